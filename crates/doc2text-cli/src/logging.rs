use std::io::Write;
use std::path::Path;

use anyhow::Context;
use indicatif::ProgressBar;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;

const LOG_FILE: &str = "doc2text.log";

/// Wraps a writer so each log record is printed with the progress bar
/// cleared, then the bar is redrawn.
pub struct SuspendingWriter<M> {
    bar: Option<ProgressBar>,
    inner: M,
}

impl<M> SuspendingWriter<M> {
    pub fn new(bar: Option<ProgressBar>, inner: M) -> Self {
        Self { bar, inner }
    }
}

/// One buffered log record; written out on drop.
pub struct SuspendedRecord<'a, M: MakeWriter<'a>> {
    bar: Option<&'a ProgressBar>,
    inner: &'a M,
    buf: Vec<u8>,
}

impl<'a, M: MakeWriter<'a>> Write for SuspendedRecord<'a, M> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a, M: MakeWriter<'a>> Drop for SuspendedRecord<'a, M> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        let inner = self.inner;
        let emit = move || {
            let mut w = inner.make_writer();
            let _ = w.write_all(&buf);
            let _ = w.flush();
        };
        match self.bar {
            Some(bar) => bar.suspend(emit),
            None => emit(),
        }
    }
}

impl<'a, M> MakeWriter<'a> for SuspendingWriter<M>
where
    M: MakeWriter<'a> + 'a,
{
    type Writer = SuspendedRecord<'a, M>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedRecord {
            bar: self.bar.as_ref(),
            inner: &self.inner,
            buf: Vec::new(),
        }
    }
}

/// Install the global subscriber: stderr (kept clear of `bar`) plus an
/// optional `<log_dir>/doc2text.log`. Hold the returned guard until exit.
pub fn init(log_dir: Option<&Path>, bar: Option<ProgressBar>) -> anyhow::Result<Option<WorkerGuard>> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE)
                .build(dir)
                .with_context(|| format!("opening log file in {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(SuspendingWriter::new(bar, std::io::stderr)))
        .with(file_layer)
        .init();
    Ok(guard)
}
