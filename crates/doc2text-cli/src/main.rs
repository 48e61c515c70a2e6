use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use doc2text_core::config_file::{self, ConfigFile};
use doc2text_core::{VersionTag, flatten};
use doc2text_ingest::{
    BatchConfig, BatchProgress, ConvertConfig, DEFAULT_OUTPUT_DIR, DEFAULT_TEMP_DIR,
    FailurePolicy, GrobidPasses, run_batch,
};
use indicatif::{ProgressBar, ProgressStyle};

mod logging;
mod output;

use output::ColorMode;

/// Convert academic PDFs to plain text through a GROBID service
#[derive(Parser, Debug)]
#[command(name = "doc2text", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every PDF in a directory into a text file
    Run {
        /// Directory containing the PDFs to convert
        #[arg(short, long = "input")]
        input_dir: PathBuf,

        /// Directory for intermediate TEI files [default: temp]
        #[arg(short, long = "temp")]
        temp_dir: Option<PathBuf>,

        /// Directory for the produced text files [default: text_repo]
        #[arg(short, long = "output")]
        output_dir: Option<PathBuf>,

        /// Keep intermediate TEI files as <paper>.<tag>.tei.xml
        #[arg(short, long)]
        keep: bool,

        /// Record failed files and keep going instead of stopping
        #[arg(long)]
        continue_on_error: bool,

        /// Config file to use instead of the platform/.doc2text.toml cascade
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write logs to <dir>/doc2text.log
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Flatten an existing TEI file and print the text
    Flatten {
        /// Path to a GROBID TEI XML file
        tei_file: PathBuf,

        /// Only run one pass (legacy or reference); both when omitted
        #[arg(long)]
        tag: Option<VersionTag>,

        /// Print the translated paper as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Directories for one run after CLI flags and config file are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunPaths {
    temp_dir: PathBuf,
    output_dir: PathBuf,
    log_dir: Option<PathBuf>,
}

/// CLI flag > config file > default.
fn resolve_paths(
    temp_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    file: &ConfigFile,
) -> RunPaths {
    let paths = file.paths.clone().unwrap_or_default();
    RunPaths {
        temp_dir: temp_dir
            .or_else(|| paths.temp_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_DIR)),
        output_dir: output_dir
            .or_else(|| paths.output_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        log_dir: log_dir.or_else(|| paths.log_dir.map(PathBuf::from)),
    }
}

fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<ConfigFile> {
    let explicit =
        explicit.or_else(|| std::env::var("DOC2TEXT_CONFIG").ok().map(PathBuf::from));
    match explicit {
        Some(path) => Ok(config_file::load_required(&path)?),
        None => Ok(config_file::load_config()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input_dir,
            temp_dir,
            output_dir,
            keep,
            continue_on_error,
            config,
            log_dir,
            no_color,
        } => {
            let file_config = load_config(config)?;
            let paths = resolve_paths(temp_dir, output_dir, log_dir, &file_config);
            let bar = progress_bar();
            let _log_guard = logging::init(paths.log_dir.as_deref(), Some(bar.clone()))?;

            let batch = BatchConfig {
                input_dir,
                convert: ConvertConfig {
                    temp_dir: paths.temp_dir,
                    output_dir: paths.output_dir,
                    keep_intermediate: keep,
                },
                failure_policy: if continue_on_error {
                    FailurePolicy::Continue
                } else {
                    FailurePolicy::Abort
                },
            };
            run(batch, &file_config, ColorMode(!no_color), bar).await
        }
        Command::Flatten { tei_file, tag, json } => {
            let _log_guard = logging::init(None, None)?;
            flatten_tei(&tei_file, tag, json)
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar
}

async fn run(
    batch: BatchConfig,
    file_config: &ConfigFile,
    color: ColorMode,
    bar: ProgressBar,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let legacy = file_config.profile(VersionTag::Legacy);
    let reference = file_config.profile(VersionTag::Reference);
    tracing::info!(
        input_dir = %batch.input_dir.display(),
        output_dir = %batch.convert.output_dir.display(),
        legacy = %legacy.base_url(),
        reference = %reference.base_url(),
        policy = ?batch.failure_policy,
        "starting conversion"
    );
    let passes = GrobidPasses::new(legacy, reference)?;

    bar.enable_steady_tick(Duration::from_millis(120));

    let result = run_batch(&batch, &passes.services(), |event| match event {
        BatchProgress::Started { total } => bar.set_length(total as u64),
        BatchProgress::FileStarted { path, .. } => {
            bar.set_message(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
        }
        BatchProgress::FileConverted { .. } => bar.inc(1),
        BatchProgress::FileFailed { path, error, .. } => {
            bar.suspend(|| {
                let _ = output::print_file_failure(&mut std::io::stderr(), &path, &error, color);
            });
            bar.inc(1);
        }
        BatchProgress::Finished { .. } => bar.finish_and_clear(),
    })
    .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            bar.abandon();
            return Err(e).with_context(|| {
                format!("converting PDFs in {}", batch.input_dir.display())
            });
        }
    };

    tracing::info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        elapsed_secs = report.elapsed.as_secs_f64(),
        "conversion finished"
    );

    let mut stdout = std::io::stdout();
    output::print_summary(&mut stdout, &report, color)?;
    output::print_failures(&mut stdout, &report.failed, color)?;
    output::print_runtime(&mut stdout, start.elapsed())?;
    stdout.flush()?;

    if !report.failed.is_empty() {
        anyhow::bail!("{} file(s) failed to convert", report.failed.len());
    }
    Ok(())
}

fn flatten_tei(tei_file: &Path, tag: Option<VersionTag>, json: bool) -> anyhow::Result<()> {
    let paper = doc2text_tei::parse_tei_file(tei_file)
        .with_context(|| format!("reading {}", tei_file.display()))?;

    let mut stdout = std::io::stdout();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &paper)?;
        writeln!(stdout)?;
        return Ok(());
    }

    let text = match tag {
        Some(tag) => flatten(&paper, tag)?,
        None => VersionTag::ALL
            .into_iter()
            .map(|tag| flatten(&paper, tag))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    };
    write!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}
