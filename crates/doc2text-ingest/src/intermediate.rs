use std::path::{Path, PathBuf};

/// Scoped ownership of the TEI file one service pass writes.
///
/// On drop the file is removed, or renamed to `keep_as` when intermediate
/// files are kept. This runs whether the pass succeeded or not.
pub(crate) struct IntermediateFile {
    path: PathBuf,
    keep_as: Option<PathBuf>,
}

impl IntermediateFile {
    /// Take ownership of `path`, clearing any file left there by an earlier run.
    pub(crate) fn acquire(path: PathBuf, keep_as: Option<PathBuf>) -> Self {
        if path.exists() {
            tracing::warn!(path = %path.display(), "removing stale intermediate file");
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale intermediate file");
            }
        }
        Self { path, keep_as }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        let result = match &self.keep_as {
            Some(target) => std::fs::rename(&self.path, target),
            None => std::fs::remove_file(&self.path),
        };
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release intermediate file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.tei.xml");
        {
            let guard = IntermediateFile::acquire(path.clone(), None);
            std::fs::write(guard.path(), "<TEI/>").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn renames_file_when_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.tei.xml");
        let kept = dir.path().join("p.legacy.tei.xml");
        {
            let _guard = IntermediateFile::acquire(path.clone(), Some(kept.clone()));
            std::fs::write(&path, "<TEI/>").unwrap();
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&kept).unwrap(), "<TEI/>");
    }

    #[test]
    fn clears_stale_file_on_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.tei.xml");
        std::fs::write(&path, "stale").unwrap();

        let _guard = IntermediateFile::acquire(path.clone(), None);
        assert!(!path.exists());
    }

    #[test]
    fn drop_without_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.tei.xml");
        drop(IntermediateFile::acquire(
            dir.path().join("never.tei.xml"),
            Some(kept.clone()),
        ));
        assert!(!kept.exists());
    }
}
