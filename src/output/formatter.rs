use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::output::report;
use crate::store::{LogEntry, Query};

/// Failure to write a report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The report name would escape the output directory or is empty.
    #[error("Invalid output name '{name}': {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Creating the directory or writing the file failed.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Write `<name>_report.md` into `output_dir` and return its path.
pub fn write_report(
    output_dir: &Path,
    name: &str,
    queries: &[Query],
    entries: &[LogEntry],
) -> Result<PathBuf, OutputError> {
    validate_output_name(name)?;

    std::fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let report_path = output_dir.join(format!("{name}_report.md"));
    std::fs::write(&report_path, report::build_report(queries, entries)).map_err(|source| {
        OutputError::Io {
            path: report_path.clone(),
            source,
        }
    })?;

    Ok(report_path)
}

fn validate_output_name(name: &str) -> Result<(), OutputError> {
    let invalid = |reason| OutputError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    let candidate = Path::new(name);
    if candidate.is_absolute() {
        return Err(invalid("absolute paths are not allowed"));
    }
    if candidate.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    }) {
        return Err(invalid("traversal segments are not allowed"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("path separators are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_report_reports_directory_creation_errors() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("marker");
        std::fs::write(&path, "not a directory").expect("should create marker file");

        let err = write_report(&path, "state", &[], &[]).expect_err("directory creation should fail");
        assert!(matches!(err, OutputError::Io { .. }));
        assert!(err.to_string().starts_with("Failed to write"));
    }

    #[test]
    fn write_report_rejects_unsafe_name_paths() {
        let dir = tempfile::tempdir().expect("should create temp dir");

        for name in ["nested/output", "../escape", "  "] {
            let err = write_report(dir.path(), name, &[], &[])
                .expect_err("unsafe output name should fail validation");
            assert!(err.to_string().contains("Invalid output name"), "{name}: {err}");
        }
    }

    #[test]
    fn write_report_writes_markdown_on_success() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let out = dir.path().join("reports");

        let path = write_report(&out, "world", &[], &[]).expect("write_report should succeed");
        assert_eq!(path, out.join("world_report.md"));

        let report = std::fs::read_to_string(path).expect("report should exist");
        assert!(report.contains("# shapeguard Firewall Report"));
    }
}
