//! Run diagnostics and the per-record error log
//!
//! Every run, preview included, produces two report files next to the bulk
//! file: a diagnostics log of run parameters and phase counts, and an error
//! log with one line per invalid or duplicate record. Both are named after
//! the input file and the run date.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Timestamp format used in both report files and on emitted records.
pub const STAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// A per-record problem. Logged and skipped, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIssue<'a> {
    /// Accession id unknown for the run's object type.
    Accession(&'a str),
    /// Designator malformed or unknown.
    Reference(&'a str),
    /// Label missing from the type cache.
    AssocType(&'a str),
    /// Creator login unknown.
    User(&'a str),
    /// Composite key already present; the raw line is logged.
    Duplicate(&'a str),
}

/// The diagnostics and error report files for one run.
pub struct RunLogs {
    diag: BufWriter<File>,
    errors: BufWriter<File>,
    diag_path: PathBuf,
    error_path: PathBuf,
    error_count: usize,
}

impl RunLogs {
    /// Open `<input-name>.<MMDDYYYY>.diagnostics` and `.error` under
    /// `out_dir` and write the start stamps.
    pub fn open(input: &Path, out_dir: &Path, started: &DateTime<Local>) -> io::Result<Self> {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let date = started.format("%m%d%Y");

        let diag_path = out_dir.join(format!("{name}.{date}.diagnostics"));
        let error_path = out_dir.join(format!("{name}.{date}.error"));

        let mut diag = BufWriter::new(File::create(&diag_path)?);
        let mut errors = BufWriter::new(File::create(&error_path)?);

        let stamp = started.format(STAMP_FORMAT);
        writeln!(diag, "Start Date/Time: {stamp}")?;
        writeln!(errors, "Start Date/Time: {stamp}")?;
        writeln!(errors)?;

        Ok(Self {
            diag,
            errors,
            diag_path,
            error_path,
            error_count: 0,
        })
    }

    /// Append one line to the diagnostics log.
    pub fn diag(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.diag, "{message}")
    }

    /// Record a per-record problem with its 1-based input line number.
    pub fn issue(&mut self, line: u64, issue: RecordIssue) -> io::Result<()> {
        self.error_count += 1;
        match issue {
            RecordIssue::Accession(v) => writeln!(self.errors, "Invalid Accession ID ({line}) {v}"),
            RecordIssue::Reference(v) => writeln!(self.errors, "Invalid Reference ({line}) {v}"),
            RecordIssue::AssocType(v) => {
                writeln!(self.errors, "Invalid Association Type ({line}) {v}")
            }
            RecordIssue::User(v) => writeln!(self.errors, "Invalid User ({line}) {v}"),
            RecordIssue::Duplicate(raw) => writeln!(self.errors, "Duplicate ({line}) {raw}"),
        }
    }

    /// Problems logged so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diag_path(&self) -> &Path {
        &self.diag_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// Write the end stamps and flush both files. Called on every exit
    /// path, fatal aborts included.
    pub fn finish(&mut self) -> io::Result<()> {
        let stamp = Local::now().format(STAMP_FORMAT);
        writeln!(self.diag, "\nEnd Date/Time: {stamp}")?;
        writeln!(self.errors, "\nEnd Date/Time: {stamp}")?;
        self.diag.flush()?;
        self.errors.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn open_logs(dir: &Path) -> RunLogs {
        RunLogs::open(Path::new("assoc.txt"), dir, &Local::now()).unwrap()
    }

    #[test]
    fn test_log_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let logs = open_logs(dir.path());

        let diag_name = logs.diag_path().file_name().unwrap().to_string_lossy().into_owned();
        let error_name = logs.error_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(diag_name.starts_with("assoc.txt."));
        assert!(diag_name.ends_with(".diagnostics"));
        assert!(error_name.ends_with(".error"));
    }

    #[test]
    fn test_issue_lines_carry_line_number_and_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut logs = open_logs(dir.path());

        logs.issue(2, RecordIssue::Reference("J:9999")).unwrap();
        logs.issue(3, RecordIssue::Duplicate("A001\tJ:1001\tGeneral"))
            .unwrap();
        assert_eq!(logs.error_count(), 2);
        let error_path = logs.error_path().to_path_buf();
        logs.finish().unwrap();

        let content = fs::read_to_string(error_path).unwrap();
        assert!(content.contains("Invalid Reference (2) J:9999"));
        assert!(content.contains("Duplicate (3) A001\tJ:1001\tGeneral"));
        assert!(content.contains("Start Date/Time: "));
        assert!(content.contains("End Date/Time: "));
    }
}
