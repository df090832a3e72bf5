//! Bulk-load file emission

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::record::AssocRow;

/// Buffered writer for the pipe-delimited bulk file.
///
/// Only created in load mode; preview runs carry no writer at all.
pub struct BulkWriter {
    out: BufWriter<File>,
    path: PathBuf,
    rows: usize,
}

impl BulkWriter {
    /// Suffix appended to the input file name.
    pub const FILE_SUFFIX: &'static str = "ref_assoc.bcp";

    /// Create `<input-name>.ref_assoc.bcp` under `out_dir`.
    pub fn create(input: &Path, out_dir: &Path) -> io::Result<Self> {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let path = out_dir.join(format!("{name}.{}", Self::FILE_SUFFIX));
        let out = BufWriter::new(File::create(&path)?);

        Ok(Self { out, path, rows: 0 })
    }

    /// Append one accepted record.
    pub fn append(&mut self, row: &AssocRow) -> io::Result<()> {
        writeln!(self.out, "{}", row.to_bcp_line())?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and hand back the file path for the bulk import.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.out.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(assoc_key: i64) -> AssocRow {
        AssocRow {
            assoc_key,
            refs_key: 201,
            object_key: 10,
            object_type_key: 1,
            assoc_type_key: 301,
            created_by_key: 100,
            modified_by_key: 100,
            creation_ts: "02/09/2026 08:30:00".to_string(),
            modification_ts: "02/09/2026 08:30:00".to_string(),
        }
    }

    #[test]
    fn test_writer_names_file_after_input() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BulkWriter::create(Path::new("/data/assoc.txt"), dir.path()).unwrap();
        assert_eq!(
            writer.path().file_name().unwrap().to_string_lossy(),
            "assoc.txt.ref_assoc.bcp"
        );
    }

    #[test]
    fn test_writer_appends_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BulkWriter::create(Path::new("assoc.txt"), dir.path()).unwrap();
        writer.append(&row(1000)).unwrap();
        writer.append(&row(1001)).unwrap();
        assert_eq!(writer.rows(), 2);

        let path = writer.finish().unwrap();
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1000|"));
        assert!(lines[1].starts_with("1001|"));
    }
}
