//! Input records and the bulk-load row format
//!
//! One input line carries an accession identifier, a reference designator,
//! an association-type label, and (when the run reads creators per line) a
//! creator login. Accepted records are serialized as pipe-delimited rows in
//! the column order of the `ref_assoc` table.

use csv::StringRecord;
use thiserror::Error;

/// Delimiter of the emitted bulk-load file.
pub const BCP_DELIMITER: char = '|';

/// Column count of the emitted bulk-load file.
pub const BCP_COLUMNS: usize = 9;

/// Raw fields pulled off one input line. Fields beyond those consumed are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub accession_id: String,
    pub designator: String,
    pub assoc_type: String,
    /// Present only when the run reads the creator per line.
    pub creator: Option<String>,
}

impl InputRecord {
    /// Pull the consumed fields off a tab-split record.
    ///
    /// Returns `None` when the record has fewer fields than the run
    /// requires (three, or four with a per-line creator). Short records
    /// are an input-format violation, so the caller aborts the run.
    pub fn from_record(record: &StringRecord, per_line_creator: bool) -> Option<Self> {
        let required = if per_line_creator { 4 } else { 3 };
        if record.len() < required {
            return None;
        }

        Some(Self {
            accession_id: record[0].to_string(),
            designator: record[1].to_string(),
            assoc_type: record[2].to_string(),
            creator: per_line_creator.then(|| record[3].to_string()),
        })
    }
}

/// Check the fixed shape of a reference designator: `J:` followed by one or
/// more ASCII digits. Anything else fails resolution before the store is
/// consulted.
pub fn is_designator(raw: &str) -> bool {
    raw.strip_prefix("J:")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// One accepted association, in target-table column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocRow {
    pub assoc_key: i64,
    pub refs_key: i64,
    pub object_key: i64,
    pub object_type_key: i64,
    pub assoc_type_key: i64,
    pub created_by_key: i64,
    pub modified_by_key: i64,
    pub creation_ts: String,
    pub modification_ts: String,
}

impl AssocRow {
    /// Serialize as one bulk-load line (no trailing newline).
    ///
    /// Column order is the load-format contract consumed by the bulk
    /// import and must not vary between runs.
    pub fn to_bcp_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.assoc_key,
            self.refs_key,
            self.object_key,
            self.object_type_key,
            self.assoc_type_key,
            self.created_by_key,
            self.modified_by_key,
            self.creation_ts,
            self.modification_ts,
        )
    }

    /// Parse one bulk-load line back into a row.
    pub fn from_bcp_line(line: &str) -> Result<Self, RowParseError> {
        let fields: Vec<&str> = line.split(BCP_DELIMITER).collect();
        if fields.len() != BCP_COLUMNS {
            return Err(RowParseError::ColumnCount(fields.len()));
        }

        let key = |i: usize| -> Result<i64, RowParseError> {
            fields[i]
                .parse()
                .map_err(|_| RowParseError::BadKey(fields[i].to_string()))
        };

        Ok(Self {
            assoc_key: key(0)?,
            refs_key: key(1)?,
            object_key: key(2)?,
            object_type_key: key(3)?,
            assoc_type_key: key(4)?,
            created_by_key: key(5)?,
            modified_by_key: key(6)?,
            creation_ts: fields[7].to_string(),
            modification_ts: fields[8].to_string(),
        })
    }
}

/// Errors parsing a bulk-load row
#[derive(Debug, Error)]
pub enum RowParseError {
    #[error("expected {BCP_COLUMNS} columns, found {0}")]
    ColumnCount(usize),

    #[error("key column is not an integer: '{0}'")]
    BadKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_three_field_record() {
        let rec = InputRecord::from_record(&record(&["A001", "J:1001", "General"]), false).unwrap();
        assert_eq!(rec.accession_id, "A001");
        assert_eq!(rec.designator, "J:1001");
        assert_eq!(rec.assoc_type, "General");
        assert_eq!(rec.creator, None);
    }

    #[test]
    fn test_trailing_fields_ignored() {
        let rec = InputRecord::from_record(
            &record(&["A001", "J:1001", "General", "curator", "note"]),
            false,
        )
        .unwrap();
        assert_eq!(rec.creator, None);
    }

    #[test]
    fn test_short_record_rejected() {
        assert!(InputRecord::from_record(&record(&["A001", "J:1001"]), false).is_none());
        assert!(InputRecord::from_record(&record(&["A001", "J:1001", "General"]), true).is_none());
    }

    #[test]
    fn test_per_line_creator_field() {
        let rec =
            InputRecord::from_record(&record(&["A001", "J:1001", "General", "curator"]), true)
                .unwrap();
        assert_eq!(rec.creator.as_deref(), Some("curator"));
    }

    #[test]
    fn test_designator_shape() {
        assert!(is_designator("J:1001"));
        assert!(is_designator("J:7"));
        assert!(!is_designator("J:"));
        assert!(!is_designator("J:12a4"));
        assert!(!is_designator("j:1001"));
        assert!(!is_designator("1001"));
        assert!(!is_designator(""));
    }

    #[test]
    fn test_bcp_line_format() {
        let row = AssocRow {
            assoc_key: 1000,
            refs_key: 201,
            object_key: 10,
            object_type_key: 1,
            assoc_type_key: 301,
            created_by_key: 100,
            modified_by_key: 100,
            creation_ts: "02/09/2026 08:30:00".to_string(),
            modification_ts: "02/09/2026 08:30:00".to_string(),
        };

        let line = row.to_bcp_line();
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields.len(), BCP_COLUMNS);
        assert_eq!(fields[0], "1000");
        assert_eq!(fields[1], "201");
        assert_eq!(fields[2], "10");

        let parsed = AssocRow::from_bcp_line(&line).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn test_bcp_line_bad_column_count() {
        assert!(matches!(
            AssocRow::from_bcp_line("1|2|3"),
            Err(RowParseError::ColumnCount(3))
        ));
    }
}
