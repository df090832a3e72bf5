//! The record pipeline: validate, reject duplicates, allocate, emit
//!
//! One pass over the input file. Each line is split by tab and every field
//! resolved independently so the error log names all of a line's problems;
//! a record reaches the duplicate check only when every field resolved, and
//! receives an association key only once it is accepted. Only a short line
//! aborts the run; data problems are logged and skipped.

use std::io::Read;

use csv::ReaderBuilder;
use serde::Serialize;
use thiserror::Error;

use crate::core::cache::{AssocIndex, AssocKey, AssocTypeCache, KeyAllocator};
use crate::core::record::{AssocRow, InputRecord};
use crate::core::report::{RecordIssue, RunLogs};
use crate::core::resolver::Resolver;
use crate::core::writer::BulkWriter;

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct RunStats {
    /// Input records read.
    pub lines: usize,
    /// Records that passed validation and duplicate detection.
    pub accepted: usize,
    /// Records with at least one unresolvable field.
    pub invalid: usize,
    /// Records whose composite key was already present or already emitted.
    pub duplicates: usize,
}

/// Structural failures that abort the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid line ({line}): {raw}")]
    BadArity { line: u64, raw: String },

    #[error("could not read input: {0}")]
    Input(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where each record's creator key comes from.
pub enum CreatorSource<'a> {
    /// Resolved once at startup; `key` is `None` when the configured login
    /// was unknown, which invalidates every record.
    PerRun { login: &'a str, key: Option<i64> },
    /// Field 4 of every line, resolved through the user namespace.
    PerLine(&'a dyn Resolver),
}

/// The per-record processing loop and the state it mutates.
pub struct Pipeline<'a> {
    pub object_type_key: i64,
    /// Stamped as creation and modification timestamp on every record.
    pub load_date: &'a str,
    pub objects: &'a dyn Resolver,
    pub references: &'a dyn Resolver,
    pub types: &'a AssocTypeCache,
    pub creator: CreatorSource<'a>,
    pub index: AssocIndex,
    pub allocator: KeyAllocator,
}

impl Pipeline<'_> {
    /// Run every input record through validation, duplicate detection and
    /// emission. `writer` is `None` in preview mode, which changes nothing
    /// about validation or logging.
    pub fn process<R: Read>(
        &mut self,
        input: R,
        mut writer: Option<&mut BulkWriter>,
        logs: &mut RunLogs,
    ) -> Result<RunStats, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(input);

        let per_line_creator = matches!(self.creator, CreatorSource::PerLine(_));
        let mut stats = RunStats::default();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let raw = record.iter().collect::<Vec<_>>().join("\t");
            stats.lines += 1;

            let Some(rec) = InputRecord::from_record(&record, per_line_creator) else {
                return Err(PipelineError::BadArity { line, raw });
            };

            // resolve every field so the error log covers the whole line
            let object_key = self.objects.resolve(&rec.accession_id);
            if object_key.is_none() {
                logs.issue(line, RecordIssue::Accession(&rec.accession_id))?;
            }
            let refs_key = self.references.resolve(&rec.designator);
            if refs_key.is_none() {
                logs.issue(line, RecordIssue::Reference(&rec.designator))?;
            }
            let assoc_type_key = self.types.resolve(&rec.assoc_type);
            if assoc_type_key.is_none() {
                logs.issue(line, RecordIssue::AssocType(&rec.assoc_type))?;
            }
            let created_by_key = match &self.creator {
                CreatorSource::PerRun { login, key } => {
                    if key.is_none() {
                        logs.issue(line, RecordIssue::User(login))?;
                    }
                    *key
                }
                CreatorSource::PerLine(users) => {
                    let login = rec.creator.as_deref().unwrap_or_default();
                    let key = users.resolve(login);
                    if key.is_none() {
                        logs.issue(line, RecordIssue::User(login))?;
                    }
                    key
                }
            };

            let (Some(object_key), Some(refs_key), Some(assoc_type_key), Some(created_by_key)) =
                (object_key, refs_key, assoc_type_key, created_by_key)
            else {
                stats.invalid += 1;
                continue;
            };

            let key = AssocKey {
                object_key,
                refs_key,
                assoc_type_key,
            };
            if !self.index.insert(key) {
                logs.issue(line, RecordIssue::Duplicate(&raw))?;
                stats.duplicates += 1;
                continue;
            }

            // accepted: the key is allocated only now
            let assoc_key = self.allocator.next_key();
            if let Some(out) = writer.as_deref_mut() {
                out.append(&AssocRow {
                    assoc_key,
                    refs_key,
                    object_key,
                    object_type_key: self.object_type_key,
                    assoc_type_key,
                    created_by_key,
                    modified_by_key: created_by_key,
                    creation_ts: self.load_date.to_string(),
                    modification_ts: self.load_date.to_string(),
                })?;
            }
            stats.accepted += 1;
        }

        Ok(stats)
    }
}
