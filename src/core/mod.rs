//! Core module - the record pipeline and its collaborators

pub mod cache;
pub mod config;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod resolver;
pub mod store;
pub mod writer;

pub use cache::{AssocIndex, AssocKey, AssocTypeCache, KeyAllocator};
pub use config::{ConfigError, RawConfig, RunConfig, RunMode};
pub use pipeline::{CreatorSource, Pipeline, PipelineError, RunStats};
pub use record::{AssocRow, InputRecord};
pub use report::{RecordIssue, RunLogs};
pub use resolver::{AccessionResolver, ReferenceResolver, Resolver, UserResolver};
pub use store::{Store, StoreError};
pub use writer::BulkWriter;
