//! Embedded, transactional, frame based text index.
//!
//! Documents are split into fixed size frames of analysed tokens. A single
//! [`IndexWriter`] per location stages changes in a transaction and commits
//! them atomically; any number of [`IndexReader`]s query immutable snapshots
//! of committed state.

pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod query;
pub mod mvcc;
pub mod writer;
pub mod reader;
pub mod compression;

pub use crate::core::config::{Config, IndexConfig};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{AttributeValue, DocId, Document, FieldValue, FrameId, Revision};
pub use crate::index::frame::Frame;
pub use crate::query::metadata::Comparison;
pub use crate::query::ngrams::{FilterNgramOptions, NgramOptions, Scoring};
pub use crate::query::skipgrams::Skipgram;
pub use crate::query::statistics::Weighting;
pub use crate::query::terms::{TermQuery, TermScoring};
pub use crate::query::{FieldSelection, Pagination};
pub use crate::reader::index_reader::IndexReader;
pub use crate::schema::plugins::{PluginInstance, PluginState};
pub use crate::schema::schema::{FieldKind, FieldType, Schema};
pub use crate::schema::settings::SettingValue;
pub use crate::storage::migration::CURRENT_SCHEMA;
pub use crate::writer::index_writer::IndexWriter;
