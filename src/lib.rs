pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ingest_log;
pub mod logging;
pub mod normalize;
pub mod parse;
pub mod queries;
pub mod reconcile;
pub mod resolve;
pub mod rows;
pub mod schema;
pub mod sections;
pub mod upsert;

pub use error::{IngestError, IngestResult};
pub use ingest::{IngestRequest, IngestResponse, ingest};
