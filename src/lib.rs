pub mod constant;
pub mod error;
pub mod protocol;

mod execution;
mod metadata;
mod opts;
mod results;
mod row;
mod shape;
mod statement;
mod value;

#[cfg(test)]
mod testutil;

pub use error::{CommonServerError, Diagnostics, Error, Result, ServerCode};
pub use execution::{ExecutionProcessor, ProcessorStep, ResultsetEncoding};
pub use metadata::{ColumnMetadata, MetadataMode};
pub use opts::{Opts, SslMode};
pub use results::{ExecutionState, QueryResults, Resultset};
pub use row::Row;
pub use shape::{ColumnShape, check_meta};
pub use statement::Statement;
pub use value::{Date, Datetime, TimeValue, Value};

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;
