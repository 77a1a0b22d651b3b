#![allow(clippy::result_large_err)]

mod adapter;
mod config;
mod descriptor;
mod error;
mod error_formatter;
mod model;
mod query;
mod sql_dialect;
mod value;

pub use adapter::DialectAdapter;
pub use config::{Config, ConfigStore, FileConfigStore};
pub use descriptor::{ColumnDescriptor, IndexDescriptor, RoutineDescriptor, RoutineKind, TableDescriptor};
pub use error::DbError;
pub use error_formatter::{ErrorLocation, FormattedError};
pub use model::{ConnectionSpec, EngineKind, LogLevel, PairSpec, Settings, TableSyncState};
pub use query::Row;
pub use sql_dialect::{DefaultSqlDialect, PlaceholderStyle, SqlDialect};
pub use value::Value;

pub use chrono;
