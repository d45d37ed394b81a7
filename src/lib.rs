//! Primary and secondary indexes for babydb tables.
//!
//! Every table has a primary index holding its row ids in byte order, and
//! every indexed column has a secondary index from each value to the rows
//! holding it. `IndexManager` keeps them up to date as rows come and go, and
//! moves them in and out of a durable `Engine` as flat byte streams.
#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

use slog::Drain;

mod config;
mod error;
mod index;
mod manager;
mod persist;
mod registry;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use index::{PrimaryKeyIndex, RowId, SecondaryValueIndex};
pub use manager::{IndexManager, Structure, StructureStats};
pub use registry::Registry;
pub use store::{Engine, SledEngine, WriteBatch};

pub fn get_default_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// A logger that drops everything, for tests and embedding.
pub fn discard_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, o!())
}
