//! PostgreSQL sink for computed reports.
//!
//! Each report is written to a staging table and swapped into place with a
//! transactional `DROP` + `RENAME`, so readers never observe a half-written
//! report table.

mod batch;
mod client;
mod ddl;
mod error;
mod sink;

pub use client::{connect, validate};
pub use sink::PostgresSink;
