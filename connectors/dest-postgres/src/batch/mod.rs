//! Row writes from Arrow record batches.

mod insert;
mod typed_col;

pub(crate) use self::insert::insert_batches;

/// Maximum rows per multi-value INSERT statement.
pub(crate) const INSERT_CHUNK_SIZE: usize = 1000;
