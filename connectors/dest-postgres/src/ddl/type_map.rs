//! Arrow -> PostgreSQL type mapping.

use datafusion::arrow::datatypes::DataType;

/// Map an Arrow data type to the PostgreSQL column type used for it.
///
/// Returns `None` for types the insert path cannot bind.
pub(crate) fn arrow_to_pg_type(dt: &DataType) -> Option<&'static str> {
    match dt {
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => Some("SMALLINT"),
        DataType::Int32 | DataType::UInt16 => Some("INTEGER"),
        DataType::Int64 | DataType::UInt32 => Some("BIGINT"),
        DataType::Float32 => Some("REAL"),
        DataType::Float64 => Some("DOUBLE PRECISION"),
        DataType::Boolean => Some("BOOLEAN"),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Some("TEXT"),
        // All-null columns carry no values to bind.
        DataType::Null => Some("TEXT"),
        _ => None,
    }
}
