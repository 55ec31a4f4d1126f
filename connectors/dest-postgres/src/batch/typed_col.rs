//! Typed Arrow column helpers used by the INSERT write path.

use datafusion::arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array,
    Int8Array, LargeStringArray, StringArray, StringViewArray, UInt16Array, UInt32Array,
    UInt8Array,
};
use datafusion::arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt8Type,
};
use datafusion::arrow::record_batch::RecordBatch;
use tokio_postgres::types::ToSql;

/// Pre-downcast Arrow column reference, resolved once per column per batch.
pub(crate) enum TypedCol<'a> {
    Int8(&'a Int8Array),
    Int16(&'a Int16Array),
    Int32(&'a Int32Array),
    Int64(&'a Int64Array),
    UInt8(&'a UInt8Array),
    UInt16(&'a UInt16Array),
    UInt32(&'a UInt32Array),
    Float32(&'a Float32Array),
    Float64(&'a Float64Array),
    Boolean(&'a BooleanArray),
    Utf8(&'a StringArray),
    LargeUtf8(&'a LargeStringArray),
    Utf8View(&'a StringViewArray),
    Null,
}

fn downcast(col: &dyn Array) -> Option<TypedCol<'_>> {
    Some(match col.data_type() {
        DataType::Int8 => TypedCol::Int8(col.as_primitive_opt::<Int8Type>()?),
        DataType::Int16 => TypedCol::Int16(col.as_primitive_opt::<Int16Type>()?),
        DataType::Int32 => TypedCol::Int32(col.as_primitive_opt::<Int32Type>()?),
        DataType::Int64 => TypedCol::Int64(col.as_primitive_opt::<Int64Type>()?),
        DataType::UInt8 => TypedCol::UInt8(col.as_primitive_opt::<UInt8Type>()?),
        DataType::UInt16 => TypedCol::UInt16(col.as_primitive_opt::<UInt16Type>()?),
        DataType::UInt32 => TypedCol::UInt32(col.as_primitive_opt::<UInt32Type>()?),
        DataType::Float32 => TypedCol::Float32(col.as_primitive_opt::<Float32Type>()?),
        DataType::Float64 => TypedCol::Float64(col.as_primitive_opt::<Float64Type>()?),
        DataType::Boolean => TypedCol::Boolean(col.as_boolean_opt()?),
        DataType::Utf8 => TypedCol::Utf8(col.as_string_opt::<i32>()?),
        DataType::LargeUtf8 => TypedCol::LargeUtf8(col.as_string_opt::<i64>()?),
        DataType::Utf8View => TypedCol::Utf8View(col.as_string_view_opt()?),
        DataType::Null => TypedCol::Null,
        _ => return None,
    })
}

/// Downcast every column of `batch`; the error names the first column that
/// has no SQL binding.
pub(crate) fn downcast_columns(batch: &RecordBatch) -> Result<Vec<TypedCol<'_>>, String> {
    let schema = batch.schema_ref();
    batch
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            downcast(col.as_ref()).ok_or_else(|| {
                format!(
                    "column '{}' has unsupported type {}",
                    schema.field(i).name(),
                    col.data_type()
                )
            })
        })
        .collect()
}

/// One bound parameter value. Unsigned types widen to the next signed type.
#[derive(Debug, PartialEq)]
pub(crate) enum SqlParamValue<'a> {
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Boolean(Option<bool>),
    Text(Option<&'a str>),
}

impl SqlParamValue<'_> {
    pub(crate) fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Int16(v) => v,
            Self::Int32(v) => v,
            Self::Int64(v) => v,
            Self::Float32(v) => v,
            Self::Float64(v) => v,
            Self::Boolean(v) => v,
            Self::Text(v) => v,
        }
    }
}

fn value_at<A: Array, T>(arr: &A, row_idx: usize, get: impl Fn(&A, usize) -> T) -> Option<T> {
    if arr.is_null(row_idx) {
        None
    } else {
        Some(get(arr, row_idx))
    }
}

pub(crate) fn sql_param_value<'a>(col: &'a TypedCol<'a>, row_idx: usize) -> SqlParamValue<'a> {
    match col {
        TypedCol::Null => SqlParamValue::Text(None),
        TypedCol::Int8(arr) => {
            SqlParamValue::Int16(value_at(*arr, row_idx, |a, i| i16::from(a.value(i))))
        }
        TypedCol::Int16(arr) => SqlParamValue::Int16(value_at(*arr, row_idx, |a, i| a.value(i))),
        TypedCol::Int32(arr) => SqlParamValue::Int32(value_at(*arr, row_idx, |a, i| a.value(i))),
        TypedCol::Int64(arr) => SqlParamValue::Int64(value_at(*arr, row_idx, |a, i| a.value(i))),
        TypedCol::UInt8(arr) => {
            SqlParamValue::Int16(value_at(*arr, row_idx, |a, i| i16::from(a.value(i))))
        }
        TypedCol::UInt16(arr) => {
            SqlParamValue::Int32(value_at(*arr, row_idx, |a, i| i32::from(a.value(i))))
        }
        TypedCol::UInt32(arr) => {
            SqlParamValue::Int64(value_at(*arr, row_idx, |a, i| i64::from(a.value(i))))
        }
        TypedCol::Float32(arr) => {
            SqlParamValue::Float32(value_at(*arr, row_idx, |a, i| a.value(i)))
        }
        TypedCol::Float64(arr) => {
            SqlParamValue::Float64(value_at(*arr, row_idx, |a, i| a.value(i)))
        }
        TypedCol::Boolean(arr) => {
            SqlParamValue::Boolean(value_at(*arr, row_idx, |a, i| a.value(i)))
        }
        TypedCol::Utf8(arr) => SqlParamValue::Text(if arr.is_null(row_idx) {
            None
        } else {
            Some(arr.value(row_idx))
        }),
        TypedCol::LargeUtf8(arr) => SqlParamValue::Text(if arr.is_null(row_idx) {
            None
        } else {
            Some(arr.value(row_idx))
        }),
        TypedCol::Utf8View(arr) => SqlParamValue::Text(if arr.is_null(row_idx) {
            None
        } else {
            Some(arr.value(row_idx))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use datafusion::arrow::array::{ArrayRef, BinaryArray, NullArray};
    use datafusion::arrow::datatypes::{Field, Schema};

    #[test]
    fn test_numeric_and_null_values() {
        let arr = Int64Array::from(vec![Some(7), None]);
        let col = TypedCol::Int64(&arr);
        assert_eq!(sql_param_value(&col, 0), SqlParamValue::Int64(Some(7)));
        assert_eq!(sql_param_value(&col, 1), SqlParamValue::Int64(None));
    }

    #[test]
    fn test_utf8_values() {
        let arr = StringArray::from(vec![Some("Toyota"), None]);
        let col = TypedCol::Utf8(&arr);
        assert_eq!(sql_param_value(&col, 0), SqlParamValue::Text(Some("Toyota")));
        assert_eq!(sql_param_value(&col, 1), SqlParamValue::Text(None));
    }

    #[test]
    fn test_unsigned_values_widen() {
        let arr = UInt32Array::from(vec![u32::MAX]);
        let col = TypedCol::UInt32(&arr);
        assert_eq!(
            sql_param_value(&col, 0),
            SqlParamValue::Int64(Some(i64::from(u32::MAX)))
        );
    }

    #[test]
    fn test_downcast_report_batch() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("make", DataType::Utf8, true),
            Field::new("avg_price", DataType::Float64, true),
            Field::new("total_vehicles", DataType::Int64, false),
            Field::new("unknown", DataType::Null, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["BMW"])),
            Arc::new(Float64Array::from(vec![68500.0])),
            Arc::new(Int64Array::from(vec![2])),
            Arc::new(NullArray::new(1)),
        ];
        let batch = RecordBatch::try_new(schema, columns).unwrap();

        let cols = downcast_columns(&batch).unwrap();
        assert!(matches!(cols[0], TypedCol::Utf8(_)));
        assert!(matches!(cols[1], TypedCol::Float64(_)));
        assert!(matches!(cols[2], TypedCol::Int64(_)));
        assert!(matches!(cols[3], TypedCol::Null));
    }

    #[test]
    fn test_unsupported_column_is_named() {
        let schema = Arc::new(Schema::new(vec![Field::new("raw", DataType::Binary, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(BinaryArray::from(vec![Some(b"x".as_slice())]))],
        )
        .unwrap();
        let err = downcast_columns(&batch).err().unwrap();
        assert!(err.contains("'raw'"));
    }
}
