//! Half-up rounding of averages on their decimal representation.
//!
//! `round(x, 2)` in DataFusion scales the binary value by 100 before
//! rounding, so an average such as `201 / 200` (stored as
//! `1.00499999999999989...`) comes out as `1.0`. Report averages are
//! rounded on the shortest decimal string that round-trips to the same
//! `f64` instead, which yields `1.01`.

use std::any::Any;
use std::sync::Arc;

use datafusion::arrow::array::{AsArray, Float64Array};
use datafusion::arrow::datatypes::{DataType, Float64Type};
use datafusion::error::{DataFusionError, Result as DfResult};
use datafusion::logical_expr::{
    ColumnarValue, Expr, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use datafusion::scalar::ScalarValue;

/// Scalar function rounding a `Float64` half-up to a fixed number of decimals.
#[derive(Debug)]
struct RoundHalfUp {
    signature: Signature,
    decimals: usize,
}

impl RoundHalfUp {
    fn new(decimals: usize) -> Self {
        Self {
            signature: Signature::exact(vec![DataType::Float64], Volatility::Immutable),
            decimals,
        }
    }
}

impl ScalarUDFImpl for RoundHalfUp {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "round_half_up"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _: &[DataType]) -> DfResult<DataType> {
        Ok(DataType::Float64)
    }

    fn invoke_batch(&self, args: &[ColumnarValue], _number_rows: usize) -> DfResult<ColumnarValue> {
        let [arg] = args else {
            return Err(DataFusionError::Internal(format!(
                "round_half_up takes one argument, got {}",
                args.len()
            )));
        };
        match arg {
            ColumnarValue::Scalar(ScalarValue::Float64(value)) => Ok(ColumnarValue::Scalar(
                ScalarValue::Float64(value.map(|v| round_half_up(v, self.decimals))),
            )),
            ColumnarValue::Scalar(other) => Err(DataFusionError::Internal(format!(
                "round_half_up expects Float64, got {}",
                other.data_type()
            ))),
            ColumnarValue::Array(array) => {
                let values = array.as_primitive_opt::<Float64Type>().ok_or_else(|| {
                    DataFusionError::Internal(format!(
                        "round_half_up expects Float64, got {}",
                        array.data_type()
                    ))
                })?;
                let rounded: Float64Array = values.unary(|v| round_half_up(v, self.decimals));
                Ok(ColumnarValue::Array(Arc::new(rounded)))
            }
        }
    }
}

/// `expr` rounded half-up to `decimals` places.
pub(crate) fn round_half_up_expr(expr: Expr, decimals: usize) -> Expr {
    ScalarUDF::from(RoundHalfUp::new(decimals)).call(vec![expr])
}

/// Round half-up (away from zero) on the shortest decimal form of `value`.
pub(crate) fn round_half_up(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // `Display` for f64 prints the shortest round-trip digits, never in
    // exponent form.
    let text = value.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if frac_part.len() <= decimals {
        return value;
    }

    let kept = int_part.bytes().chain(frac_part.bytes().take(decimals));
    let mut scaled = kept.fold(0u128, |acc, b| acc * 10 + u128::from(b - b'0'));
    if frac_part.as_bytes()[decimals] >= b'5' {
        scaled += 1;
    }
    if scaled == 0 {
        return 0.0;
    }

    let rounded = format!(
        "{}.{:0>width$}",
        scaled / 10u128.pow(decimals as u32),
        scaled % 10u128.pow(decimals as u32),
        width = decimals
    )
    .parse::<f64>()
    .unwrap_or(value.abs());
    if value < 0.0 {
        -rounded
    } else {
        rounded
    }
}
