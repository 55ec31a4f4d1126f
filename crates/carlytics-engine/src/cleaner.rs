//! Required-field filtering.

use datafusion::dataframe::DataFrame;
use datafusion::error::Result as DfResult;
use datafusion::logical_expr::{ident, lit, Expr};

use crate::config::ColumnMap;

/// Drop every record with a null in any required field.
///
/// Pure filter: schema and values of surviving rows are untouched, and an
/// empty result is valid.
pub fn clean(df: DataFrame, columns: &ColumnMap) -> DfResult<DataFrame> {
    let predicate = columns
        .required()
        .into_iter()
        .map(|name| ident(name).is_not_null())
        .reduce(Expr::and)
        .unwrap_or_else(|| lit(true));
    df.filter(predicate)
}
