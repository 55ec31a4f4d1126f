//! Derived columns computed from cleaned records.

use datafusion::arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::functions::expr_fn::upper;
use datafusion::logical_expr::{cast, ident, lit, when, Expr};

use crate::config::ColumnMap;
use crate::errors::TransformError;

/// Year car ages are measured against.
pub const REFERENCE_YEAR: i64 = 2025;

pub const MAKE_UPPER: &str = "make_upper";
pub const PRICE_USD: &str = "price_usd";
pub const CAR_AGE: &str = "car_age";
pub const PRICE_RANGE: &str = "price_range";

/// Lower bound (inclusive) of the "Medio" price bucket.
pub const PRICE_RANGE_LOW: f64 = 10_000.0;
/// Upper bound (inclusive) of the "Medio" price bucket.
pub const PRICE_RANGE_HIGH: f64 = 30_000.0;

fn is_text(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

fn require_type(
    df: &DataFrame,
    column: &str,
    check: fn(&DataType) -> bool,
    numeric: bool,
) -> Result<(), TransformError> {
    let field = df.schema().field_with_unqualified_name(column)?;
    if check(field.data_type()) {
        return Ok(());
    }
    let column = column.to_string();
    let data_type = field.data_type().clone();
    Err(if numeric {
        TransformError::NonNumeric { column, data_type }
    } else {
        TransformError::NonText { column, data_type }
    })
}

/// Append `make_upper`, `price_usd` and `car_age`.
pub fn enrich(df: DataFrame, columns: &ColumnMap) -> Result<DataFrame, TransformError> {
    require_type(&df, &columns.make, is_text, false)?;
    require_type(&df, &columns.price, DataType::is_numeric, true)?;
    require_type(&df, &columns.year, DataType::is_numeric, true)?;

    let df = df
        .with_column(MAKE_UPPER, upper(ident(&columns.make)))?
        .with_column(PRICE_USD, cast(ident(&columns.price), DataType::Float64))?
        .with_column(CAR_AGE, lit(REFERENCE_YEAR) - ident(&columns.year))?;
    Ok(df)
}

/// Bucket expression over `price_usd`: "Bajo", "Medio" or "Alto".
pub fn price_range_expr() -> Result<Expr, TransformError> {
    let price = ident(PRICE_USD);
    let expr = when(price.clone().lt(lit(PRICE_RANGE_LOW)), lit("Bajo"))
        .when(
            price.between(lit(PRICE_RANGE_LOW), lit(PRICE_RANGE_HIGH)),
            lit("Medio"),
        )
        .otherwise(lit("Alto"))?;
    Ok(expr)
}

/// Enriched records plus `price_range`.
pub fn with_price_range(df: DataFrame) -> Result<DataFrame, TransformError> {
    Ok(df.with_column(PRICE_RANGE, price_range_expr()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::config::EngineOptions;
    use crate::loader::load;
    use crate::session::EngineSession;
    use crate::testing::{render, source_config, write_csv, CsvFixture};
    use rstest::rstest;

    async fn enriched(csv: &str) -> (DataFrame, CsvFixture) {
        let file = write_csv(csv);
        let session = EngineSession::open(&EngineOptions::default());
        let df = load(&session, &source_config(file.path())).await.unwrap();
        let df = clean(df, &ColumnMap::default()).unwrap();
        (enrich(df, &ColumnMap::default()).unwrap(), file)
    }

    #[tokio::test]
    async fn test_derived_columns() {
        let (df, _file) = enriched(
            "make,model,price,year,mileage\n\
             Toyota,Corolla,20000,2020,30000\n\
             bmw,X5,65000,1999,15000\n",
        )
        .await;
        let df = df
            .select(vec![
                ident(MAKE_UPPER),
                ident(PRICE_USD),
                ident(CAR_AGE),
            ])
            .unwrap()
            .sort(vec![ident(CAR_AGE).sort(true, true)])
            .unwrap();
        let batches = df.collect().await.unwrap();
        assert_eq!(
            render(&batches),
            vec![
                "+------------+-----------+---------+",
                "| make_upper | price_usd | car_age |",
                "+------------+-----------+---------+",
                "| TOYOTA     | 20000.0   | 5       |",
                "| BMW        | 65000.0   | 26      |",
                "+------------+-----------+---------+",
            ]
        );
    }

    #[tokio::test]
    async fn test_price_usd_is_float() {
        let (df, _file) = enriched("make,model,price,year,mileage\nKia,Rio,8000,2015,1\n").await;
        let field = df.schema().field_with_unqualified_name(PRICE_USD).unwrap();
        assert_eq!(field.data_type(), &DataType::Float64);
    }

    #[tokio::test]
    async fn test_non_numeric_year_is_rejected() {
        let file = write_csv("make,model,price,year,mileage\nKia,Rio,8000,twenty,1\n");
        let session = EngineSession::open(&EngineOptions::default());
        let df = load(&session, &source_config(file.path())).await.unwrap();
        let df = clean(df, &ColumnMap::default()).unwrap();
        let err = enrich(df, &ColumnMap::default()).unwrap_err();
        match err {
            TransformError::NonNumeric { column, .. } => assert_eq!(column, "year"),
            other => panic!("expected NonNumeric, got {other}"),
        }
    }

    #[rstest]
    #[case(9_999.99, "Bajo")]
    #[case(10_000.0, "Medio")]
    #[case(20_000.0, "Medio")]
    #[case(30_000.0, "Medio")]
    #[case(30_000.01, "Alto")]
    #[case(0.0, "Bajo")]
    #[tokio::test]
    async fn test_price_range_boundaries(#[case] price: f64, #[case] expected: &str) {
        let (df, _file) = enriched(&format!(
            "make,model,price,year,mileage\nKia,Rio,{price:.2},2015,1\n"
        ))
        .await;
        let df = with_price_range(df)
            .unwrap()
            .select(vec![ident(PRICE_RANGE)])
            .unwrap();
        let batches = df.collect().await.unwrap();
        let rendered = render(&batches);
        assert_eq!(rendered[3], format!("| {expected:<11} |"));
    }
}
