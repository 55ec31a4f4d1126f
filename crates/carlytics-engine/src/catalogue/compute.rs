//! Generic report computation over the registered vehicle views.

use std::collections::HashSet;
use std::sync::Arc;

use datafusion::error::DataFusionError;
use datafusion::functions_aggregate::expr_fn::{avg, count};
use datafusion::logical_expr::{ident, lit, Expr, SortExpr};

use crate::config::ColumnMap;
use crate::errors::{QueryError, TransformError};
use crate::session::{EngineSession, PRICE_RANGES_VIEW, VEHICLES_VIEW};
use crate::transform::with_price_range;

use super::descriptor::{Aggregate, Input, Predicate, ReportDescriptor, Shape};
use super::rounding::round_half_up_expr;
use super::ReportTable;

const ROUND_DECIMALS: usize = 2;

/// Build the bucketed view from the vehicles view and register it.
pub async fn register_price_ranges(session: &mut EngineSession) -> Result<(), TransformError> {
    let vehicles = session.view(VEHICLES_VIEW).await?;
    let bucketed = with_price_range(vehicles)?;
    session.register_view(PRICE_RANGES_VIEW, bucketed)?;
    Ok(())
}

fn predicate_expr(predicate: &Predicate, columns: &ColumnMap) -> Expr {
    let column = ident(predicate.field().column(columns));
    match predicate {
        Predicate::NotNull(_) => column.is_not_null(),
        Predicate::GreaterThan(_, bound) => column.gt(lit(*bound)),
        Predicate::LessThan(_, bound) => column.lt(lit(*bound)),
    }
}

fn aggregate_expr(aggregate: &Aggregate, columns: &ColumnMap) -> Expr {
    match aggregate {
        Aggregate::Count { alias } => count(lit(1)).alias(*alias),
        Aggregate::RoundedAvg { field, alias } => avg(ident(field.column(columns))).alias(*alias),
    }
}

/// Post-aggregation projection. Rounding happens here, over the raw average.
fn aggregate_output(aggregate: &Aggregate) -> Expr {
    match aggregate {
        Aggregate::Count { alias } => ident(*alias),
        Aggregate::RoundedAvg { alias, .. } => {
            round_half_up_expr(ident(*alias), ROUND_DECIMALS).alias(*alias)
        }
    }
}

/// Stated sort keys followed by every other output column ascending, so
/// ties come out in the same order on every run.
///
/// Ascending keys put nulls first and descending keys put them last.
fn sort_exprs(descriptor: &ReportDescriptor, columns: &ColumnMap) -> Vec<SortExpr> {
    let mut used = HashSet::new();
    let mut exprs = Vec::new();
    for key in &descriptor.sort {
        let name = descriptor.sort_column_name(key.column, columns);
        used.insert(name.to_string());
        exprs.push(ident(name).sort(!key.descending, !key.descending));
    }
    for name in descriptor.output_columns(columns) {
        if used.insert(name.clone()) {
            exprs.push(ident(name).sort(true, true));
        }
    }
    exprs
}

/// Compute one report against the session's views and materialize it.
pub async fn compute_report(
    session: &EngineSession,
    columns: &ColumnMap,
    descriptor: &ReportDescriptor,
) -> Result<ReportTable, QueryError> {
    let report = descriptor.name;
    let engine_err = move |source: DataFusionError| QueryError::Engine { report, source };

    let view = match descriptor.input {
        Input::Vehicles => VEHICLES_VIEW,
        Input::PriceRanges => PRICE_RANGES_VIEW,
    };
    let mut df = session.view(view).await.map_err(engine_err)?;

    for field in descriptor.referenced_fields() {
        let name = field.column(columns);
        if !df.schema().has_column_with_unqualified_name(name) {
            return Err(QueryError::MissingColumn {
                report,
                column: name.to_string(),
            });
        }
    }

    if let Some(predicate) = descriptor
        .filters
        .iter()
        .map(|p| predicate_expr(p, columns))
        .reduce(Expr::and)
    {
        df = df.filter(predicate).map_err(engine_err)?;
    }

    df = match &descriptor.shape {
        Shape::Grouped { keys, aggregates } => {
            let group_exprs = keys
                .iter()
                .map(|key| ident(key.field.column(columns)))
                .collect();
            let aggr_exprs = aggregates
                .iter()
                .map(|a| aggregate_expr(a, columns))
                .collect();
            let projection: Vec<Expr> = keys
                .iter()
                .map(|key| {
                    let source = ident(key.field.column(columns));
                    match key.rename {
                        Some(name) => source.alias(name),
                        None => source,
                    }
                })
                .chain(aggregates.iter().map(aggregate_output))
                .collect();
            df.aggregate(group_exprs, aggr_exprs)
                .and_then(|df| df.select(projection))
                .map_err(engine_err)?
        }
        Shape::Rows { fields } => df
            .select(
                fields
                    .iter()
                    .map(|field| ident(field.column(columns)))
                    .collect::<Vec<_>>(),
            )
            .map_err(engine_err)?,
    };

    df = df
        .sort(sort_exprs(descriptor, columns))
        .map_err(engine_err)?;
    if let Some(limit) = descriptor.limit {
        df = df.limit(0, Some(limit)).map_err(engine_err)?;
    }

    let schema = Arc::clone(df.schema().inner());
    let batches = df.collect().await.map_err(engine_err)?;
    let table = ReportTable {
        name: report,
        schema,
        batches,
    };
    tracing::debug!(report = %report, rows = table.num_rows(), "Report computed");
    Ok(table)
}
