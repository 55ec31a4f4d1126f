//! Live tests for `PostgresSink`.
//!
//! Skipped unless `CARLYTICS_TEST_PG_URL` points at a reachable server, e.g.
//! `postgres://localhost:5432/postgres`. `CARLYTICS_TEST_PG_USER` and
//! `CARLYTICS_TEST_PG_PASSWORD` default to `postgres`.

use std::path::Path;
use std::sync::Arc;

use carlytics_engine::config::{
    parse_pipeline_str, Consistency, PipelineConfig, SinkConfig, SinkDriver, WriteMode,
};
use carlytics_engine::{run_pipeline, ReportName, ReportSink, ReportTable, SinkError};
use datafusion::arrow::array::Int64Array;
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use dest_postgres::{connect, PostgresSink};
use tokio_postgres::Client;

const LISTINGS: &str = "\
make,model,price,year,mileage,transmission,Fuel Type,Color,Cylinders
Toyota,Corolla,20000,2020,30000,Automatic,Gasoline,White,4
Toyota,Camry,25000,2019,40000,Automatic,Gasoline,Black,4
BMW,X5,65000,2022,15000,Automatic,Diesel,Black,6
";

/// No `Color` column, so the run fails at `count_by_color` after staging
/// the seven reports before it.
const LISTINGS_WITHOUT_COLOR: &str = "\
make,model,price,year,mileage,transmission,Fuel Type,Cylinders
Kia,Rio,8000,2010,140000,Manual,Gasoline,4
";

fn sink_config(schema: &str, consistency: Consistency) -> Option<SinkConfig> {
    let Ok(url) = std::env::var("CARLYTICS_TEST_PG_URL") else {
        eprintln!("skipping: CARLYTICS_TEST_PG_URL is not set");
        return None;
    };
    Some(SinkConfig {
        url,
        user: std::env::var("CARLYTICS_TEST_PG_USER").unwrap_or_else(|_| "postgres".into()),
        password: std::env::var("CARLYTICS_TEST_PG_PASSWORD")
            .unwrap_or_else(|_| "postgres".into()),
        driver: SinkDriver::Postgres,
        schema: format!("cl_test_{schema}_{}", std::process::id()),
        mode: WriteMode::Overwrite,
        consistency,
    })
}

async fn admin_client(sink: &SinkConfig) -> Client {
    let client = connect(sink).await.expect("connect admin client");
    client
        .batch_execute(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", sink.schema))
        .await
        .expect("reset test schema");
    client
}

async fn drop_schema(client: &Client, sink: &SinkConfig) {
    client
        .batch_execute(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", sink.schema))
        .await
        .expect("drop test schema");
}

fn pipeline_config(csv: &Path, sink: &SinkConfig) -> PipelineConfig {
    let mut config = parse_pipeline_str(&format!(
        "version: \"1.0\"\npipeline: pg_sink_test\nsource:\n  path: \"{}\"\n\
         sink:\n  url: postgres://unused/db\n  user: unused\n",
        csv.display()
    ))
    .expect("parse pipeline");
    config.sink = sink.clone();
    config
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write csv");
    path
}

async fn row_count(client: &Client, schema: &str, table: &str) -> i64 {
    client
        .query_one(&format!("SELECT count(*) FROM \"{schema}\".\"{table}\""), &[])
        .await
        .expect("count rows")
        .get(0)
}

async fn table_exists(client: &Client, schema: &str, table: &str) -> bool {
    client
        .query_opt(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2",
            &[&schema, &table],
        )
        .await
        .expect("lookup table")
        .is_some()
}

async fn staging_tables(client: &Client, schema: &str) -> i64 {
    client
        .query_one(
            "SELECT count(*) FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name LIKE '%\\_\\_cl\\_staging'",
            &[&schema],
        )
        .await
        .expect("count staging tables")
        .get(0)
}

fn years_table(years: &[i64]) -> ReportTable {
    let schema = Arc::new(Schema::new(vec![
        Field::new("year", DataType::Int64, true),
        Field::new("total_vehicles", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(years.to_vec())),
            Arc::new(Int64Array::from(vec![1; years.len()])),
        ],
    )
    .expect("build batch");
    ReportTable {
        name: ReportName::CountByYear,
        schema,
        batches: vec![batch],
    }
}

#[tokio::test]
async fn test_rerun_overwrites_instead_of_appending() {
    let Some(sink_config) = sink_config("rerun", Consistency::PerReport) else {
        return;
    };
    let admin = admin_client(&sink_config).await;
    let dir = tempfile::tempdir().unwrap();
    let config = pipeline_config(&write_csv(dir.path(), "a.csv", LISTINGS), &sink_config);

    for _ in 0..2 {
        let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
        run_pipeline(&config, &mut sink).await.unwrap();
        assert!(sink.pending().is_empty());
    }

    let schema = &sink_config.schema;
    assert_eq!(row_count(&admin, schema, "count_by_year").await, 3);
    assert_eq!(row_count(&admin, schema, "avg_price_by_make").await, 2);
    assert_eq!(row_count(&admin, schema, "vehiculos_procesados").await, 1);
    for name in ReportName::ALL {
        assert!(table_exists(&admin, schema, name.table()).await, "{name}");
    }
    assert_eq!(staging_tables(&admin, schema).await, 0);

    drop_schema(&admin, &sink_config).await;
}

#[tokio::test]
async fn test_all_or_nothing_abort_keeps_previous_tables() {
    let Some(sink_config) = sink_config("abort", Consistency::AllOrNothing) else {
        return;
    };
    let admin = admin_client(&sink_config).await;
    let dir = tempfile::tempdir().unwrap();
    let schema = &sink_config.schema;

    let first = pipeline_config(&write_csv(dir.path(), "a.csv", LISTINGS), &sink_config);
    let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
    run_pipeline(&first, &mut sink).await.unwrap();
    assert!(sink.pending().is_empty());

    let second = pipeline_config(
        &write_csv(dir.path(), "b.csv", LISTINGS_WITHOUT_COLOR),
        &sink_config,
    );
    let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
    let err = run_pipeline(&second, &mut sink).await.unwrap_err();

    assert_eq!(err.stage(), "query");
    assert!(sink.pending().is_empty());
    assert_eq!(staging_tables(&admin, schema).await, 0);
    assert_eq!(row_count(&admin, schema, "count_by_year").await, 3);
    let kia_rows: i64 = admin
        .query_one(
            &format!("SELECT count(*) FROM \"{schema}\".avg_price_by_make WHERE make = 'Kia'"),
            &[],
        )
        .await
        .unwrap()
        .get(0);
    assert_eq!(kia_rows, 0);

    drop_schema(&admin, &sink_config).await;
}

#[tokio::test]
async fn test_per_report_swaps_on_write() {
    let Some(sink_config) = sink_config("per_report", Consistency::PerReport) else {
        return;
    };
    let admin = admin_client(&sink_config).await;
    let schema = &sink_config.schema;

    let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
    sink.write_report(&years_table(&[2020, 2021])).await.unwrap();

    assert!(sink.pending().is_empty());
    assert_eq!(row_count(&admin, schema, "count_by_year").await, 2);
    assert_eq!(staging_tables(&admin, schema).await, 0);

    drop_schema(&admin, &sink_config).await;
}

#[tokio::test]
async fn test_deferred_swap_happens_on_finish() {
    let Some(sink_config) = sink_config("finish", Consistency::AllOrNothing) else {
        return;
    };
    let admin = admin_client(&sink_config).await;
    let schema = &sink_config.schema;

    let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
    sink.write_report(&years_table(&[2020, 2021, 2022])).await.unwrap();

    assert_eq!(sink.pending(), [ReportName::CountByYear]);
    assert!(!table_exists(&admin, schema, "count_by_year").await);
    assert_eq!(staging_tables(&admin, schema).await, 1);

    sink.finish().await.unwrap();

    assert!(sink.pending().is_empty());
    assert_eq!(row_count(&admin, schema, "count_by_year").await, 3);
    assert_eq!(staging_tables(&admin, schema).await, 0);

    drop_schema(&admin, &sink_config).await;
}

#[tokio::test]
async fn test_failed_swap_keeps_report_pending_until_abort() {
    let Some(sink_config) = sink_config("failed_swap", Consistency::AllOrNothing) else {
        return;
    };
    let admin = admin_client(&sink_config).await;
    let schema = &sink_config.schema;

    let mut sink = PostgresSink::connect(&sink_config).await.unwrap();
    sink.write_report(&years_table(&[2020])).await.unwrap();
    admin
        .batch_execute(&format!(
            "DROP TABLE \"{schema}\".count_by_year__cl_staging"
        ))
        .await
        .unwrap();

    let err = sink.finish().await.unwrap_err();
    assert!(matches!(err, SinkError::Schema { .. }), "got: {err}");
    assert_eq!(sink.pending(), [ReportName::CountByYear]);

    sink.abort().await.unwrap();
    assert!(sink.pending().is_empty());
    assert!(!table_exists(&admin, schema, "count_by_year").await);

    drop_schema(&admin, &sink_config).await;
}
