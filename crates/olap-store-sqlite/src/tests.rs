//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Datelike, NaiveDate};
use olap_core::{
  PartitionFilter, Partitioning, Quarter, RowSet, TableName, Value,
  dimension::{DimPayment, DimProduct},
  fact::SalesFact,
  query::QueryEngine,
  store::{ReadFilter, TableStore},
};
use olap_datagen::{Dataset, DatasetConfig};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn dataset() -> Dataset {
  Dataset::generate(&DatasetConfig {
    start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
    end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    num_countries: 2,
    regions_per_country: 2,
    cities_per_region: 2,
    num_products: 40,
    num_customers: 60,
    num_transactions: 300,
    ..Default::default()
  })
  .unwrap()
}

async fn loaded() -> (SqliteStore, Dataset) {
  let s = store().await;
  let data = dataset();
  for (table, rows) in data.tables().unwrap() {
    s.write(table, rows, table.partitioning()).await.unwrap();
  }
  (s, data)
}

// ─── Writes and reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn typed_rows_survive_a_round_trip() {
  let (s, data) = loaded().await;

  let products: Vec<DimProduct> = s
    .read(TableName::DimProduct, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(products, data.products);

  let sales: Vec<SalesFact> = s
    .read(TableName::FactSales, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(sales, data.sales);
}

#[tokio::test]
async fn fact_reads_carry_partition_columns() {
  let (s, _) = loaded().await;
  let rows = s
    .read(TableName::FactSales, &ReadFilter::all())
    .await
    .unwrap();
  let year = rows.column_index("year").unwrap();
  let quarter = rows.column_index("quarter").unwrap();
  let date = rows.column_index("transaction_date").unwrap();
  for row in &rows.rows {
    let d = row[date].as_date().unwrap();
    assert_eq!(row[year], Value::Int(i64::from(d.year())));
    assert_eq!(row[quarter], Value::Text(Quarter::from_month(d.month()).to_string()));
  }
}

#[tokio::test]
async fn write_replaces_previous_rows() {
  let s = store().await;
  let payments = olap_datagen::payment::generate_dim_payment();

  s.write(
    TableName::DimPayment,
    RowSet::from_records(&payments),
    Partitioning::None,
  )
  .await
  .unwrap();
  s.write(
    TableName::DimPayment,
    RowSet::from_records(&payments[..3]),
    Partitioning::None,
  )
  .await
  .unwrap();

  let back: Vec<DimPayment> = s
    .read(TableName::DimPayment, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(back, payments[..3]);
}

#[tokio::test]
async fn unpartitioned_fact_write_derives_partition_columns() {
  let s = store().await;
  let data = dataset();
  s.write(
    TableName::FactSales,
    RowSet::from_records(&data.sales),
    Partitioning::None,
  )
  .await
  .unwrap();

  let partitions = s.partitions(TableName::FactSales).await.unwrap();
  let total: u64 = partitions.iter().map(|p| p.row_count).sum();
  assert_eq!(total, data.sales.len() as u64);
}

#[tokio::test]
async fn partitioned_write_requires_partition_columns() {
  let s = store().await;
  let data = dataset();
  let err = s
    .write(
      TableName::FactSales,
      RowSet::from_records(&data.sales),
      Partitioning::YearQuarter,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(olap_core::Error::MissingPartitionColumns { .. })
  ));

  let err = s
    .write(
      TableName::DimPayment,
      RowSet::from_records(&olap_datagen::payment::generate_dim_payment()),
      Partitioning::YearQuarter,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnsupportedPartitioning(TableName::DimPayment)));
}

#[tokio::test]
async fn unknown_columns_are_rejected() {
  let s = store().await;
  let mut rows = RowSet::from_records(&olap_datagen::payment::generate_dim_payment());
  rows.columns[1] = "nickname".into();
  let err = s
    .write(TableName::DimPayment, rows, Partitioning::None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(olap_core::Error::UnknownColumn { .. })));
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn partition_filter_selects_matching_rows() {
  let (s, data) = loaded().await;
  let filter = ReadFilter::partition(PartitionFilter::year_quarter(2023, Quarter::Q2));
  let rows: Vec<SalesFact> = s
    .read(TableName::FactSales, &filter)
    .await
    .unwrap()
    .to_records()
    .unwrap();

  let expected: Vec<&SalesFact> = data
    .sales
    .iter()
    .filter(|f| Quarter::from_month(f.transaction_date.month()) == Quarter::Q2)
    .collect();
  assert_eq!(rows.len(), expected.len());
  assert!(!rows.is_empty());
  assert!(rows.iter().all(|f| (4..=6).contains(&f.transaction_date.month())));
}

#[tokio::test]
async fn partition_filter_on_a_dimension_is_an_error() {
  let (s, _) = loaded().await;
  let filter = ReadFilter::partition(PartitionFilter::year(2023));
  let err = s.read(TableName::DimTime, &filter).await.unwrap_err();
  assert!(matches!(err, Error::Core(olap_core::Error::NotPartitioned(_))));
}

#[tokio::test]
async fn column_projection_keeps_order() {
  let (s, data) = loaded().await;
  let filter = ReadFilter::all().with_columns(["is_digital", "payment_key"]);
  let rows = s.read(TableName::DimPayment, &filter).await.unwrap();
  assert_eq!(rows.columns, vec!["is_digital", "payment_key"]);
  assert_eq!(rows.len(), data.payments.len());
  assert_eq!(rows.rows[0], vec![Value::Bool(true), Value::Int(1)]);

  let bad = ReadFilter::all().with_columns(["colour"]);
  assert!(s.read(TableName::DimPayment, &bad).await.is_err());
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_and_partitions() {
  let (s, data) = loaded().await;

  let meta = s.metadata(TableName::FactSales).await.unwrap();
  assert_eq!(meta.row_count, data.sales.len() as u64);
  assert_eq!(meta.column_count, TableName::FactSales.schema().len() + 2);
  let fact_bytes = meta.size_bytes.unwrap();
  assert!(fact_bytes > 0);
  let payment_bytes = s.metadata(TableName::DimPayment).await.unwrap().size_bytes.unwrap();
  assert!(payment_bytes > 0 && payment_bytes <= fact_bytes);

  let partitions = s.partitions(TableName::FactSales).await.unwrap();
  let keys: Vec<String> = partitions.iter().map(|p| p.key.to_string()).collect();
  assert_eq!(
    keys,
    vec![
      "year=2023/quarter=Q1",
      "year=2023/quarter=Q2",
      "year=2023/quarter=Q3",
      "year=2023/quarter=Q4",
    ]
  );
  let apportioned: u64 = partitions.iter().map(|p| p.size_bytes.unwrap()).sum();
  assert!(apportioned.abs_diff(fact_bytes) <= partitions.len() as u64);

  assert!(s.partitions(TableName::DimTime).await.unwrap().is_empty());
}

#[tokio::test]
async fn table_size_grows_with_rows() {
  let s = store().await;
  let empty = s.metadata(TableName::FactSales).await.unwrap().size_bytes.unwrap();

  let data = dataset();
  for (table, rows) in data.tables().unwrap() {
    s.write(table, rows, table.partitioning()).await.unwrap();
  }
  let full = s.metadata(TableName::FactSales).await.unwrap().size_bytes.unwrap();
  assert!(full > empty, "{full} <= {empty}");
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn star_join_query_returns_named_columns() {
  let (s, data) = loaded().await;
  let result = s
    .execute(
      "SELECT p.category AS category, SUM(f.revenue) AS revenue, COUNT(*) AS n
       FROM fact_sales f
       JOIN dim_product p ON f.product_key = p.product_key
       GROUP BY p.category
       ORDER BY p.category",
    )
    .await
    .unwrap();

  assert_eq!(result.columns, vec!["category", "revenue", "n"]);
  let n = result.column_index("n").unwrap();
  let total: i64 = result.rows.iter().map(|r| r[n].as_int().unwrap()).sum();
  assert_eq!(total, data.sales.len() as i64);
}

#[tokio::test]
async fn invalid_sql_is_a_database_error() {
  let s = store().await;
  let err = s.execute("SELECT * FROM dim_store").await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
}

#[tokio::test]
async fn concurrent_read_only_queries() {
  let (s, data) = loaded().await;

  let mut handles = Vec::new();
  for quarter in Quarter::ALL {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      let sql = format!("SELECT COUNT(*) AS n FROM fact_sales WHERE quarter = '{quarter}'");
      s.execute(&sql).await.unwrap().rows[0][0].as_int().unwrap()
    }));
  }

  let mut total = 0;
  for handle in handles {
    total += handle.await.unwrap();
  }
  assert_eq!(total, data.sales.len() as i64);
}
