//! Integration tests for `ParquetStore` against temporary directories.

use olap_core::{
  PartitionFilter, Partitioning, Quarter, RowSet, TableName,
  dimension::{DimGeography, DimProduct},
  fact::SalesFact,
  store::{ReadFilter, TableStore},
};
use olap_datagen::{Dataset, DatasetConfig};
use tempfile::TempDir;

use crate::{Error, ParquetStore};

fn dataset() -> Dataset {
  Dataset::generate(&DatasetConfig {
    start_date: chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
    end_date: chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    num_countries: 2,
    regions_per_country: 2,
    cities_per_region: 3,
    num_products: 30,
    num_customers: 50,
    num_transactions: 300,
    ..Default::default()
  })
  .unwrap()
}

async fn loaded(store: &ParquetStore) -> Dataset {
  let data = dataset();
  for (table, rows) in data.tables().unwrap() {
    store.write(table, rows, table.partitioning()).await.unwrap();
  }
  data
}

fn sorted(mut facts: Vec<SalesFact>) -> Vec<SalesFact> {
  facts.sort_by_key(|f| (f.transaction_id, f.line_item_id));
  facts
}

// ─── Round trips ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn typed_rows_survive_a_round_trip() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = loaded(&store).await;

  let geography: Vec<DimGeography> = store
    .read(TableName::DimGeography, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(geography, data.geography);

  let products: Vec<DimProduct> = store
    .read(TableName::DimProduct, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(products, data.products);

  let sales: Vec<SalesFact> = store
    .read(TableName::FactSales, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(sorted(sales), sorted(data.sales.clone()));
}

#[tokio::test]
async fn unpartitioned_fact_table_is_a_single_file() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = dataset();

  store
    .write(
      TableName::FactSales,
      RowSet::from_records(&data.sales),
      Partitioning::None,
    )
    .await
    .unwrap();
  assert!(dir.path().join("fact_sales/fact_sales.parquet").is_file());

  let back: Vec<SalesFact> = store
    .read(TableName::FactSales, &ReadFilter::all())
    .await
    .unwrap()
    .to_records()
    .unwrap();
  assert_eq!(back, data.sales);
  assert!(store.partitions(TableName::FactSales).await.unwrap().is_empty());

  let filter = ReadFilter::partition(PartitionFilter::year(2023));
  assert!(matches!(
    store.read(TableName::FactSales, &filter).await,
    Err(Error::Core(olap_core::Error::NotPartitioned(_)))
  ));
}

// ─── Pruning and projection ──────────────────────────────────────────────────

#[tokio::test]
async fn partition_filter_prunes_directories() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = loaded(&store).await;

  let partitions = store.partitions(TableName::FactSales).await.unwrap();
  let q4 = partitions
    .iter()
    .find(|p| p.key.quarter == Quarter::Q4)
    .unwrap();

  let filter = ReadFilter::partition(PartitionFilter::year_quarter(2023, Quarter::Q4));
  let rows = store.read(TableName::FactSales, &filter).await.unwrap();
  assert_eq!(rows.len() as u64, q4.row_count);
  assert!(rows.len() < data.sales.len());

  let year = store
    .read(TableName::FactSales, &ReadFilter::partition(PartitionFilter::year(2023)))
    .await
    .unwrap();
  assert_eq!(year.len(), data.sales.len());
}

#[tokio::test]
async fn projection_reads_selected_columns() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = loaded(&store).await;

  let filter = ReadFilter::all().with_columns(["quarter", "profit", "product_key"]);
  let rows = store.read(TableName::FactSales, &filter).await.unwrap();
  assert_eq!(rows.columns, vec!["quarter", "profit", "product_key"]);
  assert_eq!(rows.len(), data.sales.len());

  let only_partitions = ReadFilter::all().with_columns(["year"]);
  let rows = store
    .read(TableName::FactSales, &only_partitions)
    .await
    .unwrap();
  assert_eq!(rows.columns, vec!["year"]);
  assert_eq!(rows.len(), data.sales.len());

  let unknown = ReadFilter::all().with_columns(["colour"]);
  assert!(store.read(TableName::FactSales, &unknown).await.is_err());
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_comes_from_footers() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = loaded(&store).await;

  let meta = store.metadata(TableName::FactSales).await.unwrap();
  assert_eq!(meta.row_count, data.sales.len() as u64);
  assert_eq!(meta.column_count, TableName::FactSales.schema().len() + 2);
  assert!(meta.size_bytes.unwrap() > 0);

  let dim = store.metadata(TableName::DimPayment).await.unwrap();
  assert_eq!(dim.row_count, 7);
  assert_eq!(dim.column_count, TableName::DimPayment.schema().len());

  let partitions = store.partitions(TableName::FactSales).await.unwrap();
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
}

#[tokio::test]
async fn partitioned_write_requires_partition_columns() {
  let dir = TempDir::new().unwrap();
  let store = ParquetStore::new(dir.path());
  let data = dataset();
  let err = store
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
}
