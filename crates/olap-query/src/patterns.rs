//! OLAP query patterns over the star schema.
//!
//! Each [`Pattern`] renders to a single SQL statement against the schema's
//! table names, joining only the dimensions it references.

use std::collections::BTreeSet;

use olap_core::{
  PartitionFilter, Quarter, TableName,
  query::{QueryEngine, QueryResult},
};
use serde::Serialize;
use tracing::debug;

use crate::{
  Error, Result,
  attribute::{Attribute, FACT_ALIAS, Metric, join_clause},
  sql::{Filter, quote},
};

/// Granularity a time drill-down returns rows at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillLevel {
  Quarter,
  Month,
  Day,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
  /// Revenue, profit and quantity grouped by any dimension attributes.
  RevenueByDimensions {
    dimensions: Vec<Attribute>,
    filters:    Vec<Filter>,
    limit:      Option<usize>,
  },
  /// A year broken into quarters, a quarter into months, or a month into
  /// days.
  DrillDownTime {
    year:    i32,
    quarter: Option<Quarter>,
    month:   Option<u32>,
  },
  /// Monthly revenue with a trailing moving average over `window` months.
  MovingAverageRevenue { window: usize, year: Option<i32> },
  /// Year-over-year growth of a metric, optionally per attribute value.
  YoyGrowth {
    metric:    Metric,
    dimension: Option<Attribute>,
  },
  /// Top products by a metric within each value of `partition_by`.
  ProductRankings {
    partition_by: Attribute,
    metric:       Metric,
    year:         Option<i32>,
    top_n:        usize,
  },
  /// Total revenue and row count of the fact table, restricted by the
  /// partition columns only.
  PartitionScan { filter: PartitionFilter },
}

impl Pattern {
  pub fn name(&self) -> &'static str {
    match self {
      Self::RevenueByDimensions { .. } => "revenue_by_dimensions",
      Self::DrillDownTime { .. } => "drill_down_time",
      Self::MovingAverageRevenue { .. } => "moving_average_revenue",
      Self::YoyGrowth { .. } => "yoy_growth",
      Self::ProductRankings { .. } => "product_rankings",
      Self::PartitionScan { .. } => "partition_scan",
    }
  }

  pub fn sql(&self) -> Result<String> {
    match self {
      Self::RevenueByDimensions { dimensions, filters, limit } => {
        revenue_by_dimensions(dimensions, filters, *limit)
      }
      Self::DrillDownTime { year, quarter, month } => {
        drill_down_time(*year, *quarter, *month).map(|(_, sql)| sql)
      }
      Self::MovingAverageRevenue { window, year } => moving_average_revenue(*window, *year),
      Self::YoyGrowth { metric, dimension } => Ok(yoy_growth(*metric, *dimension)),
      Self::ProductRankings { partition_by, metric, year, top_n } => {
        product_rankings(*partition_by, *metric, *year, *top_n)
      }
      Self::PartitionScan { filter } => Ok(partition_scan(filter)),
    }
  }
}

/// Render and execute `pattern` on `engine`.
pub async fn run<E: QueryEngine>(engine: &E, pattern: &Pattern) -> Result<QueryResult> {
  let sql = pattern.sql()?;
  debug!(pattern = pattern.name(), %sql, "running query pattern");
  engine.execute(&sql).await.map_err(Error::engine)
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// `FROM fact_sales fs` plus a join per referenced dimension, in schema
/// order.
fn from_clause(attributes: impl IntoIterator<Item = Attribute>) -> String {
  let dimensions: BTreeSet<TableName> = attributes.into_iter().map(Attribute::table).collect();
  let mut sql = format!("FROM {} {FACT_ALIAS}", TableName::FactSales);
  for dimension in dimensions {
    sql.push('\n');
    sql.push_str(&join_clause(dimension));
  }
  sql
}

fn where_clause(conditions: &[String]) -> String {
  if conditions.is_empty() {
    String::new()
  } else {
    format!("\nWHERE {}", conditions.join(" AND "))
  }
}

fn year_condition(year: Option<i32>) -> Vec<String> {
  year
    .map(|y| format!("{} = {y}", Attribute::Year.qualified()))
    .into_iter()
    .collect()
}

pub fn revenue_by_dimensions(
  dimensions: &[Attribute],
  filters: &[Filter],
  limit: Option<usize>,
) -> Result<String> {
  if dimensions.is_empty() {
    return Err(Error::InvalidPattern(
      "revenue_by_dimensions needs at least one dimension".into(),
    ));
  }
  let mut seen = BTreeSet::new();
  if let Some(dup) = dimensions.iter().find(|d| !seen.insert(**d)) {
    return Err(Error::InvalidPattern(format!("dimension {dup} given twice")));
  }

  let group_by = dimensions
    .iter()
    .map(|d| d.qualified())
    .collect::<Vec<_>>()
    .join(", ");
  let select = dimensions
    .iter()
    .map(|d| format!("{} AS {}", d.qualified(), d.column()))
    .collect::<Vec<_>>()
    .join(", ");
  let conditions: Vec<String> = filters.iter().map(Filter::to_sql).collect();
  let from = from_clause(
    dimensions
      .iter()
      .copied()
      .chain(filters.iter().map(|f| f.attribute)),
  );
  let limit = limit.map(|n| format!("\nLIMIT {n}")).unwrap_or_default();

  Ok(format!(
    "SELECT {select},
  SUM(fs.revenue) AS total_revenue,
  SUM(fs.profit) AS total_profit,
  SUM(fs.quantity) AS total_quantity,
  COUNT(*) AS line_item_count,
  AVG(fs.revenue) AS avg_revenue
{from}{where_}
GROUP BY {group_by}
ORDER BY total_revenue DESC{limit}",
    where_ = where_clause(&conditions),
  ))
}

/// The level rows come back at, and the SQL.
pub fn drill_down_time(
  year: i32,
  quarter: Option<Quarter>,
  month: Option<u32>,
) -> Result<(DrillLevel, String)> {
  let mut conditions = year_condition(Some(year));

  let (level, keys) = match (quarter, month) {
    (_, Some(m)) => {
      if !(1..=12).contains(&m) {
        return Err(Error::InvalidPattern(format!("month {m} is outside 1..=12")));
      }
      if let Some(q) = quarter.filter(|q| *q != Quarter::from_month(m)) {
        return Err(Error::InvalidPattern(format!("month {m} is not in {q}")));
      }
      conditions.push(format!("{} = {m}", Attribute::Month.qualified()));
      (DrillLevel::Day, vec![Attribute::Date, Attribute::DayName])
    }
    (Some(q), None) => {
      conditions.push(format!("{} = {}", Attribute::Quarter.qualified(), quote(q.as_str())));
      (DrillLevel::Month, vec![Attribute::Month, Attribute::MonthName])
    }
    (None, None) => (DrillLevel::Quarter, vec![Attribute::Quarter]),
  };

  let select = keys
    .iter()
    .map(|k| format!("{} AS {}", k.qualified(), k.column()))
    .collect::<Vec<_>>()
    .join(", ");
  let group_by = keys.iter().map(|k| k.qualified()).collect::<Vec<_>>().join(", ");

  let sql = format!(
    "SELECT {select},
  SUM(fs.revenue) AS revenue,
  COUNT(DISTINCT fs.transaction_id) AS transaction_count
{from}{where_}
GROUP BY {group_by}
ORDER BY {first}",
    from = from_clause([Attribute::Year]),
    where_ = where_clause(&conditions),
    first = keys[0].qualified(),
  );
  Ok((level, sql))
}

pub fn moving_average_revenue(window: usize, year: Option<i32>) -> Result<String> {
  if window == 0 {
    return Err(Error::InvalidPattern("moving average window must be positive".into()));
  }
  let preceding = window - 1;
  Ok(format!(
    "SELECT dt.year AS year, dt.month AS month, dt.month_name AS month_name,
  SUM(fs.revenue) AS monthly_revenue,
  AVG(SUM(fs.revenue)) OVER (
    ORDER BY dt.year, dt.month
    ROWS BETWEEN {preceding} PRECEDING AND CURRENT ROW
  ) AS moving_avg_revenue
{from}{where_}
GROUP BY dt.year, dt.month, dt.month_name
ORDER BY dt.year, dt.month",
    from = from_clause([Attribute::Year]),
    where_ = where_clause(&year_condition(year)),
  ))
}

pub fn yoy_growth(metric: Metric, dimension: Option<Attribute>) -> String {
  let m = metric.column();
  let (select_dim, group_dim, partition, order) = match dimension {
    Some(d) => (
      format!(", {} AS dimension", d.qualified()),
      format!(", {}", d.qualified()),
      "PARTITION BY dimension ",
      "dimension, year",
    ),
    None => (String::new(), String::new(), "", "year"),
  };
  let from = from_clause(std::iter::once(Attribute::Year).chain(dimension));

  format!(
    "WITH yearly AS (
  SELECT dt.year AS year{select_dim}, SUM({metric_col}) AS current_{m}
  {from}
  GROUP BY dt.year{group_dim}
),
lagged AS (
  SELECT *, LAG(current_{m}, 1) OVER ({partition}ORDER BY year) AS previous_{m}
  FROM yearly
)
SELECT *,
  ROUND((current_{m} - previous_{m}) * 100.0 / previous_{m}, 2) AS yoy_growth_pct
FROM lagged
ORDER BY {order}",
    metric_col = metric.qualified(),
    from = from.replace('\n', "\n  "),
  )
}

pub fn product_rankings(
  partition_by: Attribute,
  metric: Metric,
  year: Option<i32>,
  top_n: usize,
) -> Result<String> {
  if top_n == 0 {
    return Err(Error::InvalidPattern("top_n must be positive".into()));
  }
  let m = metric.column();
  let from = from_clause([partition_by, Attribute::ProductName, Attribute::Year]);
  let where_ = where_clause(&year_condition(year));

  Ok(format!(
    "WITH ranked AS (
  SELECT {part} AS partition_key, dp.product_id AS product_id,
    dp.product_name AS product_name,
    SUM({metric_col}) AS total_{m},
    ROW_NUMBER() OVER (
      PARTITION BY {part}
      ORDER BY SUM({metric_col}) DESC, dp.product_id
    ) AS rank_in_group
  {from}{where_}
  GROUP BY {part}, dp.product_id, dp.product_name
)
SELECT * FROM ranked
WHERE rank_in_group <= {top_n}
ORDER BY partition_key, rank_in_group",
    part = partition_by.qualified(),
    metric_col = metric.qualified(),
    from = from.replace('\n', "\n  "),
    where_ = where_.replace('\n', "\n  "),
  ))
}

/// Uses the fact table's own partition columns so the predicate can be
/// pushed down to partitions.
pub fn partition_scan(filter: &PartitionFilter) -> String {
  let where_ = filter
    .to_sql_predicate()
    .map(|p| format!("\nWHERE {p}"))
    .unwrap_or_default();
  format!(
    "SELECT SUM(revenue) AS total_revenue, COUNT(*) AS row_count
FROM {}{where_}",
    TableName::FactSales
  )
}
