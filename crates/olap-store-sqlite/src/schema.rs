//! SQL schema for the star schema in SQLite.
//!
//! Column order matches the table schemas in `olap_core`. Dates and
//! timestamps are ISO 8601 text, booleans are 0/1 integers.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;

CREATE TABLE IF NOT EXISTS dim_time (
    time_key       INTEGER PRIMARY KEY,   -- yyyymmdd
    date           TEXT    NOT NULL,
    year           INTEGER NOT NULL,
    quarter        TEXT    NOT NULL,      -- 'Q1' .. 'Q4'
    month          INTEGER NOT NULL,
    month_name     TEXT    NOT NULL,
    week           INTEGER NOT NULL,      -- ISO week
    day_of_month   INTEGER NOT NULL,
    day_of_week    INTEGER NOT NULL,      -- 1 = Monday
    day_name       TEXT    NOT NULL,
    is_weekend     INTEGER NOT NULL,
    is_holiday     INTEGER NOT NULL,
    fiscal_year    INTEGER NOT NULL,
    fiscal_quarter TEXT    NOT NULL,
    fiscal_period  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_geography (
    geo_key            INTEGER PRIMARY KEY,
    city               TEXT    NOT NULL,
    region             TEXT    NOT NULL,
    country            TEXT    NOT NULL,
    country_code       TEXT    NOT NULL,
    latitude           REAL    NOT NULL,
    longitude          REAL    NOT NULL,
    population_segment TEXT    NOT NULL,
    timezone           TEXT    NOT NULL
);

-- SCD type 2: several rows may share a product_id.
CREATE TABLE IF NOT EXISTS dim_product (
    product_key     INTEGER PRIMARY KEY,
    product_id      TEXT    NOT NULL,
    product_name    TEXT    NOT NULL,
    category        TEXT    NOT NULL,
    subcategory     TEXT    NOT NULL,
    brand           TEXT    NOT NULL,
    unit_cost       REAL    NOT NULL,
    unit_price      REAL    NOT NULL,
    effective_date  TEXT    NOT NULL,
    expiration_date TEXT    NOT NULL,     -- '9999-12-31' while current
    is_current      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_customer (
    customer_key      INTEGER PRIMARY KEY,
    customer_id       TEXT    NOT NULL,
    first_name        TEXT    NOT NULL,
    last_name         TEXT    NOT NULL,
    email             TEXT    NOT NULL,
    phone             TEXT    NOT NULL,
    date_of_birth     TEXT    NOT NULL,
    gender            TEXT    NOT NULL,
    income_segment    TEXT    NOT NULL,
    customer_segment  TEXT    NOT NULL,
    registration_date TEXT    NOT NULL,
    is_active         INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_payment (
    payment_key        INTEGER PRIMARY KEY,
    payment_method     TEXT    NOT NULL,
    payment_type       TEXT    NOT NULL,
    processing_fee_pct REAL    NOT NULL,
    is_digital         INTEGER NOT NULL
);

-- Foreign keys are declared but not enforced; dimensions may be reloaded
-- under existing facts and integrity is checked by the validators.
CREATE TABLE IF NOT EXISTS fact_sales (
    transaction_id        INTEGER NOT NULL,
    line_item_id          INTEGER NOT NULL,
    transaction_date      TEXT    NOT NULL,
    transaction_timestamp TEXT    NOT NULL,
    time_key              INTEGER NOT NULL REFERENCES dim_time(time_key),
    geo_key               INTEGER NOT NULL REFERENCES dim_geography(geo_key),
    product_key           INTEGER NOT NULL REFERENCES dim_product(product_key),
    customer_key          INTEGER NOT NULL REFERENCES dim_customer(customer_key),
    payment_key           INTEGER NOT NULL REFERENCES dim_payment(payment_key),
    quantity              INTEGER NOT NULL,
    unit_price            REAL    NOT NULL,
    revenue               REAL    NOT NULL,
    cost                  REAL    NOT NULL,
    discount_amount       REAL    NOT NULL,
    profit                REAL    NOT NULL,
    year                  INTEGER NOT NULL,
    quarter               TEXT    NOT NULL,
    PRIMARY KEY (transaction_id, line_item_id)
);

-- Stands in for directory partitions.
CREATE INDEX IF NOT EXISTS fact_sales_partition_idx ON fact_sales(year, quarter);
CREATE INDEX IF NOT EXISTS fact_sales_time_idx      ON fact_sales(time_key);
CREATE INDEX IF NOT EXISTS fact_sales_product_idx   ON fact_sales(product_key);

PRAGMA user_version = 1;
";
