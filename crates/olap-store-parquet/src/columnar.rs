//! Conversions between [`RowSet`]s and Arrow record batches.

use std::sync::Arc;

use arrow::{
  array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array,
    StringArray, TimestampMicrosecondArray,
  },
  datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit},
  record_batch::RecordBatch,
};
use chrono::{DateTime, Datelike, NaiveDate};
use olap_core::{RowSet, TableName, Value, value::ColumnType};

use crate::{Error, Result};

/// Days from 0001-01-01 to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn arrow_type(ty: ColumnType) -> DataType {
  match ty {
    ColumnType::Int => DataType::Int64,
    ColumnType::Float => DataType::Float64,
    ColumnType::Text => DataType::Utf8,
    ColumnType::Bool => DataType::Boolean,
    ColumnType::Date => DataType::Date32,
    ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
  }
}

/// Arrow schema for `columns` of `table`. Every field is nullable.
pub fn schema_for(table: TableName, columns: &[String]) -> Result<SchemaRef> {
  let fields = columns
    .iter()
    .map(|name| {
      let ty = table.require_column_type(name)?;
      Ok(Field::new(name.as_str(), arrow_type(ty), true))
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(Arc::new(Schema::new(fields)))
}

fn days_since_epoch(date: NaiveDate) -> i32 {
  date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn cells<T>(
  rows: &RowSet,
  idx: usize,
  ty: ColumnType,
  f: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<Option<T>>> {
  rows
    .rows
    .iter()
    .map(|row| match &row[idx] {
      Value::Null => Ok(None),
      value => f(value).map(Some).ok_or_else(|| {
        Error::Core(olap_core::Error::TypeMismatch {
          column:   rows.columns[idx].clone(),
          expected: ty.name(),
          found:    value.kind(),
        })
      }),
    })
    .collect()
}

pub fn to_batch(table: TableName, rows: &RowSet) -> Result<RecordBatch> {
  let schema = schema_for(table, &rows.columns)?;

  let mut arrays: Vec<ArrayRef> = Vec::with_capacity(rows.columns.len());
  for (idx, name) in rows.columns.iter().enumerate() {
    let ty = table.require_column_type(name)?;
    let array: ArrayRef = match ty {
      ColumnType::Int => Arc::new(Int64Array::from(cells(rows, idx, ty, Value::as_int)?)),
      ColumnType::Float => {
        Arc::new(Float64Array::from(cells(rows, idx, ty, Value::as_float)?))
      }
      ColumnType::Text => Arc::new(StringArray::from(cells(rows, idx, ty, |v| {
        v.as_text().map(str::to_owned)
      })?)),
      ColumnType::Bool => Arc::new(BooleanArray::from(cells(rows, idx, ty, Value::as_bool)?)),
      ColumnType::Date => Arc::new(Date32Array::from(cells(rows, idx, ty, |v| {
        v.as_date().map(days_since_epoch)
      })?)),
      ColumnType::Timestamp => Arc::new(TimestampMicrosecondArray::from(cells(
        rows,
        idx,
        ty,
        |v| v.as_timestamp().map(|t| t.and_utc().timestamp_micros()),
      )?)),
    };
    arrays.push(array);
  }

  Ok(RecordBatch::try_new(schema, arrays)?)
}

fn downcast<'a, A: Array + 'static>(
  name: &str,
  ty: ColumnType,
  array: &'a dyn Array,
) -> Result<&'a A> {
  array.as_any().downcast_ref::<A>().ok_or_else(|| Error::Decode {
    column:   name.to_owned(),
    expected: ty.name(),
    found:    array.data_type().to_string(),
  })
}

fn out_of_range(name: &str, raw: impl ToString) -> Error {
  olap_core::Error::InvalidValue {
    column: name.to_owned(),
    value:  raw.to_string(),
  }
  .into()
}

/// Decode one Arrow column of a known logical type.
fn column_values(name: &str, ty: ColumnType, array: &dyn Array) -> Result<Vec<Value>> {
  let len = array.len();
  let mut out = Vec::with_capacity(len);
  for i in 0..len {
    if array.is_null(i) {
      out.push(Value::Null);
      continue;
    }
    let value = match ty {
      ColumnType::Int => Value::Int(downcast::<Int64Array>(name, ty, array)?.value(i)),
      ColumnType::Float => Value::Float(downcast::<Float64Array>(name, ty, array)?.value(i)),
      ColumnType::Text => {
        Value::Text(downcast::<StringArray>(name, ty, array)?.value(i).to_owned())
      }
      ColumnType::Bool => Value::Bool(downcast::<BooleanArray>(name, ty, array)?.value(i)),
      ColumnType::Date => {
        let days = downcast::<Date32Array>(name, ty, array)?.value(i);
        let date = NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
          .ok_or_else(|| out_of_range(name, days))?;
        Value::Date(date)
      }
      ColumnType::Timestamp => {
        let micros = downcast::<TimestampMicrosecondArray>(name, ty, array)?.value(i);
        let ts = DateTime::from_timestamp_micros(micros)
          .ok_or_else(|| out_of_range(name, micros))?;
        Value::Timestamp(ts.naive_utc())
      }
    };
    out.push(value);
  }
  Ok(out)
}

/// Append the rows of `batch` to `rows`, whose columns must match the
/// batch's field names.
pub fn append_batch(table: TableName, rows: &mut RowSet, batch: &RecordBatch) -> Result<()> {
  let mut decoded: Vec<Vec<Value>> = (0..batch.num_rows())
    .map(|_| Vec::with_capacity(batch.num_columns()))
    .collect();

  for (field, array) in batch.schema().fields().iter().zip(batch.columns()) {
    let ty = table.require_column_type(field.name())?;
    for (row, value) in decoded
      .iter_mut()
      .zip(column_values(field.name(), ty, array.as_ref())?)
    {
      row.push(value);
    }
  }

  for row in decoded {
    rows.push(row)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use olap_core::dimension::DimPayment;

  use super::*;

  #[test]
  fn epoch_offset() {
    assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
    assert_eq!(days_since_epoch(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
  }

  #[test]
  fn schema_follows_column_types() {
    let schema = schema_for(TableName::FactSales, &TableName::FactSales.column_names())
      .unwrap();
    let ty = |name: &str| schema.field_with_name(name).unwrap().data_type().clone();
    assert_eq!(ty("transaction_id"), DataType::Int64);
    assert_eq!(ty("transaction_date"), DataType::Date32);
    assert_eq!(
      ty("transaction_timestamp"),
      DataType::Timestamp(TimeUnit::Microsecond, None)
    );
    assert_eq!(ty("revenue"), DataType::Float64);
  }

  #[test]
  fn batches_decode_back_to_rows() {
    let payments = vec![DimPayment {
      payment_key:        1,
      payment_method:     "Cash".into(),
      payment_type:       "Physical".into(),
      processing_fee_pct: 0.0,
      is_digital:         false,
    }];
    let rows = RowSet::from_records(&payments);
    let batch = to_batch(TableName::DimPayment, &rows).unwrap();
    assert_eq!(batch.num_rows(), 1);

    let mut back = RowSet::new(rows.columns.clone());
    append_batch(TableName::DimPayment, &mut back, &batch).unwrap();
    assert_eq!(back, rows);
  }

  #[test]
  fn wrong_cell_type_is_rejected() {
    let mut rows = RowSet::new(vec!["payment_key".into()]);
    rows.push(vec![Value::Text("one".into())]).unwrap();
    assert!(matches!(
      to_batch(TableName::DimPayment, &rows),
      Err(Error::Core(olap_core::Error::TypeMismatch { .. }))
    ));
  }
}
