//! In-memory result tables.

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, AsArray as _},
    compute,
    datatypes::{DataType, Field, Float64Type, SchemaRef},
    error::ArrowError,
    record_batch::RecordBatch,
};

/// The rows produced by a transformation.
///
/// Holds the record batches of every result file, in object key order, under a single
/// schema.
#[derive(Debug, Clone)]
pub struct ResultTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl ResultTable {
    /// Creates a table from batches that all share `schema`.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// The named column across all batches, concatenated into one array.
    pub fn column(&self, name: &str) -> Result<ArrayRef, ColumnError> {
        let (index, field) = self
            .schema
            .column_with_name(name)
            .ok_or_else(|| ColumnError::Missing {
                name: name.to_string(),
                available: self.column_names().into_iter().map(String::from).collect(),
            })?;

        let columns: Vec<&dyn Array> = self
            .batches
            .iter()
            .map(|batch| batch.column(index).as_ref())
            .collect();
        if columns.is_empty() {
            return Ok(arrow::array::new_empty_array(field.data_type()));
        }

        compute::concat(&columns).map_err(|err| ColumnError::Arrow {
            name: name.to_string(),
            source: err,
        })
    }

    /// A flat numeric column as `f64` values.
    ///
    /// Integer and `float32` columns are widened. Null values are an error.
    pub fn f64_column(&self, name: &str) -> Result<Vec<f64>, ColumnError> {
        let column = self.column(name)?;
        if !column.data_type().is_numeric() {
            return Err(ColumnError::NotNumeric {
                name: name.to_string(),
                data_type: column.data_type().clone(),
            });
        }

        let values = compute::cast(&column, &DataType::Float64).map_err(|err| {
            ColumnError::Arrow {
                name: name.to_string(),
                source: err,
            }
        })?;
        let values = values.as_primitive::<Float64Type>();

        values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| ColumnError::Null {
                    name: name.to_string(),
                    row,
                })
            })
            .collect()
    }

    /// A jagged numeric column, one `Vec<f64>` per row.
    ///
    /// Accepts list and large-list columns of any numeric element type. A null row is an
    /// error; null elements inside a row are too.
    pub fn list_f64_column(&self, name: &str) -> Result<Vec<Vec<f64>>, ColumnError> {
        let column = self.column(name)?;
        match column.data_type() {
            DataType::List(field) | DataType::LargeList(field)
                if field.data_type().is_numeric() => {}
            data_type => {
                return Err(ColumnError::NotNumericList {
                    name: name.to_string(),
                    data_type: data_type.clone(),
                });
            }
        }

        let target = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
        let lists = compute::cast(&column, &target).map_err(|err| ColumnError::Arrow {
            name: name.to_string(),
            source: err,
        })?;
        let lists = lists.as_list::<i32>();

        let mut rows = Vec::with_capacity(lists.len());
        for row in 0..lists.len() {
            if lists.is_null(row) {
                return Err(ColumnError::Null {
                    name: name.to_string(),
                    row,
                });
            }
            let values = lists.value(row);
            let values = values.as_primitive::<Float64Type>();
            let row_values = values
                .iter()
                .map(|value| {
                    value.ok_or_else(|| ColumnError::Null {
                        name: name.to_string(),
                        row,
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(row_values);
        }
        Ok(rows)
    }
}

/// Errors that can occur when reading a column of a [`ResultTable`].
#[derive(Debug, thiserror::Error)]
pub enum ColumnError {
    #[error("no column named '{name}' (available: {available:?})")]
    Missing { name: String, available: Vec<String> },

    #[error("column '{name}' has non-numeric type {data_type}")]
    NotNumeric { name: String, data_type: DataType },

    #[error("column '{name}' has type {data_type}, expected a list of numbers")]
    NotNumericList { name: String, data_type: DataType },

    #[error("column '{name}' has a null value in row {row}")]
    Null { name: String, row: usize },

    #[error("failed to read column '{name}'")]
    Arrow {
        name: String,
        #[source]
        source: ArrowError,
    },
}
