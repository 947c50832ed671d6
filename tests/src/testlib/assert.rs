//! Checks on transformation results.
//!
//! The checks return an error instead of panicking so the message names what was counted.
//! Tests `expect` on them.

use servicex_client::table::ResultTable;

/// Fails unless `table` holds exactly `expected` rows.
pub fn expect_row_count(table: &ResultTable, expected: usize) -> Result<(), AssertionError> {
    let actual = table.num_rows();
    if actual != expected {
        return Err(AssertionError::RowCount { expected, actual });
    }
    Ok(())
}

/// Fails unless `actual` equals `expected`, naming the quantity as `label`.
pub fn expect_count(label: &str, actual: usize, expected: usize) -> Result<(), AssertionError> {
    if actual != expected {
        return Err(AssertionError::Count {
            label: label.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    #[error("expected {expected} rows, got {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("expected {expected} {label}, got {actual}")]
    Count {
        label: String,
        expected: usize,
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::Float64Array,
        datatypes::{DataType, Field, Schema},
        record_batch::RecordBatch,
    };

    use super::*;

    fn table_with_rows(rows: usize) -> ResultTable {
        let schema = Arc::new(Schema::new(vec![Field::new("JetPt", DataType::Float64, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Float64Array::from(vec![1.0; rows]))],
        )
        .expect("valid batch");
        ResultTable::new(schema, vec![batch])
    }

    #[test]
    fn row_count_mismatch_reports_both_counts() {
        //* Given
        let table = table_with_rows(3);

        //* Then
        assert_eq!(expect_row_count(&table, 3), Ok(()));
        let err = expect_row_count(&table, 11355980).expect_err("counts differ");
        assert_eq!(err.to_string(), "expected 11355980 rows, got 3");
    }

    #[test]
    fn count_mismatch_names_the_quantity() {
        let err = expect_count("dielectron masses", 2, 1502958).expect_err("counts differ");
        assert_eq!(err.to_string(), "expected 1502958 dielectron masses, got 2");
        assert_eq!(expect_count("dielectron masses", 2, 2), Ok(()));
    }
}
