//! Column-oriented input batches and the helpers that turn them into
//! deduplicated, row-oriented chunks for insertion.

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{error, info, warn};

pub const ID_COLUMN: &str = "id";
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// One named column and its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Ordered mapping of column name to values, as handed to `insert_dict_in_db`.
///
/// Columns keep insertion order; inserting an existing name replaces its values
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct ColumnBatch {
    columns: Vec<Column>,
}

/// A single row; values line up with the batch's column names.
pub type Row = Vec<Value>;

impl ColumnBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(name, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Value>) {
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Common length of every column, or `None` if they disagree.
    pub fn uniform_len(&self) -> Option<usize> {
        let mut lens = self.columns.iter().map(|c| c.values.len());
        let first = lens.next().unwrap_or(0);
        lens.all(|l| l == first).then_some(first)
    }

    /// Keep only the first occurrence of each distinct `id`, across all columns.
    ///
    /// Batches whose columns differ in length are logged and returned as-is.
    pub fn remove_duplicate_ids(mut self) -> Self {
        let Some(len) = self.uniform_len() else {
            error!("Not all values in the keys of the dictionary are of the same size");
            return self;
        };
        if self.columns.is_empty() {
            return self;
        }
        info!(
            len,
            "All values in the keys of the dictionary are of the same size"
        );

        let Some(ids) = self.get(ID_COLUMN) else {
            warn!("Batch has no '{ID_COLUMN}' column; skipping deduplication");
            return self;
        };

        let mut seen = HashSet::with_capacity(ids.len());
        let mask: Vec<bool> = ids.iter().map(|id| seen.insert(id.clone())).collect();
        if mask.iter().all(|keep| *keep) {
            return self;
        }

        for col in self.columns.iter_mut() {
            let values = std::mem::take(&mut col.values);
            col.values = values
                .into_iter()
                .zip(mask.iter())
                .filter_map(|(v, keep)| keep.then_some(v))
                .collect();
        }
        self
    }

    /// Transpose into rows. Ragged columns are cut to the shortest one.
    pub fn into_rows(self) -> (Vec<String>, Vec<Row>) {
        let n_rows = self
            .columns
            .iter()
            .map(|c| c.values.len())
            .min()
            .unwrap_or(0);
        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();

        let mut rows: Vec<Row> = (0..n_rows)
            .map(|_| Vec::with_capacity(names.len()))
            .collect();
        for col in self.columns {
            for (row, v) in rows.iter_mut().zip(col.values) {
                row.push(v);
            }
        }
        (names, rows)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ColumnBatch {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut batch = ColumnBatch::new();
        for (name, values) in map {
            let values = match values {
                serde_json::Value::Array(items) => items.into_iter().map(json_to_value).collect(),
                single => vec![json_to_value(single)],
            };
            batch.insert(name, values);
        }
        batch
    }
}

fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::Text(s),
        other => Value::Text(other.to_string()),
    }
}

/// Split `rows` into consecutive chunks of at most `batch_size` items.
///
/// A `batch_size` of zero is treated as one.
pub fn divide_in_batches<T>(rows: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(rows.len().div_ceil(batch_size));
    let mut iter = rows.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(batch_size).collect());
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(batch: &ColumnBatch) -> Vec<i64> {
        batch
            .get("id")
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let batch = ColumnBatch::new()
            .with_column("id", [1, 2, 1, 3])
            .with_column("val", ["a", "b", "c", "d"]);

        let deduped = batch.remove_duplicate_ids();

        let expected = ColumnBatch::new()
            .with_column("id", [1, 2, 3])
            .with_column("val", ["a", "b", "d"]);
        assert_eq!(deduped, expected);
    }

    #[test]
    fn dedup_preserves_order_of_survivors() {
        let batch = ColumnBatch::new()
            .with_column("id", [5, 4, 5, 4, 3, 5])
            .with_column("n", [0, 1, 2, 3, 4, 5]);

        let deduped = batch.remove_duplicate_ids();
        assert_eq!(ids(&deduped), vec![5, 4, 3]);
        assert_eq!(
            deduped.get("n").unwrap(),
            &[Value::Int(0), Value::Int(1), Value::Int(4)]
        );
    }

    #[test]
    fn text_ids_are_deduplicated_too() {
        let batch = ColumnBatch::new()
            .with_column("id", ["lion", "tiger", "lion"])
            .with_column("age", [4.5, 2.0, 7.0]);

        let deduped = batch.remove_duplicate_ids();
        assert_eq!(deduped.uniform_len(), Some(2));
        assert_eq!(deduped.get("age").unwrap()[1], Value::Float(2.0));
    }

    #[test]
    fn whole_float_ids_collide_with_int_ids() {
        let batch: ColumnBatch =
            serde_json::from_str(r#"{"id": [1, 1.0, 2], "name": ["a", "b", "c"]}"#).unwrap();

        let deduped = batch.remove_duplicate_ids();
        assert_eq!(deduped.get("name").unwrap(), &[Value::from("a"), Value::from("c")]);
    }

    #[test]
    fn mismatched_lengths_are_returned_unchanged() {
        let batch = ColumnBatch::new()
            .with_column("id", [1, 1, 2])
            .with_column("val", ["a", "b"]);

        let out = batch.clone().remove_duplicate_ids();
        assert_eq!(out, batch);
        assert_eq!(out.uniform_len(), None);
    }

    #[test]
    fn batch_without_id_column_is_untouched() {
        let batch = ColumnBatch::new().with_column("name", ["a", "a"]);
        assert_eq!(batch.clone().remove_duplicate_ids(), batch);
        assert_eq!(ColumnBatch::new().remove_duplicate_ids(), ColumnBatch::new());
    }

    #[test]
    fn rows_follow_column_order() {
        let batch = ColumnBatch::new()
            .with_column("id", [1, 2])
            .with_column("name", ["kiwi", "emu"]);

        let (names, rows) = batch.into_rows();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(rows[1], vec![Value::Int(2), Value::from("emu")]);
    }

    #[test]
    fn batches_of_two() {
        let rows = vec!["r0", "r1", "r2", "r3", "r4"];
        let batches = divide_in_batches(rows, 2);
        assert_eq!(batches, vec![vec!["r0", "r1"], vec!["r2", "r3"], vec!["r4"]]);
    }

    #[test]
    fn oversized_batch_yields_one_chunk() {
        let rows: Vec<u32> = (0..7).collect();
        let batches = divide_in_batches(rows.clone(), 100);
        assert_eq!(batches, vec![rows]);
    }

    #[test]
    fn batches_reassemble_to_input() {
        for size in 1..=12 {
            let rows: Vec<u32> = (0..23).collect();
            let batches = divide_in_batches(rows.clone(), size);
            let (last, full) = batches.split_last().unwrap();
            assert!(full.iter().all(|b| b.len() == size));
            assert!(!last.is_empty() && last.len() <= size);
            assert_eq!(batches.concat(), rows);
        }
    }

    #[test]
    fn empty_input_and_zero_size() {
        assert!(divide_in_batches(Vec::<u8>::new(), 3).is_empty());
        assert_eq!(divide_in_batches(vec![1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn batch_parses_from_column_json() {
        let batch: ColumnBatch =
            serde_json::from_str(r#"{"id": [1, 2, 1], "name": ["a", null, "c"]}"#).unwrap();
        assert_eq!(batch.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(batch.get("name").unwrap()[1], Value::Null);
    }
}
