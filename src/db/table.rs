use super::batch::ID_COLUMN;
use super::value::Value;
use crate::error::FetchError;
use std::fmt;

/// Row predicate on a single column: equality or membership.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(Value),
    In(Vec<Value>),
}

impl Filter {
    pub fn matches(&self, v: &Value) -> bool {
        match self {
            Filter::Eq(want) => want == v,
            Filter::In(wanted) => wanted.contains(v),
        }
    }
}

impl From<Value> for Filter {
    fn from(v: Value) -> Self {
        Filter::Eq(v)
    }
}

impl From<Vec<Value>> for Filter {
    fn from(v: Vec<Value>) -> Self {
        Filter::In(v)
    }
}

/// Materialized query result, indexed by its `id` column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index_pos: usize,
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let pos = self.columns.iter().position(|c| c == name)?;
        self.values.get(pos)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, FetchError> {
        let index_pos = columns
            .iter()
            .position(|c| c == ID_COLUMN)
            .ok_or(FetchError::MissingIndex)?;
        Ok(Self {
            columns,
            rows,
            index_pos,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| &r[self.index_pos])
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let pos = self.position(name)?;
        Some(self.rows.iter().map(|r| &r[pos]).collect())
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |r| Record {
            columns: &self.columns,
            values: r,
        })
    }

    /// Row whose `id` equals `id`.
    pub fn loc(&self, id: &Value) -> Option<Record<'_>> {
        self.records().find(|r| &r.values[self.index_pos] == id)
    }

    /// Keep rows whose `column` satisfies `filter`.
    pub fn filter(self, column: &str, filter: &Filter) -> Result<Table, FetchError> {
        let pos = self
            .position(column)
            .ok_or_else(|| FetchError::UnknownColumn(column.to_string()))?;
        let rows = self
            .rows
            .into_iter()
            .filter(|r| filter.matches(&r[pos]))
            .collect();
        Ok(Table { rows, ..self })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoo() -> Table {
        Table::new(
            vec!["id".into(), "name".into(), "animal_class".into()],
            vec![
                vec![1.into(), "leo".into(), "mammals".into()],
                vec![2.into(), "kiwi".into(), "birds".into()],
                vec![3.into(), "rex".into(), "reptiles".into()],
                vec![4.into(), "tweety".into(), "birds".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn requires_id_column() {
        let err = Table::new(vec!["name".into()], vec![]).unwrap_err();
        assert!(matches!(err, FetchError::MissingIndex));
    }

    #[test]
    fn filter_by_equality() {
        let birds = zoo().filter("animal_class", &Filter::Eq("birds".into())).unwrap();
        let ids: Vec<_> = birds.index().cloned().collect();
        assert_eq!(ids, vec![Value::Int(2), Value::Int(4)]);
    }

    #[test]
    fn filter_by_membership() {
        let picked = zoo()
            .filter("name", &vec![Value::from("leo"), Value::from("rex")].into())
            .unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.loc(&Value::Int(3)).unwrap().get("name"), Some(&Value::from("rex")));
    }

    #[test]
    fn numeric_filter_ignores_int_float_split() {
        let herd = Table::new(
            vec!["id".into(), "age".into()],
            vec![
                vec![1.into(), 4.0.into()],
                vec![2.into(), 4.5.into()],
                vec![3.into(), 7.0.into()],
            ],
        )
        .unwrap();
        let four = herd.clone().filter("age", &Filter::Eq(Value::Int(4))).unwrap();
        assert_eq!(four.index().cloned().collect::<Vec<_>>(), vec![Value::Int(1)]);

        let some = herd
            .filter("age", &Filter::In(vec![Value::Int(7), Value::Float(4.5)]))
            .unwrap();
        assert_eq!(some.len(), 2);
    }

    #[test]
    fn filter_on_missing_column_fails() {
        let err = zoo().filter("wings", &Filter::Eq(Value::Bool(true))).unwrap_err();
        assert!(matches!(err, FetchError::UnknownColumn(ref c) if c == "wings"));
    }

    #[test]
    fn no_match_is_empty() {
        let none = zoo().filter("name", &Filter::In(vec![])).unwrap();
        assert!(none.is_empty());
        assert_eq!(none.columns().len(), 3);
    }
}
