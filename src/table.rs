use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

const DATE_FORMATS: [&str; 4] = ["%b %d, %Y", "%Y-%m-%d", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row has {found} cells, table has {expected} columns")]
    RaggedRow { expected: usize, found: usize },
}

/// A single cell. Tables coming back from the stats API are loosely typed, so
/// every column stays dynamic until it is written out.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Datum {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Datum::Int(i)
                } else {
                    n.as_f64().map(Datum::Float).unwrap_or(Datum::Null)
                }
            }
            Value::String(s) => Datum::Text(s.clone()),
            other => Datum::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Datum::Null => true,
            Datum::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(v) => Some(*v as f64),
            Datum::Float(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            Datum::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Datum::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Coerces a cell to a date. Anything that does not parse becomes null.
    pub fn to_date(&self) -> Datum {
        match self {
            Datum::Date(d) => Datum::Date(*d),
            Datum::Text(raw) => parse_date(raw).map(Datum::Date).unwrap_or(Datum::Null),
            _ => Datum::Null,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Datum::Bool(_) => 0,
            Datum::Int(_) | Datum::Float(_) => 1,
            Datum::Date(_) => 2,
            Datum::Text(_) => 3,
            Datum::Null => 4,
        }
    }

    /// Total order used for sorting. Nulls sort last.
    pub fn total_cmp(&self, other: &Datum) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    pub(crate) fn key(&self) -> String {
        match self {
            Datum::Null => "n:".to_string(),
            Datum::Bool(b) => format!("b:{b}"),
            Datum::Int(v) => format!("i:{v}"),
            Datum::Float(v) if v.is_nan() => "n:".to_string(),
            Datum::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => format!("i:{}", *v as i64),
            Datum::Float(v) => format!("f:{v}"),
            Datum::Text(s) => format!("t:{s}"),
            Datum::Date(d) => format!("d:{d}"),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "-"),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Float(v) if v.is_nan() => write!(f, "-"),
            Datum::Float(v) => write!(f, "{v:.2}"),
            Datum::Text(s) => write!(f, "{s}"),
            Datum::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Datum::Null)
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return Some(d);
        }
    }
    None
}

/// Column-labelled rows. Column labels are not required to be unique until
/// [`Table::drop_duplicate_columns`] has run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Datum>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Datum>>,
    ) -> Result<Self, TableError> {
        let mut table = Table::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Datum>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Datum> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Datum> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn push_row(&mut self, row: Vec<Datum>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RaggedRow {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Sets every row of `name` to `value`, appending the column if needed.
    pub fn set_constant(&mut self, name: &str, value: Datum) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Appends a computed column, one value per row.
    pub fn push_column(&mut self, name: &str, values: Vec<Datum>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::RaggedRow {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn map_column(&mut self, name: &str, f: impl Fn(&Datum) -> Datum) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
    }

    pub fn lowercase_columns(&mut self) {
        for col in &mut self.columns {
            *col = col.to_lowercase();
        }
    }

    /// Keeps the first column for each repeated label.
    pub fn drop_duplicate_columns(&mut self) {
        let mut seen = HashSet::new();
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| seen.insert(c.clone()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        self.columns = retain_flagged(std::mem::take(&mut self.columns), &keep);
        for row in &mut self.rows {
            *row = retain_flagged(std::mem::take(row), &keep);
        }
    }

    /// Drops every row whose `keys` values were already seen, keeping the
    /// first. Key columns missing from the table are ignored; with no key
    /// column present the table is left alone.
    pub fn drop_duplicate_rows(&mut self, keys: &[&str]) {
        let idxs: Vec<usize> = keys.iter().filter_map(|k| self.column_index(k)).collect();
        if idxs.is_empty() {
            return;
        }
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<String> = idxs.iter().map(|i| row[*i].key()).collect();
            seen.insert(key)
        });
    }

    /// Keeps columns named in `allow`, in this table's order. Falls back to
    /// every column when none match.
    pub fn project(&mut self, allow: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| allow.contains(&c.as_str()))
            .collect();
        if !keep.iter().any(|k| *k) {
            return;
        }
        self.columns = retain_flagged(std::mem::take(&mut self.columns), &keep);
        for row in &mut self.rows {
            *row = retain_flagged(std::mem::take(row), &keep);
        }
    }

    /// Stable sort on the given columns, ascending, nulls last.
    pub fn sort_by(&mut self, keys: &[&str]) {
        let idxs: Vec<usize> = keys.iter().filter_map(|k| self.column_index(k)).collect();
        self.rows.sort_by(|a, b| {
            for i in &idxs {
                let ord = a[*i].total_cmp(&b[*i]);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    pub fn sort_with(&mut self, mut cmp: impl FnMut(&[Datum], &[Datum]) -> Ordering) {
        self.rows.sort_by(|a, b| cmp(a.as_slice(), b.as_slice()));
    }

    pub fn filter(&self, mut keep: impl FnMut(&Table, usize) -> bool) -> Table {
        let rows = (0..self.rows.len())
            .filter(|i| keep(self, *i))
            .map(|i| self.rows[i].clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Row-wise union. Columns are the union of all inputs in first-seen
    /// order; cells a source table lacks are null.
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();
        for table in tables {
            for col in &table.columns {
                if !position.contains_key(col) {
                    position.insert(col.clone(), columns.len());
                    columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|c| position[c]).collect();
            for row in &table.rows {
                let mut out = vec![Datum::Null; columns.len()];
                for (src, dst) in mapping.iter().enumerate() {
                    out[*dst] = row[src].clone();
                }
                rows.push(out);
            }
        }
        Table { columns, rows }
    }
}

fn retain_flagged<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep.iter())
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}
