// src/frame/mod.rs
use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::fmt;

/// One cell of a query result.
///
/// Mirrors SQLite's dynamic typing: a column may hold a mix of integers,
/// reals, text and NULLs, and the transform layer decides what to do with
/// each. Text is never parsed here; that is `transform::to_numeric`'s job.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The cell as a category label ("1960", "Fiji", "70.5"); NULL is blank.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Total order used for sorting and grouping: numbers first (Int and Real
/// compared together), then text, NULL always last so ascending output
/// reads naturally.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Text(_), _) => Ordering::Greater,
        (_, Value::Text(_)) => Ordering::Less,
        (x, y) => {
            let xf = x.as_f64().unwrap_or(f64::NAN);
            let yf = y.as_f64().unwrap_or(f64::NAN);
            xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Ascending,
    Descending,
}

/// An in-memory relation: named columns plus rows of [`Value`]s, all the
/// same arity. This is what a query materializes and what transforms and
/// presentation consume; it never flows back into the store.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row has {} cells but the frame has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => Ok(idx),
            None => bail!(
                "no column `{}` (have: {})",
                name,
                self.columns.join(", ")
            ),
        }
    }

    /// Append a fully materialized column; `values` must cover every row.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        if self.columns.iter().any(|c| *c == name) {
            bail!("column `{}` already exists", name);
        }
        if values.len() != self.rows.len() {
            bail!(
                "column `{}` has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }
        self.columns.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Numeric view of a column: Int/Real become Some, NULL becomes None.
    /// A text cell is an error; coerce the column first.
    pub fn f64_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| match &row[idx] {
                Value::Null => Ok(None),
                v => match v.as_f64() {
                    Some(f) => Ok(Some(f)),
                    None => bail!(
                        "column `{}` holds text; run a numeric coercion first",
                        name
                    ),
                },
            })
            .collect()
    }

    pub fn i64_column(&self, name: &str) -> Result<Vec<Option<i64>>> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| match &row[idx] {
                Value::Null => Ok(None),
                v => match v.as_i64() {
                    Some(i) => Ok(Some(i)),
                    None => bail!("column `{}` is not integral", name),
                },
            })
            .collect()
    }

    /// Every cell of a column rendered as a label; NULL renders blank.
    pub fn text_column(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].label()).collect())
    }

    /// Stable sort by one column; NULLs sort last under `Ascending`.
    pub fn sort_by(&mut self, column: &str, dir: SortDir) -> Result<()> {
        let idx = self.column_index(column)?;
        self.rows.sort_by(|a, b| {
            let ord = cmp_values(&a[idx], &b[idx]);
            match dir {
                SortDir::Ascending => ord,
                SortDir::Descending => ord.reverse(),
            }
        });
        Ok(())
    }

    /// A copy of the first `n` rows.
    pub fn head(&self, n: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let mut f = Frame::new(vec!["name".into(), "score".into()]);
        f.push_row(vec![Value::Text("b".into()), Value::Int(2)])
            .unwrap();
        f.push_row(vec![Value::Text("a".into()), Value::Real(3.5)])
            .unwrap();
        f.push_row(vec![Value::Text("c".into()), Value::Null]).unwrap();
        f
    }

    #[test]
    fn push_row_checks_arity() {
        let mut f = Frame::new(vec!["only".into()]);
        assert!(f.push_row(vec![Value::Int(1), Value::Int(2)]).is_err());
        assert!(f.push_row(vec![Value::Int(1)]).is_ok());
    }

    #[test]
    fn sort_puts_nulls_last_ascending() {
        let mut f = sample();
        f.sort_by("score", SortDir::Ascending).unwrap();
        let scores: Vec<Option<f64>> = f.f64_column("score").unwrap();
        assert_eq!(scores, vec![Some(2.0), Some(3.5), None]);
    }

    #[test]
    fn sort_descending_reverses() {
        let mut f = sample();
        f.sort_by("score", SortDir::Descending).unwrap();
        let names = f.text_column("name").unwrap();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn f64_column_rejects_text() {
        let f = sample();
        assert!(f.f64_column("name").is_err());
        assert!(f.f64_column("missing").is_err());
    }

    #[test]
    fn add_column_keeps_arity() {
        let mut f = sample();
        assert!(f
            .add_column("extra", vec![Value::Int(1), Value::Int(2)])
            .is_err());
        f.add_column(
            "extra",
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        )
        .unwrap();
        assert_eq!(f.columns().len(), 3);
        assert!(f.add_column("extra", vec![]).is_err());
    }

    #[test]
    fn labels_render_numbers_plainly() {
        assert_eq!(Value::Int(1960).label(), "1960");
        assert_eq!(Value::Real(70.0).label(), "70");
        assert_eq!(Value::Real(70.5).label(), "70.5");
        assert_eq!(Value::Null.label(), "");
    }

    #[test]
    fn head_copies_prefix() {
        let f = sample();
        let h = f.head(2);
        assert_eq!(h.len(), 2);
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn cross_type_numeric_ordering() {
        use std::cmp::Ordering;
        assert_eq!(cmp_values(&Value::Int(2), &Value::Real(2.5)), Ordering::Less);
        assert_eq!(
            cmp_values(&Value::Real(10.0), &Value::Text("9".into())),
            Ordering::Less
        );
        assert_eq!(cmp_values(&Value::Null, &Value::Int(0)), Ordering::Greater);
    }
}
