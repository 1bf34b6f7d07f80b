//! Cell transforms applied to workbook ranges.
//!
//! Every cell is turned into text before the rule runs, so numbers, booleans
//! and dates come back as strings. Excel will store them as text after the
//! write; that loss of type is a known limitation of rewriting a range.

use serde_json::Value;

/// A rule applied to every cell of a range independently.
pub trait CellTransform: Send + Sync {
    fn apply(&self, cell: &str) -> String;
}

impl<F> CellTransform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn apply(&self, cell: &str) -> String {
        self(cell)
    }
}

/// Replace every occurrence of `from` with `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    from: String,
    to: String,
}

impl Replace {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl CellTransform for Replace {
    fn apply(&self, cell: &str) -> String {
        // str::replace with an empty needle inserts between every char.
        if self.from.is_empty() {
            return cell.to_string();
        }
        cell.replace(&self.from, &self.to)
    }
}

/// Text of a cell as the rule sees it.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Apply `rule` to every cell, keeping the shape of `rows`.
pub fn transform_rows(rows: &[Vec<Value>], rule: &dyn CellTransform) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| rule.apply(&cell_text(cell))).collect())
        .collect()
}
