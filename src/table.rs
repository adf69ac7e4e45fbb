//! Raw and canonical table models.
//!
//! A [`RawTable`] is whatever the input collaborator hands over: named
//! columns of loosely typed cells. A [`CanonicalTable`] is the validated
//! `(group, value)` sequence every procedure consumes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::validate::ValidationError;

/// Tokens treated as missing when parsing text cells (pandas defaults).
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ============================================================================
// Raw input
// ============================================================================

/// One loosely typed input cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parses a textual cell.
    ///
    /// Missing-value tokens become [`Cell::Missing`], finite numeric
    /// literals become [`Cell::Number`], and anything else (including
    /// `inf`) stays text.
    ///
    /// # Examples
    /// ```
    /// use u_abtest::table::Cell;
    /// assert_eq!(Cell::parse(" 3.5 "), Cell::Number(3.5));
    /// assert_eq!(Cell::parse("NA"), Cell::Missing);
    /// assert_eq!(Cell::parse("control"), Cell::Text("control".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_owned()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// The cell as a group label. Numbers use their shortest display form.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Text(s) => Some(s.clone()),
        }
    }
}

fn format_number(v: f64) -> String {
    // -0.0 and 0.0 must label the same group
    if v == 0.0 {
        "0".to_owned()
    } else {
        v.to_string()
    }
}

/// Inferred storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every present cell is a number.
    Numeric,
    /// At least one present cell is text.
    Text,
    /// No present cells.
    Empty,
}

/// A named column of raw cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    name: String,
    cells: Vec<Cell>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        let mut saw_number = false;
        for cell in &self.cells {
            match cell {
                Cell::Text(_) => return ColumnKind::Text,
                Cell::Number(_) => saw_number = true,
                Cell::Missing => {}
            }
        }
        if saw_number {
            ColumnKind::Numeric
        } else {
            ColumnKind::Empty
        }
    }

    /// Number of distinct present values.
    ///
    /// In a text column numbers count by their label, matching how a
    /// mixed column would be read as strings.
    pub fn distinct_count(&self) -> usize {
        match self.kind() {
            ColumnKind::Empty => 0,
            ColumnKind::Numeric => self
                .cells
                .iter()
                .filter_map(|c| match c {
                    Cell::Number(v) => Some(if *v == 0.0 { 0_u64 } else { v.to_bits() }),
                    _ => None,
                })
                .collect::<HashSet<_>>()
                .len(),
            ColumnKind::Text => self
                .cells
                .iter()
                .filter_map(Cell::label)
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// The present numeric values; `None` if the column is not numeric.
    pub fn numbers(&self) -> Option<Vec<f64>> {
        if self.kind() != ColumnKind::Numeric {
            return None;
        }
        Some(
            self.cells
                .iter()
                .filter_map(|c| match c {
                    Cell::Number(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        )
    }
}

/// Error building a [`RawTable`] from ragged input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableShapeError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("column `{name}` has {found} cells, expected {expected}")]
    RaggedColumn {
        name: String,
        found: usize,
        expected: usize,
    },
}

/// Tabular input with arbitrary column names and loosely typed cells.
///
/// # Examples
/// ```
/// use u_abtest::table::{ColumnKind, RawTable};
///
/// let raw = RawTable::from_text_rows(
///     &["Bucket", "Score"],
///     &[vec!["a", "1.5"], vec!["b", "2.0"], vec!["a", "NA"]],
/// ).unwrap();
/// assert_eq!(raw.row_count(), 3);
/// assert_eq!(raw.columns()[1].kind(), ColumnKind::Numeric);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    columns: Vec<RawColumn>,
    rows: usize,
}

impl RawTable {
    /// Builds a table from typed columns of equal length.
    pub fn from_columns(columns: Vec<RawColumn>) -> Result<Self, TableShapeError> {
        let rows = columns.first().map_or(0, RawColumn::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(TableShapeError::RaggedColumn {
                name: bad.name.clone(),
                found: bad.len(),
                expected: rows,
            });
        }
        Ok(Self { columns, rows })
    }

    /// Builds a table from a header and textual rows, parsing each cell
    /// with [`Cell::parse`].
    pub fn from_text_rows<H, S>(headers: &[H], rows: &[Vec<S>]) -> Result<Self, TableShapeError>
    where
        H: AsRef<str>,
        S: AsRef<str>,
    {
        let width = headers.len();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); width];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(TableShapeError::RaggedRow {
                    row: i,
                    found: row.len(),
                    expected: width,
                });
            }
            for (col, raw) in columns.iter_mut().zip(row) {
                col.push(Cell::parse(raw.as_ref()));
            }
        }
        let columns = headers
            .iter()
            .zip(columns)
            .map(|(h, cells)| RawColumn::new(h.as_ref(), cells))
            .collect();
        Ok(Self {
            columns,
            rows: rows.len(),
        })
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Copy with every column name trimmed and lowercased.
    pub fn with_normalized_names(&self) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| RawColumn::new(normalize_name(&c.name), c.cells.clone()))
                .collect(),
            rows: self.rows,
        }
    }

    /// The first `n` rows, one cell per column.
    pub fn head(&self, n: usize) -> Vec<Vec<&Cell>> {
        (0..self.rows.min(n))
            .map(|r| self.columns.iter().map(|c| &c.cells[r]).collect())
            .collect()
    }
}

/// Trims and lowercases a column name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// Canonical table
// ============================================================================

/// One `(group, value)` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub group: String,
    pub value: f64,
}

/// Values of one group, derived on demand from a [`CanonicalTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSample<'a> {
    pub label: &'a str,
    pub values: Vec<f64>,
}

impl GroupSample<'_> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validated two-column table: at least two distinct groups, every value
/// finite. Immutable once built.
///
/// # Examples
/// ```
/// use u_abtest::table::CanonicalTable;
///
/// let table = CanonicalTable::from_groups(&[
///     ("control", &[1.0, 2.0, 3.0][..]),
///     ("treatment", &[2.0, 3.0, 4.0][..]),
/// ]).unwrap();
/// assert_eq!(table.group_count(), 2);
/// assert_eq!(table.group_labels(), vec!["control", "treatment"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    rows: Vec<Observation>,
}

impl CanonicalTable {
    /// Builds a table from observations.
    ///
    /// # Errors
    /// - [`ValidationError::NonNumericMetric`] if any value is NaN/Inf.
    /// - [`ValidationError::InsufficientGroups`] if fewer than two
    ///   distinct groups are present.
    pub fn new(rows: Vec<Observation>) -> Result<Self, ValidationError> {
        if rows.iter().any(|o| !o.value.is_finite()) {
            return Err(ValidationError::NonNumericMetric {
                column: "value".to_owned(),
            });
        }
        let table = Self { rows };
        let found = table.group_count();
        if found < 2 {
            return Err(ValidationError::InsufficientGroups { found });
        }
        Ok(table)
    }

    /// Builds a table from `(label, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(group, value)| Observation {
                    group: group.into(),
                    value,
                })
                .collect(),
        )
    }

    /// Builds a table from per-group value slices, in the given order.
    pub fn from_groups(groups: &[(&str, &[f64])]) -> Result<Self, ValidationError> {
        Self::from_pairs(
            groups
                .iter()
                .flat_map(|(label, values)| values.iter().map(move |&v| (*label, v))),
        )
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct group labels in first-appearance order.
    pub fn group_labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|o| o.group.as_str())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Distinct group labels in lexicographic order.
    pub fn sorted_group_labels(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|o| o.group.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.rows
            .iter()
            .map(|o| o.group.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Values of one group in table order; empty if the label is absent.
    pub fn values_of(&self, label: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|o| o.group == label)
            .map(|o| o.value)
            .collect()
    }

    /// Every group's sample, in first-appearance order.
    pub fn groups(&self) -> Vec<GroupSample<'_>> {
        self.partition(self.group_labels())
    }

    /// Every group's sample, in lexicographic label order.
    pub fn sorted_groups(&self) -> Vec<GroupSample<'_>> {
        self.partition(self.sorted_group_labels())
    }

    /// All values in table order.
    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|o| o.value).collect()
    }

    fn partition<'a>(&'a self, labels: Vec<&'a str>) -> Vec<GroupSample<'a>> {
        let index: HashMap<&str, usize> = labels.iter().enumerate().map(|(i, l)| (*l, i)).collect();
        let mut samples: Vec<GroupSample<'a>> = labels
            .into_iter()
            .map(|label| GroupSample {
                label,
                values: Vec::new(),
            })
            .collect();
        for o in &self.rows {
            samples[index[o.group.as_str()]].values.push(o.value);
        }
        samples
    }
}

impl fmt::Display for CanonicalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "group,value")?;
        for o in &self.rows {
            writeln!(f, "{},{}", o.group, o.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("42"), Cell::Number(42.0));
        assert_eq!(Cell::parse("-1e3"), Cell::Number(-1000.0));
        assert_eq!(Cell::parse("  "), Cell::Missing);
        assert_eq!(Cell::parse("null"), Cell::Missing);
        assert_eq!(Cell::parse("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::parse(" B "), Cell::Text("B".into()));
    }

    #[test]
    fn test_cell_label() {
        assert_eq!(Cell::Number(1.0).label().as_deref(), Some("1"));
        assert_eq!(Cell::Number(-0.0).label().as_deref(), Some("0"));
        assert_eq!(Cell::Number(2.5).label().as_deref(), Some("2.5"));
        assert_eq!(Cell::Missing.label(), None);
    }

    #[test]
    fn test_column_kind() {
        let numeric = RawColumn::new("x", vec![Cell::Number(1.0), Cell::Missing]);
        let text = RawColumn::new("y", vec![Cell::Number(1.0), Cell::Text("a".into())]);
        let empty = RawColumn::new("z", vec![Cell::Missing, Cell::Missing]);
        assert_eq!(numeric.kind(), ColumnKind::Numeric);
        assert_eq!(text.kind(), ColumnKind::Text);
        assert_eq!(empty.kind(), ColumnKind::Empty);
        assert_eq!(empty.distinct_count(), 0);
    }

    #[test]
    fn test_distinct_count_ignores_missing() {
        let col = RawColumn::new(
            "g",
            vec![
                Cell::Text("a".into()),
                Cell::Missing,
                Cell::Text("a".into()),
                Cell::Text("b".into()),
            ],
        );
        assert_eq!(col.distinct_count(), 2);
    }

    #[test]
    fn test_from_text_rows_ragged() {
        let err = RawTable::from_text_rows(&["a", "b"], &[vec!["1", "2"], vec!["3"]]).unwrap_err();
        assert_eq!(
            err,
            TableShapeError::RaggedRow {
                row: 1,
                found: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn test_from_columns_ragged() {
        let err = RawTable::from_columns(vec![
            RawColumn::new("a", vec![Cell::Missing]),
            RawColumn::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableShapeError::RaggedColumn { .. }));
    }

    #[test]
    fn test_normalized_names() {
        let raw = RawTable::from_text_rows(&["  Score ", "GROUP"], &[vec!["1", "a"]]).unwrap();
        let norm = raw.with_normalized_names();
        assert!(norm.column("score").is_some());
        assert!(norm.column("group").is_some());
        // original untouched
        assert!(raw.column("score").is_none());
    }

    #[test]
    fn test_head() {
        let rows = [vec!["1"], vec!["2"], vec!["3"], vec!["4"]];
        let raw = RawTable::from_text_rows(&["a"], &rows).unwrap();
        let head = raw.head(3);
        assert_eq!(head.len(), 3);
        assert_eq!(head[2][0], &Cell::Number(3.0));
    }

    #[test]
    fn test_canonical_requires_two_groups() {
        let err = CanonicalTable::from_pairs([("a", 1.0), ("a", 2.0)]).unwrap_err();
        assert_eq!(err, ValidationError::InsufficientGroups { found: 1 });
    }

    #[test]
    fn test_canonical_rejects_non_finite() {
        let err = CanonicalTable::from_pairs([("a", 1.0), ("b", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ValidationError::NonNumericMetric { .. }));
    }

    #[test]
    fn test_group_order() {
        let table =
            CanonicalTable::from_pairs([("z", 1.0), ("a", 2.0), ("z", 3.0), ("m", 4.0)]).unwrap();
        assert_eq!(table.group_labels(), vec!["z", "a", "m"]);
        assert_eq!(table.sorted_group_labels(), vec!["a", "m", "z"]);
        let groups = table.groups();
        assert_eq!(groups[0].label, "z");
        assert_eq!(groups[0].values, vec![1.0, 3.0]);
        assert_eq!(table.sorted_groups()[2].values, vec![1.0, 3.0]);
        assert_eq!(table.values_of("m"), vec![4.0]);
        assert!(table.values_of("missing").is_empty());
    }

    #[test]
    fn test_display_csv() {
        let table = CanonicalTable::from_pairs([("a", 1.5), ("b", 2.0)]).unwrap();
        assert_eq!(table.to_string(), "group,value\na,1.5\nb,2\n");
    }
}
