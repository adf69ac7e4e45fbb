//! Group/metric column classification.
//!
//! A column is a *group candidate* when it holds text with between
//! [`MIN_GROUP_LEVELS`] and [`MAX_GROUP_LEVELS`] distinct values, and a
//! *metric candidate* when it is numeric with more than
//! [`MIN_METRIC_DISTINCT`] distinct values. Numeric columns are never
//! group candidates, even with few levels.

use serde::Serialize;

use crate::table::{ColumnKind, RawTable};

pub const MIN_GROUP_LEVELS: usize = 2;
pub const MAX_GROUP_LEVELS: usize = 10;
pub const MIN_METRIC_DISTINCT: usize = 5;

/// Candidate column names, each list in original column order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnCandidates {
    pub groups: Vec<String>,
    pub metrics: Vec<String>,
}

impl ColumnCandidates {
    pub fn default_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }

    pub fn default_metric(&self) -> Option<&str> {
        self.metrics.first().map(String::as_str)
    }
}

/// Proposes group and metric columns. Never fails; empty lists are a
/// valid answer.
///
/// # Examples
/// ```
/// use u_abtest::classify::classify;
/// use u_abtest::table::RawTable;
///
/// let rows: Vec<Vec<String>> = (0..12)
///     .map(|i| vec![if i % 2 == 0 { "a" } else { "b" }.to_string(), i.to_string()])
///     .collect();
/// let raw = RawTable::from_text_rows(&["bucket", "score"], &rows).unwrap();
/// let c = classify(&raw);
/// assert_eq!(c.groups, vec!["bucket"]);
/// assert_eq!(c.metrics, vec!["score"]);
/// ```
pub fn classify(table: &RawTable) -> ColumnCandidates {
    let mut out = ColumnCandidates::default();
    for column in table.columns() {
        let distinct = column.distinct_count();
        match column.kind() {
            ColumnKind::Text if (MIN_GROUP_LEVELS..=MAX_GROUP_LEVELS).contains(&distinct) => {
                out.groups.push(column.name().to_owned());
            }
            ColumnKind::Numeric if distinct > MIN_METRIC_DISTINCT => {
                out.metrics.push(column.name().to_owned());
            }
            _ => {}
        }
    }
    out
}
