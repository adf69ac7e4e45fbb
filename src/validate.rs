//! Dataset validation: raw table in, canonical `(group, value)` table out.
//!
//! # Policy
//!
//! 1. Normalize column names (trim, lowercase).
//! 2. Classify columns; the first group and first metric candidate are
//!    the defaults.
//! 3. Drop rows missing either selected cell.
//! 4. Coerce the metric column to numbers.
//! 5. Require at least two distinct groups among the remaining rows.
//!
//! The raw table is never modified.

use crate::classify::classify;
use crate::table::{normalize_name, Cell, CanonicalTable, Observation, RawTable};

/// Why a dataset cannot be turned into a [`CanonicalTable`].
///
/// Every variant is recoverable by the caller choosing different columns
/// or supplying different data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "no suitable group column found; include a text column with {min}-{max} unique values",
        min = crate::classify::MIN_GROUP_LEVELS,
        max = crate::classify::MAX_GROUP_LEVELS
    )]
    NoGroupColumn,

    #[error(
        "no suitable metric column found; \
         include a numeric column with more than {min} unique values",
        min = crate::classify::MIN_METRIC_DISTINCT
    )]
    NoMetricColumn,

    #[error("column `{column}` must be numeric")]
    NonNumericMetric { column: String },

    #[error("need at least 2 unique groups for comparison, found {found}")]
    InsufficientGroups { found: usize },

    #[error("column `{name}` does not exist")]
    UnknownColumn { name: String },
}

/// Explicit choice of group and metric columns, by (unnormalized) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub group: String,
    pub metric: String,
}

impl ColumnSelection {
    pub fn new(group: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            metric: metric.into(),
        }
    }
}

/// Validates `raw` using the classifier's default columns.
///
/// # Errors
/// [`ValidationError::NoGroupColumn`], [`ValidationError::NoMetricColumn`],
/// [`ValidationError::NonNumericMetric`] or
/// [`ValidationError::InsufficientGroups`].
///
/// # Examples
/// ```
/// use u_abtest::table::RawTable;
/// use u_abtest::validate::validate;
///
/// let rows: Vec<Vec<String>> = (0..10)
///     .map(|i| vec![if i < 5 { "A" } else { "B" }.to_string(), format!("{}", i + 1)])
///     .collect();
/// let raw = RawTable::from_text_rows(&["Variant", "Revenue"], &rows).unwrap();
/// let table = validate(&raw).unwrap();
/// assert_eq!(table.group_labels(), vec!["A", "B"]);
/// assert_eq!(table.len(), 10);
/// ```
pub fn validate(raw: &RawTable) -> Result<CanonicalTable, ValidationError> {
    let normalized = raw.with_normalized_names();
    let candidates = classify(&normalized);

    let group = candidates
        .default_group()
        .ok_or(ValidationError::NoGroupColumn)?;
    let metric = candidates
        .default_metric()
        .ok_or(ValidationError::NoMetricColumn)?;

    tracing::debug!(
        target: "u_abtest.validate",
        group,
        metric,
        group_candidates = candidates.groups.len(),
        metric_candidates = candidates.metrics.len(),
        "selected default columns"
    );

    build_canonical(&normalized, group, metric)
}

/// Validates `raw` using caller-chosen columns.
///
/// Names are matched after normalization, so `" Score"` selects a column
/// headed `"SCORE "`. Unlike [`validate`] the classifier is not consulted:
/// a text metric column fails coercion with
/// [`ValidationError::NonNumericMetric`].
pub fn validate_with(
    raw: &RawTable,
    selection: &ColumnSelection,
) -> Result<CanonicalTable, ValidationError> {
    let normalized = raw.with_normalized_names();
    let group = normalize_name(&selection.group);
    let metric = normalize_name(&selection.metric);
    for name in [&group, &metric] {
        if normalized.column(name).is_none() {
            return Err(ValidationError::UnknownColumn { name: name.clone() });
        }
    }
    build_canonical(&normalized, &group, &metric)
}

fn build_canonical(
    table: &RawTable,
    group: &str,
    metric: &str,
) -> Result<CanonicalTable, ValidationError> {
    let unknown = |name: &str| ValidationError::UnknownColumn {
        name: name.to_owned(),
    };
    let group_cells = table.column(group).ok_or_else(|| unknown(group))?.cells();
    let metric_cells = table.column(metric).ok_or_else(|| unknown(metric))?.cells();

    let mut rows = Vec::with_capacity(table.row_count());
    let mut dropped = 0_usize;
    for (g, m) in group_cells.iter().zip(metric_cells) {
        if g.is_missing() || m.is_missing() {
            dropped += 1;
            continue;
        }
        let value = match m {
            Cell::Number(v) => *v,
            _ => {
                return Err(ValidationError::NonNumericMetric {
                    column: metric.to_owned(),
                })
            }
        };
        if let Some(label) = g.label() {
            rows.push(Observation {
                group: label,
                value,
            });
        }
    }

    let table = CanonicalTable::new(rows)?;
    tracing::debug!(
        target: "u_abtest.validate",
        rows = table.len(),
        dropped,
        groups = table.group_count(),
        "dataset validated"
    );
    Ok(table)
}
