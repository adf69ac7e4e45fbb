//! Column advisor: an external assistant that proposes group and metric
//! columns from a dataset summary.
//!
//! The crate ships no network client. Callers inject a [`ColumnAdvisor`];
//! [`request_suggestion`] runs it on a worker thread under a timeout and
//! folds every failure (error, panic, timeout) into
//! [`Suggestion::Unavailable`], so the assistant can never break the
//! analysis flow.

use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::stats::Summary;
use crate::table::{ColumnKind, RawTable};

/// Rows of the dataset shown to the advisor.
pub const HEAD_ROWS: usize = 3;

pub const DEFAULT_SYSTEM_ROLE: &str = "You are a helpful A/B testing assistant.";

pub const DEFAULT_INSTRUCTIONS: &str = "Based on this, suggest one GROUP column and one METRIC \
(value) column for A/B testing. Explain briefly why you chose them.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    #[error("column advisor unavailable: {0}")]
    Unavailable(String),

    #[error("column advisor failed: {0}")]
    Failed(String),
}

/// Produces a free-text column suggestion.
pub trait ColumnAdvisor: Send + Sync {
    fn suggest(&self, request: &AdvisorRequest) -> Result<String, AdvisorError>;
}

/// Advisor used when no assistant is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAdvisor;

impl ColumnAdvisor for UnavailableAdvisor {
    fn suggest(&self, _request: &AdvisorRequest) -> Result<String, AdvisorError> {
        Err(AdvisorError::Unavailable(
            "no column advisor is configured".to_owned(),
        ))
    }
}

// ============================================================================
// Dataset summary
// ============================================================================

/// Describe-style statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    /// Present (non-missing) cells.
    pub count: usize,
    pub unique: usize,
    /// Distribution statistics; numeric columns only.
    pub numeric: Option<Summary>,
}

/// What the advisor sees of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    /// First [`HEAD_ROWS`] rows rendered as text; missing cells show `NaN`.
    pub head: Vec<Vec<String>>,
}

impl TableSummary {
    pub fn of(table: &RawTable) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|c| ColumnSummary {
                name: c.name().to_owned(),
                kind: c.kind(),
                count: c.cells().iter().filter(|cell| !cell.is_missing()).count(),
                unique: c.distinct_count(),
                numeric: c.numbers().and_then(|v| Summary::of(&v)),
            })
            .collect();
        let head = table
            .head(HEAD_ROWS)
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.label().unwrap_or_else(|| "NaN".to_owned()))
                    .collect()
            })
            .collect();
        Self {
            rows: table.row_count(),
            columns,
            head,
        }
    }

    /// Plain-text rendering: one line per column, then the head rows.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "rows: {}", self.rows);
        for c in &self.columns {
            let _ = write!(
                out,
                "{}: kind={:?} count={} unique={}",
                c.name, c.kind, c.count, c.unique
            );
            if let Some(s) = &c.numeric {
                let std = s.std.map_or_else(|| "NaN".to_owned(), |v| format!("{v:.4}"));
                let _ = write!(
                    out,
                    " mean={:.4} std={std} min={} 25%={} 50%={} 75%={} max={}",
                    s.mean, s.min, s.q25, s.median, s.q75, s.max
                );
            }
            out.push('\n');
        }
        let header: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let _ = writeln!(out, "\n{}", header.join(" | "));
        for row in &self.head {
            let _ = writeln!(out, "{}", row.join(" | "));
        }
        out
    }
}

/// One advisor call: the summary plus the prompt wording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorRequest {
    pub system_role: String,
    pub instructions: String,
    pub summary: TableSummary,
}

impl AdvisorRequest {
    pub fn new(summary: TableSummary) -> Self {
        Self {
            system_role: DEFAULT_SYSTEM_ROLE.to_owned(),
            instructions: DEFAULT_INSTRUCTIONS.to_owned(),
            summary,
        }
    }

    pub fn for_table(table: &RawTable) -> Self {
        Self::new(TableSummary::of(table))
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// The user message: dataset summary followed by the instructions.
    pub fn prompt(&self) -> String {
        format!(
            "You are a data analyst helping with A/B testing.\n\n\
             Here is the dataset summary:\n{}\n{}",
            self.summary.render(),
            self.instructions
        )
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Outcome of an advisor call. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Suggestion {
    Available { text: String },
    Unavailable { reason: String },
}

impl Suggestion {
    fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(target: "u_abtest.advisor", %reason, "column suggestion unavailable");
        Suggestion::Unavailable { reason }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Suggestion::Available { text } => Some(text),
            Suggestion::Unavailable { .. } => None,
        }
    }
}

/// Runs `advisor` on a worker thread and waits at most `timeout`.
///
/// A worker that outlives the timeout is detached; its eventual answer
/// is dropped.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use u_abtest::advisor::{request_suggestion, AdvisorRequest, Suggestion, UnavailableAdvisor};
/// use u_abtest::table::RawTable;
///
/// let request = AdvisorRequest::for_table(&RawTable::default());
/// let s = request_suggestion(Arc::new(UnavailableAdvisor), request, Duration::from_secs(1));
/// assert!(matches!(s, Suggestion::Unavailable { .. }));
/// ```
pub fn request_suggestion(
    advisor: Arc<dyn ColumnAdvisor>,
    request: AdvisorRequest,
    timeout: Duration,
) -> Suggestion {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("column-advisor".to_owned())
        .spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| advisor.suggest(&request)));
            // The receiver is gone after a timeout.
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        return Suggestion::unavailable(format!("could not start advisor thread: {e}"));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(Ok(text))) => {
            let text = text.trim();
            if text.is_empty() {
                Suggestion::unavailable("advisor returned an empty suggestion")
            } else {
                tracing::debug!(
                    target: "u_abtest.advisor",
                    chars = text.len(),
                    "column suggestion received"
                );
                Suggestion::Available {
                    text: text.to_owned(),
                }
            }
        }
        Ok(Ok(Err(e))) => Suggestion::unavailable(e.to_string()),
        Ok(Err(_)) => Suggestion::unavailable("advisor panicked"),
        Err(RecvTimeoutError::Timeout) => Suggestion::unavailable(format!(
            "advisor timed out after {} ms",
            timeout.as_millis()
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Suggestion::unavailable("advisor thread exited without answering")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl ColumnAdvisor for Fixed {
        fn suggest(&self, request: &AdvisorRequest) -> Result<String, AdvisorError> {
            assert!(request.prompt().contains(&request.instructions));
            Ok(self.0.to_owned())
        }
    }

    struct Failing;

    impl ColumnAdvisor for Failing {
        fn suggest(&self, _request: &AdvisorRequest) -> Result<String, AdvisorError> {
            Err(AdvisorError::Failed("rate limited".into()))
        }
    }

    struct Panicking;

    impl ColumnAdvisor for Panicking {
        fn suggest(&self, _request: &AdvisorRequest) -> Result<String, AdvisorError> {
            panic!("boom")
        }
    }

    struct Slow;

    impl ColumnAdvisor for Slow {
        fn suggest(&self, _request: &AdvisorRequest) -> Result<String, AdvisorError> {
            thread::sleep(Duration::from_millis(500));
            Ok("too late".into())
        }
    }

    fn table() -> RawTable {
        RawTable::from_text_rows(
            &["variant", "revenue", "note"],
            &[
                vec!["A", "10.5", "x"],
                vec!["B", "", "y"],
                vec!["A", "12.0", "NA"],
                vec!["B", "9.0", "z"],
            ],
        )
        .unwrap()
    }

    fn ask(advisor: Arc<dyn ColumnAdvisor>, timeout_ms: u64) -> Suggestion {
        request_suggestion(
            advisor,
            AdvisorRequest::for_table(&table()),
            Duration::from_millis(timeout_ms),
        )
    }

    #[test]
    fn test_summary() {
        let s = TableSummary::of(&table());
        assert_eq!(s.rows, 4);
        assert_eq!(s.head.len(), HEAD_ROWS);
        assert_eq!(s.head[1], vec!["B", "NaN", "y"]);

        let revenue = &s.columns[1];
        assert_eq!(revenue.kind, ColumnKind::Numeric);
        assert_eq!(revenue.count, 3);
        let stats = revenue.numeric.as_ref().unwrap();
        assert_eq!(stats.min, 9.0);
        assert_eq!(stats.max, 12.0);
        assert!(s.columns[0].numeric.is_none());
        assert_eq!(s.columns[0].unique, 2);
    }

    #[test]
    fn test_render_and_prompt() {
        let request = AdvisorRequest::for_table(&table());
        let text = request.summary.render();
        assert!(text.contains("variant | revenue | note"));
        assert!(text.contains("revenue: kind=Numeric count=3 unique=3"));
        let prompt = request.prompt();
        assert!(prompt.ends_with(DEFAULT_INSTRUCTIONS));
        assert_eq!(request.system_role, DEFAULT_SYSTEM_ROLE);

        let custom = AdvisorRequest::for_table(&table()).with_instructions("Pick two.");
        assert!(custom.prompt().ends_with("Pick two."));
    }

    #[test]
    fn test_available() {
        let s = ask(Arc::new(Fixed("  group: variant\nmetric: revenue  ")), 2_000);
        assert_eq!(s.text(), Some("group: variant\nmetric: revenue"));
    }

    #[test]
    fn test_empty_text_is_unavailable() {
        assert!(ask(Arc::new(Fixed("   ")), 2_000).text().is_none());
    }

    #[test]
    fn test_failure_is_unavailable() {
        match ask(Arc::new(Failing), 2_000) {
            Suggestion::Unavailable { reason } => assert!(reason.contains("rate limited")),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_panic_is_unavailable() {
        assert_eq!(
            ask(Arc::new(Panicking), 2_000),
            Suggestion::Unavailable {
                reason: "advisor panicked".into()
            }
        );
    }

    #[test]
    fn test_timeout_is_unavailable() {
        match ask(Arc::new(Slow), 20) {
            Suggestion::Unavailable { reason } => assert!(reason.contains("timed out")),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_stub_advisor() {
        assert!(matches!(
            ask(Arc::new(UnavailableAdvisor), 2_000),
            Suggestion::Unavailable { .. }
        ));
    }

    #[test]
    fn test_suggestion_serializes_with_status() {
        let v = serde_json::to_value(Suggestion::Available { text: "hi".into() }).unwrap();
        assert_eq!(v["status"], "available");
        assert_eq!(v["text"], "hi");
    }
}
