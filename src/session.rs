//! Caller-held state for comparing two test runs side by side.
//!
//! The engine never reads these slots; they exist so a front end can keep
//! a "first test" and an optional "second test" without global state.

use serde::Serialize;

use crate::procedures::TestResult;
use crate::recommend::ProcedureId;

/// A finished run kept for comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedTest {
    pub procedure: ProcedureId,
    pub result: TestResult,
}

impl RecordedTest {
    pub fn new(result: TestResult) -> Self {
        Self {
            procedure: result.procedure(),
            result,
        }
    }
}

/// Zero, one or two recorded runs.
///
/// # Examples
/// ```
/// use u_abtest::procedures::TestResult;
/// use u_abtest::recommend::ProcedureId;
/// use u_abtest::session::ComparisonSlots;
///
/// let rejected = |p| TestResult::Rejected { procedure: p, reason: String::new() };
/// let mut slots = ComparisonSlots::default();
/// slots.record(rejected(ProcedureId::TwoSample));
/// assert!(slots.both().is_none());
/// slots.record(rejected(ProcedureId::Resampling));
/// let (first, second) = slots.both().unwrap();
/// assert_eq!(first.procedure, ProcedureId::TwoSample);
/// assert_eq!(second.procedure, ProcedureId::Resampling);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonSlots {
    first: Option<RecordedTest>,
    second: Option<RecordedTest>,
}

impl ComparisonSlots {
    /// Fills the first slot if empty, otherwise (re)places the second.
    pub fn record(&mut self, result: TestResult) -> &RecordedTest {
        let entry = RecordedTest::new(result);
        if self.first.is_none() {
            self.first.insert(entry)
        } else {
            self.second.insert(entry)
        }
    }

    pub fn first(&self) -> Option<&RecordedTest> {
        self.first.as_ref()
    }

    pub fn second(&self) -> Option<&RecordedTest> {
        self.second.as_ref()
    }

    /// Clears the second slot, returning what it held.
    pub fn reset_second(&mut self) -> Option<RecordedTest> {
        self.second.take()
    }

    /// Clears both slots.
    pub fn clear(&mut self) {
        self.first = None;
        self.second = None;
    }

    /// Both runs, once the comparison is complete.
    pub fn both(&self) -> Option<(&RecordedTest, &RecordedTest)> {
        self.first.as_ref().zip(self.second.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(procedure: ProcedureId, reason: &str) -> TestResult {
        TestResult::Rejected {
            procedure,
            reason: reason.into(),
        }
    }

    #[test]
    fn test_second_is_replaced() {
        let mut slots = ComparisonSlots::default();
        slots.record(rejected(ProcedureId::TwoSample, "1"));
        slots.record(rejected(ProcedureId::Resampling, "2"));
        let third = slots.record(rejected(ProcedureId::Probabilistic, "3"));
        assert_eq!(third.procedure, ProcedureId::Probabilistic);
        assert_eq!(slots.first().unwrap().procedure, ProcedureId::TwoSample);
        assert_eq!(slots.second().unwrap().result.conclusion(), Some("3"));
    }

    #[test]
    fn test_reset_second() {
        let mut slots = ComparisonSlots::default();
        slots.record(rejected(ProcedureId::TwoSample, "1"));
        assert!(slots.reset_second().is_none());
        slots.record(rejected(ProcedureId::Resampling, "2"));
        assert!(slots.both().is_some());
        let removed = slots.reset_second().unwrap();
        assert_eq!(removed.procedure, ProcedureId::Resampling);
        assert!(slots.both().is_none());
        assert!(slots.first().is_some());
    }

    #[test]
    fn test_clear() {
        let mut slots = ComparisonSlots::default();
        slots.record(rejected(ProcedureId::TwoSample, "1"));
        slots.clear();
        assert_eq!(slots, ComparisonSlots::default());
        let entry = slots.record(rejected(ProcedureId::Resampling, "again"));
        assert_eq!(entry.procedure, ProcedureId::Resampling);
        assert!(slots.second().is_none());
    }
}
