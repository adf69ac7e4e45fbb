//! Hypothesis-test procedures and their shared result model.
//!
//! Every procedure implements [`Procedure`]: a pure function of a
//! [`CanonicalTable`] plus a [`RunContext`] carrying the significance level
//! and, for randomized procedures, a seeded RNG.
//!
//! | Procedure | Groups | Result |
//! |---|---|---|
//! | [`two_sample::TwoSampleTest`] | exactly 2 | [`TestResult::Point`] |
//! | [`anova::OneWayAnova`] | at least 3 | [`TestResult::Point`] |
//! | [`tukey::TukeyHsd`] | at least 3 | [`TestResult::Pairwise`] or [`TestResult::Rejected`] |
//! | [`permutation::PermutationTest`] | exactly 2 | [`TestResult::Resampling`] |
//! | [`posterior::PosteriorComparison`] | exactly 2 | [`TestResult::Probabilistic`] |

pub mod anova;
pub mod permutation;
pub mod posterior;
pub mod tukey;
pub mod two_sample;

use std::fmt;
use std::time::Instant;

use rand::rngs::SmallRng;
use serde::Serialize;

use crate::random::{create_rng, entropy_seed};
use crate::recommend::ProcedureId;
use crate::table::{CanonicalTable, GroupSample};

/// Significance level used when none is configured.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

// ============================================================================
// Procedure trait
// ============================================================================

/// A hypothesis test over a canonical `(group, value)` table.
pub trait Procedure: Send + Sync {
    fn id(&self) -> ProcedureId;

    /// Number of distinct groups the procedure accepts.
    fn arity(&self) -> GroupArity;

    /// Runs the test.
    ///
    /// # Errors
    /// [`ProcedureError::WrongGroupCount`] when the table's group count does
    /// not satisfy [`Procedure::arity`], plus procedure-specific failures.
    fn run(&self, table: &CanonicalTable, ctx: &mut RunContext)
        -> Result<TestResult, ProcedureError>;
}

/// Accepted group counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupArity {
    Exactly(usize),
    AtLeast(usize),
}

impl GroupArity {
    pub fn accepts(self, groups: usize) -> bool {
        match self {
            GroupArity::Exactly(n) => groups == n,
            GroupArity::AtLeast(n) => groups >= n,
        }
    }
}

impl fmt::Display for GroupArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupArity::Exactly(n) => write!(f, "exactly {n}"),
            GroupArity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Per-run state: significance level, seeded RNG and optional deadline.
///
/// # Examples
/// ```
/// use u_abtest::procedures::RunContext;
///
/// let ctx = RunContext::seeded(7).with_significance_level(0.01);
/// assert_eq!(ctx.seed(), 7);
/// assert_eq!(ctx.significance_level(), 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    seed: u64,
    rng: SmallRng,
    significance_level: f64,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: create_rng(seed),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            deadline: None,
        }
    }

    /// Context seeded from fresh entropy.
    pub fn from_entropy() -> Self {
        Self::seeded(entropy_seed())
    }

    pub fn with_significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = alpha;
        self
    }

    /// Wall-clock deadline for iterative procedures.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn significance_level(&self) -> f64 {
        self.significance_level
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::from_entropy()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a procedure could not produce a result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcedureError {
    #[error("{procedure} requires {expected} groups, found {found}")]
    WrongGroupCount {
        procedure: ProcedureId,
        expected: GroupArity,
        found: usize,
    },

    #[error("{procedure}: group `{group}` has {found} observations, at least {required} needed")]
    InsufficientObservations {
        procedure: ProcedureId,
        group: String,
        found: usize,
        required: usize,
    },

    #[error("{procedure}: {reason}")]
    Degenerate {
        procedure: ProcedureId,
        reason: String,
    },

    #[error("no procedure registered for {0}")]
    Unregistered(ProcedureId),
}

/// Fails with [`ProcedureError::WrongGroupCount`] unless `table` has a
/// group count `arity` accepts.
pub fn ensure_arity(
    procedure: ProcedureId,
    arity: GroupArity,
    table: &CanonicalTable,
) -> Result<(), ProcedureError> {
    let found = table.group_count();
    if arity.accepts(found) {
        Ok(())
    } else {
        Err(ProcedureError::WrongGroupCount {
            procedure,
            expected: arity,
            found,
        })
    }
}

/// The two groups of a two-group table, in first-appearance order.
pub(crate) fn two_groups(
    procedure: ProcedureId,
    table: &CanonicalTable,
) -> Result<(GroupSample<'_>, GroupSample<'_>), ProcedureError> {
    ensure_arity(procedure, GroupArity::Exactly(2), table)?;
    let mut groups = table.groups().into_iter();
    match (groups.next(), groups.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ProcedureError::WrongGroupCount {
            procedure,
            expected: GroupArity::Exactly(2),
            found: table.group_count(),
        }),
    }
}

// ============================================================================
// Results
// ============================================================================

/// Degrees of freedom of a reference distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DegreesOfFreedom {
    /// Student t.
    Single(f64),
    /// F, as (numerator, denominator).
    Pair(f64, f64),
}

/// Statistic plus p-value, for the t-test and ANOVA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointResult {
    pub procedure: ProcedureId,
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: DegreesOfFreedom,
    pub significant: bool,
    pub conclusion: String,
}

/// One pairwise comparison from Tukey's HSD.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseRow {
    pub group_a: String,
    pub group_b: String,
    /// `mean(group_b) − mean(group_a)`.
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    pub reject: bool,
}

/// A labelled confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    pub label: String,
    pub center: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Simultaneous-interval plot data: one interval per pair and a
/// reference line (zero difference).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalPlot {
    pub intervals: Vec<Interval>,
    pub reference_line: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseResult {
    pub alpha: f64,
    pub q_critical: f64,
    pub df_residual: f64,
    pub rows: Vec<PairwiseRow>,
    pub plot: IntervalPlot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResamplingResult {
    pub group_a_label: String,
    pub group_b_label: String,
    pub observed_diff: f64,
    pub p_value: f64,
    /// Completed permutations; below the requested count only when a
    /// deadline stopped the run.
    pub iterations: usize,
    pub significant: bool,
    pub conclusion: String,
    pub null_distribution: Vec<f64>,
}

/// Normal approximation of one group's mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PosteriorSummary {
    pub mean: f64,
    pub standard_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilisticResult {
    pub group_a_label: String,
    pub group_b_label: String,
    pub prob_a_better: f64,
    pub prob_b_better: f64,
    pub posterior_a: PosteriorSummary,
    pub posterior_b: PosteriorSummary,
    pub conclusion: String,
    pub posterior_samples: (Vec<f64>, Vec<f64>),
}

/// Outcome of a procedure run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestResult {
    Point(PointResult),
    Pairwise(PairwiseResult),
    /// The procedure ran but could not produce numbers; `reason` is shown
    /// to the user in place of a table.
    Rejected {
        procedure: ProcedureId,
        reason: String,
    },
    Resampling(ResamplingResult),
    Probabilistic(ProbabilisticResult),
}

impl TestResult {
    pub fn procedure(&self) -> ProcedureId {
        match self {
            TestResult::Point(r) => r.procedure,
            TestResult::Pairwise(_) => ProcedureId::PosthocPairwise,
            TestResult::Rejected { procedure, .. } => *procedure,
            TestResult::Resampling(_) => ProcedureId::Resampling,
            TestResult::Probabilistic(_) => ProcedureId::Probabilistic,
        }
    }

    /// The single p-value, where the result has one.
    pub fn p_value(&self) -> Option<f64> {
        match self {
            TestResult::Point(r) => Some(r.p_value),
            TestResult::Resampling(r) => Some(r.p_value),
            _ => None,
        }
    }

    /// Natural-language verdict, where the result has one.
    pub fn conclusion(&self) -> Option<&str> {
        match self {
            TestResult::Point(r) => Some(&r.conclusion),
            TestResult::Resampling(r) => Some(&r.conclusion),
            TestResult::Probabilistic(r) => Some(&r.conclusion),
            TestResult::Rejected { reason, .. } => Some(reason),
            TestResult::Pairwise(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, TestResult::Rejected { .. })
    }
}
