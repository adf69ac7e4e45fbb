//! Permutation test on the absolute difference of two group means.
//!
//! # Algorithm
//!
//! 1. `D = |x̄_A − x̄_B|` on the observed labelling.
//! 2. Pool the values. For each iteration, restore the pooled order, move a
//!    uniformly random subset of size `n_A` to the front (partial
//!    Fisher–Yates), and record `dᵢ = |mean(front) − mean(rest)|`.
//! 3. `p = #{dᵢ ≥ D} / iterations`.
//!
//! Restoring the pooled order before each draw keeps the draws
//! independent of one another. `dᵢ` within `1e-14·D` of `D` counts as a
//! tie, so relabellings that reproduce the observed split are not lost to
//! rounding.
//!
//! # Reference
//! Good (2005), *Permutation, Parametric, and Bootstrap Tests of
//! Hypotheses*, 3rd ed., §3.

use std::time::Instant;

use rand::Rng;

use crate::procedures::{
    two_groups, GroupArity, Procedure, ProcedureError, ResamplingResult, RunContext, TestResult,
};
use crate::random::partial_shuffle;
use crate::recommend::ProcedureId;
use crate::stats::kahan_sum;
use crate::table::CanonicalTable;

const ID: ProcedureId = ProcedureId::Resampling;

/// Relative tolerance for counting `dᵢ` as reaching `D`.
const TIE_TOLERANCE: f64 = 1e-14;

/// How often, in iterations, the deadline is polled.
const DEADLINE_POLL_INTERVAL: usize = 1024;

/// Stopping rule for the permutation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_iterations: usize,
    pub deadline: Option<Instant>,
}

impl Budget {
    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            deadline: None,
        }
    }

    fn expired(&self, completed: usize) -> bool {
        completed > 0
            && completed % DEADLINE_POLL_INTERVAL == 0
            && self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

fn abs_mean_diff(front: &[f64], back: &[f64]) -> f64 {
    let ma = kahan_sum(front) / front.len() as f64;
    let mb = kahan_sum(back) / back.len() as f64;
    (ma - mb).abs()
}

fn non_finite_difference() -> ProcedureError {
    ProcedureError::Degenerate {
        procedure: ID,
        reason: "mean difference is not finite".to_owned(),
    }
}

/// Endless stream of permutation statistics `dᵢ`.
///
/// # Examples
/// ```
/// use u_abtest::procedures::permutation::PermutationSampler;
/// use u_abtest::random::create_rng;
///
/// let pooled = [1.0, 2.0, 3.0, 4.0];
/// let mut rng = create_rng(1);
/// let draws: Vec<f64> = PermutationSampler::new(&pooled, 2, &mut rng).take(100).collect();
/// // Every split of {1,2,3,4} into halves has |Δ| ∈ {0, 1, 2}.
/// assert!(draws.iter().all(|d| [0.0, 1.0, 2.0].contains(d)));
/// ```
pub struct PermutationSampler<'a, R: Rng> {
    pooled: &'a [f64],
    scratch: Vec<f64>,
    split: usize,
    rng: &'a mut R,
}

impl<'a, R: Rng> PermutationSampler<'a, R> {
    /// `split` is the size of the first group; it is clamped to
    /// `1..pooled.len()` so both sides stay non-empty.
    pub fn new(pooled: &'a [f64], split: usize, rng: &'a mut R) -> Self {
        let split = split.clamp(1, pooled.len().saturating_sub(1).max(1));
        Self {
            pooled,
            scratch: pooled.to_vec(),
            split,
            rng,
        }
    }
}

impl<R: Rng> Iterator for PermutationSampler<'_, R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.pooled.len() < 2 {
            return None;
        }
        self.scratch.copy_from_slice(self.pooled);
        partial_shuffle(&mut self.scratch, self.split, self.rng);
        let (front, back) = self.scratch.split_at(self.split);
        Some(abs_mean_diff(front, back))
    }
}

/// Permutation test with a fixed number of iterations.
#[derive(Debug, Clone, Copy)]
pub struct PermutationTest {
    pub iterations: usize,
}

impl PermutationTest {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }
}

impl Default for PermutationTest {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Procedure for PermutationTest {
    fn id(&self) -> ProcedureId {
        ID
    }

    fn arity(&self) -> GroupArity {
        GroupArity::Exactly(2)
    }

    fn run(
        &self,
        table: &CanonicalTable,
        ctx: &mut RunContext,
    ) -> Result<TestResult, ProcedureError> {
        let (a, b) = two_groups(ID, table)?;
        let observed_diff = abs_mean_diff(&a.values, &b.values);
        if !observed_diff.is_finite() {
            return Err(non_finite_difference());
        }
        let threshold = observed_diff - TIE_TOLERANCE * observed_diff;

        let mut pooled = Vec::with_capacity(a.len() + b.len());
        pooled.extend_from_slice(&a.values);
        pooled.extend_from_slice(&b.values);

        let budget = Budget {
            max_iterations: self.iterations,
            deadline: ctx.deadline(),
        };
        let mut null_distribution = Vec::with_capacity(budget.max_iterations);
        let mut extreme = 0_usize;
        for d in PermutationSampler::new(&pooled, a.len(), ctx.rng()) {
            if null_distribution.len() >= budget.max_iterations
                || budget.expired(null_distribution.len())
            {
                break;
            }
            if !d.is_finite() {
                return Err(non_finite_difference());
            }
            if d >= threshold {
                extreme += 1;
            }
            null_distribution.push(d);
        }

        let iterations = null_distribution.len();
        if iterations < budget.max_iterations {
            tracing::warn!(
                target: "u_abtest.procedures",
                procedure = %ID,
                completed = iterations,
                requested = budget.max_iterations,
                "permutation budget exhausted early"
            );
        }
        if iterations == 0 {
            return Err(ProcedureError::Degenerate {
                procedure: ID,
                reason: "no permutations were drawn".to_owned(),
            });
        }

        let p_value = extreme as f64 / iterations as f64;
        let alpha = ctx.significance_level();
        let significant = p_value < alpha;
        let conclusion = if significant {
            format!("Statistically significant difference (p < {alpha})")
        } else {
            format!("No statistically significant difference (p ≥ {alpha})")
        };
        tracing::debug!(
            target: "u_abtest.procedures",
            procedure = %ID,
            seed = ctx.seed(),
            iterations,
            observed_diff,
            p_value,
            "permutation test finished"
        );

        Ok(TestResult::Resampling(ResamplingResult {
            group_a_label: a.label.to_owned(),
            group_b_label: b.label.to_owned(),
            observed_diff,
            p_value,
            iterations,
            significant,
            conclusion,
            null_distribution,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
