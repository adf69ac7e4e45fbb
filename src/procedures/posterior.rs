//! Probabilistic comparison of two group means.
//!
//! Each group's mean is modelled as `N(x̄, SE²)` with
//! `SE = σ_pop / √n`. This is a normal approximation of the posterior
//! under a flat prior, not a conjugate update. Drawing `N` samples from
//! each approximation and counting how often A's draw exceeds B's gives a
//! Monte Carlo estimate of `P(μ_A > μ_B)`.

use crate::distributions::Normal;
use crate::procedures::{
    two_groups, GroupArity, PosteriorSummary, ProbabilisticResult, Procedure, ProcedureError,
    RunContext, TestResult,
};
use crate::recommend::ProcedureId;
use crate::stats;
use crate::table::{CanonicalTable, GroupSample};

const ID: ProcedureId = ProcedureId::Probabilistic;

/// Posterior comparison with a fixed number of draws per group.
///
/// # Examples
/// ```
/// use u_abtest::procedures::{posterior::PosteriorComparison, Procedure, RunContext, TestResult};
/// use u_abtest::table::CanonicalTable;
///
/// let t = CanonicalTable::from_groups(&[
///     ("new", &[12.0, 13.0, 14.0, 15.0][..]),
///     ("old", &[1.0, 2.0, 3.0, 4.0][..]),
/// ]).unwrap();
/// let TestResult::Probabilistic(r) =
///     PosteriorComparison::new(2_000).run(&t, &mut RunContext::seeded(1)).unwrap()
/// else { unreachable!() };
/// assert!(r.prob_a_better > 0.99);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PosteriorComparison {
    pub samples: usize,
}

impl PosteriorComparison {
    pub fn new(samples: usize) -> Self {
        Self {
            samples: samples.max(1),
        }
    }
}

impl Default for PosteriorComparison {
    fn default() -> Self {
        Self::new(10_000)
    }
}

fn approximate(group: &GroupSample<'_>) -> Result<(PosteriorSummary, Normal), ProcedureError> {
    let degenerate = |reason: String| ProcedureError::Degenerate {
        procedure: ID,
        reason,
    };
    let mean = stats::mean(&group.values)
        .ok_or_else(|| degenerate(format!("group `{}` has no values", group.label)))?;
    let standard_error = stats::standard_error(&group.values)
        .ok_or_else(|| degenerate(format!("group `{}` has no values", group.label)))?;
    let normal = Normal::new(mean, standard_error).map_err(|e| degenerate(e.to_string()))?;
    Ok((
        PosteriorSummary {
            mean,
            standard_error,
        },
        normal,
    ))
}

impl Procedure for PosteriorComparison {
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
        let (posterior_a, dist_a) = approximate(&a)?;
        let (posterior_b, dist_b) = approximate(&b)?;

        let draws_a = dist_a.sample_n(ctx.rng(), self.samples);
        let draws_b = dist_b.sample_n(ctx.rng(), self.samples);
        let wins = draws_a
            .iter()
            .zip(&draws_b)
            .filter(|(x, y)| x > y)
            .count();
        let prob_a_better = wins as f64 / self.samples as f64;
        let prob_b_better = 1.0 - prob_a_better;

        let conclusion = format!(
            "There is a {:.1}% chance that `{}` is better than `{}`.",
            prob_a_better * 100.0,
            a.label,
            b.label
        );
        tracing::debug!(
            target: "u_abtest.procedures",
            procedure = %ID,
            seed = ctx.seed(),
            samples = self.samples,
            prob_a_better,
            "posterior comparison finished"
        );

        Ok(TestResult::Probabilistic(ProbabilisticResult {
            group_a_label: a.label.to_owned(),
            group_b_label: b.label.to_owned(),
            prob_a_better,
            prob_b_better,
            posterior_a,
            posterior_b,
            conclusion,
            posterior_samples: (draws_a, draws_b),
        }))
    }
}
