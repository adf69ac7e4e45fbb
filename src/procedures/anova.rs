//! One-way analysis of variance.
//!
//! # Algorithm
//!
//! For `k` groups with `N` observations in total:
//!
//! ```text
//! SSB = Σ nᵢ (x̄ᵢ − x̄)²        MSB = SSB / (k − 1)
//! SSW = Σ Σ (xᵢⱼ − x̄ᵢ)²       MSW = SSW / (N − k)
//! F   = MSB / MSW,  p = P(F(k−1, N−k) ≥ F)
//! ```
//!
//! Group sums of squares come from [`WelfordAccumulator`], the grand mean
//! from compensated summation.

use crate::procedures::{
    ensure_arity, DegreesOfFreedom, GroupArity, PointResult, Procedure, ProcedureError,
    RunContext, TestResult,
};
use crate::recommend::ProcedureId;
use crate::special::f_distribution_sf;
use crate::stats::{kahan_sum, WelfordAccumulator};
use crate::table::{CanonicalTable, GroupSample};

const ID: ProcedureId = ProcedureId::MultiGroupVariance;

/// Per-group and pooled sums of squares shared by ANOVA and Tukey's HSD.
#[derive(Debug, Clone)]
pub(crate) struct VarianceDecomposition {
    pub means: Vec<f64>,
    pub sizes: Vec<usize>,
    pub ss_between: f64,
    pub ss_within: f64,
    pub total: usize,
}

impl VarianceDecomposition {
    pub fn of(groups: &[GroupSample<'_>]) -> Self {
        let all: Vec<f64> = groups.iter().flat_map(|g| g.values.iter().copied()).collect();
        let total = all.len();
        let grand_mean = if total == 0 {
            0.0
        } else {
            kahan_sum(&all) / total as f64
        };

        let mut means = Vec::with_capacity(groups.len());
        let mut sizes = Vec::with_capacity(groups.len());
        let mut ss_between = 0.0;
        let mut ss_within = 0.0;
        for g in groups {
            let acc = WelfordAccumulator::from_slice(&g.values);
            let mean = acc.mean().unwrap_or(grand_mean);
            ss_between += g.len() as f64 * (mean - grand_mean).powi(2);
            ss_within += acc.sum_squared_deviations();
            means.push(mean);
            sizes.push(g.len());
        }

        Self {
            means,
            sizes,
            ss_between,
            ss_within,
            total,
        }
    }

    pub fn groups(&self) -> usize {
        self.means.len()
    }

    /// `N − k`.
    pub fn df_within(&self) -> f64 {
        self.total as f64 - self.groups() as f64
    }

    pub fn mean_square_within(&self) -> f64 {
        self.ss_within / self.df_within()
    }
}

/// One-way ANOVA F-test across all groups.
///
/// # Examples
/// ```
/// use u_abtest::procedures::{anova::OneWayAnova, Procedure, RunContext};
/// use u_abtest::table::CanonicalTable;
///
/// let t = CanonicalTable::from_groups(&[
///     ("a", &[1.0, 2.0, 3.0][..]),
///     ("b", &[4.0, 5.0, 6.0][..]),
///     ("c", &[7.0, 8.0, 9.0][..]),
/// ]).unwrap();
/// let r = OneWayAnova.run(&t, &mut RunContext::seeded(0)).unwrap();
/// assert!((r.p_value().unwrap() - 0.001).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OneWayAnova;

impl Procedure for OneWayAnova {
    fn id(&self) -> ProcedureId {
        ID
    }

    fn arity(&self) -> GroupArity {
        GroupArity::AtLeast(3)
    }

    fn run(
        &self,
        table: &CanonicalTable,
        ctx: &mut RunContext,
    ) -> Result<TestResult, ProcedureError> {
        ensure_arity(ID, self.arity(), table)?;
        let groups = table.groups();
        let decomposition = VarianceDecomposition::of(&groups);

        let df_between = decomposition.groups() as f64 - 1.0;
        let df_within = decomposition.df_within();
        if df_within < 1.0 {
            let first = &groups[0];
            return Err(ProcedureError::InsufficientObservations {
                procedure: ID,
                group: first.label.to_owned(),
                found: first.len(),
                required: 2,
            });
        }

        let msw = decomposition.mean_square_within();
        if msw <= 0.0 {
            return Err(ProcedureError::Degenerate {
                procedure: ID,
                reason: "every group has zero within-group variance".to_owned(),
            });
        }
        let statistic = (decomposition.ss_between / df_between) / msw;
        let p_value = f_distribution_sf(statistic, df_between, df_within);
        if !statistic.is_finite() || !p_value.is_finite() {
            return Err(ProcedureError::Degenerate {
                procedure: ID,
                reason: format!("non-finite statistic (F = {statistic})"),
            });
        }

        let significant = p_value < ctx.significance_level();
        let conclusion = if significant {
            "At least one group is significantly different."
        } else {
            "No significant difference found."
        };
        tracing::debug!(
            target: "u_abtest.procedures",
            procedure = %ID,
            groups = decomposition.groups(),
            statistic,
            df_between,
            df_within,
            p_value,
            "ANOVA finished"
        );

        Ok(TestResult::Point(PointResult {
            procedure: ID,
            statistic,
            p_value,
            degrees_of_freedom: DegreesOfFreedom::Pair(df_between, df_within),
            significant,
            conclusion: conclusion.to_owned(),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
