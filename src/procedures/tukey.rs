//! Tukey's honestly significant difference (Tukey–Kramer for unequal sizes).
//!
//! # Algorithm
//!
//! With `k` groups in lexicographic label order, residual mean square
//! `MSE = SSW / (N − k)` and `df = N − k`, each pair `i < j` gets
//!
//! ```text
//! Δ    = x̄ⱼ − x̄ᵢ
//! SE   = √(MSE/2 · (1/nᵢ + 1/nⱼ))
//! q    = |Δ| / SE
//! pₐ   = 1 − P(Q ≤ q; k, df)
//! CI   = Δ ± q₁₋α(k, df) · SE
//! ```
//!
//! and is rejected when `q` exceeds the critical value. Numerical failure
//! is reported as [`TestResult::Rejected`] rather than an error, since the
//! caller shows the message in place of the table.
//!
//! # Reference
//! Kramer (1956), "Extension of multiple range tests to group means with
//! unequal numbers of replications", *Biometrics* 12(3).

use crate::procedures::anova::VarianceDecomposition;
use crate::procedures::{
    ensure_arity, GroupArity, Interval, IntervalPlot, PairwiseResult, PairwiseRow, Procedure,
    ProcedureError, RunContext, TestResult,
};
use crate::recommend::ProcedureId;
use crate::special::{studentized_range_cdf, studentized_range_quantile};
use crate::table::CanonicalTable;

const ID: ProcedureId = ProcedureId::PosthocPairwise;

/// Tukey's HSD over every pair of groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct TukeyHsd;

fn rejected(reason: impl Into<String>) -> TestResult {
    let reason = reason.into();
    tracing::warn!(
        target: "u_abtest.procedures",
        procedure = %ID,
        %reason,
        "pairwise test rejected"
    );
    TestResult::Rejected {
        procedure: ID,
        reason,
    }
}

impl Procedure for TukeyHsd {
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
        let alpha = ctx.significance_level();
        let groups = table.sorted_groups();
        let decomposition = VarianceDecomposition::of(&groups);
        let k = decomposition.groups() as f64;

        let df = decomposition.df_within();
        if df < 2.0 {
            return Ok(rejected(format!(
                "residual degrees of freedom ({df}) must be at least 2"
            )));
        }
        let mse = decomposition.mean_square_within();
        if !mse.is_finite() {
            return Ok(rejected(format!(
                "within-group variance is not finite (MSE = {mse})"
            )));
        }
        if mse <= 0.0 {
            return Ok(rejected("within-group variance is zero"));
        }
        let q_critical = studentized_range_quantile(1.0 - alpha, k, df);
        if !q_critical.is_finite() {
            return Ok(rejected(format!(
                "studentized range quantile did not converge (k = {k}, df = {df})"
            )));
        }

        let mut rows = Vec::new();
        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                let (ni, nj) = (
                    decomposition.sizes[i] as f64,
                    decomposition.sizes[j] as f64,
                );
                let mean_diff = decomposition.means[j] - decomposition.means[i];
                let se = (mse / 2.0 * (1.0 / ni + 1.0 / nj)).sqrt();
                let q = mean_diff.abs() / se;
                let p_adj = (1.0 - studentized_range_cdf(q, k, df)).clamp(0.0, 1.0);
                if p_adj.is_nan() {
                    return Ok(rejected(format!(
                        "studentized range CDF failed for `{}` vs `{}`",
                        groups[i].label, groups[j].label
                    )));
                }
                let half_width = q_critical * se;
                rows.push(PairwiseRow {
                    group_a: groups[i].label.to_owned(),
                    group_b: groups[j].label.to_owned(),
                    mean_diff,
                    p_adj,
                    lower_ci: mean_diff - half_width,
                    upper_ci: mean_diff + half_width,
                    reject: q > q_critical,
                });
            }
        }

        let plot = IntervalPlot {
            intervals: rows
                .iter()
                .map(|r| Interval {
                    label: format!("{} - {}", r.group_b, r.group_a),
                    center: r.mean_diff,
                    lower: r.lower_ci,
                    upper: r.upper_ci,
                })
                .collect(),
            reference_line: 0.0,
        };
        tracing::debug!(
            target: "u_abtest.procedures",
            procedure = %ID,
            groups = groups.len(),
            pairs = rows.len(),
            rejected_pairs = rows.iter().filter(|r| r.reject).count(),
            q_critical,
            "pairwise test finished"
        );

        Ok(TestResult::Pairwise(PairwiseResult {
            alpha,
            q_critical,
            df_residual: df,
            rows,
            plot,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
