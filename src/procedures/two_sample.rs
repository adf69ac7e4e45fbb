//! Two-sample t-test.
//!
//! # Algorithm
//!
//! With group means `x̄₁, x̄₂`, sums of squared deviations `SS₁, SS₂` and
//! sizes `n₁, n₂`:
//!
//! - **Pooled** (Student): `s²ₚ = (SS₁ + SS₂) / (n₁ + n₂ − 2)`,
//!   `SE = √(s²ₚ (1/n₁ + 1/n₂))`, `df = n₁ + n₂ − 2`.
//! - **Welch**: `vᵢ = s²ᵢ / nᵢ`, `SE = √(v₁ + v₂)`,
//!   `df = (v₁ + v₂)² / (v₁²/(n₁−1) + v₂²/(n₂−1))`.
//!
//! `t = (x̄₁ − x̄₂) / SE`; the p-value is two-sided.
//!
//! # Reference
//! Welch (1947), "The generalization of 'Student's' problem when several
//! different population variances are involved", *Biometrika* 34.

use crate::config::VarianceAssumption;
use crate::procedures::{
    two_groups, DegreesOfFreedom, GroupArity, PointResult, Procedure, ProcedureError, RunContext,
    TestResult,
};
use crate::recommend::ProcedureId;
use crate::special::t_two_sided_p;
use crate::stats::WelfordAccumulator;
use crate::table::{CanonicalTable, GroupSample};

const ID: ProcedureId = ProcedureId::TwoSample;

/// Two-sample t-test comparing the first group against the second
/// (first-appearance order).
///
/// # Examples
/// ```
/// use u_abtest::procedures::{two_sample::TwoSampleTest, Procedure, RunContext, TestResult};
/// use u_abtest::table::CanonicalTable;
///
/// let t = CanonicalTable::from_groups(&[
///     ("A", &[1.0, 2.0, 3.0, 4.0, 5.0][..]),
///     ("B", &[6.0, 7.0, 8.0, 9.0, 10.0][..]),
/// ]).unwrap();
/// let TestResult::Point(r) = TwoSampleTest::default().run(&t, &mut RunContext::seeded(0)).unwrap()
/// else { unreachable!() };
/// assert!((r.statistic + 5.0).abs() < 1e-12);
/// assert!(r.p_value < 0.01 && r.significant);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoSampleTest {
    pub variance: VarianceAssumption,
}

impl TwoSampleTest {
    pub fn new(variance: VarianceAssumption) -> Self {
        Self { variance }
    }
}

struct Moments {
    n: f64,
    mean: f64,
    ss: f64,
}

impl Moments {
    fn of(group: &GroupSample<'_>) -> Result<Self, ProcedureError> {
        let acc = WelfordAccumulator::from_slice(&group.values);
        let mean = acc.mean().ok_or_else(|| ProcedureError::InsufficientObservations {
            procedure: ID,
            group: group.label.to_owned(),
            found: 0,
            required: 1,
        })?;
        Ok(Self {
            n: group.len() as f64,
            mean,
            ss: acc.sum_squared_deviations(),
        })
    }
}

/// `(SE, df)` under the chosen variance model.
fn standard_error(
    variance: VarianceAssumption,
    a: &GroupSample<'_>,
    b: &GroupSample<'_>,
    ma: &Moments,
    mb: &Moments,
) -> Result<(f64, f64), ProcedureError> {
    match variance {
        VarianceAssumption::Pooled => {
            let df = ma.n + mb.n - 2.0;
            if df < 1.0 {
                return Err(ProcedureError::InsufficientObservations {
                    procedure: ID,
                    group: a.label.to_owned(),
                    found: a.len(),
                    required: 2,
                });
            }
            let pooled = (ma.ss + mb.ss) / df;
            Ok(((pooled * (1.0 / ma.n + 1.0 / mb.n)).sqrt(), df))
        }
        VarianceAssumption::Welch => {
            for g in [a, b] {
                if g.len() < 2 {
                    return Err(ProcedureError::InsufficientObservations {
                        procedure: ID,
                        group: g.label.to_owned(),
                        found: g.len(),
                        required: 2,
                    });
                }
            }
            let va = ma.ss / (ma.n - 1.0) / ma.n;
            let vb = mb.ss / (mb.n - 1.0) / mb.n;
            let df = (va + vb).powi(2) / (va * va / (ma.n - 1.0) + vb * vb / (mb.n - 1.0));
            Ok(((va + vb).sqrt(), df))
        }
    }
}

impl Procedure for TwoSampleTest {
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
        let ma = Moments::of(&a)?;
        let mb = Moments::of(&b)?;

        let (se, df) = standard_error(self.variance, &a, &b, &ma, &mb)?;
        if se.is_nan() || se <= 0.0 || !df.is_finite() {
            return Err(ProcedureError::Degenerate {
                procedure: ID,
                reason: "both groups have zero variance".to_owned(),
            });
        }

        let statistic = (ma.mean - mb.mean) / se;
        let p_value = t_two_sided_p(statistic, df);
        if !statistic.is_finite() || !p_value.is_finite() {
            return Err(ProcedureError::Degenerate {
                procedure: ID,
                reason: format!("non-finite statistic (t = {statistic}, df = {df})"),
            });
        }

        let significant = p_value < ctx.significance_level();
        let conclusion = if significant {
            "The difference is statistically significant."
        } else {
            "The difference is not statistically significant."
        };
        tracing::debug!(
            target: "u_abtest.procedures",
            procedure = %ID,
            variance = ?self.variance,
            statistic,
            df,
            p_value,
            "two-sample test finished"
        );

        Ok(TestResult::Point(PointResult {
            procedure: ID,
            statistic,
            p_value,
            degrees_of_freedom: DegreesOfFreedom::Single(df),
            significant,
            conclusion: conclusion.to_owned(),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
