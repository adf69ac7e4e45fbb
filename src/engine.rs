//! Procedure registry and dispatch.
//!
//! An [`Engine`] maps each [`ProcedureId`] to a boxed [`Procedure`] built
//! from an [`EngineConfig`]. Dispatch is a map lookup followed by a group
//! count check; callers may [`Engine::register`] their own implementations
//! to replace a built-in one.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ConfigError, EngineConfig};
use crate::procedures::anova::OneWayAnova;
use crate::procedures::permutation::PermutationTest;
use crate::procedures::posterior::PosteriorComparison;
use crate::procedures::tukey::TukeyHsd;
use crate::procedures::two_sample::TwoSampleTest;
use crate::procedures::{ensure_arity, Procedure, ProcedureError, RunContext, TestResult};
use crate::random::entropy_seed;
use crate::recommend::{recommend, ProcedureId, RecommendationSet};
use crate::table::{CanonicalTable, RawTable};
use crate::validate::{validate, validate_with, ColumnSelection};

/// Registry of test procedures sharing one configuration.
///
/// # Examples
/// ```
/// use u_abtest::config::EngineConfig;
/// use u_abtest::engine::Engine;
/// use u_abtest::recommend::ProcedureId;
/// use u_abtest::table::CanonicalTable;
///
/// let engine = Engine::new(EngineConfig::default().with_seed(1)).unwrap();
/// let table = CanonicalTable::from_groups(&[
///     ("A", &[1.0, 2.0, 3.0, 4.0, 5.0][..]),
///     ("B", &[6.0, 7.0, 8.0, 9.0, 10.0][..]),
/// ]).unwrap();
/// for id in engine.recommend(&table) {
///     let result = engine.run(id, &table).unwrap();
///     assert_eq!(result.procedure(), id);
/// }
/// ```
pub struct Engine {
    config: EngineConfig,
    procedures: BTreeMap<ProcedureId, Box<dyn Procedure>>,
}

impl Engine {
    /// Builds an engine with every built-in procedure registered.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_builtins(config))
    }

    fn with_builtins(config: EngineConfig) -> Self {
        let mut engine = Self {
            config,
            procedures: BTreeMap::new(),
        };
        engine.register(Box::new(TwoSampleTest::new(engine.config.variance)));
        engine.register(Box::new(OneWayAnova));
        engine.register(Box::new(TukeyHsd));
        engine.register(Box::new(PermutationTest::new(
            engine.config.permutation_iterations,
        )));
        engine.register(Box::new(PosteriorComparison::new(
            engine.config.posterior_samples,
        )));
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers `procedure` under its own id, returning the one it
    /// replaces.
    pub fn register(&mut self, procedure: Box<dyn Procedure>) -> Option<Box<dyn Procedure>> {
        self.procedures.insert(procedure.id(), procedure)
    }

    pub fn unregister(&mut self, id: ProcedureId) -> Option<Box<dyn Procedure>> {
        self.procedures.remove(&id)
    }

    pub fn procedure(&self, id: ProcedureId) -> Option<&dyn Procedure> {
        self.procedures.get(&id).map(|p| p.as_ref())
    }

    /// Registered ids in [`ProcedureId`] order.
    pub fn registered(&self) -> impl Iterator<Item = ProcedureId> + '_ {
        self.procedures.keys().copied()
    }

    pub fn recommend(&self, table: &CanonicalTable) -> RecommendationSet {
        recommend(table)
    }

    /// A fresh run context: the configured seed if any, otherwise entropy.
    pub fn context(&self) -> RunContext {
        self.seeded_context(self.config.seed.unwrap_or_else(entropy_seed))
    }

    fn seeded_context(&self, seed: u64) -> RunContext {
        RunContext::seeded(seed).with_significance_level(self.config.significance_level)
    }

    /// Runs procedure `id` on `table`.
    ///
    /// # Errors
    /// [`ProcedureError::Unregistered`] for an unknown id,
    /// [`ProcedureError::WrongGroupCount`] when the table does not fit the
    /// procedure, and any error the procedure itself reports.
    pub fn run(
        &self,
        id: ProcedureId,
        table: &CanonicalTable,
    ) -> Result<TestResult, ProcedureError> {
        self.run_with(id, table, &mut self.context())
    }

    /// Runs procedure `id` with an explicit RNG seed.
    pub fn run_seeded(
        &self,
        id: ProcedureId,
        table: &CanonicalTable,
        seed: u64,
    ) -> Result<TestResult, ProcedureError> {
        self.run_with(id, table, &mut self.seeded_context(seed))
    }

    /// Runs procedure `id` with a caller-built context.
    pub fn run_with(
        &self,
        id: ProcedureId,
        table: &CanonicalTable,
        ctx: &mut RunContext,
    ) -> Result<TestResult, ProcedureError> {
        let procedure = self
            .procedures
            .get(&id)
            .ok_or(ProcedureError::Unregistered(id))?;
        ensure_arity(id, procedure.arity(), table)?;

        tracing::debug!(
            target: "u_abtest.engine",
            procedure = %id,
            groups = table.group_count(),
            rows = table.len(),
            seed = ctx.seed(),
            alpha = ctx.significance_level(),
            "dispatching procedure"
        );
        let result = procedure.run(table, ctx);
        if let Err(err) = &result {
            tracing::debug!(target: "u_abtest.engine", procedure = %id, %err, "procedure failed");
        }
        result
    }

    /// Validates `raw` with the default column choice, then runs `id`.
    pub fn analyze(&self, raw: &RawTable, id: ProcedureId) -> crate::Result<TestResult> {
        let table = validate(raw)?;
        Ok(self.run(id, &table)?)
    }

    /// Validates `raw` with explicit columns, then runs `id`.
    pub fn analyze_with(
        &self,
        raw: &RawTable,
        selection: &ColumnSelection,
        id: ProcedureId,
    ) -> crate::Result<TestResult> {
        let table = validate_with(raw, selection)?;
        Ok(self.run(id, &table)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_builtins(EngineConfig::default())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("procedures", &self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedures::GroupArity;

    fn two_groups() -> CanonicalTable {
        CanonicalTable::from_groups(&[
            ("A", &[1.0, 2.0, 3.0, 4.0, 5.0][..]),
            ("B", &[6.0, 7.0, 8.0, 9.0, 10.0][..]),
        ])
        .unwrap()
    }

    #[test]
    fn test_all_builtins_registered() {
        let engine = Engine::default();
        assert_eq!(engine.registered().collect::<Vec<_>>(), ProcedureId::ALL.to_vec());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            significance_level: 2.0,
            ..EngineConfig::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_arity_checked_before_dispatch() {
        let engine = Engine::default();
        let err = engine
            .run(ProcedureId::MultiGroupVariance, &two_groups())
            .unwrap_err();
        assert!(matches!(err, ProcedureError::WrongGroupCount { found: 2, .. }));
    }

    #[test]
    fn test_unregistered() {
        let mut engine = Engine::default();
        assert!(engine.unregister(ProcedureId::Probabilistic).is_some());
        assert_eq!(
            engine.run(ProcedureId::Probabilistic, &two_groups()),
            Err(ProcedureError::Unregistered(ProcedureId::Probabilistic))
        );
    }

    #[test]
    fn test_run_seeded_reproducible() {
        let engine = Engine::new(EngineConfig {
            permutation_iterations: 500,
            ..EngineConfig::default()
        })
        .unwrap();
        let t = two_groups();
        let a = engine.run_seeded(ProcedureId::Resampling, &t, 3).unwrap();
        let b = engine.run_seeded(ProcedureId::Resampling, &t, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_configured_seed_used() {
        let engine = Engine::new(EngineConfig {
            posterior_samples: 200,
            seed: Some(17),
            ..EngineConfig::default()
        })
        .unwrap();
        let t = two_groups();
        assert_eq!(engine.context().seed(), 17);
        assert_eq!(
            engine.run(ProcedureId::Probabilistic, &t).unwrap(),
            engine.run_seeded(ProcedureId::Probabilistic, &t, 17).unwrap()
        );
    }

    #[test]
    fn test_config_flows_into_procedures() {
        let engine = Engine::new(EngineConfig {
            permutation_iterations: 123,
            significance_level: 0.001,
            ..EngineConfig::default()
        })
        .unwrap();
        match engine.run_seeded(ProcedureId::Resampling, &two_groups(), 0).unwrap() {
            TestResult::Resampling(r) => {
                assert_eq!(r.iterations, 123);
                assert!(r.conclusion.contains("0.001"));
            }
            other => panic!("{other:?}"),
        }
    }

    struct Constant;

    impl Procedure for Constant {
        fn id(&self) -> ProcedureId {
            ProcedureId::TwoSample
        }

        fn arity(&self) -> GroupArity {
            GroupArity::AtLeast(2)
        }

        fn run(
            &self,
            _table: &CanonicalTable,
            _ctx: &mut RunContext,
        ) -> Result<TestResult, ProcedureError> {
            Ok(TestResult::Rejected {
                procedure: ProcedureId::TwoSample,
                reason: "stub".into(),
            })
        }
    }

    #[test]
    fn test_register_replaces() {
        let mut engine = Engine::default();
        let previous = engine.register(Box::new(Constant));
        assert!(previous.is_some());
        let result = engine.run(ProcedureId::TwoSample, &two_groups()).unwrap();
        assert_eq!(result.conclusion(), Some("stub"));
        assert_eq!(
            engine.procedure(ProcedureId::TwoSample).map(|p| p.arity()),
            Some(GroupArity::AtLeast(2))
        );
    }

    #[test]
    fn test_analyze_raw_table() {
        let rows: Vec<Vec<String>> = (1..=10)
            .map(|i| vec![if i <= 5 { "A" } else { "B" }.to_string(), i.to_string()])
            .collect();
        let raw = RawTable::from_text_rows(&["Group", "Value"], &rows).unwrap();
        let engine = Engine::default();
        let result = engine.analyze(&raw, ProcedureId::TwoSample).unwrap();
        assert!(result.p_value().unwrap() < 0.05);

        let err = engine
            .analyze_with(&raw, &ColumnSelection::new("group", "missing"), ProcedureId::TwoSample)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }
}
