//! # u-abtest
//!
//! Statistical test engine for A/B experiments.
//!
//! A loosely typed [`RawTable`](table::RawTable) is validated into a
//! canonical `(group, value)` table, a set of applicable procedures is
//! recommended from the number of groups, and each procedure returns a
//! structured, serializable verdict.
//!
//! ## Modules
//!
//! - [`stats`]: Descriptive statistics with numerical stability guarantees
//! - [`special`]: Normal, t, F and studentized range distribution functions
//! - [`distributions`]: Normal distribution with sampling
//! - [`random`]: Seeded RNG and shuffling
//! - [`table`]: Raw and canonical table models
//! - [`classify`]: Group/metric column classification
//! - [`validate`]: Dataset validation
//! - [`recommend`]: Method recommendation
//! - [`procedures`]: The five hypothesis tests and their results
//! - [`engine`]: Procedure registry and dispatch
//! - [`config`]: Engine configuration
//! - [`advisor`]: Column-suggestion assistant interface
//! - [`session`]: Side-by-side comparison slots
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: Welford's algorithm for variance,
//!   Kahan summation for accumulation, tail probabilities computed
//!   directly rather than as `1 − CDF`
//! - **Reproducible randomness**: every randomized run has a logged seed
//! - **Property-based testing**: statistical invariants verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_abtest::engine::Engine;
//! use u_abtest::procedures::TestResult;
//! use u_abtest::recommend::ProcedureId;
//! use u_abtest::table::RawTable;
//!
//! let rows: Vec<Vec<String>> = (1..=10)
//!     .map(|i| vec![if i <= 5 { "A" } else { "B" }.to_string(), i.to_string()])
//!     .collect();
//! let raw = RawTable::from_text_rows(&["group", "value"], &rows).unwrap();
//!
//! let engine = Engine::default();
//! let result = engine.analyze(&raw, ProcedureId::TwoSample).unwrap();
//! assert!(matches!(result, TestResult::Point(ref r) if r.significant));
//! ```

pub mod advisor;
pub mod classify;
pub mod config;
pub mod distributions;
pub mod engine;
pub mod error;
pub mod procedures;
pub mod random;
pub mod recommend;
pub mod session;
pub mod special;
pub mod stats;
pub mod table;
pub mod validate;

pub use engine::Engine;
pub use error::{Error, Result};
pub use procedures::TestResult;
pub use recommend::ProcedureId;
