//! Crate-level error type.

use crate::advisor::AdvisorError;
use crate::config::ConfigError;
use crate::distributions::DistributionError;
use crate::procedures::ProcedureError;
use crate::table::TableShapeError;
use crate::validate::ValidationError;

/// Any failure surfaced by the public API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Table(#[from] TableShapeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Procedure(#[from] ProcedureError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

pub type Result<T> = std::result::Result<T, Error>;
