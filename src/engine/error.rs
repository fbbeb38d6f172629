use thiserror::Error;

use crate::store::StoreError;

/// Failures of engine operations. Expected outcomes such as clocking in twice are not errors,
/// see [ClockInOutcome](super::ClockInOutcome) and [ClockOutOutcome](super::ClockOutOutcome).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The store could not complete a read or write. Nothing was changed and the operation can
    /// be retried.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
