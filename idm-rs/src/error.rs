use idm_env::EnvError;

use crate::storage::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("invalid parameters: {0}")]
    Parameters(String),
    #[error(
        "overflow in binomial calculation at i = {infections} \
         (state {state}, action {action}, row {row}): pmf = {value}"
    )]
    NumericalOverflow {
        state: usize,
        action: usize,
        row: usize,
        infections: usize,
        value: f64,
    },
    #[error(
        "binomial window of row {row} (state {state}, action {action}) \
         retains no probability mass: sum = {mass}"
    )]
    DegenerateRow {
        state: usize,
        action: usize,
        row: usize,
        mass: f64,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
