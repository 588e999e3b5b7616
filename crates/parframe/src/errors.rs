//! Error handling and exit codes.

use parframe_comm::CommError;
use parframe_core::constants::exit_codes;
use parframe_core::ParError;
use parframe_ml::MlError;

/// Failures raised by the driver itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid result: {0}")]
    InvalidResult(String),
}

/// Exit code for an error returned by [`crate::app::run`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(app) = err.downcast_ref::<AppError>() {
        return match app {
            AppError::Config(_) => exit_codes::ERROR_CONFIG,
            AppError::InvalidResult(_) => exit_codes::ERROR_INVALID_RESULT,
        };
    }
    if let Some(ml) = err.downcast_ref::<MlError>() {
        return ml_code(ml);
    }
    if let Some(par) = err.downcast_ref::<ParError>() {
        return par_code(par);
    }
    if err.downcast_ref::<CommError>().is_some() {
        return exit_codes::ERROR_COMMUNICATION;
    }
    exit_codes::ERROR_GENERIC
}

fn ml_code(err: &MlError) -> i32 {
    match err {
        MlError::Engine(par) => par_code(par),
        MlError::Comm(_) => exit_codes::ERROR_COMMUNICATION,
        MlError::InvalidResult(_) => exit_codes::ERROR_INVALID_RESULT,
        MlError::NoClusters(_)
        | MlError::InitMismatch { .. }
        | MlError::NotEnoughRows { .. }
        | MlError::FeatureMismatch { .. }
        | MlError::Config(_) => exit_codes::ERROR_CONFIG,
    }
}

fn par_code(err: &ParError) -> i32 {
    match err {
        ParError::Executor(_) => exit_codes::ERROR_GENERIC,
        ParError::Config(_)
        | ParError::InvalidArgument(_)
        | ParError::InvalidPartitionedObject(_)
        | ParError::SizeMismatch { .. } => exit_codes::ERROR_CONFIG,
    }
}
