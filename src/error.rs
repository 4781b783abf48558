use thiserror::Error;

use crate::codegen::EmitError;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid options: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
