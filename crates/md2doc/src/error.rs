//! CLI error types.

use md2doc_config::ConfigError;
use md2doc_gateway::DispatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}
