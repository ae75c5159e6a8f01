//! CLI error types.

use docweld_config::ConfigError;
use docweld_merge::MergeError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Merge(#[from] MergeError),
}
