use ethers::types::H256;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the deployment flow.
///
/// The type is `Clone` because a single provisioning failure is handed to every
/// caller waiting on the same in-flight construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoinOpError {
    /// No owner credential in the session
    #[error("Not authenticated")]
    NotAuthenticated,
    /// Owner is authenticated but the embedded wallet exposes no account yet
    #[error("Signing wallet not available yet")]
    SignerUnavailable,
    /// Smart account construction failed, including the automatic retry
    #[error("Smart account construction failed: {0}")]
    AccountConstructionFailed(String),
    /// The owner wallet refused or failed to sign
    #[error("Owner signature failed: {0}")]
    SigningFailed(String),
    /// The paymaster or bundler refused the user operation
    #[error("Relay rejected the user operation ({code}): {message}")]
    SubmissionRejected { code: i64, message: String },
    /// No receipt within the confirmation window
    #[error("User operation {hash:?} not confirmed after {waited:?}")]
    ConfirmationTimeout { hash: H256, waited: Duration },
    /// The user operation was mined but reverted
    #[error("User operation {hash:?} reverted: {reason}")]
    ConfirmationFailed { hash: H256, reason: String },
    /// Transport or node error
    #[error("Network error: {0}")]
    Network(String),
    /// Bad or mismatched network configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Deployment request failed validation
    #[error("Invalid deployment request: {0}")]
    InvalidRequest(String),
}

impl CoinOpError {
    /// Whether waiting (without user action) may resolve the error
    pub fn is_transient(&self) -> bool {
        matches!(self, CoinOpError::SignerUnavailable)
    }

    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        CoinOpError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for CoinOpError {
    fn from(err: reqwest::Error) -> Self {
        CoinOpError::Network(err.to_string())
    }
}
