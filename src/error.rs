//! Error types for the PARYS SDK
//!
//! Typed errors cover the failure categories callers must tell apart
//! (validation, configuration, chain reads, signing, submission, timeouts).
//! `eyre` is still re-exported for soft-dependency paths such as the block
//! explorer client.

use crate::feed::TransactionType;
use std::collections::BTreeMap;
use std::fmt;

pub use eyre::{eyre, Context, Report};

/// Result alias defaulting to [`ParysError`]
pub type Result<T, E = ParysError> = std::result::Result<T, E>;

/// The overarching error type of the SDK.
#[derive(Debug, thiserror::Error)]
pub enum ParysError {
    /// User input does not match the current account state.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),
    /// Integration defect: unsupported fee token, fee/plan mismatch, bad address table.
    #[error("configuration error: {0}")]
    Config(String),
    /// Reading chain state failed. Safe to retry the read.
    #[error("chain query failed: {0}")]
    ChainQuery(String),
    /// Signing failed, locally or on the hardware device.
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// The transaction was rejected by the node or reverted on-chain.
    #[error("transaction submission failed: {0}")]
    Submission(String),
    /// Waiting for confirmation exceeded its bound. The transaction may still be mined.
    #[error("timed out waiting for confirmation of {0}")]
    Timeout(String),
    /// Amount was negative, non-numeric or too precise for the token.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Live gas estimation could not be performed.
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),
    /// Plan execution was cancelled before the next item was attempted.
    #[error("execution cancelled")]
    Cancelled,
    /// A multi-step plan stopped part way.
    #[error(transparent)]
    Plan(Box<PlanFailure>),
    /// An internal error occurred.
    #[error(transparent)]
    Internal(#[from] eyre::Report),
}

impl From<PlanFailure> for ParysError {
    fn from(failure: PlanFailure) -> Self {
        Self::Plan(Box::new(failure))
    }
}

impl ParysError {
    /// Whether the caller may safely retry the whole action from scratch.
    ///
    /// Timeouts are never retryable: the outstanding transaction may still land.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChainQuery(_))
    }

    pub(crate) fn chain(context: &str, err: impl fmt::Display) -> Self {
        Self::ChainQuery(format!("{context}: {err}"))
    }
}

impl From<alloy::sol_types::Error> for ParysError {
    fn from(err: alloy::sol_types::Error) -> Self {
        Self::ChainQuery(format!("abi decoding failed: {err}"))
    }
}

/// Errors from the signer abstraction.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The device stayed locked for every attempt of the retry budget.
    #[error("Ledger action failed, please check connection")]
    DeviceUnavailable,
    /// The device answered with a definitive failure status (e.g. user rejection).
    #[error("Ledger responded with failure: {message} (0x{status:04x})")]
    DeviceStatus { status: u16, message: String },
    /// Transport-level failure other than the device being locked.
    #[error("Ledger transport issue: {0}")]
    Transport(String),
    /// The on-device application is missing, outdated or misconfigured.
    #[error("{0}")]
    UnsupportedApp(String),
    /// The transaction is missing fields required for signing.
    #[error("transaction is missing mandatory fields: {0}")]
    IncompleteTransaction(&'static str),
    /// The transaction's chain id or sender does not match the signer.
    #[error("{0}")]
    Mismatch(String),
    /// Local key material is unavailable or unusable.
    #[error("local key error: {0}")]
    Key(String),
}

impl From<alloy::signers::Error> for SigningError {
    fn from(err: alloy::signers::Error) -> Self {
        Self::Key(err.to_string())
    }
}

/// Field-level validation failures, keyed by input field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// Create an empty (valid) error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set with a single invalid field
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record an invalid field. A later message for the same field replaces the earlier one.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    /// Merge another error set into this one
    pub fn merge(&mut self, other: ValidationErrors) {
        self.fields.extend(other.fields);
    }

    pub fn is_valid(&self) -> bool {
        self.fields.is_empty()
    }

    /// Message for a given field, if it is invalid
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when valid, otherwise the error set itself
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A multi-step plan failed at a specific item.
///
/// Items before `index` were confirmed on-chain and stand; items after it were
/// never built or submitted.
#[derive(Debug, thiserror::Error)]
#[error("plan item {index} ({tx_type:?}) failed: {source}")]
pub struct PlanFailure {
    pub index: usize,
    pub tx_type: TransactionType,
    /// Number of items confirmed before the failure
    pub confirmed: usize,
    #[source]
    pub source: ParysError,
}

impl PlanFailure {
    /// Whether re-running planning and execution from scratch is safe.
    ///
    /// Only failures that happened before anything reached the network for the
    /// failing item qualify; a timeout or submission error never does.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self.source,
            ParysError::ChainQuery(_) | ParysError::Signing(_) | ParysError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_merge_and_display() {
        let mut errors = ValidationErrors::invalid("amount", "Amount Missing");
        assert!(!errors.is_valid());
        errors.merge(ValidationErrors::invalid("fee", "No fee set"));
        assert_eq!(errors.get("fee"), Some("No fee set"));
        assert_eq!(errors.to_string(), "amount: Amount Missing; fee: No fee set");
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_timeout_is_not_retryable() {
        let failure = PlanFailure {
            index: 1,
            tx_type: TransactionType::RelockParys,
            confirmed: 1,
            source: ParysError::Timeout("0xabc".into()),
        };
        assert!(!failure.is_retry_safe());
        assert!(!failure.source.is_retryable());
        assert!(ParysError::ChainQuery("rpc down".into()).is_retryable());
    }
}
