//! Error classification for failed passes and submissions
//!
//! Classification feeds log fields and the `errors_total` metric label only.
//! Retry behavior is governed by the unconditional error-state requeue at the
//! start of every executor pass, not by the class.

/// Coarse class of a failure, derived from the error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// RPC timeout, rate limit, connectivity — expected to clear on its own
    Transient,
    /// Transaction underpriced relative to the current gas market
    Underpriced,
    /// Nonce conflict with an in-flight or already-mined transaction
    Nonce,
    /// The chain executed and rejected the transaction
    Revert,
    /// Expected on-chain data was missing (event absent, receipt not found,
    /// record not found for a salt/trackId)
    DataInconsistency,
    /// The guardian network never produced the attestation within budget
    AttestationExhausted,
    Unknown,
}

impl ErrorClass {
    /// Metric label for this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Underpriced => "underpriced",
            ErrorClass::Nonce => "nonce",
            ErrorClass::Revert => "revert",
            ErrorClass::DataInconsistency => "data_inconsistency",
            ErrorClass::AttestationExhausted => "attestation_exhausted",
            ErrorClass::Unknown => "unknown",
        }
    }
}

/// Classify an error string.
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("attestation attempts exhausted") {
        return ErrorClass::AttestationExhausted;
    }

    if error_lower.contains("timeout")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
    {
        return ErrorClass::Transient;
    }

    if error_lower.contains("underpriced")
        || error_lower.contains("replacement transaction")
        || error_lower.contains("gas price too low")
        || error_lower.contains("max fee per gas less than")
    {
        return ErrorClass::Underpriced;
    }

    if error_lower.contains("nonce too low")
        || error_lower.contains("nonce too high")
        || error_lower.contains("already known")
    {
        return ErrorClass::Nonce;
    }

    if error_lower.contains("reverted")
        || error_lower.contains("execution reverted")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("out of gas")
    {
        return ErrorClass::Revert;
    }

    if error_lower.contains("event not found")
        || error_lower.contains("no receipt")
        || error_lower.contains("not found for salt")
        || error_lower.contains("missing block number")
    {
        return ErrorClass::DataInconsistency;
    }

    ErrorClass::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(classify_error("connection timeout"), ErrorClass::Transient);
        assert_eq!(
            classify_error("replacement transaction underpriced"),
            ErrorClass::Underpriced
        );
        assert_eq!(classify_error("nonce too low"), ErrorClass::Nonce);
        assert_eq!(classify_error("execution reverted"), ErrorClass::Revert);
        assert_eq!(
            classify_error("TokenDeployed event not found in receipt"),
            ErrorClass::DataInconsistency
        );
        assert_eq!(
            classify_error("attestation attempts exhausted after 20 tries"),
            ErrorClass::AttestationExhausted
        );
        assert_eq!(classify_error("some unknown error"), ErrorClass::Unknown);
    }
}
