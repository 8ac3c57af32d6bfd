//! State-machine types shared between trackers and executors
//!
//! Statuses are persisted as uppercase strings so operators can query the
//! database directly; the enums here are the only place the strings live.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two asset families the relayer handles. Token and NFT records share
/// tables and code paths, discriminated by this kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Token,
    Nft,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Token => "token",
            AssetKind::Nft => "nft",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an asset lands on a particular chain.
///
/// The ordinal matters: the deployment executor processes records ascending
/// by kind so a proxy (the cross-chain hub wrapping an existing token) is
/// deployed before the native copies that link back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeployKind {
    Proxy,
    Native,
    Generic,
}

impl DeployKind {
    pub fn ordinal(&self) -> i32 {
        match self {
            DeployKind::Proxy => 0,
            DeployKind::Native => 1,
            DeployKind::Generic => 2,
        }
    }

    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(DeployKind::Proxy),
            1 => Some(DeployKind::Native),
            2 => Some(DeployKind::Generic),
            _ => None,
        }
    }
}

/// Per-chain deployment state machine.
///
/// `QUERIED → PENDING → IN_PROGRESS → DEPLOYED` on success, `→ FAILED` on
/// error. FAILED records are requeued to PENDING at the start of every
/// executor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployStatus {
    Queried,
    Pending,
    InProgress,
    Deployed,
    Failed,
}

impl DeployStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Queried => "QUERIED",
            DeployStatus::Pending => "PENDING",
            DeployStatus::InProgress => "IN_PROGRESS",
            DeployStatus::Deployed => "DEPLOYED",
            DeployStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUERIED" => Some(DeployStatus::Queried),
            "PENDING" => Some(DeployStatus::Pending),
            "IN_PROGRESS" => Some(DeployStatus::InProgress),
            "DEPLOYED" => Some(DeployStatus::Deployed),
            "FAILED" => Some(DeployStatus::Failed),
            _ => None,
        }
    }

    /// DEPLOYED is the only terminal success state; executors must never
    /// touch a record that reached it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeployStatus::Deployed)
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the best-effort post-deploy registration phase.
///
/// Kept separate from `DeployStatus` so a partially-registered asset still
/// reads as DEPLOYED: the address exists and is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Pending,
    Registered,
    Failed,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Failed => "failed",
        }
    }
}

/// Bridge-transfer state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeStatus {
    Queried,
    BridgeInitiated,
    BlockConfirmation,
    InQueue,
    BridgeCompleted,
    BridgeError,
}

impl BridgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeStatus::Queried => "QUERIED",
            BridgeStatus::BridgeInitiated => "BRIDGE_INITIATED",
            BridgeStatus::BlockConfirmation => "BLOCK_CONFIRMATION",
            BridgeStatus::InQueue => "IN_QUEUE",
            BridgeStatus::BridgeCompleted => "BRIDGE_COMPLETED",
            BridgeStatus::BridgeError => "BRIDGE_ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUERIED" => Some(BridgeStatus::Queried),
            "BRIDGE_INITIATED" => Some(BridgeStatus::BridgeInitiated),
            "BLOCK_CONFIRMATION" => Some(BridgeStatus::BlockConfirmation),
            "IN_QUEUE" => Some(BridgeStatus::InQueue),
            "BRIDGE_COMPLETED" => Some(BridgeStatus::BridgeCompleted),
            "BRIDGE_ERROR" => Some(BridgeStatus::BridgeError),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeStatus::BridgeCompleted)
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a tracker does when the fee paid on-chain differs from the quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMismatchPolicy {
    /// Leave the record untouched; the deployment will not proceed until
    /// the user pays the quoted fee.
    Skip,
    /// Log the mismatch and commit the transition anyway.
    Proceed,
}

impl FeeMismatchPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Some(FeeMismatchPolicy::Skip),
            "proceed" => Some(FeeMismatchPolicy::Proceed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_status_round_trip() {
        for status in [
            DeployStatus::Queried,
            DeployStatus::Pending,
            DeployStatus::InProgress,
            DeployStatus::Deployed,
            DeployStatus::Failed,
        ] {
            assert_eq!(DeployStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeployStatus::parse("BOGUS"), None);
    }

    #[test]
    fn test_bridge_status_round_trip() {
        for status in [
            BridgeStatus::Queried,
            BridgeStatus::BridgeInitiated,
            BridgeStatus::BlockConfirmation,
            BridgeStatus::InQueue,
            BridgeStatus::BridgeCompleted,
            BridgeStatus::BridgeError,
        ] {
            assert_eq!(BridgeStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_deploy_kind_ordering() {
        // Proxy must sort before native and generic so the hub deploys first
        let mut kinds = vec![DeployKind::Generic, DeployKind::Native, DeployKind::Proxy];
        kinds.sort_by_key(|k| k.ordinal());
        assert_eq!(
            kinds,
            vec![DeployKind::Proxy, DeployKind::Native, DeployKind::Generic]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(DeployStatus::Deployed.is_terminal());
        assert!(!DeployStatus::Failed.is_terminal());
        assert!(BridgeStatus::BridgeCompleted.is_terminal());
        assert!(!BridgeStatus::BridgeError.is_terminal());
    }

    #[test]
    fn test_fee_mismatch_policy_parse() {
        assert_eq!(
            FeeMismatchPolicy::parse("Skip"),
            Some(FeeMismatchPolicy::Skip)
        );
        assert_eq!(
            FeeMismatchPolicy::parse("proceed"),
            Some(FeeMismatchPolicy::Proceed)
        );
        assert_eq!(FeeMismatchPolicy::parse("queue"), None);
    }
}
