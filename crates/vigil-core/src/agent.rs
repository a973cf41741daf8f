//! Registered agents and wallet address validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{AgentId, AgentStatus, Timestamp};

/// Base58 alphabet used by the chain's account identifiers (no `0`, `O`, `I`, `l`).
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Minimum length of a valid wallet address.
const MIN_ADDRESS_LEN: usize = 32;

/// Maximum length of a valid wallet address.
const MAX_ADDRESS_LEN: usize = 44;

/// Errors from wallet address validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The address length is outside the 32-44 character range.
    #[error("invalid address length {0}: expected {MIN_ADDRESS_LEN}-{MAX_ADDRESS_LEN} characters")]
    InvalidLength(usize),

    /// The address contains a character outside the base58 alphabet.
    #[error("invalid base58 character '{0}'")]
    InvalidCharacter(char),
}

/// A validated chain account identifier.
///
/// Construction goes through [`FromStr`], which enforces the chain's base58
/// address format (32-44 characters from the base58 alphabet). Once built,
/// the address is known-good everywhere downstream.
///
/// # Example
///
/// ```
/// use vigil_core::WalletAddress;
///
/// let addr: WalletAddress = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".parse().unwrap();
/// assert!("not base58!".parse::<WalletAddress>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
            return Err(AddressError::InvalidLength(len));
        }
        if let Some(bad) = s.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(AddressError::InvalidCharacter(bad));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered autonomous agent.
///
/// Created on registration and mutated only through soft status changes and
/// activity refreshes. The raw credential is never stored; only its SHA-256
/// hex digest lives on the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier.
    pub id: AgentId,
    /// Display name chosen by the owner.
    pub name: String,
    /// Chain account this agent transacts from.
    pub wallet: WalletAddress,
    /// Soft lifecycle status.
    pub status: AgentStatus,
    /// SHA-256 hex digest of the bearer credential.
    pub credential_hash: String,
    /// Owner (human user) reference.
    pub owner_id: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// When the agent was registered.
    pub created_at: Timestamp,
    /// Last observed activity (request or matched on-chain event).
    pub last_seen: Timestamp,
}

impl Agent {
    /// Register a new agent.
    ///
    /// The agent starts `active` with `last_seen` equal to registration time.
    #[must_use]
    pub fn register(
        name: impl Into<String>,
        wallet: WalletAddress,
        owner_id: impl Into<String>,
        credential_hash: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: AgentId::new(),
            name: name.into(),
            wallet,
            status: AgentStatus::Active,
            credential_hash: credential_hash.into(),
            owner_id: owner_id.into(),
            description: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.id, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_ADDR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[test]
    fn test_valid_address() {
        let addr: WalletAddress = GOOD_ADDR.parse().unwrap();
        assert_eq!(addr.as_str(), GOOD_ADDR);
        assert_eq!(addr.to_string(), GOOD_ADDR);
    }

    #[test]
    fn test_address_length_bounds() {
        // 31 chars: too short
        let short = "1".repeat(31);
        assert_eq!(
            short.parse::<WalletAddress>(),
            Err(AddressError::InvalidLength(31))
        );
        // 32 chars: minimum accepted
        assert!("1".repeat(32).parse::<WalletAddress>().is_ok());
        // 44 chars: maximum accepted
        assert!("1".repeat(44).parse::<WalletAddress>().is_ok());
        // 45 chars: too long
        assert_eq!(
            "1".repeat(45).parse::<WalletAddress>(),
            Err(AddressError::InvalidLength(45))
        );
    }

    #[test]
    fn test_address_rejects_non_base58() {
        // '0', 'O', 'I', 'l' are not in the alphabet
        let bad = format!("{}0", "1".repeat(33));
        assert_eq!(
            bad.parse::<WalletAddress>(),
            Err(AddressError::InvalidCharacter('0'))
        );
        let bad = format!("{}l", "1".repeat(33));
        assert!(bad.parse::<WalletAddress>().is_err());
    }

    #[test]
    fn test_register_agent() {
        let wallet: WalletAddress = GOOD_ADDR.parse().unwrap();
        let agent = Agent::register("trader-1", wallet, "user-42", "deadbeef")
            .with_description("grid bot");
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.created_at, agent.last_seen);
        assert_eq!(agent.description.as_deref(), Some("grid bot"));
        assert_eq!(agent.credential_hash, "deadbeef");
    }

    #[test]
    fn test_agent_serde_roundtrip() {
        let wallet: WalletAddress = GOOD_ADDR.parse().unwrap();
        let agent = Agent::register("trader-1", wallet, "user-42", "deadbeef");
        let json = serde_json::to_string(&agent).unwrap();
        let back: Agent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, agent.id);
        assert_eq!(back.wallet, agent.wallet);
    }
}
