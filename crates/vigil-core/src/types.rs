//! Identifiers, timestamps, and shared enums.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Create a new random agent ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agt:{}", self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "agt:").map(Self)
    }
}

/// Unique identifier for an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub Uuid);

impl ApprovalId {
    /// Create a new random approval ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "apr:{}", self.0)
    }
}

impl std::str::FromStr for ApprovalId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "apr:").map(Self)
    }
}

/// Error parsing a prefixed identifier string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier: {0}")]
pub struct IdParseError(String);

/// Accepts both the prefixed display form (`agt:<uuid>`) and a bare UUID.
fn parse_prefixed(s: &str, prefix: &str) -> Result<Uuid, IdParseError> {
    let bare = s.strip_prefix(prefix).unwrap_or(s);
    Uuid::parse_str(bare).map_err(|_| IdParseError(s.to_string()))
}

/// A UTC timestamp.
///
/// Thin wrapper over [`chrono::DateTime<Utc>`] so domain code never reaches
/// for raw chrono types. Ordering and serde follow the inner datetime
/// (RFC 3339 on the wire).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing datetime.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Build from a Unix timestamp in seconds.
    ///
    /// Returns `None` if the value is out of chrono's representable range.
    #[must_use]
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self)
    }

    /// The inner datetime.
    #[must_use]
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Whether this timestamp lies in the future.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now()
    }

    /// Whether this timestamp lies in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Midnight UTC of the day this timestamp falls on.
    ///
    /// This is the start of the rolling daily accounting window used by the
    /// spending ledger reader.
    #[must_use]
    pub fn start_of_utc_day(&self) -> Self {
        let midnight = self.0.date_naive().and_time(NaiveTime::MIN);
        Self(DateTime::from_naive_utc_and_offset(midnight, Utc))
    }

    /// This timestamp shifted forward by whole minutes.
    #[must_use]
    pub fn plus_minutes(&self, minutes: u32) -> Self {
        Self(self.0 + Duration::minutes(i64::from(minutes)))
    }

    /// This timestamp shifted backward by whole minutes.
    #[must_use]
    pub fn minus_minutes(&self, minutes: u32) -> Self {
        Self(self.0 - Duration::minutes(i64::from(minutes)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Lifecycle status of a registered agent.
///
/// Agents are never hard-deleted; they move between these soft states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered and allowed to propose transactions.
    Active,
    /// Temporarily suspended by its owner.
    Paused,
    /// Not seen recently; kept for audit.
    Offline,
}

impl AgentStatus {
    /// Whether the agent may currently propose transactions.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Semantic kind of an observed on-chain transaction.
///
/// Indexers report free-form raw type strings; [`TxKind::from_raw`] folds
/// them onto this fixed set. Unrecognized raw types map to
/// [`TxKind::ProgramInteraction`]; an explicit `unknown` maps to
/// [`TxKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// Native or token transfer between accounts.
    Transfer,
    /// Token swap through a DEX program.
    Swap,
    /// Stake delegation or withdrawal.
    Stake,
    /// Any other interaction with a known program.
    ProgramInteraction,
    /// The indexer could not classify the transaction.
    Unknown,
}

impl TxKind {
    /// Map a raw indexer type string onto a semantic kind.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Self::Unknown,
            "TRANSFER" | "TOKEN_TRANSFER" => Self::Transfer,
            "SWAP" => Self::Swap,
            "STAKE" | "STAKE_SOL" | "UNSTAKE" | "UNSTAKE_SOL" => Self::Stake,
            _ => Self::ProgramInteraction,
        }
    }

    /// Wire name of this kind (matches the serde encoding).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Swap => "swap",
            Self::Stake => "stake",
            Self::ProgramInteraction => "program_interaction",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
