//! Account session entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Account profile as returned by the account service.
///
/// Only `id` is interpreted here; every other field is kept verbatim so the
/// presentation layer sees the full profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccountProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Usage/quota snapshot for the logged-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub data: Value,
    pub fetched_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            fetched_at: Utc::now(),
        }
    }
}

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    LoggedOut,
    /// Profile committed, provider config reconciliation still running
    Syncing,
    LoggedIn,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::Syncing => "syncing",
            Self::LoggedIn => "logged_in",
        }
    }

    pub fn is_logged_out(&self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

/// Point-in-time copy of the session, published to the UI on every change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<AccountProfile>,
    pub usage: Option<UsageSnapshot>,
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}
