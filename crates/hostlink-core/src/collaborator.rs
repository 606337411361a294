//! Collaborator traits
//!
//! The controller only talks to the outside world through these traits.
//! Concrete implementations (host IPC, config files, webview overlays) live
//! in the embedding application; tests use in-memory mocks.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{AccountProfile, ModelGroup, OverlayTarget, UsageSnapshot};

/// Result type for collaborator calls
pub type CollabResult<T> = anyhow::Result<T>;

/// Remote account service (token, profile, usage)
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Current auth token, `None` when not logged in
    async fn get_token(&self) -> CollabResult<Option<String>>;

    async fn get_me(&self) -> CollabResult<AccountProfile>;

    async fn get_usage(&self) -> CollabResult<UsageSnapshot>;

    /// Invalidate the session on the account side
    async fn logout(&self) -> CollabResult<()>;
}

/// Config subsystem owning the account-provider entry.
///
/// Every call must be safe to repeat.
#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    /// First-time activation: add the account-provider entry
    async fn write_provider_config(&self) -> CollabResult<()>;

    /// Refresh credentials/metadata of the existing entry
    async fn reload_provider_config(&self) -> CollabResult<()>;

    async fn remove_provider_config(&self) -> CollabResult<()>;

    /// Pull the latest config from the host
    async fn refresh_host_config(&self) -> CollabResult<()>;
}

/// Model provider groups currently configured
#[async_trait]
pub trait ModelGroupRegistry: Send + Sync {
    async fn groups(&self) -> CollabResult<Vec<ModelGroup>>;
}

#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn load_tools(&self) -> CollabResult<()>;

    async fn load_mcp_config(&self) -> CollabResult<()>;

    /// Tools backed by the logged-in account
    async fn load_account_tools(&self) -> CollabResult<()>;
}

/// Navigation surface. Fire-and-forget.
pub trait OverlaySurface: Send + Sync {
    fn open_overlay(&self, target: &OverlayTarget);
}

/// Receives model settings whenever they change
#[async_trait]
pub trait ModelSettingsSink: Send + Sync {
    async fn set_model_settings(&self, settings: &Value) -> CollabResult<()>;
}
