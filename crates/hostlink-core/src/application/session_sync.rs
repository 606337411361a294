//! Account Session Synchronizer
//!
//! Keeps the in-memory account session and the account-provider config entry
//! in line with the remote account service.
//!
//! ```text
//!   LoggedOut ──token+profile──▶ Syncing ──reconciled──▶ LoggedIn
//!       ▲                           │                       │
//!       └──────── logout / no token / fetch failure ────────┘
//! ```
//!
//! Passes may overlap (startup, `login` and `refresh` all start one). Each
//! pass holds a ticket from the [`SessionStore`]; a logout or a newer pass
//! invalidates it, and an invalidated pass can no longer commit. A logout
//! always wins over an in-flight pass.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::session_store::{RefreshTicket, SessionAction, SessionStore, Staleness, Transition};
use crate::collaborator::{AccountService, ModelGroupRegistry, ProviderConfigStore, ToolRegistry};
use crate::domain::{query_group, GroupFilter, SessionSnapshot};

/// Config operation chosen by a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Write,
    Reload,
    Remove,
}

impl ConfigAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Reload => "reload",
            Self::Remove => "remove",
        }
    }
}

/// How a refresh pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// User committed and config reconciled with the given action
    LoggedIn(ConfigAction),
    NoToken,
    /// Token or profile fetch failed
    Failed,
    SupersededByLogout,
    SupersededByRefresh,
}

impl RefreshOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }
}

/// Default provider name of the account-backed model provider
pub const DEFAULT_ACCOUNT_PROVIDER: &str = "oap";

pub struct SessionSynchronizer {
    store: Arc<SessionStore>,
    account: Arc<dyn AccountService>,
    config: Arc<dyn ProviderConfigStore>,
    groups: Arc<dyn ModelGroupRegistry>,
    tools: Arc<dyn ToolRegistry>,
    provider: String,
}

impl SessionSynchronizer {
    pub fn new(
        store: Arc<SessionStore>,
        account: Arc<dyn AccountService>,
        config: Arc<dyn ProviderConfigStore>,
        groups: Arc<dyn ModelGroupRegistry>,
        tools: Arc<dyn ToolRegistry>,
    ) -> Self {
        Self {
            store,
            account,
            config,
            groups,
            tools,
            provider: DEFAULT_ACCOUNT_PROVIDER.to_string(),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Run one refresh pass. Never fails; every error ends in a log line.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        let ticket = self.store.begin_refresh();
        debug!(
            generation = ticket.generation(),
            "[SessionSync] Refresh pass started"
        );

        let token = match self.account.get_token().await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "[SessionSync] Token fetch failed");
                return self.end_logged_out(ticket, RefreshOutcome::Failed).await;
            }
        };

        if token.is_none() {
            debug!("[SessionSync] No auth token, staying logged out");
            return self.end_logged_out(ticket, RefreshOutcome::NoToken).await;
        }

        let user = match self.account.get_me().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "[SessionSync] Profile fetch failed");
                return self.end_logged_out(ticket, RefreshOutcome::Failed).await;
            }
        };

        let user_id = user.id.clone();
        if let Transition::Rejected(stale) =
            self.store.dispatch(SessionAction::CommitUser { ticket, user })
        {
            return self.superseded(stale, false).await;
        }
        info!(user_id = %user_id, "[SessionSync] Account user resolved");

        match self.account.get_usage().await {
            Ok(usage) => {
                if let Transition::Rejected(stale) =
                    self.store.dispatch(SessionAction::CommitUsage { ticket, usage })
                {
                    return self.superseded(stale, false).await;
                }
            }
            Err(e) => warn!(error = %e, "[SessionSync] Usage fetch failed"),
        }

        let action = self.reconcile_action().await;

        if let Some(outcome) = self.check(&ticket, false).await {
            return outcome;
        }

        let applied = match action {
            ConfigAction::Write => self.config.write_provider_config().await,
            ConfigAction::Reload => self.config.reload_provider_config().await,
            ConfigAction::Remove => self.config.remove_provider_config().await,
        };
        match applied {
            Ok(()) => debug!(
                provider = %self.provider,
                action = action.as_str(),
                "[SessionSync] Provider config reconciled"
            ),
            Err(e) => error!(
                provider = %self.provider,
                action = action.as_str(),
                error = %e,
                "[SessionSync] Provider config reconciliation failed"
            ),
        }

        if let Some(outcome) = self.check(&ticket, true).await {
            return outcome;
        }

        if let Transition::Rejected(stale) =
            self.store.dispatch(SessionAction::CompleteSync { ticket })
        {
            return self.superseded(stale, true).await;
        }

        if let Err(e) = self.tools.load_account_tools().await {
            error!(error = %e, "[SessionSync] Failed to load account tools");
        }

        info!(
            user_id = %user_id,
            action = action.as_str(),
            "[SessionSync] Session synced"
        );
        RefreshOutcome::LoggedIn(action)
    }

    /// Clear the session locally. No network; config removal is separate.
    pub fn clear_session(&self) -> Transition {
        let transition = self.store.dispatch(SessionAction::Logout);
        info!(
            changed = transition == Transition::Changed,
            "[SessionSync] Logged out"
        );
        transition
    }

    /// Remove the account-provider entry, logging failures.
    pub async fn remove_account_config(&self) {
        if let Err(e) = self.config.remove_provider_config().await {
            error!(
                provider = %self.provider,
                error = %e,
                "[SessionSync] Failed to remove provider config"
            );
        }
    }

    /// Full logout handling: clear synchronously, then drop the config entry.
    pub async fn logout(&self) {
        self.clear_session();
        self.remove_account_config().await;
    }

    /// Write when no account-provider group exists yet, reload otherwise.
    ///
    /// An unreadable registry falls back to reload, which never duplicates
    /// the entry.
    pub async fn reconcile_action(&self) -> ConfigAction {
        match self.groups.groups().await {
            Ok(groups) => {
                if query_group(&GroupFilter::provider(&self.provider), &groups).is_empty() {
                    ConfigAction::Write
                } else {
                    ConfigAction::Reload
                }
            }
            Err(e) => {
                error!(error = %e, "[SessionSync] Failed to read model groups");
                ConfigAction::Reload
            }
        }
    }

    async fn end_logged_out(&self, ticket: RefreshTicket, outcome: RefreshOutcome) -> RefreshOutcome {
        if let Transition::Rejected(stale) = self.store.dispatch(SessionAction::Reset { ticket }) {
            return self.superseded(stale, false).await;
        }
        self.remove_account_config().await;
        outcome
    }

    async fn check(&self, ticket: &RefreshTicket, config_touched: bool) -> Option<RefreshOutcome> {
        match self.store.staleness(ticket) {
            Staleness::Current => None,
            stale => Some(self.superseded(stale, config_touched).await),
        }
    }

    async fn superseded(&self, stale: Staleness, config_touched: bool) -> RefreshOutcome {
        match stale {
            Staleness::SupersededByLogout => {
                warn!("[SessionSync] No user after refresh, forcing logout");
                if config_touched {
                    // the pass wrote after the logout removed the entry
                    self.remove_account_config().await;
                }
                if let Err(e) = self.account.logout().await {
                    warn!(error = %e, "[SessionSync] Remote logout failed");
                }
                RefreshOutcome::SupersededByLogout
            }
            _ => {
                debug!("[SessionSync] Pass superseded by a newer refresh");
                RefreshOutcome::SupersededByRefresh
            }
        }
    }
}
