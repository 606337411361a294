//! Application layer - orchestration between host events and collaborators
//!
//! ```text
//! Host adapter (IPC, deep links)
//!         │  HostEvent
//!         ▼
//! ┌────────────────────────────────────────────┐
//! │              ShellController               │
//! │   ├─ SessionSynchronizer ─▶ SessionStore   │
//! │   └─ InstallStaging                        │
//! │                   │ ShellEvent             │
//! │                   ▼                        │
//! │              ┌──────────┐                  │
//! │              │Event Bus │                  │
//! │              └──────────┘                  │
//! └────────────────────────────────────────────┘
//!         │
//!         ▼
//! Collaborators (account service, config store, tool registry, overlay)
//! ```

mod install_staging;
mod session_store;
mod session_sync;
mod shell_controller;

pub use install_staging::{InstallDecision, InstallStaging, PendingSlot};
pub use session_store::{
    begin, reduce, RefreshTicket, SessionAction, SessionState, SessionStore, Staleness, Transition,
};
pub use session_sync::{
    ConfigAction, RefreshOutcome, SessionSynchronizer, DEFAULT_ACCOUNT_PROVIDER,
};
pub use shell_controller::{ShellController, ShellControllerBuilder};
