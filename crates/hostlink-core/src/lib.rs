//! # Hostlink Core Library
//!
//! Session and event synchronization for a desktop shell driven by a
//! privileged host process.
//!
//! ## Modules
//!
//! - `domain` - Host/shell events, session entities, install descriptors
//! - `event_bridge` - Typed pub/sub for events pushed by the host
//! - `event_bus` - Broadcast bus for notifications to the UI
//! - `collaborator` - Traits for the account service, config store, registries
//! - `application` - Session synchronizer, install staging, shell controller
//! - `ambient` - OS theme, language, resize and hotkey pass-through
//! - `config` - Shell configuration

pub mod ambient;
pub mod application;
pub mod collaborator;
pub mod config;
pub mod domain;
pub mod event_bridge;
pub mod event_bus;

pub use domain::*;

pub use ambient::{AmbientWatchers, ModelSettingsSync};
pub use application::{
    ConfigAction, InstallDecision, InstallStaging, RefreshOutcome, SessionStore,
    SessionSynchronizer, ShellController, ShellControllerBuilder,
};
pub use collaborator::{
    AccountService, CollabResult, ModelGroupRegistry, ModelSettingsSink, OverlaySurface,
    ProviderConfigStore, ToolRegistry,
};
pub use config::{ConfigError, ShellConfig};
pub use event_bridge::{host_event_channel, HostEventBridge, HostEventSender, Subscription};
pub use event_bus::{create_shared_event_bus, EventBus, EventReceiver, EventSender, SharedEventBus};
