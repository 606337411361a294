//! Shared test utilities and fixtures for Hostlink integration tests.

use std::sync::Arc;

use hostlink_core::{
    create_shared_event_bus, EventReceiver, SessionStore, SessionSynchronizer, ShellConfig,
    ShellController,
};

pub use mocks::MockCollaborators;

/// Install tracing output for a test run.
///
/// Honours `RUST_LOG`, defaults to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Shell event testing utilities
pub mod events {
    use std::time::Duration;

    use hostlink_core::{EventReceiver, ShellEvent};

    /// Wait for the first event matching `predicate`
    pub async fn wait_for_event<F>(
        rx: &mut EventReceiver,
        timeout: Duration,
        predicate: F,
    ) -> Option<ShellEvent>
    where
        F: Fn(&ShellEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(event)) if predicate(&event) => return Some(event),
                Ok(Some(_)) => continue,
                Ok(None) => return None, // bus closed
                Err(_) => return None,   // timeout
            }
        }
    }

    /// Type names of everything currently queued
    pub fn drain_type_names(rx: &mut EventReceiver) -> Vec<&'static str> {
        rx.drain().iter().map(|e| e.type_name()).collect()
    }
}

/// Fixtures for install descriptors
pub mod fixtures {
    use hostlink_core::McpInstallPayload;
    use serde_json::json;

    pub fn stdio_install(name: &str, command: &str, args: &[&str]) -> McpInstallPayload {
        McpInstallPayload::encode(
            name,
            &json!({ "transport": "stdio", "command": command, "args": args }),
        )
    }

    pub fn sse_install(name: &str, url: &str) -> McpInstallPayload {
        McpInstallPayload::encode(name, &json!({ "transport": "sse", "url": url }))
    }
}

/// A synchronizer wired to `mocks`, plus a receiver for its session events
pub fn session_synchronizer(mocks: &MockCollaborators) -> (Arc<SessionSynchronizer>, EventReceiver) {
    let bus = create_shared_event_bus(64);
    let rx = bus.subscribe();
    let store = Arc::new(SessionStore::new(bus.sender()));
    let sync = SessionSynchronizer::new(
        store,
        mocks.account.clone(),
        mocks.config.clone(),
        mocks.groups.clone(),
        mocks.tools.clone(),
    );
    (Arc::new(sync), rx)
}

/// A controller wired to mock collaborators
pub struct ShellTestHarness {
    pub controller: ShellController,
    pub mocks: MockCollaborators,
    pub events: EventReceiver,
}

impl ShellTestHarness {
    pub fn new(mocks: MockCollaborators) -> Self {
        Self::with_config(mocks, ShellConfig::default())
    }

    pub fn with_config(mocks: MockCollaborators, config: ShellConfig) -> Self {
        init_test_tracing();

        let controller = ShellController::builder()
            .with_config(config)
            .with_account_service(mocks.account.clone())
            .with_config_store(mocks.config.clone())
            .with_model_groups(mocks.groups.clone())
            .with_tool_registry(mocks.tools.clone())
            .with_overlay(mocks.overlay.clone())
            .build()
            .expect("all collaborators provided");
        let events = controller.subscribe();

        Self {
            controller,
            mocks,
            events,
        }
    }

    /// `start()` and wait for the startup chains
    pub async fn started(self) -> Self {
        self.controller.start();
        self.controller.settle().await;
        self
    }
}
