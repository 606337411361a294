//! Shell Controller - wires host events to the session and install flows
//!
//! ```text
//!  host ──▶ HostEventSender ──▶ HostEventBridge::run
//!                                   │
//!        login / refresh ───────────┼──▶ SessionSynchronizer::refresh_session (spawned)
//!        refresh ───────────────────┼──▶ refresh_host_config → load_tools   (spawned)
//!        logout ────────────────────┼──▶ clear_session (sync) + remove config (spawned)
//!        mcp.install ───────────────┴──▶ InstallStaging::handle_install_event
//! ```
//!
//! Spawned chains are tracked so [`ShellController::settle`] can wait for
//! them. None of them is cancelled; each logs its own failure.

use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use super::install_staging::InstallStaging;
use super::session_store::SessionStore;
use super::session_sync::SessionSynchronizer;
use crate::ambient::AmbientWatchers;
use crate::collaborator::{
    AccountService, ModelGroupRegistry, OverlaySurface, ProviderConfigStore, ToolRegistry,
};
use crate::config::ShellConfig;
use crate::domain::{HostEvent, HostEventKind, SessionSnapshot};
use crate::event_bridge::{HostEventBridge, Subscription};
use crate::event_bus::{create_shared_event_bus, EventReceiver, SharedEventBus};

/// Builder collecting the controller's collaborators
#[derive(Default)]
pub struct ShellControllerBuilder {
    config: Option<ShellConfig>,
    event_bus: Option<SharedEventBus>,
    account: Option<Arc<dyn AccountService>>,
    config_store: Option<Arc<dyn ProviderConfigStore>>,
    model_groups: Option<Arc<dyn ModelGroupRegistry>>,
    tools: Option<Arc<dyn ToolRegistry>>,
    overlay: Option<Arc<dyn OverlaySurface>>,
}

impl ShellControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_event_bus(mut self, bus: SharedEventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_account_service(mut self, account: Arc<dyn AccountService>) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_config_store(mut self, store: Arc<dyn ProviderConfigStore>) -> Self {
        self.config_store = Some(store);
        self
    }

    pub fn with_model_groups(mut self, groups: Arc<dyn ModelGroupRegistry>) -> Self {
        self.model_groups = Some(groups);
        self
    }

    pub fn with_tool_registry(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_overlay(mut self, overlay: Arc<dyn OverlaySurface>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn build(self) -> anyhow::Result<ShellController> {
        let config = self.config.unwrap_or_default();
        let account = self.account.ok_or_else(|| anyhow!("Account service required"))?;
        let config_store = self
            .config_store
            .ok_or_else(|| anyhow!("Provider config store required"))?;
        let model_groups = self
            .model_groups
            .ok_or_else(|| anyhow!("Model group registry required"))?;
        let tools = self.tools.ok_or_else(|| anyhow!("Tool registry required"))?;
        let overlay = self.overlay.ok_or_else(|| anyhow!("Overlay surface required"))?;

        let bus = self
            .event_bus
            .unwrap_or_else(|| create_shared_event_bus(config.event_bus_capacity));
        let sender = bus.sender();

        let store = Arc::new(SessionStore::new(sender.clone()));
        let session = SessionSynchronizer::new(
            store,
            account,
            config_store.clone(),
            model_groups,
            tools.clone(),
        )
        .with_provider(config.account_provider.clone());

        let staging = InstallStaging::new(overlay, sender.clone())
            .with_destination(config.install_overlay.clone());

        let ambient = AmbientWatchers::new(sender, config.default_language.clone());

        Ok(ShellController {
            bus,
            bridge: HostEventBridge::new(),
            session: Arc::new(session),
            staging: Arc::new(staging),
            ambient: Arc::new(ambient),
            config_store,
            tools,
            tasks: TaskTracker::new(),
            subscriptions: Mutex::new(Vec::new()),
            config,
        })
    }
}

pub struct ShellController {
    config: ShellConfig,
    bus: SharedEventBus,
    bridge: HostEventBridge,
    session: Arc<SessionSynchronizer>,
    staging: Arc<InstallStaging>,
    ambient: Arc<AmbientWatchers>,
    config_store: Arc<dyn ProviderConfigStore>,
    tools: Arc<dyn ToolRegistry>,
    tasks: TaskTracker,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl ShellController {
    pub fn builder() -> ShellControllerBuilder {
        ShellControllerBuilder::new()
    }

    /// Register the host event handlers. Calling it again is a no-op.
    pub fn attach(&self) {
        let mut subs = self.subscriptions.lock();
        if !subs.is_empty() {
            debug!("[Shell] Handlers already attached");
            return;
        }

        subs.push(self.bridge.register(HostEventKind::Login, {
            let session = self.session.clone();
            let tasks = self.tasks.clone();
            move |_: &HostEvent| {
                info!("[Shell] Host login");
                spawn_refresh(&tasks, session.clone(), "login");
            }
        }));

        subs.push(self.bridge.register(HostEventKind::Logout, {
            let session = self.session.clone();
            let tasks = self.tasks.clone();
            move |_: &HostEvent| {
                info!("[Shell] Host logout");
                session.clear_session();
                let session = session.clone();
                tasks.spawn(async move { session.remove_account_config().await });
            }
        }));

        subs.push(self.bridge.register(HostEventKind::Refresh, {
            let session = self.session.clone();
            let config_store = self.config_store.clone();
            let tools = self.tools.clone();
            let tasks = self.tasks.clone();
            move |_: &HostEvent| {
                info!("[Shell] Host refresh");
                let config_store = config_store.clone();
                let tools = tools.clone();
                spawn_logged(&tasks, "refresh host config", async move {
                    config_store.refresh_host_config().await?;
                    tools.load_tools().await
                });
                spawn_refresh(&tasks, session.clone(), "refresh");
            }
        }));

        subs.push(self.bridge.register(HostEventKind::McpInstall, {
            let staging = self.staging.clone();
            move |event: &HostEvent| {
                if let HostEvent::McpInstall(payload) = event {
                    staging.handle_install_event(payload);
                }
            }
        }));

        info!(handlers = subs.len(), "[Shell] Host event handlers attached");
    }

    /// Attach handlers and run the startup chains.
    pub fn start(&self) {
        self.attach();

        let tools = self.tools.clone();
        spawn_logged(&self.tasks, "initial tool load", async move {
            // both loads run; the first error is reported
            let loaded = tools.load_tools().await;
            let mcp = tools.load_mcp_config().await;
            loaded.and(mcp)
        });

        spawn_refresh(&self.tasks, self.session.clone(), "startup");
    }

    /// Dispatch loop over the host event channel
    pub async fn run(&self, receiver: mpsc::UnboundedReceiver<HostEvent>) {
        self.bridge.run(receiver).await;
    }

    /// Deliver one host event immediately
    pub fn handle(&self, event: &HostEvent) -> usize {
        self.bridge.publish(event)
    }

    pub fn confirm_pending_install(&self) -> bool {
        self.staging.confirm_pending_install()
    }

    pub fn cancel_pending_install(&self) -> bool {
        self.staging.cancel_pending_install()
    }

    /// Wait until every spawned chain has finished.
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Unregister handlers and stop the dispatch loop. Idempotent.
    ///
    /// Chains already in flight keep running; use [`settle`](Self::settle)
    /// to wait for them.
    pub fn shutdown(&self) {
        let subs: Vec<Subscription> = std::mem::take(&mut *self.subscriptions.lock());
        for sub in &subs {
            sub.unsubscribe();
        }
        self.bridge.shutdown();
        if !subs.is_empty() {
            info!("[Shell] Shut down");
        }
    }

    pub fn session(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn synchronizer(&self) -> &Arc<SessionSynchronizer> {
        &self.session
    }

    pub fn staging(&self) -> &Arc<InstallStaging> {
        &self.staging
    }

    pub fn ambient(&self) -> &Arc<AmbientWatchers> {
        &self.ambient
    }

    pub fn bridge(&self) -> &HostEventBridge {
        &self.bridge
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }
}

fn spawn_refresh(tasks: &TaskTracker, session: Arc<SessionSynchronizer>, trigger: &'static str) {
    tasks.spawn(async move {
        let outcome = session.refresh_session().await;
        debug!(trigger, outcome = ?outcome, "[Shell] Session refresh finished");
    });
}

fn spawn_logged<F>(tasks: &TaskTracker, chain: &'static str, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tasks.spawn(async move {
        if let Err(e) = fut.await {
            error!(chain, error = %e, "[Shell] Background chain failed");
        }
    });
}
