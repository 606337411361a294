//! Tests for ShellController
//!
//! Validates host event wiring, startup chains, the dispatch loop and
//! shutdown.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use hostlink_core::{
    host_event_channel, ColorScheme, HostEvent, HostEventKind, SessionPhase, ShellConfig,
    ShellController, ShellEvent,
};
use tests::fixtures::{sse_install, stdio_install};
use tests::mocks::*;
use tests::ShellTestHarness;

fn logged_in() -> MockCollaborators {
    MockCollaborators::new().with_account(MockAccountService::logged_in("tok", "u1"))
}

#[test]
fn build_requires_every_collaborator() {
    let mocks = MockCollaborators::new();

    let err = ShellController::builder()
        .with_config_store(mocks.config.clone())
        .with_model_groups(mocks.groups.clone())
        .with_tool_registry(mocks.tools.clone())
        .with_overlay(mocks.overlay.clone())
        .build()
        .err()
        .expect("missing account service");
    assert!(err.to_string().contains("Account service required"));

    let err = ShellController::builder()
        .with_account_service(mocks.account.clone())
        .with_config_store(mocks.config.clone())
        .with_model_groups(mocks.groups.clone())
        .with_tool_registry(mocks.tools.clone())
        .build()
        .err()
        .expect("missing overlay");
    assert!(err.to_string().contains("Overlay surface required"));
}

#[tokio::test]
async fn start_loads_tools_and_syncs_session() {
    let h = ShellTestHarness::new(logged_in()).started().await;

    assert_eq!(h.mocks.tools.tools_loads(), 1);
    assert_eq!(h.mocks.tools.mcp_config_loads(), 1);
    assert_eq!(h.mocks.tools.account_tools_loads(), 1);

    let session = h.controller.session();
    assert_eq!(session.phase, SessionPhase::LoggedIn);
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(h.mocks.config.ops(), vec![ConfigOp::Write]);
}

#[tokio::test]
async fn start_without_token_removes_stale_entry() {
    let mocks = MockCollaborators::new().with_config(MockProviderConfigStore::new().with_entry());
    let h = ShellTestHarness::new(mocks).started().await;

    assert!(h.controller.session().phase.is_logged_out());
    assert!(!h.mocks.config.has_entry());
    assert_eq!(h.mocks.account.logouts(), 0);
}

#[tokio::test]
async fn login_event_runs_refresh() {
    let h = ShellTestHarness::new(MockCollaborators::new()).started().await;
    assert!(h.controller.session().user.is_none());

    h.mocks.account.set_token(Some("tok"));
    h.mocks
        .account
        .set_profile(Some(hostlink_core::AccountProfile::new("u1")));
    h.mocks.groups.add_group("oap");

    assert_eq!(h.controller.handle(&HostEvent::Login), 1);
    h.controller.settle().await;

    assert_eq!(h.controller.session().phase, SessionPhase::LoggedIn);
    assert_eq!(h.mocks.config.count(ConfigOp::Reload), 1);
}

#[tokio::test]
async fn logout_event_clears_session_synchronously() {
    let h = ShellTestHarness::new(logged_in()).started().await;
    h.mocks.config.clear_ops();

    h.controller.handle(&HostEvent::Logout);

    // cleared before any spawned work runs
    assert!(h.controller.session().user.is_none());
    assert!(h.controller.session().phase.is_logged_out());

    h.controller.settle().await;
    assert_eq!(h.mocks.config.ops(), vec![ConfigOp::Remove]);
    assert!(!h.mocks.config.has_entry());
}

#[tokio::test]
async fn refresh_event_reloads_host_config_and_session() {
    let h = ShellTestHarness::new(logged_in()).started().await;
    h.mocks.config.clear_ops();

    h.controller.handle(&HostEvent::Refresh);
    h.controller.settle().await;

    assert_eq!(h.mocks.config.count(ConfigOp::RefreshHost), 1);
    assert_eq!(h.mocks.tools.tools_loads(), 2);
    // groups are still empty, so the entry is written again
    assert_eq!(h.mocks.config.count(ConfigOp::Write), 1);
    assert_eq!(h.mocks.tools.account_tools_loads(), 2);
}

#[tokio::test]
async fn failed_host_refresh_does_not_block_session_refresh() {
    let h = ShellTestHarness::new(logged_in()).started().await;
    h.mocks.config.fail_host_refresh(true);
    h.mocks
        .account
        .set_profile(Some(hostlink_core::AccountProfile::new("u2")));

    h.controller.handle(&HostEvent::Refresh);
    h.controller.settle().await;

    // load_tools is skipped after the failed host refresh
    assert_eq!(h.mocks.tools.tools_loads(), 1);
    assert_eq!(h.controller.session().user_id(), Some("u2"));
}

#[tokio::test]
async fn logout_wins_over_in_flight_login() {
    let h = ShellTestHarness::new(MockCollaborators::new()).started().await;
    h.mocks.config.clear_ops();

    h.mocks.account.set_token(Some("tok"));
    h.mocks
        .account
        .set_profile(Some(hostlink_core::AccountProfile::new("u1")));
    let gate = Gate::new();
    h.mocks.account.gate_get_me(gate.clone());

    h.controller.handle(&HostEvent::Login);
    gate.entered().await;
    h.controller.handle(&HostEvent::Logout);
    gate.release();
    h.controller.settle().await;

    let session = h.controller.session();
    assert!(session.user.is_none());
    assert_eq!(session.phase, SessionPhase::LoggedOut);
    assert_eq!(h.mocks.config.count(ConfigOp::Write), 0);
    assert!(!h.mocks.config.has_entry());
    assert_eq!(h.mocks.account.logouts(), 1);
}

#[tokio::test]
async fn install_event_reaches_staging() {
    let mut h = ShellTestHarness::new(MockCollaborators::new()).started().await;
    h.events.drain();

    h.controller
        .handle(&HostEvent::McpInstall(stdio_install("fs", "npx", &["server"])));

    let pending = h.controller.staging().pending().expect("install staged");
    assert_eq!(pending.name, "fs");
    assert!(h.events.drain().iter().any(|e| matches!(
        e,
        ShellEvent::InstallConfirmationRequested { command_line, .. } if command_line == "npx server"
    )));

    assert!(h.controller.confirm_pending_install());
    assert_eq!(h.controller.staging().install_buffer().len(), 1);
    assert_eq!(h.mocks.overlay.opened().len(), 1);
}

#[tokio::test]
async fn cancel_through_controller() {
    let h = ShellTestHarness::new(MockCollaborators::new()).started().await;

    h.controller
        .handle(&HostEvent::McpInstall(stdio_install("fs", "npx", &[])));
    assert!(h.controller.cancel_pending_install());
    assert!(!h.controller.cancel_pending_install());
    assert!(h.controller.staging().install_buffer().is_empty());
}

#[tokio::test]
async fn run_dispatches_channel_in_order() {
    let h = ShellTestHarness::new(logged_in());
    h.controller.attach();
    let (sender, receiver) = host_event_channel();

    assert!(sender.send(HostEvent::McpInstall(sse_install("remote", "https://x"))));
    assert!(sender.send_wire("login", serde_json::Value::Null));
    assert!(!sender.send_wire("unknown.event", serde_json::Value::Null));
    drop(sender);

    h.controller.run(receiver).await;
    h.controller.settle().await;

    assert_eq!(h.controller.staging().install_buffer().len(), 1);
    assert_eq!(h.controller.session().phase, SessionPhase::LoggedIn);
}

#[tokio::test]
async fn attach_is_idempotent() {
    let h = ShellTestHarness::new(MockCollaborators::new());

    h.controller.attach();
    h.controller.attach();

    for kind in HostEventKind::ALL {
        assert_eq!(h.controller.bridge().handler_count(kind), 1, "{kind}");
    }
}

#[tokio::test]
async fn shutdown_stops_delivery() {
    let h = ShellTestHarness::new(logged_in()).started().await;
    h.mocks.config.clear_ops();

    h.controller.shutdown();
    h.controller.shutdown();

    assert_eq!(h.controller.handle(&HostEvent::Logout), 0);
    assert_eq!(h.controller.session().phase, SessionPhase::LoggedIn);

    let (sender, receiver) = host_event_channel();
    sender.send(HostEvent::Login);
    // the loop exits at once; the event is never delivered
    h.controller.run(receiver).await;
    h.controller.settle().await;
    assert!(h.mocks.config.ops().is_empty());
}

#[tokio::test]
async fn custom_provider_is_reconciled() {
    let mocks = logged_in().with_groups(MockModelGroupRegistry::new().with_group("acme"));
    let config = ShellConfig {
        account_provider: "acme".to_string(),
        ..ShellConfig::default()
    };
    let h = ShellTestHarness::with_config(mocks, config).started().await;

    assert_eq!(h.controller.synchronizer().provider(), "acme");
    assert_eq!(h.mocks.config.ops(), vec![ConfigOp::Reload]);
}

#[tokio::test]
async fn ambient_changes_reach_subscribers() {
    let mut h = ShellTestHarness::new(MockCollaborators::new());

    let ambient = Arc::clone(h.controller.ambient());
    ambient.color_scheme_changed(true);
    assert_eq!(ambient.language_changed(""), "en");
    ambient.window_resized(1280, 800);

    assert_eq!(
        tests::events::drain_type_names(&mut h.events),
        vec!["color_scheme_changed", "language_changed", "window_resized"]
    );
    assert_eq!(ambient.color_scheme(), Some(ColorScheme::Dark));
}
