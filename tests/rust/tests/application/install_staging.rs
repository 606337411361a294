//! Tests for InstallStaging
//!
//! Validates the stdio confirmation gate, direct forwarding of other
//! transports and the single pending slot.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use hostlink_core::{
    EventBus, EventReceiver, InstallDecision, InstallError, InstallStaging, McpInstallPayload,
    OverlayTarget, ShellEvent,
};
use tests::fixtures::{sse_install, stdio_install};
use tests::mocks::MockOverlaySurface;

fn make_staging() -> (InstallStaging, Arc<MockOverlaySurface>, EventReceiver) {
    tests::init_test_tracing();
    let bus = EventBus::new();
    let rx = bus.subscribe();
    let overlay = Arc::new(MockOverlaySurface::new());
    let staging = InstallStaging::new(overlay.clone(), bus.sender());
    (staging, overlay, rx)
}

#[tokio::test]
async fn stdio_install_waits_for_confirmation() {
    let (staging, overlay, mut rx) = make_staging();

    let decision = staging.handle_install_event(&stdio_install(
        "fs",
        "npx",
        &["-y", "@modelcontextprotocol/server-filesystem"],
    ));

    assert!(matches!(decision, InstallDecision::Staged));
    assert!(staging.install_buffer().is_empty());
    assert!(overlay.opened().is_empty());
    assert_eq!(staging.pending().map(|p| p.name), Some("fs".to_string()));

    assert_eq!(
        rx.try_recv(),
        Some(ShellEvent::InstallConfirmationRequested {
            name: "fs".to_string(),
            command_line: "npx -y @modelcontextprotocol/server-filesystem".to_string(),
        })
    );
}

#[tokio::test]
async fn confirm_forwards_pending_install() {
    let (staging, overlay, mut rx) = make_staging();
    staging.handle_install_event(&stdio_install("fs", "npx", &["server"]));
    rx.drain();

    assert!(staging.confirm_pending_install());

    let buffer = staging.install_buffer();
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer[0].name, "fs");
    assert_eq!(buffer[0].config.command(), Some("npx"));
    assert!(staging.pending().is_none());
    assert_eq!(overlay.opened(), vec![OverlayTarget::tools_settings()]);

    let events = rx.drain();
    assert_eq!(
        events,
        vec![
            ShellEvent::ToolInstallForwarded {
                name: "fs".to_string(),
                transport: "stdio".to_string(),
            },
            ShellEvent::InstallConfirmationClosed {
                name: "fs".to_string(),
                confirmed: true,
            },
        ]
    );
}

#[tokio::test]
async fn cancel_drops_pending_install() {
    let (staging, overlay, mut rx) = make_staging();
    staging.handle_install_event(&stdio_install("fs", "npx", &[]));
    rx.drain();

    assert!(staging.cancel_pending_install());

    assert!(staging.pending().is_none());
    assert!(staging.install_buffer().is_empty());
    assert!(overlay.opened().is_empty());
    assert_eq!(
        rx.try_recv(),
        Some(ShellEvent::InstallConfirmationClosed {
            name: "fs".to_string(),
            confirmed: false,
        })
    );
}

#[tokio::test]
async fn confirm_and_cancel_without_pending_are_noops() {
    let (staging, overlay, mut rx) = make_staging();

    assert!(!staging.confirm_pending_install());
    assert!(!staging.cancel_pending_install());
    assert!(staging.install_buffer().is_empty());
    assert!(overlay.opened().is_empty());
    assert!(rx.drain().is_empty());
}

#[tokio::test]
async fn second_stdio_install_replaces_the_first() {
    let (staging, _overlay, _rx) = make_staging();

    staging.handle_install_event(&stdio_install("first", "npx", &["a"]));
    staging.handle_install_event(&stdio_install("second", "uvx", &["b"]));

    assert_eq!(staging.pending().map(|p| p.name), Some("second".to_string()));

    assert!(staging.confirm_pending_install());
    let names: Vec<String> = staging.install_buffer().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["second".to_string()]);
    assert!(!staging.confirm_pending_install());
}

#[tokio::test]
async fn non_stdio_install_is_forwarded_directly() {
    let (staging, overlay, mut rx) = make_staging();

    let decision = staging.handle_install_event(&sse_install("remote", "https://mcp.example.com/sse"));

    assert!(matches!(decision, InstallDecision::Forwarded));
    assert!(staging.pending().is_none());
    assert_eq!(overlay.opened(), vec![OverlayTarget::new("Setting", "Tools")]);

    let buffer = staging.install_buffer();
    assert_eq!(buffer.len(), 1);
    assert_eq!(
        buffer[0].config.as_map().get("url"),
        Some(&json!("https://mcp.example.com/sse"))
    );
    assert!(!rx.drain().iter().any(|e| matches!(
        e,
        ShellEvent::InstallConfirmationRequested { .. }
    )));
}

#[tokio::test]
async fn forwarding_keeps_pending_stdio_install() {
    let (staging, _overlay, _rx) = make_staging();

    staging.handle_install_event(&stdio_install("local", "npx", &[]));
    staging.handle_install_event(&sse_install("remote", "https://x"));

    assert_eq!(staging.pending().map(|p| p.name), Some("local".to_string()));
    assert_eq!(staging.install_buffer().len(), 1);
}

#[tokio::test]
async fn malformed_payloads_are_discarded() {
    let (staging, overlay, mut rx) = make_staging();

    let cases = [
        McpInstallPayload::new("bad-b64", "%%%not base64%%%"),
        McpInstallPayload::encode("array", &json!(["stdio"])),
        McpInstallPayload::encode("no-transport", &json!({ "command": "npx" })),
        McpInstallPayload::encode("no-command", &json!({ "transport": "stdio" })),
    ];

    for payload in &cases {
        let decision = staging.handle_install_event(payload);
        assert!(decision.is_discarded(), "{} should be discarded", payload.name);
    }

    assert!(matches!(
        staging.handle_install_event(&McpInstallPayload::encode("x", &json!({ "transport": "stdio" }))),
        InstallDecision::Discarded(InstallError::MissingCommand)
    ));

    assert!(staging.pending().is_none());
    assert!(staging.install_buffer().is_empty());
    assert!(overlay.opened().is_empty());
    assert!(rx.drain().is_empty());
}

#[tokio::test]
async fn custom_destination_is_opened() {
    tests::init_test_tracing();
    let bus = EventBus::new();
    let overlay = Arc::new(MockOverlaySurface::new());
    let staging = InstallStaging::new(overlay.clone(), bus.sender())
        .with_destination(OverlayTarget::new("Setting", "Mcp"));

    staging.handle_install_event(&sse_install("remote", "https://x"));

    assert_eq!(overlay.opened(), vec![OverlayTarget::new("Setting", "Mcp")]);
}

#[tokio::test]
async fn drain_hands_over_buffer_once() {
    let (staging, _overlay, _rx) = make_staging();
    staging.handle_install_event(&sse_install("a", "https://a"));
    staging.handle_install_event(&sse_install("b", "https://b"));

    assert_eq!(staging.drain_install_buffer().len(), 2);
    assert!(staging.drain_install_buffer().is_empty());
}
