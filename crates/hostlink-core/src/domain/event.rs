//! Events crossing the shell boundary.
//!
//! - [`HostEvent`]: pushed by the privileged host process, consumed through
//!   the [`HostEventBridge`](crate::event_bridge::HostEventBridge).
//! - [`ShellEvent`]: produced by the controller, consumed by the presentation
//!   layer through the [`EventBus`](crate::event_bus::EventBus).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ColorScheme, McpInstallPayload, SessionSnapshot};

// ============================================================================
// HOST EVENTS
// ============================================================================

/// Event names the bridge accepts registrations for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostEventKind {
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "logout")]
    Logout,
    #[serde(rename = "refresh")]
    Refresh,
    #[serde(rename = "mcp.install")]
    McpInstall,
}

impl HostEventKind {
    pub const ALL: [HostEventKind; 4] = [Self::Login, Self::Logout, Self::Refresh, Self::McpInstall];

    /// Name used by the host on the wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
            Self::McpInstall => "mcp.install",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.wire_name() == name)
    }
}

impl std::fmt::Display for HostEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A single occurrence of a host event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Login,
    Logout,
    Refresh,
    McpInstall(McpInstallPayload),
}

impl HostEvent {
    pub fn kind(&self) -> HostEventKind {
        match self {
            Self::Login => HostEventKind::Login,
            Self::Logout => HostEventKind::Logout,
            Self::Refresh => HostEventKind::Refresh,
            Self::McpInstall(_) => HostEventKind::McpInstall,
        }
    }

    /// Map a named host message onto a typed event.
    ///
    /// Unknown names and `mcp.install` payloads that are not `{name, config}`
    /// yield `None`.
    pub fn from_wire(name: &str, payload: Value) -> Option<Self> {
        let Some(kind) = HostEventKind::from_wire_name(name) else {
            debug!(event = name, "[HostEvent] Ignoring unknown host event");
            return None;
        };

        match kind {
            HostEventKind::Login => Some(Self::Login),
            HostEventKind::Logout => Some(Self::Logout),
            HostEventKind::Refresh => Some(Self::Refresh),
            HostEventKind::McpInstall => match serde_json::from_value(payload) {
                Ok(p) => Some(Self::McpInstall(p)),
                Err(e) => {
                    debug!(error = %e, "[HostEvent] Malformed mcp.install payload");
                    None
                }
            },
        }
    }
}

// ============================================================================
// SHELL EVENTS
// ============================================================================

/// Notifications for the presentation layer
///
/// Serialized with a `type` tag:
/// ```json
/// { "type": "install_confirmation_requested", "name": "...", "command_line": "npx server" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellEvent {
    /// Session state was committed
    SessionChanged { session: SessionSnapshot },

    /// A stdio install is waiting for the user
    InstallConfirmationRequested { name: String, command_line: String },

    /// The confirmation prompt should close
    InstallConfirmationClosed { name: String, confirmed: bool },

    /// An install was appended to the install buffer
    ToolInstallForwarded { name: String, transport: String },

    ColorSchemeChanged { scheme: ColorScheme },

    LanguageChanged { lang: String },

    WindowResized { width: u32, height: u32 },

    HotkeyPressed { combo: String },
}

impl ShellEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionChanged { .. } => "session_changed",
            Self::InstallConfirmationRequested { .. } => "install_confirmation_requested",
            Self::InstallConfirmationClosed { .. } => "install_confirmation_closed",
            Self::ToolInstallForwarded { .. } => "tool_install_forwarded",
            Self::ColorSchemeChanged { .. } => "color_scheme_changed",
            Self::LanguageChanged { .. } => "language_changed",
            Self::WindowResized { .. } => "window_resized",
            Self::HotkeyPressed { .. } => "hotkey_pressed",
        }
    }

    /// Events that come from the install staging flow
    pub fn is_install_event(&self) -> bool {
        matches!(
            self,
            Self::InstallConfirmationRequested { .. }
                | Self::InstallConfirmationClosed { .. }
                | Self::ToolInstallForwarded { .. }
        )
    }
}
