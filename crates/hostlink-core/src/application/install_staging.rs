//! Tool Install Staging
//!
//! Deep-link installs arrive as `mcp.install` host events. Descriptors with a
//! `stdio` transport would run an arbitrary local command, so they are parked
//! in a single pending slot until the user confirms. Every other transport is
//! forwarded straight to the install buffer and the tools settings page.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::collaborator::OverlaySurface;
use crate::domain::{InstallError, McpInstallPayload, OverlayTarget, ShellEvent, ToolInstallRequest};
use crate::event_bus::EventSender;

/// What happened to an install event
#[derive(Debug)]
pub enum InstallDecision {
    Discarded(InstallError),
    /// Waiting for confirmation
    Staged,
    Forwarded,
}

impl InstallDecision {
    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded(_))
    }
}

/// Holds at most one install awaiting confirmation
#[derive(Debug, Default)]
pub struct PendingSlot(Option<ToolInstallRequest>);

impl PendingSlot {
    /// Put `request` in the slot, returning whatever it replaced
    pub fn replace(&mut self, request: ToolInstallRequest) -> Option<ToolInstallRequest> {
        self.0.replace(request)
    }

    pub fn take(&mut self) -> Option<ToolInstallRequest> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<&ToolInstallRequest> {
        self.0.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

pub struct InstallStaging {
    pending: Mutex<PendingSlot>,
    buffer: Mutex<Vec<ToolInstallRequest>>,
    overlay: Arc<dyn OverlaySurface>,
    destination: OverlayTarget,
    events: EventSender,
}

impl InstallStaging {
    pub fn new(overlay: Arc<dyn OverlaySurface>, events: EventSender) -> Self {
        Self {
            pending: Mutex::new(PendingSlot::default()),
            buffer: Mutex::new(Vec::new()),
            overlay,
            destination: OverlayTarget::tools_settings(),
            events,
        }
    }

    pub fn with_destination(mut self, destination: OverlayTarget) -> Self {
        self.destination = destination;
        self
    }

    /// Decode and classify one `mcp.install` payload.
    pub fn handle_install_event(&self, payload: &McpInstallPayload) -> InstallDecision {
        let request = match ToolInstallRequest::from_payload(payload) {
            Ok(request) => request,
            Err(e) => {
                debug!(
                    name = %payload.name,
                    error = %e,
                    "[InstallStaging] Discarding install descriptor"
                );
                return InstallDecision::Discarded(e);
            }
        };

        if request.requires_confirmation() {
            self.stage(request);
            InstallDecision::Staged
        } else {
            self.forward(request);
            InstallDecision::Forwarded
        }
    }

    /// Forward the pending install, if any. Returns whether one was forwarded.
    pub fn confirm_pending_install(&self) -> bool {
        let Some(request) = self.pending.lock().take() else {
            debug!("[InstallStaging] Confirm with nothing pending");
            return false;
        };

        info!(name = %request.name, "[InstallStaging] Install confirmed by user");
        let name = request.name.clone();
        self.forward(request);
        self.events.emit(ShellEvent::InstallConfirmationClosed {
            name,
            confirmed: true,
        });
        true
    }

    /// Drop the pending install without forwarding (cancel or dismiss).
    pub fn cancel_pending_install(&self) -> bool {
        let Some(request) = self.pending.lock().take() else {
            return false;
        };

        info!(name = %request.name, "[InstallStaging] Install cancelled");
        self.events.emit(ShellEvent::InstallConfirmationClosed {
            name: request.name,
            confirmed: false,
        });
        true
    }

    pub fn pending(&self) -> Option<ToolInstallRequest> {
        self.pending.lock().peek().cloned()
    }

    pub fn install_buffer(&self) -> Vec<ToolInstallRequest> {
        self.buffer.lock().clone()
    }

    /// Hand the buffered installs to the installation surface
    pub fn drain_install_buffer(&self) -> Vec<ToolInstallRequest> {
        std::mem::take(&mut *self.buffer.lock())
    }

    fn stage(&self, request: ToolInstallRequest) {
        let name = request.name.clone();
        let command_line = request.config.command_line();

        if let Some(previous) = self.pending.lock().replace(request) {
            warn!(
                replaced = %previous.name,
                name = %name,
                "[InstallStaging] Replacing pending install"
            );
        }

        info!(
            name = %name,
            command = %command_line,
            "[InstallStaging] stdio install awaiting confirmation"
        );
        self.events
            .emit_or_warn(ShellEvent::InstallConfirmationRequested { name, command_line });
    }

    fn forward(&self, request: ToolInstallRequest) {
        let name = request.name.clone();
        let transport = request.config.transport().as_str().to_string();

        self.buffer.lock().push(request);
        self.overlay.open_overlay(&self.destination);

        info!(
            name = %name,
            transport = %transport,
            page = %self.destination.page,
            tab = %self.destination.tab,
            "[InstallStaging] Install forwarded"
        );
        self.events
            .emit(ShellEvent::ToolInstallForwarded { name, transport });
    }
}
