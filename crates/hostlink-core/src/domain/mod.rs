//! Domain entities and events

mod environment;
pub mod event;
pub mod install;
pub mod model_group;
mod overlay;
pub mod session;

pub use environment::ColorScheme;
pub use event::{HostEvent, HostEventKind, ShellEvent};
pub use install::{
    InstallError, McpInstallPayload, ToolDescriptor, ToolInstallRequest, Transport,
    STDIO_TRANSPORT,
};
pub use model_group::{query_group, GroupFilter, ModelGroup};
pub use overlay::OverlayTarget;
pub use session::{AccountProfile, SessionPhase, SessionSnapshot, UsageSnapshot};
