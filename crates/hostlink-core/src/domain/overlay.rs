use serde::{Deserialize, Serialize};

/// Named UI surface the installation flow opens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayTarget {
    pub page: String,
    pub tab: String,
}

impl OverlayTarget {
    pub fn new(page: impl Into<String>, tab: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            tab: tab.into(),
        }
    }

    /// Settings → Tools, where forwarded installs land
    pub fn tools_settings() -> Self {
        Self::new("Setting", "Tools")
    }
}

impl Default for OverlayTarget {
    fn default() -> Self {
        Self::tools_settings()
    }
}
