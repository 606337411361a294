//! Ambient environment watchers
//!
//! Pass-through adapters for OS/window signals. The embedding UI calls these
//! when its platform listeners fire; they publish [`ShellEvent`]s and keep the
//! last theme and language so repeated notifications are not re-published.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error};

use crate::collaborator::ModelSettingsSink;
use crate::domain::{ColorScheme, ShellEvent};
use crate::event_bus::EventSender;

struct AmbientState {
    scheme: Option<ColorScheme>,
    lang: Option<String>,
}

pub struct AmbientWatchers {
    state: Mutex<AmbientState>,
    default_language: String,
    events: EventSender,
}

impl AmbientWatchers {
    pub fn new(events: EventSender, default_language: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(AmbientState {
                scheme: None,
                lang: None,
            }),
            default_language: default_language.into(),
            events,
        }
    }

    /// OS `prefers-color-scheme` changed. Returns whether it was published.
    pub fn color_scheme_changed(&self, prefers_dark: bool) -> bool {
        let scheme = ColorScheme::from_prefers_dark(prefers_dark);
        {
            let mut state = self.state.lock();
            if state.scheme == Some(scheme) {
                return false;
            }
            state.scheme = Some(scheme);
        }
        debug!(scheme = scheme.as_str(), "[Ambient] Color scheme changed");
        self.events.emit(ShellEvent::ColorSchemeChanged { scheme });
        true
    }

    pub fn color_scheme(&self) -> Option<ColorScheme> {
        self.state.lock().scheme
    }

    /// UI language changed; empty falls back to the default language.
    ///
    /// Returns the language code the document should carry.
    pub fn language_changed(&self, lang: &str) -> String {
        let lang = match lang.trim() {
            "" => self.default_language.clone(),
            code => code.to_string(),
        };

        let changed = {
            let mut state = self.state.lock();
            if state.lang.as_deref() == Some(lang.as_str()) {
                false
            } else {
                state.lang = Some(lang.clone());
                true
            }
        };

        if changed {
            self.events
                .emit(ShellEvent::LanguageChanged { lang: lang.clone() });
        }
        lang
    }

    pub fn window_resized(&self, width: u32, height: u32) {
        self.events.emit(ShellEvent::WindowResized { width, height });
    }

    /// Global hotkey; mapping keys to actions belongs to the UI.
    pub fn hotkey_pressed(&self, combo: impl Into<String>) {
        self.events.emit(ShellEvent::HotkeyPressed {
            combo: combo.into(),
        });
    }
}

/// Pushes model settings to the host whenever they change
pub struct ModelSettingsSync {
    sink: Arc<dyn ModelSettingsSink>,
    last: Mutex<Option<Value>>,
}

impl ModelSettingsSync {
    pub fn new(sink: Arc<dyn ModelSettingsSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    /// Push `settings` if present and different from the last push.
    ///
    /// Returns whether a push was attempted.
    pub async fn settings_changed(&self, settings: Option<&Value>) -> bool {
        let Some(settings) = settings else {
            return false;
        };

        {
            let mut last = self.last.lock();
            if last.as_ref() == Some(settings) {
                return false;
            }
            *last = Some(settings.clone());
        }

        if let Err(e) = self.sink.set_model_settings(settings).await {
            error!(error = %e, "[Ambient] Failed to push model settings");
            // retry on the next change even if the value is identical
            *self.last.lock() = None;
        }
        true
    }
}
