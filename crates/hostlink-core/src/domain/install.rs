//! Tool install descriptors received through `mcp.install` deep links.
//!
//! The host hands over `{ name, config }` where `config` is base64-encoded
//! JSON. The decoded object is kept verbatim; this module only adds a typed
//! view over the fields that decide whether the install needs confirmation.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Standard alphabet, padding optional (deep links often drop it)
const DESCRIPTOR_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Transport value that executes a local command
pub const STDIO_TRANSPORT: &str = "stdio";

/// Reasons an install descriptor is discarded
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("descriptor is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("descriptor is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("descriptor is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("descriptor is not a JSON object")]
    NotAnObject,

    #[error("descriptor has no transport")]
    MissingTransport,

    #[error("stdio descriptor has no command")]
    MissingCommand,
}

/// Raw `mcp.install` payload as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpInstallPayload {
    pub name: String,
    /// base64(JSON descriptor)
    pub config: String,
}

impl McpInstallPayload {
    pub fn new(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
        }
    }

    /// Build a payload from a plain JSON descriptor (used by host adapters and tests).
    pub fn encode(name: impl Into<String>, descriptor: &Value) -> Self {
        Self::new(name, DESCRIPTOR_ENGINE.encode(descriptor.to_string()))
    }
}

/// Transport classification of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    Stdio,
    Other(String),
}

impl Transport {
    pub fn parse(value: &str) -> Self {
        if value == STDIO_TRANSPORT {
            Self::Stdio
        } else {
            Self::Other(value.to_string())
        }
    }

    /// Whether installing requires explicit user confirmation
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Stdio)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stdio => STDIO_TRANSPORT,
            Self::Other(s) => s,
        }
    }
}

/// Decoded tool descriptor.
///
/// Serializes back to exactly the object that was decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolDescriptor(Map<String, Value>);

impl ToolDescriptor {
    /// Decode `base64(JSON)` into a descriptor.
    pub fn decode(encoded: &str) -> Result<Self, InstallError> {
        let bytes = DESCRIPTOR_ENGINE.decode(encoded.trim())?;
        let text = String::from_utf8(bytes)?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, InstallError> {
        let Value::Object(map) = value else {
            return Err(InstallError::NotAnObject);
        };

        // a non-string transport cannot be classified, so it is dropped
        // rather than forwarded as a non-stdio install
        let transport = match map.get("transport") {
            Some(Value::String(t)) if !t.is_empty() => Transport::parse(t),
            _ => return Err(InstallError::MissingTransport),
        };

        if transport == Transport::Stdio
            && !matches!(map.get("command"), Some(Value::String(c)) if !c.is_empty())
        {
            return Err(InstallError::MissingCommand);
        }

        Ok(Self(map))
    }

    pub fn transport(&self) -> Transport {
        match self.0.get("transport") {
            Some(Value::String(t)) => Transport::parse(t),
            // from_value rejects descriptors without a string transport
            _ => Transport::Other(String::new()),
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.0.get("command").and_then(Value::as_str)
    }

    /// Command arguments in order; non-string entries are rendered as JSON.
    pub fn args(&self) -> Vec<String> {
        match self.0.get("args") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `command arg1 arg2 ...`, what the confirmation prompt shows
    pub fn command_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(command) = self.command() {
            parts.push(command.to_string());
        }
        parts.extend(self.args());
        parts.join(" ")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// A decoded install request, either pending confirmation or forwarded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInstallRequest {
    pub name: String,
    pub config: ToolDescriptor,
}

impl ToolInstallRequest {
    pub fn new(name: impl Into<String>, config: ToolDescriptor) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Decode a host payload.
    pub fn from_payload(payload: &McpInstallPayload) -> Result<Self, InstallError> {
        let config = ToolDescriptor::decode(&payload.config)?;
        Ok(Self::new(payload.name.clone(), config))
    }

    pub fn requires_confirmation(&self) -> bool {
        self.config.transport().requires_confirmation()
    }
}
