//! Configuration types for the HI service clients.

use crate::error::HiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Maximum representable quota value. Size limiting is left to the server.
pub const MAX_QUOTA: i32 = i32::MAX;

/// Main configuration file for the HI clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HiClientConfig {
    /// Config version
    pub version: String,

    /// Named endpoint profiles
    pub profiles: HashMap<String, EndpointProfile>,
}

impl Default for HiClientConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            profiles: HashMap::new(),
        }
    }
}

impl HiClientConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HiError> {
        serde_yaml::from_str(yaml).map_err(|e| HiError::Config(format!("Invalid config: {}", e)))
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HiError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Look up a named profile.
    pub fn profile(&self, name: &str) -> Result<&EndpointProfile, HiError> {
        self.profiles
            .get(name)
            .ok_or_else(|| HiError::Config(format!("Unknown endpoint profile '{}'", name)))
    }
}

/// A named endpoint with its binding overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointProfile {
    /// Service endpoint URL (https)
    pub endpoint: String,

    /// Timeout profile used when no explicit timeouts are given
    #[serde(default)]
    pub timeout_profile: TimeoutProfile,

    /// Explicit timeout overrides
    #[serde(default)]
    pub timeouts: TimeoutOverrides,
}

impl EndpointProfile {
    /// Binding described by this profile.
    pub fn binding(&self) -> ServiceBinding {
        let mut binding = ServiceBinding::for_profile(self.timeout_profile);
        binding.timeouts = self.timeouts.apply(binding.timeouts);
        binding
    }
}

/// Per-profile timeout overrides. Unset fields keep the timeout profile's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_secs: Option<u64>,
}

impl TimeoutOverrides {
    /// Merge over `base`.
    pub fn apply(&self, base: Timeouts) -> Timeouts {
        Timeouts {
            open_secs: self.open_secs.unwrap_or(base.open_secs),
            close_secs: self.close_secs.unwrap_or(base.close_secs),
            send_secs: self.send_secs.unwrap_or(base.send_secs),
            receive_secs: self.receive_secs.unwrap_or(base.receive_secs),
        }
    }
}

/// Timeout profile for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutProfile {
    /// Single-record operations
    Interactive,
    /// Batch operations, which tolerate slow responses
    #[default]
    Batch,
}

/// Channel timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub open_secs: u64,
    pub close_secs: u64,
    pub send_secs: u64,
    pub receive_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            open_secs: 180,
            close_secs: 180,
            send_secs: 180,
            receive_secs: 600,
        }
    }
}

impl Timeouts {
    /// Defaults for the given profile.
    pub fn for_profile(profile: TimeoutProfile) -> Self {
        match profile {
            TimeoutProfile::Batch => Self::default(),
            TimeoutProfile::Interactive => Self {
                receive_secs: 180,
                ..Self::default()
            },
        }
    }

    pub fn open(&self) -> Duration {
        Duration::from_secs(self.open_secs)
    }

    pub fn close(&self) -> Duration {
        Duration::from_secs(self.close_secs)
    }

    pub fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs)
    }

    pub fn receive(&self) -> Duration {
        Duration::from_secs(self.receive_secs)
    }
}

/// Message size and depth quotas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQuotas {
    pub max_received_message_size: i32,
    pub max_buffer_size: i32,
    pub max_string_content_length: i32,
    pub max_array_length: i32,
    pub max_name_table_char_count: i32,
    pub max_bytes_per_read: i32,
    pub max_depth: i32,
}

impl Default for MessageQuotas {
    fn default() -> Self {
        Self {
            max_received_message_size: MAX_QUOTA,
            max_buffer_size: MAX_QUOTA,
            max_string_content_length: MAX_QUOTA,
            max_array_length: MAX_QUOTA,
            max_name_table_char_count: MAX_QUOTA,
            max_bytes_per_read: MAX_QUOTA,
            max_depth: MAX_QUOTA,
        }
    }
}

/// Message encoding used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    #[default]
    Text,
}

/// Transport, encoding and security configuration of a channel.
///
/// Immutable once a client has been built with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    /// Message encoding
    pub encoding: MessageEncoding,
    /// Mutual TLS: a client certificate must be presented
    pub require_client_certificate: bool,
    /// Size and depth quotas
    pub quotas: MessageQuotas,
    /// Channel timeouts
    pub timeouts: Timeouts,
}

impl Default for ServiceBinding {
    fn default() -> Self {
        Self::for_profile(TimeoutProfile::default())
    }
}

impl ServiceBinding {
    /// Binding with the default policy and the profile's timeouts.
    pub fn for_profile(profile: TimeoutProfile) -> Self {
        Self {
            encoding: MessageEncoding::Text,
            require_client_certificate: true,
            quotas: MessageQuotas::default(),
            timeouts: Timeouts::for_profile(profile),
        }
    }
}
