//! INDI Protocol Client
//!
//! Minimal INDI client used by the MAPS panels to follow device properties.
//!
//! ## Features
//!
//! - Stream subscriptions by `device.property`
//! - Bounded update queue of `{device.property.element: value}` messages
//! - XML parse timeout for incomplete messages
//! - BLOB base64 decoding
//! - Property min/max extraction for number elements
//! - Permission checking before property writes

mod client;
mod error;
mod protocol;

pub use client::*;
pub use error::{IndiError, IndiResult};
pub use protocol::INDI_PROTOCOL_VERSION;

/// Default INDI server port
pub const INDI_DEFAULT_PORT: u16 = 7624;

/// Capacity of the update queue handed to consumers
pub const UPDATE_QUEUE_CAPACITY: usize = 100;

/// INDI property types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndiPropertyType {
    Text,
    Number,
    Switch,
    Light,
    Blob,
}

/// INDI property state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndiPropertyState {
    Idle,
    Ok,
    Busy,
    Alert,
}

/// An INDI property
#[derive(Debug, Clone)]
pub struct IndiProperty {
    pub device: String,
    pub name: String,
    pub label: String,
    pub group: String,
    pub property_type: IndiPropertyType,
    pub state: IndiPropertyState,
    pub perm: IndiPermission,
    pub elements: Vec<String>,
}

/// INDI property permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndiPermission {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl IndiPermission {
    /// Parse the INDI `perm` attribute; anything containing `w` is writable
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        match (s.contains('r'), s.contains('w')) {
            (_, false) => IndiPermission::ReadOnly,
            (false, true) => IndiPermission::WriteOnly,
            (true, true) => IndiPermission::ReadWrite,
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, IndiPermission::ReadOnly)
    }
}

/// Timeout configuration for INDI operations
#[derive(Debug, Clone)]
pub struct IndiTimeoutConfig {
    /// Connection timeout for initial TCP connection (default: 30 seconds)
    pub connection_timeout_secs: u64,
    /// Timeout for completing partial XML messages (default: 60 seconds)
    /// If a partial XML message is not completed within this time, the parser resets
    pub message_timeout_secs: u64,
    /// Reader poll interval used to check the connection flag (default: 5 seconds)
    pub read_poll_secs: u64,
}

impl Default for IndiTimeoutConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 30,
            message_timeout_secs: 60,
            read_poll_secs: 5,
        }
    }
}

impl IndiTimeoutConfig {
    /// Get the message timeout as a Duration
    pub fn message_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.message_timeout_secs)
    }

    /// Get the connection timeout as a Duration
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn read_poll(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_poll_secs)
    }
}

/// Split a dotted property key into `(device, property, element)`.
///
/// The element is optional; anything after the third component is kept in
/// the element name.
pub fn split_key(key: &str) -> IndiResult<(&str, &str, Option<&str>)> {
    let mut parts = key.splitn(3, '.');
    let device = parts.next().filter(|s| !s.is_empty());
    let property = parts.next().filter(|s| !s.is_empty());
    match (device, property) {
        (Some(device), Some(property)) => Ok((device, property, parts.next())),
        _ => Err(IndiError::InvalidKey(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parse() {
        assert_eq!(IndiPermission::parse("ro"), IndiPermission::ReadOnly);
        assert_eq!(IndiPermission::parse("wo"), IndiPermission::WriteOnly);
        assert_eq!(IndiPermission::parse("RW"), IndiPermission::ReadWrite);
        assert_eq!(IndiPermission::parse(""), IndiPermission::ReadOnly);
        assert!(IndiPermission::parse("rw").is_writable());
        assert!(!IndiPermission::parse("r").is_writable());
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("wfs.camera").unwrap(), ("wfs", "camera", None));
        assert_eq!(
            split_key("wfs.camera.exposure").unwrap(),
            ("wfs", "camera", Some("exposure"))
        );
        assert_eq!(
            split_key("a.b.c.d").unwrap(),
            ("a", "b", Some("c.d"))
        );
        assert!(split_key("wfs").is_err());
        assert!(split_key(".camera").is_err());
    }

    #[test]
    fn test_timeout_config_default() {
        let config = IndiTimeoutConfig::default();
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.message_timeout_secs, 60);
        assert_eq!(config.read_poll_secs, 5);
    }
}
