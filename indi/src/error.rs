//! INDI error types
//!
//! Structured errors for the connection, the XML stream and property writes.

use std::fmt;
use std::time::Duration;

/// INDI client errors
#[derive(Debug, Clone)]
pub enum IndiError {
    /// Connection to INDI server failed
    ConnectionFailed(String),
    /// Connection timeout with context
    ConnectionTimeout {
        host: String,
        port: u16,
        duration: Duration,
    },
    /// Message parse timeout - partial XML message not completed
    MessageParseTimeout {
        duration: Duration,
        bytes_received: usize,
    },
    /// Property not found
    PropertyNotFound { device: String, property: String },
    /// Malformed property key (expected `device.property[.element]`)
    InvalidKey(String),
    /// Permission denied (attempted to write to read-only property)
    PermissionDenied(String),
    /// Send channel closed
    ChannelClosed(String),
    /// Not connected to server
    NotConnected,
    /// Property value out of range
    ValueOutOfRange {
        device: String,
        property: String,
        element: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl std::error::Error for IndiError {}

impl fmt::Display for IndiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndiError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            IndiError::ConnectionTimeout { host, port, duration } => {
                write!(
                    f,
                    "Connection timeout: failed to connect to {}:{} after {:?}",
                    host, port, duration
                )
            }
            IndiError::MessageParseTimeout {
                duration,
                bytes_received,
            } => {
                write!(
                    f,
                    "XML message parse timeout after {:?}: received {} bytes of incomplete message",
                    duration, bytes_received
                )
            }
            IndiError::PropertyNotFound { device, property } => {
                write!(f, "Property not found: {}.{}", device, property)
            }
            IndiError::InvalidKey(key) => {
                write!(f, "Invalid property key '{}': expected device.property[.element]", key)
            }
            IndiError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            IndiError::ChannelClosed(msg) => write!(f, "Channel closed: {}", msg),
            IndiError::NotConnected => write!(f, "Not connected to INDI server"),
            IndiError::ValueOutOfRange {
                device,
                property,
                element,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "Value {} out of range [{}, {}] for {}.{}.{}",
                    value, min, max, device, property, element
                )
            }
        }
    }
}

impl From<IndiError> for String {
    fn from(err: IndiError) -> String {
        err.to_string()
    }
}

/// Result type for INDI operations
pub type IndiResult<T> = Result<T, IndiError>;
