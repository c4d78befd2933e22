//! Error types for record marshaling and device operations.

use std::io;

/// Result type for device configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while marshaling records or talking to the
/// device configuration backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation was invoked with the wrong number of arguments.
    #[error("{operation}: expected {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// The operation that was invoked.
        operation: &'static str,
        /// Number of arguments the operation takes.
        expected: usize,
        /// Number of arguments actually passed.
        actual: usize,
    },

    /// An operation argument had the wrong type.
    #[error("{operation}: argument {index} must be {expected}")]
    ArgumentType {
        /// The operation that was invoked.
        operation: &'static str,
        /// Zero-based argument position.
        index: usize,
        /// Expected type of the argument.
        expected: &'static str,
    },

    /// A record field was missing or had the wrong type.
    #[error("field {field}: expected {expected}")]
    FieldType {
        /// The record field that failed validation.
        field: &'static str,
        /// Expected type of the field.
        expected: &'static str,
    },

    /// An address family tag was unrecognized, or an address did not
    /// parse under its declared family.
    #[error("address family error: {0}")]
    AddressFamily(String),

    /// An endpoint string was not in `ip:port` form.
    #[error("endpoint format error: {0}")]
    EndpointFormat(String),

    /// A key was not valid base64 or decoded to the wrong length.
    #[error("key format error: {0}")]
    KeyFormat(String),

    /// A nested record failed to convert into a native structure.
    #[error("failed to convert {entity} record: {source}")]
    Conversion {
        /// The entity kind that failed ("device", "peer", "allowed ip").
        entity: &'static str,
        /// The underlying field or element failure.
        #[source]
        source: Box<Error>,
    },

    /// The device configuration backend rejected an operation.
    #[error("{operation}: {message}")]
    Call {
        /// The backend operation that failed.
        operation: &'static str,
        /// Human-readable failure description.
        message: String,
    },

    /// No device with the given name exists.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// The device name that was not found.
        name: String,
    },

    /// An interface name failed validation.
    #[error("invalid device name: {0}")]
    DeviceName(String),

    /// I/O error from socket or filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap a nested element failure in an entity conversion error.
    pub fn conversion(entity: &'static str, source: Error) -> Self {
        Self::Conversion {
            entity,
            source: Box::new(source),
        }
    }

    /// Create a backend call error.
    pub fn call(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Call {
            operation,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DeviceNotFound { .. })
    }

    /// Check if this is a validation error detected before any backend
    /// call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ArgumentCount { .. }
                | Self::ArgumentType { .. }
                | Self::FieldType { .. }
                | Self::AddressFamily(_)
                | Self::EndpointFormat(_)
                | Self::KeyFormat(_)
                | Self::Conversion { .. }
                | Self::DeviceName(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::ArgumentCount {
            operation: "getDevice",
            expected: 1,
            actual: 0,
        };
        assert_eq!(err.to_string(), "getDevice: expected 1 argument(s), got 0");

        let err = Error::FieldType {
            field: "listenPort",
            expected: "number",
        };
        assert_eq!(err.to_string(), "field listenPort: expected number");

        let err = Error::DeviceNotFound {
            name: "wg0".into(),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn test_conversion_wraps_source() {
        let inner = Error::AddressFamily("unrecognized address family tag 99".into());
        let err = Error::conversion("allowed ip", inner);
        let msg = err.to_string();
        assert!(msg.contains("allowed ip"));
        assert!(msg.contains("99"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_backend_errors_are_not_validation() {
        assert!(!Error::call("setDevice", "kernel rejected config").is_validation());
        assert!(!Error::DeviceNotFound { name: "wg9".into() }.is_validation());
    }
}
