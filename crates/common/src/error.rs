//! Common error types

use protocol::OsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The OS refused to open a device path
    #[error("Failed to open device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: OsError,
    },

    #[error("No USBCAN device named \"{0}\" is attached")]
    DeviceNotFound(String),

    #[error("No USBCAN devices are attached")]
    NoDevices,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// OS error code behind an open failure, if that is what this is
    pub fn os_error(&self) -> Option<OsError> {
        match self {
            Error::Open { source, .. } => Some(*source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_display_carries_path_and_code() {
        let err = Error::Open {
            path: r"\\?\usb#missing".to_string(),
            source: OsError::FILE_NOT_FOUND,
        };
        let msg = format!("{}", err);
        assert!(msg.contains(r"\\?\usb#missing"));
        assert!(msg.contains("ERROR_FILE_NOT_FOUND"));
        assert_eq!(err.os_error(), Some(OsError::FILE_NOT_FOUND));
    }

    #[test]
    fn test_selection_errors_have_no_os_code() {
        let err = Error::DeviceNotFound("Bench".to_string());
        assert!(format!("{}", err).contains("\"Bench\""));
        assert!(err.os_error().is_none());
        assert!(Error::NoDevices.os_error().is_none());
    }
}
