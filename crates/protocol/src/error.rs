//! OS error codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Native error code reported by the operating system (a Win32 error code)
///
/// Kept as the raw number so callers can log or match on it; `name()` gives
/// the symbolic name for the codes this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OsError(pub u32);

impl OsError {
    pub const INVALID_FUNCTION: OsError = OsError(1);
    pub const FILE_NOT_FOUND: OsError = OsError(2);
    pub const PATH_NOT_FOUND: OsError = OsError(3);
    pub const ACCESS_DENIED: OsError = OsError(5);
    pub const INVALID_HANDLE: OsError = OsError(6);
    pub const SHARING_VIOLATION: OsError = OsError(32);
    pub const NOT_SUPPORTED: OsError = OsError(50);
    pub const INVALID_PARAMETER: OsError = OsError(87);
    pub const INSUFFICIENT_BUFFER: OsError = OsError(122);
    pub const INVALID_NAME: OsError = OsError(123);
    pub const NO_MORE_ITEMS: OsError = OsError(259);
    pub const DEVICE_NOT_CONNECTED: OsError = OsError(1167);

    /// Raw error code
    pub fn code(&self) -> u32 {
        self.0
    }

    /// Symbolic name of well-known codes
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::INVALID_FUNCTION => "ERROR_INVALID_FUNCTION",
            Self::FILE_NOT_FOUND => "ERROR_FILE_NOT_FOUND",
            Self::PATH_NOT_FOUND => "ERROR_PATH_NOT_FOUND",
            Self::ACCESS_DENIED => "ERROR_ACCESS_DENIED",
            Self::INVALID_HANDLE => "ERROR_INVALID_HANDLE",
            Self::SHARING_VIOLATION => "ERROR_SHARING_VIOLATION",
            Self::NOT_SUPPORTED => "ERROR_NOT_SUPPORTED",
            Self::INVALID_PARAMETER => "ERROR_INVALID_PARAMETER",
            Self::INSUFFICIENT_BUFFER => "ERROR_INSUFFICIENT_BUFFER",
            Self::INVALID_NAME => "ERROR_INVALID_NAME",
            Self::NO_MORE_ITEMS => "ERROR_NO_MORE_ITEMS",
            Self::DEVICE_NOT_CONNECTED => "ERROR_DEVICE_NOT_CONNECTED",
            _ => return None,
        };
        Some(name)
    }

    /// Whether another opener already holds the object
    pub fn is_sharing_violation(&self) -> bool {
        *self == Self::SHARING_VIOLATION
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "system error {} ({:#x})", self.0, self.0),
        }
    }
}

impl std::error::Error for OsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_error_display() {
        let msg = format!("{}", OsError::SHARING_VIOLATION);
        assert_eq!(msg, "ERROR_SHARING_VIOLATION (32)");
    }

    #[test]
    fn test_unknown_error_display() {
        let msg = format!("{}", OsError(0x1f));
        assert!(msg.contains("31"));
        assert!(msg.contains("0x1f"));
        assert!(OsError(0x1f).name().is_none());
    }

    #[test]
    fn test_sharing_violation_predicate() {
        assert!(OsError(32).is_sharing_violation());
        assert!(!OsError::FILE_NOT_FOUND.is_sharing_violation());
        assert_eq!(OsError::FILE_NOT_FOUND.code(), 2);
    }
}
