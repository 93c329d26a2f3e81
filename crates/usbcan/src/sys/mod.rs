//! Operating system device-interface layer
//!
//! Everything the enumerator and opener need from the OS goes through
//! [`DeviceInterfaceApi`]. The platform backend is picked at compile time:
//!
//! - **Windows**: SetupAPI interface enumeration, `CreateFileW` and
//!   `DeviceIoControl`
//! - **Everything else**: no USBCAN driver exists, so every call reports
//!   `ERROR_NOT_SUPPORTED` (enumeration finds nothing, opening fails)
//!
//! Transient resources handed out by the trait (interface sets, path buffers,
//! handles) release themselves on drop, so scoping a value to one loop
//! iteration is enough to guarantee it is released on every exit path.

use protocol::{ClassId, OsError};

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod win32;
        pub use self::win32::{DetailBuffer, DeviceHandle, InterfaceSet, SetupApi as PlatformApi};
    } else {
        mod unsupported;
        pub use self::unsupported::{DeviceHandle, UnsupportedApi as PlatformApi};
    }
}

/// Outcome of resolving the interface at one index to a system path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A buffer of this many bytes is needed to hold the path
    NeedsBuffer(usize),
    /// The interface resolved to this path
    Path(String),
    /// There is no interface at this index; the scan is over
    NoEntry,
    /// The interface exists but its path could not be resolved
    Failed(OsError),
}

/// Sharing mode requested when opening an OS object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Nobody else may open the object while we hold it
    Exclusive,
    /// Other readers and writers may open it concurrently
    ReadWrite,
}

/// How to open a device path
///
/// Access is always read/write and the object must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    pub share: ShareMode,
    /// Open for overlapped (asynchronous) I/O
    pub overlapped: bool,
}

impl OpenOptions {
    /// The `\INFO` metadata sub-channel: shared, synchronous
    pub const INFO: OpenOptions = OpenOptions {
        share: ShareMode::ReadWrite,
        overlapped: false,
    };

    /// The data channel: exclusive, overlapped
    pub const CHANNEL: OpenOptions = OpenOptions {
        share: ShareMode::Exclusive,
        overlapped: true,
    };
}

/// Device-interface primitives consumed from the operating system
pub trait DeviceInterfaceApi {
    /// Enumeration session over the present interfaces of one class
    type DeviceSet;
    /// Scratch buffer receiving an interface path
    type PathBuffer;
    /// Open I/O object
    type Handle;

    /// Start enumerating the present interfaces of `class`
    fn device_set(&self, class: &ClassId) -> Result<Self::DeviceSet, OsError>;

    /// Resolve the interface at `index`
    ///
    /// Called without a buffer to learn the size required, then again with a
    /// buffer from [`alloc_path_buffer`](Self::alloc_path_buffer).
    fn resolve_interface(
        &self,
        set: &Self::DeviceSet,
        index: u32,
        buffer: Option<&mut Self::PathBuffer>,
    ) -> Resolution;

    fn alloc_path_buffer(&self, size: usize) -> Self::PathBuffer;

    /// Open an existing object for read/write access
    fn open(&self, path: &str, options: OpenOptions) -> Result<Self::Handle, OsError>;

    /// Issue a control request with no input payload
    ///
    /// Returns the number of bytes the device wrote into `output`.
    fn control(&self, handle: &Self::Handle, code: u32, output: &mut [u8])
    -> Result<usize, OsError>;
}

/// NUL-terminated UTF-16 copy of a path, as the wide Win32 calls expect
///
/// An interior NUL would silently truncate the path, so it is rejected.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn to_wide_nul(path: &str) -> Result<Vec<u16>, OsError> {
    if path.contains('\0') {
        return Err(OsError::INVALID_NAME);
    }
    Ok(path.encode_utf16().chain(std::iter::once(0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_path_is_nul_terminated() {
        let wide = to_wide_nul(r"\\?\usb#a").unwrap();
        assert_eq!(wide.last(), Some(&0));
        assert_eq!(wide.len(), r"\\?\usb#a".len() + 1);
        assert_eq!(String::from_utf16_lossy(&wide[..wide.len() - 1]), r"\\?\usb#a");
    }

    #[test]
    fn test_wide_path_rejects_interior_nul() {
        assert_eq!(to_wide_nul("abc\0def"), Err(OsError::INVALID_NAME));
    }

    #[test]
    fn test_open_options() {
        assert_eq!(OpenOptions::CHANNEL.share, ShareMode::Exclusive);
        assert!(OpenOptions::CHANNEL.overlapped);
        assert_eq!(OpenOptions::INFO.share, ShareMode::ReadWrite);
        assert!(!OpenOptions::INFO.overlapped);
    }
}
