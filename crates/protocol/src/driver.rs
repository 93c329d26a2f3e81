//! USBCAN driver constants
//!
//! Values shared with the kernel driver. These must match the driver's
//! header byte for byte, so they are plain constants rather than anything
//! configurable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 128-bit device-interface class identifier (a Windows GUID)
///
/// Stored as the canonical big-endian `u128` so it can be written exactly as
/// it appears in registry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u128);

impl ClassId {
    /// First field of the GUID
    pub const fn data1(&self) -> u32 {
        (self.0 >> 96) as u32
    }

    /// Second field of the GUID
    pub const fn data2(&self) -> u16 {
        (self.0 >> 80) as u16
    }

    /// Third field of the GUID
    pub const fn data3(&self) -> u16 {
        (self.0 >> 64) as u16
    }

    /// Trailing eight bytes of the GUID
    pub const fn data4(&self) -> [u8; 8] {
        (self.0 as u64).to_be_bytes()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d4 = self.data4();
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1(),
            self.data2(),
            self.data3(),
            d4[0],
            d4[1],
            d4[2],
            d4[3],
            d4[4],
            d4[5],
            d4[6],
            d4[7]
        )
    }
}

/// Interface class registered by the USBCAN driver for every attached device
pub const USBCAN_INTERFACE_CLASS: ClassId = ClassId(0x6310356f_28be_4678_ab3a_e642b017e40a);

/// Capacity of the firmware ID (device name) buffer, in bytes
///
/// The driver returns the name unterminated, so the byte count it reports is
/// the only record of the string length.
pub const FWID_STRING_SIZE: usize = 80;

/// Suffix appended to a device path to reach its metadata sub-channel
pub const INFO_SUFFIX: &str = "\\INFO";

const FILE_DEVICE_UNKNOWN: u32 = 0x0000_0022;
const METHOD_BUFFERED: u32 = 0;
const FILE_ANY_ACCESS: u32 = 0;

const USBCAN_IOCTL_INDEX: u32 = 0x0000;

/// Build a Windows I/O control code (the `CTL_CODE` macro)
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Control code returning the device's firmware ID string
pub const IOCTL_USBCAN_GET_FWID: u32 = ctl_code(
    FILE_DEVICE_UNKNOWN,
    USBCAN_IOCTL_INDEX + 1,
    METHOD_BUFFERED,
    FILE_ANY_ACCESS,
);

/// Path of the `\INFO` sub-channel belonging to a device path
pub fn info_path(device_path: &str) -> String {
    let mut path = String::with_capacity(device_path.len() + INFO_SUFFIX.len());
    path.push_str(device_path);
    path.push_str(INFO_SUFFIX);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_registry_form() {
        assert_eq!(
            USBCAN_INTERFACE_CLASS.to_string(),
            "{6310356F-28BE-4678-AB3A-E642B017E40A}"
        );
    }

    #[test]
    fn test_class_id_fields() {
        let class = USBCAN_INTERFACE_CLASS;
        assert_eq!(class.data1(), 0x6310356f);
        assert_eq!(class.data2(), 0x28be);
        assert_eq!(class.data3(), 0x4678);
        assert_eq!(
            class.data4(),
            [0xab, 0x3a, 0xe6, 0x42, 0xb0, 0x17, 0xe4, 0x0a]
        );
    }

    #[test]
    fn test_get_fwid_control_code() {
        assert_eq!(IOCTL_USBCAN_GET_FWID, 0x0022_0004);
    }

    #[test]
    fn test_ctl_code_packs_all_fields() {
        // FILE_DEVICE_DISK, function 0x10, METHOD_OUT_DIRECT, FILE_READ_ACCESS
        assert_eq!(ctl_code(0x07, 0x10, 2, 1), 0x0007_4042);
    }

    #[test]
    fn test_info_path() {
        assert_eq!(info_path(r"\\?\usb#dev"), r"\\?\usb#dev\INFO");
        assert_eq!(info_path(""), r"\INFO");
    }
}
