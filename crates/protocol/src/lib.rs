//! Driver interface library for usbcan-rs
//!
//! This crate defines what the USBCAN kernel driver exposes to user space:
//! the device-interface class GUID it registers, the control codes accepted on
//! a device's `\INFO` sub-channel, and the plain data types used to describe
//! discovered devices.
//!
//! Nothing in here talks to the operating system; see the `usbcan` crate for
//! enumeration and channel opening.
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceList, DeviceRecord, USBCAN_INTERFACE_CLASS};
//!
//! let mut devices = DeviceList::new();
//! devices.push(DeviceRecord::with_name(r"\\?\usb#vid_16d0&pid_0577#1", "Bench"));
//!
//! assert_eq!(devices.len(), 1);
//! assert_eq!(
//!     USBCAN_INTERFACE_CLASS.to_string(),
//!     "{6310356F-28BE-4678-AB3A-E642B017E40A}"
//! );
//! ```

pub mod driver;
pub mod error;
pub mod types;

pub use driver::{
    ClassId, FWID_STRING_SIZE, INFO_SUFFIX, IOCTL_USBCAN_GET_FWID, USBCAN_INTERFACE_CLASS,
    ctl_code, info_path,
};
pub use error::OsError;
pub use types::{DeviceList, DeviceRecord};
