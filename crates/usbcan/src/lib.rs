//! USBCAN device discovery and channel opening
//!
//! Finds every attached USBCAN adapter, reads the name each one reports, and
//! opens an exclusive overlapped channel to a chosen device.
//!
//! The functions without a suffix talk to the real operating system. The
//! `_with` variants take any [`DeviceInterfaceApi`], which is how the
//! [`test_utils::MockBus`] drives them in tests.
//!
//! # Example
//!
//! ```no_run
//! use usbcan::Selection;
//!
//! for device in &usbcan::devices() {
//!     println!("{}  {}", device.name(), device.path());
//! }
//!
//! let channel = usbcan::select_and_open(&Selection::Any)?;
//! println!("using {}", channel.path());
//! channel.close();
//! # Ok::<(), common::Error>(())
//! ```

pub mod channel;
pub mod enumerate;
pub mod select;
pub mod sys;
pub mod test_utils;

pub use channel::{Channel, open_with};
pub use enumerate::enumerate_with;
pub use select::{Selection, select_and_open_with};
pub use sys::{DeviceHandle, DeviceInterfaceApi, OpenOptions, PlatformApi, Resolution, ShareMode};

use common::Result;
use protocol::{DeviceList, DeviceRecord, USBCAN_INTERFACE_CLASS};

/// Channel to a real device
pub type DeviceChannel = Channel<DeviceHandle>;

/// Append every attached USBCAN device to `devices`
///
/// Returns how many were added. Devices that cannot be identified are
/// skipped.
pub fn enumerate(devices: &mut DeviceList) -> usize {
    enumerate_with(&PlatformApi, &USBCAN_INTERFACE_CLASS, devices)
}

/// All attached USBCAN devices, in discovery order
pub fn devices() -> DeviceList {
    let mut devices = DeviceList::new();
    enumerate(&mut devices);
    devices
}

/// Open the data channel of a device
pub fn open(record: &DeviceRecord) -> Result<DeviceChannel> {
    open_with(&PlatformApi, record)
}

/// Pick a device and open its data channel
pub fn select_and_open(selection: &Selection) -> Result<DeviceChannel> {
    select_and_open_with(&PlatformApi, &USBCAN_INTERFACE_CLASS, selection)
}
