//! Exclusive data channel to one device

use std::fmt;

use common::{Error, Result};
use protocol::DeviceRecord;
use tracing::{debug, warn};

use crate::sys::{DeviceInterfaceApi, OpenOptions};

/// An open data channel
///
/// The device is opened once, exclusively and for overlapped I/O. The same
/// handle serves as both the output (host to device) and input (device to
/// host) direction. Dropping the channel closes the handle.
pub struct Channel<H> {
    handle: H,
    record: DeviceRecord,
}

impl<H> Channel<H> {
    /// Handle used for host-to-device traffic
    pub fn output(&self) -> &H {
        &self.handle
    }

    /// Handle used for device-to-host traffic
    pub fn input(&self) -> &H {
        &self.handle
    }

    /// Device this channel was opened on
    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn path(&self) -> &str {
        self.record.path()
    }

    /// Close the channel, releasing exclusive access
    pub fn close(self) {
        debug!("Closing channel to {}", self.record.path());
    }

    /// Take ownership of the underlying handle
    pub fn into_inner(self) -> H {
        self.handle
    }
}

impl<H: fmt::Debug> fmt::Debug for Channel<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("path", &self.record.path())
            .field("name", &self.record.name())
            .field("handle", &self.handle)
            .finish()
    }
}

/// Open the data channel of `record`
///
/// Only the path is used; the name may be empty. A failed open carries the
/// OS error code, e.g. a sharing violation when someone else holds the device.
pub fn open_with<A: DeviceInterfaceApi>(
    api: &A,
    record: &DeviceRecord,
) -> Result<Channel<A::Handle>> {
    let handle = api
        .open(record.path(), OpenOptions::CHANNEL)
        .map_err(|source| {
            warn!("Failed to open {}: {}", record.path(), source);
            Error::Open {
                path: record.path().to_string(),
                source,
            }
        })?;

    debug!("Opened channel to {}", record.path());
    Ok(Channel {
        handle,
        record: record.clone(),
    })
}
