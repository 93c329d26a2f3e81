//! Device discovery
//!
//! Walks every present interface of the USBCAN class, resolves its path with
//! the two-call size pattern, and asks the device for its firmware ID through
//! the `\INFO` sub-channel. Interfaces that fail at any step are logged and
//! skipped; discovery itself never fails.

use protocol::{
    ClassId, DeviceList, DeviceRecord, FWID_STRING_SIZE, IOCTL_USBCAN_GET_FWID, info_path,
};
use tracing::{debug, info, trace};

use crate::sys::{DeviceInterfaceApi, OpenOptions, Resolution};

/// What the path stage decided for one interface index
enum PathStep {
    End,
    Skip,
    Path(String),
}

/// Append every identifiable device of `class` to `devices`
///
/// Existing entries are kept; new ones are appended in OS enumeration order.
/// Returns the number of records added.
pub fn enumerate_with<A: DeviceInterfaceApi>(
    api: &A,
    class: &ClassId,
    devices: &mut DeviceList,
) -> usize {
    let set = match api.device_set(class) {
        Ok(set) => set,
        Err(e) => {
            debug!("No interface set for class {}: {}", class, e);
            return 0;
        }
    };

    let before = devices.len();
    devices.extend(
        (0..=u32::MAX)
            .map_while(|index| match resolve_path(api, &set, index) {
                PathStep::End => None,
                PathStep::Skip => Some(None),
                PathStep::Path(path) => Some(Some((index, path))),
            })
            .flatten()
            .filter_map(|(index, path)| identify(api, index, path)),
    );
    let added = devices.len() - before;

    info!("Found {} USBCAN device(s)", added);
    added
}

/// Resolve the path of the interface at `index`
///
/// The path buffer lives only for this call, so it is released whichever
/// way resolution ends.
fn resolve_path<A: DeviceInterfaceApi>(api: &A, set: &A::DeviceSet, index: u32) -> PathStep {
    let size = match api.resolve_interface(set, index, None) {
        Resolution::NoEntry => return PathStep::End,
        Resolution::NeedsBuffer(size) => size,
        // Some backends hand the path over without a size round trip
        Resolution::Path(path) => return PathStep::Path(path),
        Resolution::Failed(e) => {
            debug!("Skipping interface {}: path size query failed: {}", index, e);
            return PathStep::Skip;
        }
    };

    let mut buffer = api.alloc_path_buffer(size);
    match api.resolve_interface(set, index, Some(&mut buffer)) {
        Resolution::Path(path) => {
            trace!("Interface {} resolved to {}", index, path);
            PathStep::Path(path)
        }
        Resolution::Failed(e) => {
            debug!("Skipping interface {}: path query failed: {}", index, e);
            PathStep::Skip
        }
        Resolution::NeedsBuffer(grown) => {
            debug!(
                "Skipping interface {}: path grew from {} to {} bytes",
                index, size, grown
            );
            PathStep::Skip
        }
        Resolution::NoEntry => {
            debug!("Skipping interface {}: removed during enumeration", index);
            PathStep::Skip
        }
    }
}

/// Read the firmware ID of the device behind `path`
fn identify<A: DeviceInterfaceApi>(api: &A, index: u32, path: String) -> Option<DeviceRecord> {
    let info = info_path(&path);
    let handle = match api.open(&info, OpenOptions::INFO) {
        Ok(handle) => handle,
        Err(e) => {
            debug!("Skipping interface {}: cannot open {}: {}", index, info, e);
            return None;
        }
    };

    let mut fwid = [0u8; FWID_STRING_SIZE];
    let result = api.control(&handle, IOCTL_USBCAN_GET_FWID, &mut fwid);
    drop(handle);

    match result {
        Ok(len) => {
            let record = DeviceRecord::from_fwid(path, &fwid[..len.min(FWID_STRING_SIZE)]);
            debug!("Discovered {:?} at {}", record.name(), record.path());
            Some(record)
        }
        Err(e) => {
            debug!("Skipping interface {}: firmware ID query failed: {}", index, e);
            None
        }
    }
}
