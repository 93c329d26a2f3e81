//! In-memory device bus for testing
//!
//! [`MockBus`] implements [`DeviceInterfaceApi`] over a scripted list of
//! interfaces. It tracks every resource it hands out so tests can check that
//! enumeration and opening release what they acquire, and it enforces
//! exclusive opens the way the OS does.
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceList, USBCAN_INTERFACE_CLASS};
//! use usbcan::enumerate_with;
//! use usbcan::test_utils::MockBus;
//!
//! let bus = MockBus::new()
//!     .with_device(r"\\?\usb#a", "Bench")
//!     .with_device(r"\\?\usb#b", "Car");
//!
//! let mut devices = DeviceList::new();
//! assert_eq!(enumerate_with(&bus, &USBCAN_INTERFACE_CLASS, &mut devices), 2);
//! assert_eq!(devices.get(1).map(|d| d.name()), Some("Car"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::{ClassId, IOCTL_USBCAN_GET_FWID, OsError, USBCAN_INTERFACE_CLASS, info_path};

use crate::sys::{DeviceInterfaceApi, OpenOptions, Resolution, ShareMode};

/// How the path of a mock interface resolves
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathBehavior {
    Resolves,
    /// The path comes back from the size query itself
    ImmediatePath,
    SizeQueryFails(OsError),
    DetailFails(OsError),
    /// The fetch asks for a larger buffer than the size query reported
    GrowsBetweenCalls,
    /// The interface is gone by the time the path is fetched
    VanishesBeforeFetch,
}

/// What the `\INFO` sub-channel of a mock interface does
#[derive(Debug, Clone, PartialEq, Eq)]
enum InfoBehavior {
    Fwid(Vec<u8>),
    Missing,
    ControlFails(OsError),
}

/// One scripted device interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockInterface {
    path: String,
    resolve: PathBehavior,
    info: InfoBehavior,
}

impl MockInterface {
    /// Well-behaved device reporting `name` as its firmware ID
    ///
    /// The name is sent as 8-bit characters; anything above U+00FF becomes `?`.
    pub fn device(path: impl Into<String>, name: &str) -> Self {
        let fwid: Vec<u8> = name
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        Self::with_fwid(path, &fwid)
    }

    /// Device reporting raw firmware ID bytes
    pub fn with_fwid(path: impl Into<String>, fwid: &[u8]) -> Self {
        Self {
            path: path.into(),
            resolve: PathBehavior::Resolves,
            info: InfoBehavior::Fwid(fwid.to_vec()),
        }
    }

    /// Device whose `\INFO` sub-channel does not exist
    pub fn without_info(path: impl Into<String>) -> Self {
        Self {
            info: InfoBehavior::Missing,
            ..Self::device(path, "")
        }
    }

    /// Device whose firmware ID request fails
    pub fn control_fails(path: impl Into<String>, error: OsError) -> Self {
        Self {
            info: InfoBehavior::ControlFails(error),
            ..Self::device(path, "")
        }
    }

    /// Interface whose path size cannot be queried
    pub fn unresolvable(path: impl Into<String>, error: OsError) -> Self {
        Self {
            resolve: PathBehavior::SizeQueryFails(error),
            ..Self::device(path, "")
        }
    }

    /// Interface whose size query works but whose path retrieval fails
    pub fn detail_fails(path: impl Into<String>, error: OsError) -> Self {
        Self {
            resolve: PathBehavior::DetailFails(error),
            ..Self::device(path, "")
        }
    }

    /// Interface whose path is returned without a size round trip
    pub fn immediate_path(path: impl Into<String>, name: &str) -> Self {
        Self {
            resolve: PathBehavior::ImmediatePath,
            ..Self::device(path, name)
        }
    }

    /// Interface whose path grows between the size query and the fetch
    pub fn grows_between_calls(path: impl Into<String>) -> Self {
        Self {
            resolve: PathBehavior::GrowsBetweenCalls,
            ..Self::device(path, "")
        }
    }

    /// Interface that disappears between the size query and the fetch
    pub fn vanishes_before_fetch(path: impl Into<String>) -> Self {
        Self {
            resolve: PathBehavior::VanishesBeforeFetch,
            ..Self::device(path, "")
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bytes needed to hold the path: a u32 header plus NUL-terminated UTF-16
    fn required_size(&self) -> usize {
        4 + (self.path.encode_utf16().count() + 1) * 2
    }
}

/// Resource counters of a [`MockBus`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub sets_opened: usize,
    pub sets_released: usize,
    pub path_buffers_allocated: usize,
    pub path_buffers_freed: usize,
    pub handles_opened: usize,
    pub handles_closed: usize,
    pub control_requests: usize,
}

#[derive(Debug)]
struct OpenEntry {
    path: String,
    share: ShareMode,
}

#[derive(Debug, Default)]
struct BusState {
    interfaces: Vec<MockInterface>,
    class: Option<ClassId>,
    set_error: Option<OsError>,
    stats: MockStats,
    next_handle: u64,
    handles: HashMap<u64, OpenEntry>,
    open_log: Vec<(String, OpenOptions)>,
}

impl BusState {
    fn device_exists(&self, path: &str) -> bool {
        self.interfaces.iter().any(|iface| iface.path == path)
    }

    fn info_target(&self, path: &str) -> Option<&MockInterface> {
        self.interfaces
            .iter()
            .find(|iface| iface.info != InfoBehavior::Missing && info_path(&iface.path) == path)
    }
}

/// Scripted stand-in for the OS device-interface layer
///
/// Clones share state, so a test can keep one clone for inspection while
/// another is used by the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interface to the enumeration order
    pub fn with_interface(self, interface: MockInterface) -> Self {
        self.lock().interfaces.push(interface);
        self
    }

    pub fn with_device(self, path: impl Into<String>, name: &str) -> Self {
        self.with_interface(MockInterface::device(path, name))
    }

    /// Make the interface set itself unavailable
    pub fn failing_device_set(self, error: OsError) -> Self {
        self.lock().set_error = Some(error);
        self
    }

    /// Only answer for `class`; other classes enumerate as empty
    pub fn for_class(self, class: ClassId) -> Self {
        self.lock().class = Some(class);
        self
    }

    /// Unplug the device at `path`
    pub fn remove(&self, path: &str) {
        self.lock().interfaces.retain(|iface| iface.path != path);
    }

    pub fn stats(&self) -> MockStats {
        self.lock().stats
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.lock().handles.len()
    }

    /// Every open attempt so far, successful or not
    pub fn open_log(&self) -> Vec<(String, OpenOptions)> {
        self.lock().open_log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interface set of a [`MockBus`]; counted as released on drop
pub struct MockDeviceSet {
    state: Arc<Mutex<BusState>>,
    empty: bool,
}

impl Drop for MockDeviceSet {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.sets_released += 1;
    }
}

/// Path buffer of a [`MockBus`]; counted as freed on drop
pub struct MockPathBuffer {
    state: Arc<Mutex<BusState>>,
    capacity: usize,
}

impl MockPathBuffer {
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for MockPathBuffer {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.path_buffers_freed += 1;
    }
}

/// Handle of a [`MockBus`]; closed on drop
pub struct MockHandle {
    id: u64,
    path: String,
    state: Arc<Mutex<BusState>>,
}

impl MockHandle {
    /// Unique identity of this open
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PartialEq for MockHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MockHandle {}

impl fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.handles.remove(&self.id).is_some() {
            state.stats.handles_closed += 1;
        }
    }
}

impl DeviceInterfaceApi for MockBus {
    type DeviceSet = MockDeviceSet;
    type PathBuffer = MockPathBuffer;
    type Handle = MockHandle;

    fn device_set(&self, class: &ClassId) -> Result<MockDeviceSet, OsError> {
        let mut state = self.lock();
        if let Some(error) = state.set_error {
            return Err(error);
        }
        state.stats.sets_opened += 1;
        let expected = state.class.unwrap_or(USBCAN_INTERFACE_CLASS);
        Ok(MockDeviceSet {
            state: Arc::clone(&self.state),
            empty: *class != expected,
        })
    }

    fn resolve_interface(
        &self,
        set: &MockDeviceSet,
        index: u32,
        buffer: Option<&mut MockPathBuffer>,
    ) -> Resolution {
        if set.empty {
            return Resolution::NoEntry;
        }
        let state = self.lock();
        let Some(iface) = state.interfaces.get(index as usize) else {
            return Resolution::NoEntry;
        };

        match (&iface.resolve, buffer) {
            (PathBehavior::SizeQueryFails(error), _) => Resolution::Failed(*error),
            (PathBehavior::ImmediatePath, _) => Resolution::Path(iface.path.clone()),
            (_, None) => Resolution::NeedsBuffer(iface.required_size()),
            (PathBehavior::DetailFails(error), Some(_)) => Resolution::Failed(*error),
            (PathBehavior::GrowsBetweenCalls, Some(buffer)) => {
                Resolution::NeedsBuffer(buffer.capacity + 2)
            }
            (PathBehavior::VanishesBeforeFetch, Some(_)) => Resolution::NoEntry,
            (PathBehavior::Resolves, Some(buffer)) => {
                if buffer.capacity < iface.required_size() {
                    Resolution::Failed(OsError::INSUFFICIENT_BUFFER)
                } else {
                    Resolution::Path(iface.path.clone())
                }
            }
        }
    }

    fn alloc_path_buffer(&self, size: usize) -> MockPathBuffer {
        self.lock().stats.path_buffers_allocated += 1;
        MockPathBuffer {
            state: Arc::clone(&self.state),
            capacity: size,
        }
    }

    fn open(&self, path: &str, options: OpenOptions) -> Result<MockHandle, OsError> {
        let mut state = self.lock();
        state.open_log.push((path.to_string(), options));

        if path.contains('\0') {
            return Err(OsError::INVALID_NAME);
        }
        if !state.device_exists(path) && state.info_target(path).is_none() {
            return Err(OsError::FILE_NOT_FOUND);
        }

        let conflict = state.handles.values().any(|open| {
            open.path == path
                && (open.share == ShareMode::Exclusive || options.share == ShareMode::Exclusive)
        });
        if conflict {
            return Err(OsError::SHARING_VIOLATION);
        }

        state.next_handle += 1;
        let id = state.next_handle;
        state.handles.insert(
            id,
            OpenEntry {
                path: path.to_string(),
                share: options.share,
            },
        );
        state.stats.handles_opened += 1;

        Ok(MockHandle {
            id,
            path: path.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn control(
        &self,
        handle: &MockHandle,
        code: u32,
        output: &mut [u8],
    ) -> Result<usize, OsError> {
        let mut state = self.lock();
        state.stats.control_requests += 1;

        if !state.handles.contains_key(&handle.id) {
            return Err(OsError::INVALID_HANDLE);
        }
        if code != IOCTL_USBCAN_GET_FWID {
            return Err(OsError::INVALID_FUNCTION);
        }
        let Some(iface) = state.info_target(&handle.path) else {
            return Err(OsError::INVALID_FUNCTION);
        };

        match &iface.info {
            InfoBehavior::Fwid(fwid) => {
                let len = fwid.len().min(output.len());
                output[..len].copy_from_slice(&fwid[..len]);
                Ok(len)
            }
            InfoBehavior::ControlFails(error) => Err(*error),
            InfoBehavior::Missing => Err(OsError::INVALID_FUNCTION),
        }
    }
}
