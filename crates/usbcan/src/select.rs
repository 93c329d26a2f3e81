//! Choosing which device to open

use common::{Error, Result};
use protocol::{ClassId, DeviceList, DeviceRecord};
use tracing::debug;

use crate::channel::{Channel, open_with};
use crate::enumerate::enumerate_with;
use crate::sys::DeviceInterfaceApi;

/// Which device a caller wants a channel to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Open this path directly, without enumerating
    Path(String),
    /// The first device whose firmware ID matches exactly
    Name(String),
    /// The first device that can be opened
    Any,
}

impl Selection {
    /// Build a selection from optional user input; a path wins over a name
    pub fn from_parts(name: Option<String>, path: Option<String>) -> Self {
        match (path, name) {
            (Some(path), _) => Selection::Path(path),
            (None, Some(name)) => Selection::Name(name),
            (None, None) => Selection::Any,
        }
    }
}

/// Resolve `selection` against the devices of `class` and open it
///
/// With [`Selection::Any`] each device is tried in discovery order; if none
/// can be opened the last open error is returned.
pub fn select_and_open_with<A: DeviceInterfaceApi>(
    api: &A,
    class: &ClassId,
    selection: &Selection,
) -> Result<Channel<A::Handle>> {
    match selection {
        Selection::Path(path) => open_with(api, &DeviceRecord::new(path.clone())),
        Selection::Name(name) => {
            let devices = discover(api, class);
            let record = devices
                .find_by_name(name)
                .ok_or_else(|| Error::DeviceNotFound(name.clone()))?;
            open_with(api, record)
        }
        Selection::Any => {
            let devices = discover(api, class);
            let mut last_error = None;
            for record in &devices {
                match open_with(api, record) {
                    Ok(channel) => return Ok(channel),
                    Err(e) => {
                        debug!("Trying next device after {}", e);
                        last_error = Some(e);
                    }
                }
            }
            Err(last_error.unwrap_or(Error::NoDevices))
        }
    }
}

fn discover<A: DeviceInterfaceApi>(api: &A, class: &ClassId) -> DeviceList {
    let mut devices = DeviceList::new();
    enumerate_with(api, class, &mut devices);
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_takes_precedence() {
        let selection = Selection::from_parts(Some("Bench".into()), Some("p".into()));
        assert_eq!(selection, Selection::Path("p".into()));
    }

    #[test]
    fn test_name_without_path() {
        let selection = Selection::from_parts(Some("Bench".into()), None);
        assert_eq!(selection, Selection::Name("Bench".into()));
        assert_eq!(Selection::from_parts(None, None), Selection::Any);
    }
}
