//! Device data model
//!
//! Plain types describing USBCAN devices as seen by the host, independent of
//! how they were discovered.

use serde::{Deserialize, Serialize};

use crate::driver::FWID_STRING_SIZE;

/// One discovered or addressable USBCAN device
///
/// The path identifies the device instance for the current boot session only;
/// nothing here is stable across unplug/replug. The name is whatever the
/// device reports as its firmware ID and is not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    path: String,
    name: String,
}

impl DeviceRecord {
    /// Create a record for a path that is already known (name left empty)
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: String::new(),
        }
    }

    /// Create a record with a known identity string
    ///
    /// Names longer than [`FWID_STRING_SIZE`] characters are truncated, the
    /// same bound a device-reported name has.
    pub fn with_name(path: impl Into<String>, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if let Some((end, _)) = name.char_indices().nth(FWID_STRING_SIZE) {
            name.truncate(end);
        }
        Self {
            path: path.into(),
            name,
        }
    }

    /// Build a record from the raw firmware ID bytes returned by the driver
    ///
    /// The driver hands back 8-bit characters with no encoding attached. At
    /// most [`FWID_STRING_SIZE`] bytes are used and each byte becomes one
    /// character (Latin-1), so nothing is lost and the name never exceeds
    /// [`FWID_STRING_SIZE`] characters.
    pub fn from_fwid(path: impl Into<String>, fwid: &[u8]) -> Self {
        let len = fwid.len().min(FWID_STRING_SIZE);
        Self {
            path: path.into(),
            name: fwid[..len].iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// OS object path of the device
    pub fn path(&self) -> &str {
        &self.path
    }

    /// User-facing identity string, possibly empty
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered collection of device records, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceList {
    devices: Vec<DeviceRecord>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of the list
    pub fn push(&mut self, record: DeviceRecord) {
        self.devices.push(record);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceRecord> {
        self.devices.get(index)
    }

    pub fn first(&self) -> Option<&DeviceRecord> {
        self.devices.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }

    /// First record whose name matches exactly
    pub fn find_by_name(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|record| record.name == name)
    }

    /// First record with the given path
    pub fn find_by_path(&self, path: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|record| record.path == path)
    }

}

impl Extend<DeviceRecord> for DeviceList {
    fn extend<I: IntoIterator<Item = DeviceRecord>>(&mut self, iter: I) {
        self.devices.extend(iter);
    }
}

impl FromIterator<DeviceRecord> for DeviceList {
    fn from_iter<I: IntoIterator<Item = DeviceRecord>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DeviceList {
    type Item = DeviceRecord;
    type IntoIter = std::vec::IntoIter<DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_known_path_has_empty_name() {
        let record = DeviceRecord::new(r"\\?\usb#a");
        assert_eq!(record.path(), r"\\?\usb#a");
        assert!(record.name().is_empty());
    }

    #[test]
    fn test_record_from_fwid_uses_reported_bytes() {
        let record = DeviceRecord::from_fwid("p", b"Bench Adapter");
        assert_eq!(record.name(), "Bench Adapter");
    }

    #[test]
    fn test_record_from_fwid_truncates_to_buffer_size() {
        let long = [b'x'; 120];
        let record = DeviceRecord::from_fwid("p", &long);
        assert_eq!(record.name().len(), FWID_STRING_SIZE);
    }

    #[test]
    fn test_record_from_fwid_keeps_high_bytes() {
        let record = DeviceRecord::from_fwid("p", &[b'C', b'A', b'N', 0xE9]);
        assert_eq!(record.name(), "CAN\u{e9}");
        assert_eq!(record.name().chars().count(), 4);
    }

    #[test]
    fn test_record_from_full_high_byte_fwid() {
        let record = DeviceRecord::from_fwid("p", &[0xE9; FWID_STRING_SIZE]);
        assert_eq!(record.name().chars().count(), FWID_STRING_SIZE);
        assert!(record.name().chars().all(|c| c == '\u{e9}'));
        assert!(!record.name().contains('\u{fffd}'));
    }

    #[test]
    fn test_with_name_is_bounded() {
        let long = "\u{e9}".repeat(FWID_STRING_SIZE + 5);
        let record = DeviceRecord::with_name("p", long);
        assert_eq!(record.name().chars().count(), FWID_STRING_SIZE);

        let short = DeviceRecord::with_name("p", "Bench");
        assert_eq!(short.name(), "Bench");
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let mut list = DeviceList::new();
        list.push(DeviceRecord::with_name("a", "first"));
        list.push(DeviceRecord::with_name("b", "second"));
        list.extend([DeviceRecord::with_name("c", "third")]);

        let names: Vec<&str> = list.iter().map(DeviceRecord::name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(list.first().map(DeviceRecord::path), Some("a"));
    }

    #[test]
    fn test_find_by_name_returns_first_match() {
        let list: DeviceList = [
            DeviceRecord::with_name("a", "twin"),
            DeviceRecord::with_name("b", "twin"),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.find_by_name("twin").map(DeviceRecord::path), Some("a"));
        assert!(list.find_by_name("TWIN").is_none());
        assert!(list.find_by_path("b").is_some());
    }

    #[test]
    fn test_list_serializes_as_array() {
        let list: DeviceList = [DeviceRecord::with_name("a", "one")].into_iter().collect();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"[{"path":"a","name":"one"}]"#);
    }
}
