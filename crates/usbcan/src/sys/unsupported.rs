//! Backend for platforms without a USBCAN driver
//!
//! Enumeration finds nothing and every open fails with
//! `ERROR_NOT_SUPPORTED`.

use protocol::{ClassId, OsError};

use super::{DeviceInterfaceApi, OpenOptions, Resolution};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedApi;

/// Interface set that can never be created here
pub enum NoInterfaces {}

/// Device handle that can never be created here
#[derive(Debug, PartialEq, Eq)]
pub enum DeviceHandle {}

impl DeviceInterfaceApi for UnsupportedApi {
    type DeviceSet = NoInterfaces;
    type PathBuffer = Vec<u8>;
    type Handle = DeviceHandle;

    fn device_set(&self, _class: &ClassId) -> Result<NoInterfaces, OsError> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn resolve_interface(
        &self,
        set: &NoInterfaces,
        _index: u32,
        _buffer: Option<&mut Vec<u8>>,
    ) -> Resolution {
        match *set {}
    }

    fn alloc_path_buffer(&self, size: usize) -> Vec<u8> {
        vec![0; size]
    }

    fn open(&self, _path: &str, _options: OpenOptions) -> Result<DeviceHandle, OsError> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn control(
        &self,
        handle: &DeviceHandle,
        _code: u32,
        _output: &mut [u8],
    ) -> Result<usize, OsError> {
        match *handle {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_is_supported() {
        let api = UnsupportedApi;
        assert_eq!(
            api.device_set(&protocol::USBCAN_INTERFACE_CLASS).err(),
            Some(OsError::NOT_SUPPORTED)
        );
        assert_eq!(
            api.open("anything", OpenOptions::CHANNEL).err(),
            Some(OsError::NOT_SUPPORTED)
        );
    }
}
