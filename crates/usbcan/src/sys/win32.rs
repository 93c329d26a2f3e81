//! Windows backend: SetupAPI, `CreateFileW` and `DeviceIoControl`

use std::mem;
use std::os::windows::io::{AsRawHandle, RawHandle};

use protocol::{ClassId, OsError};
use tracing::trace;
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    DIGCF_DEVICEINTERFACE, DIGCF_PRESENT, HDEVINFO, SP_DEVICE_INTERFACE_DATA,
    SP_DEVICE_INTERFACE_DETAIL_DATA_W, SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInterfaces,
    SetupDiGetClassDevsW, SetupDiGetDeviceInterfaceDetailW,
};
use windows::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_FLAG_OVERLAPPED, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_MODE,
    FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows::Win32::System::IO::DeviceIoControl;
use windows::core::{GUID, PCWSTR};

use super::{DeviceInterfaceApi, OpenOptions, Resolution, ShareMode, to_wide_nul};

/// Win32 error code carried by a `windows` crate error
///
/// Win32 failures arrive wrapped as `HRESULT_FROM_WIN32`; anything else is
/// passed through as the raw HRESULT.
fn os_error(error: &windows::core::Error) -> OsError {
    let hr = error.code().0 as u32;
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        OsError(hr & 0xFFFF)
    } else {
        OsError(hr)
    }
}

/// The real device-interface API
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupApi;

/// Device information set from `SetupDiGetClassDevsW`
pub struct InterfaceSet {
    info: HDEVINFO,
    class: GUID,
}

impl Drop for InterfaceSet {
    fn drop(&mut self) {
        // SAFETY: info came from SetupDiGetClassDevsW and is destroyed once.
        unsafe {
            let _ = SetupDiDestroyDeviceInfoList(self.info);
        }
    }
}

/// Buffer for `SP_DEVICE_INTERFACE_DETAIL_DATA_W`
///
/// Backed by `u32` words so the structure header is correctly aligned.
pub struct DetailBuffer {
    words: Vec<u32>,
    size: usize,
}

impl DetailBuffer {
    fn new(size: usize) -> Self {
        let size = size.max(mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>());
        Self {
            words: vec![0; size.div_ceil(mem::size_of::<u32>())],
            size,
        }
    }

    fn as_detail_mut(&mut self) -> *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W {
        let detail = self.words.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W;
        // SAFETY: the buffer is at least one header long and u32 aligned.
        unsafe {
            (*detail).cbSize = mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
        }
        detail
    }

    /// Path written by SetupAPI, up to the NUL or the end of the buffer
    fn device_path(&self) -> String {
        let offset = mem::offset_of!(SP_DEVICE_INTERFACE_DETAIL_DATA_W, DevicePath);
        let units = self.size.saturating_sub(offset) / mem::size_of::<u16>();
        // SAFETY: offset..offset + units * 2 lies inside the word buffer, and
        // DevicePath follows a u32 so it is u16 aligned.
        let wide = unsafe {
            let start = (self.words.as_ptr() as *const u8).add(offset) as *const u16;
            std::slice::from_raw_parts(start, units)
        };
        let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
        String::from_utf16_lossy(&wide[..len])
    }
}

/// Open device handle, closed on drop
#[derive(Debug)]
pub struct DeviceHandle(HANDLE);

// SAFETY: a file handle may be used and closed from any thread.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    /// Raw handle for issuing I/O directly through the `windows` crate
    pub fn raw(&self) -> HANDLE {
        self.0
    }
}

impl PartialEq for DeviceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for DeviceHandle {}

impl AsRawHandle for DeviceHandle {
    fn as_raw_handle(&self) -> RawHandle {
        self.0.0 as RawHandle
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateFileW and is closed once.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

impl DeviceInterfaceApi for SetupApi {
    type DeviceSet = InterfaceSet;
    type PathBuffer = DetailBuffer;
    type Handle = DeviceHandle;

    fn device_set(&self, class: &ClassId) -> Result<InterfaceSet, OsError> {
        let class = GUID::from_u128(class.0);
        // SAFETY: class outlives the call; no enumerator or parent window.
        let info = unsafe {
            SetupDiGetClassDevsW(
                Some(&class),
                PCWSTR::null(),
                None,
                DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
            )
        }
        .map_err(|e| os_error(&e))?;
        Ok(InterfaceSet { info, class })
    }

    fn resolve_interface(
        &self,
        set: &InterfaceSet,
        index: u32,
        buffer: Option<&mut DetailBuffer>,
    ) -> Resolution {
        let mut iface = SP_DEVICE_INTERFACE_DATA {
            cbSize: mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32,
            ..Default::default()
        };
        // SAFETY: set.info is a live device information set and iface is sized.
        if let Err(e) =
            unsafe { SetupDiEnumDeviceInterfaces(set.info, None, &set.class, index, &mut iface) }
        {
            // ERROR_NO_MORE_ITEMS is the normal end; any other failure also
            // leaves nothing further to enumerate.
            trace!("Interface enumeration stopped at {}: {}", index, os_error(&e));
            return Resolution::NoEntry;
        }

        match buffer {
            None => {
                let mut required: u32 = 0;
                // SAFETY: size query with no output buffer.
                let result = unsafe {
                    SetupDiGetDeviceInterfaceDetailW(
                        set.info,
                        &iface,
                        None,
                        0,
                        Some(&mut required),
                        None,
                    )
                };
                match result {
                    Ok(()) => Resolution::NeedsBuffer(required as usize),
                    Err(e) => {
                        let error = os_error(&e);
                        if error == OsError::INSUFFICIENT_BUFFER && required > 0 {
                            Resolution::NeedsBuffer(required as usize)
                        } else {
                            Resolution::Failed(error)
                        }
                    }
                }
            }
            Some(buffer) => {
                let size = buffer.size as u32;
                let detail = buffer.as_detail_mut();
                // SAFETY: detail points at `size` writable bytes with cbSize set.
                let result = unsafe {
                    SetupDiGetDeviceInterfaceDetailW(
                        set.info,
                        &iface,
                        Some(detail),
                        size,
                        None,
                        None,
                    )
                };
                match result {
                    Ok(()) => Resolution::Path(buffer.device_path()),
                    Err(e) => Resolution::Failed(os_error(&e)),
                }
            }
        }
    }

    fn alloc_path_buffer(&self, size: usize) -> DetailBuffer {
        DetailBuffer::new(size)
    }

    fn open(&self, path: &str, options: OpenOptions) -> Result<DeviceHandle, OsError> {
        let wide = to_wide_nul(path)?;
        let share = match options.share {
            ShareMode::Exclusive => FILE_SHARE_MODE(0),
            ShareMode::ReadWrite => FILE_SHARE_READ | FILE_SHARE_WRITE,
        };
        let flags = if options.overlapped {
            FILE_FLAG_OVERLAPPED
        } else {
            FILE_FLAGS_AND_ATTRIBUTES(0)
        };

        // SAFETY: wide is NUL terminated and outlives the call.
        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                (GENERIC_READ | GENERIC_WRITE).0,
                share,
                None,
                OPEN_EXISTING,
                flags,
                None,
            )
        }
        .map_err(|e| os_error(&e))?;
        Ok(DeviceHandle(handle))
    }

    fn control(
        &self,
        handle: &DeviceHandle,
        code: u32,
        output: &mut [u8],
    ) -> Result<usize, OsError> {
        let mut returned: u32 = 0;
        // SAFETY: synchronous request; output is valid for output.len() bytes.
        unsafe {
            DeviceIoControl(
                handle.0,
                code,
                None,
                0,
                Some(output.as_mut_ptr() as *mut _),
                output.len() as u32,
                Some(&mut returned),
                None,
            )
        }
        .map_err(|e| os_error(&e))?;
        Ok(returned as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::core::HRESULT;

    #[test]
    fn test_win32_code_is_unwrapped_from_hresult() {
        let error = windows::core::Error::from_hresult(HRESULT(0x8007_0020_u32 as i32));
        assert_eq!(os_error(&error), OsError::SHARING_VIOLATION);
    }

    #[test]
    fn test_other_hresults_pass_through() {
        let error = windows::core::Error::from_hresult(HRESULT(0x8000_4005_u32 as i32));
        assert_eq!(os_error(&error), OsError(0x8000_4005));
    }

    #[test]
    fn test_missing_path_reports_not_found() {
        let result = SetupApi.open(r"\\.\usbcan-does-not-exist", OpenOptions::CHANNEL);
        let error = result.err().map(|e| e.code());
        assert!(matches!(error, Some(2) | Some(3)));
    }

    #[test]
    fn test_detail_buffer_reads_path_until_nul() {
        let mut buffer = DetailBuffer::new(64);
        buffer.as_detail_mut();
        let offset = mem::offset_of!(SP_DEVICE_INTERFACE_DETAIL_DATA_W, DevicePath);
        let path: Vec<u16> = r"\\?\x".encode_utf16().chain([0, b'z' as u16]).collect();
        let bytes: Vec<u8> = path.iter().flat_map(|c| c.to_le_bytes()).collect();
        // SAFETY: the buffer holds at least offset + bytes.len() bytes.
        unsafe {
            let dst = (buffer.words.as_mut_ptr() as *mut u8).add(offset);
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        }
        assert_eq!(buffer.device_path(), r"\\?\x");
    }
}
