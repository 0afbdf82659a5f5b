//! In-process memory accessor for Windows.
//!
//! Every access probes page state with `VirtualQuery` before dereferencing,
//! so a bad address becomes a reported failure instead of an access
//! violation. Writes temporarily elevate page protection and restore it
//! before returning; the elevation never outlives the call.

use std::ffi::c_void;
use std::mem;

use tracing::{debug, warn};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEMORY_BASIC_INFORMATION, PAGE_EXECUTE_READWRITE, PAGE_GUARD, PAGE_NOACCESS,
    PAGE_PROTECTION_FLAGS, VirtualProtect, VirtualQuery,
};
use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
use windows::Win32::System::Threading::GetCurrentProcess;

use crate::error::{Error, Result};
use crate::memory::{MemoryAccess, MemoryRegion};

/// Accessor over the current process's own address space.
#[derive(Debug, Default)]
pub struct ProcessMemory;

impl ProcessMemory {
    pub fn new() -> Self {
        Self
    }

    /// Image bounds of the process's main module, for use as the scan region.
    pub fn main_module_region() -> Result<MemoryRegion> {
        unsafe {
            let module = GetModuleHandleW(None)
                .map_err(|e| Error::ModuleUnavailable(e.message().to_string()))?;

            let mut info = MODULEINFO::default();
            GetModuleInformation(
                GetCurrentProcess(),
                module,
                &mut info,
                mem::size_of::<MODULEINFO>() as u32,
            )
            .map_err(|e| Error::ModuleUnavailable(e.message().to_string()))?;

            let region = MemoryRegion::new(info.lpBaseOfDll as u64, info.SizeOfImage as usize);
            debug!(
                "Main module image: base {:#x}, size {:#x}",
                region.base(),
                region.length()
            );
            Ok(region)
        }
    }

    /// Check that every page in `[address, address + len)` is committed and
    /// readable.
    fn probe_readable(address: u64, len: usize) -> bool {
        let end = address.saturating_add(len as u64);
        let mut cursor = address;

        while cursor < end {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let written = unsafe {
                VirtualQuery(
                    Some(cursor as *const c_void),
                    &mut info,
                    mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                return false;
            }

            let blocked = info.Protect.contains(PAGE_NOACCESS) || info.Protect.contains(PAGE_GUARD);
            if info.State != MEM_COMMIT || blocked {
                return false;
            }

            cursor = (info.BaseAddress as u64).saturating_add(info.RegionSize as u64);
        }

        true
    }
}

impl MemoryAccess for ProcessMemory {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if address == 0 || !Self::probe_readable(address, len) {
            return Err(Error::ReadFailed { address, size: len });
        }

        let bytes = unsafe { std::slice::from_raw_parts(address as *const u8, len) };
        Ok(bytes.to_vec())
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let failed = Error::WriteFailed {
            address,
            size: bytes.len(),
        };
        if address == 0 || !Self::probe_readable(address, bytes.len()) {
            return Err(failed);
        }

        unsafe {
            let target = address as *mut c_void;
            let mut old_protect = PAGE_PROTECTION_FLAGS::default();
            if VirtualProtect(target, bytes.len(), PAGE_EXECUTE_READWRITE, &mut old_protect)
                .is_err()
            {
                return Err(failed);
            }

            std::ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len());

            let mut ignored = PAGE_PROTECTION_FLAGS::default();
            if let Err(e) = VirtualProtect(target, bytes.len(), old_protect, &mut ignored) {
                warn!(
                    "Failed to restore page protection at {:#x}: {}",
                    address,
                    e.message()
                );
            }
        }

        Ok(())
    }
}
