//! Memory access abstraction.
//!
//! All components see the target address space only through [`MemoryAccess`];
//! nothing outside this module touches raw pointers. The real in-process
//! accessor lives in [`process`] (Windows only); tests use the mock.

mod region;

#[cfg(target_os = "windows")]
mod process;

#[cfg(test)]
pub mod mock;

pub use region::MemoryRegion;

#[cfg(target_os = "windows")]
pub use process::ProcessMemory;

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};

use crate::error::{Error, Result};

/// Checked access to the target process's address space.
///
/// Implementations must never crash the host on a bad address; every failure
/// is reported as [`Error::ReadFailed`] or [`Error::WriteFailed`]. Methods
/// take `&self` so an accessor can be shared; callers that need ordering
/// across multiple accesses (such as the patch controller) serialize
/// externally.
pub trait MemoryAccess {
    /// Read `len` bytes starting at `address`.
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>>;

    /// Write `bytes` starting at `address`.
    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()>;

    fn read_i16(&self, address: u64) -> Result<i16> {
        let bytes = self.read_bytes(address, 2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn write_i16(&self, address: u64, value: i16) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_i32(&self, address: u64, value: i32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Capture an entire region into a local buffer.
    ///
    /// A region that cannot be read in full yields [`Error::RegionUnreadable`];
    /// no partial buffer is ever returned.
    fn read_region(&self, region: MemoryRegion) -> Result<Vec<u8>> {
        self.read_bytes(region.base(), region.length())
            .map_err(|_| Error::RegionUnreadable {
                base: region.base(),
                length: region.length(),
            })
    }
}

// The host usually keeps its own handle to the accessor it hands to the
// controller; sharing through Arc preserves the trait.
impl<M: MemoryAccess + ?Sized> MemoryAccess for std::sync::Arc<M> {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, len)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(address, bytes)
    }
}
