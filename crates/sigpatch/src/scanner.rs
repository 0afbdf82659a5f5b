//! First-match pattern scanning over a captured memory region.

use tracing::debug;

use crate::error::Result;
use crate::memory::{MemoryAccess, MemoryRegion};
use crate::pattern::Pattern;

/// Scans memory regions for compiled patterns.
///
/// Stateless apart from the borrowed accessor; a scan captures the whole
/// region into a local buffer once, so the region's bytes are only read a
/// single time per call.
pub struct PatternScanner<'a, M: MemoryAccess> {
    memory: &'a M,
}

impl<'a, M: MemoryAccess> PatternScanner<'a, M> {
    pub fn new(memory: &'a M) -> Self {
        Self { memory }
    }

    /// Find the first occurrence of `pattern` in `region`.
    ///
    /// Returns the absolute address of the lowest-offset match, or `Ok(None)`
    /// when the pattern does not occur. A region that cannot be read in full
    /// is an error ([`crate::Error::RegionUnreadable`]); a partially readable
    /// region is never scanned.
    pub fn scan(&self, region: MemoryRegion, pattern: &Pattern) -> Result<Option<u64>> {
        if region.is_empty() || pattern.len() > region.length() {
            return Ok(None);
        }

        let buffer = self.memory.read_region(region)?;
        let found = find_first(&buffer, pattern).map(|pos| region.base() + pos as u64);

        match found {
            Some(addr) => debug!(
                "Pattern '{}' matched at {:#x} (module+{:#x})",
                pattern,
                addr,
                addr - region.base()
            ),
            None => debug!("Pattern '{}' not found in region", pattern),
        }

        Ok(found)
    }
}

/// Lowest buffer offset at which the pattern matches, if any.
fn find_first(buffer: &[u8], pattern: &Pattern) -> Option<usize> {
    if pattern.len() > buffer.len() {
        return None;
    }
    let last_start = buffer.len() - pattern.len();

    // Seed candidate positions from the first concrete byte; a pattern that
    // opens with wildcards falls back to checking every offset.
    match pattern.first_concrete() {
        Some((skip, byte)) if skip == 0 => memchr::memchr_iter(byte, buffer)
            .take_while(|&pos| pos <= last_start)
            .find(|&pos| pattern.matches(&buffer[pos..])),
        _ => (0..=last_start).find(|&pos| pattern.matches(&buffer[pos..])),
    }
}
