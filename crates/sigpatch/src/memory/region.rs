/// A contiguous readable span of the target address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    base: u64,
    length: usize,
}

impl MemoryRegion {
    pub fn new(base: u64, length: usize) -> Self {
        Self { base, length }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// First address past the end of the region.
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }

    /// Whether a span of `len` bytes at `address` lies fully inside the region.
    pub fn contains_span(&self, address: u64, len: usize) -> bool {
        address >= self.base && address.saturating_add(len as u64) <= self.end()
    }
}
