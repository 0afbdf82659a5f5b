//! Mock memory for tests.
//!
//! Backs the [`MemoryAccess`] trait with an in-process byte buffer at a
//! configurable base address, with per-address failure injection and call
//! counters for verifying access patterns.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::memory::MemoryAccess;

pub struct MockMemory {
    base: u64,
    data: Mutex<Vec<u8>>,
    fail_reads: HashSet<u64>,
    fail_writes: HashSet<u64>,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl MockMemory {
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Snapshot of the full backing buffer.
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn span_ok(&self, address: u64, len: usize) -> bool {
        let data_len = self.data.lock().unwrap().len() as u64;
        address >= self.base && address.saturating_add(len as u64) <= self.base + data_len
    }
}

impl MemoryAccess for MockMemory {
    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        if !self.span_ok(address, len) || self.fail_reads.contains(&address) {
            return Err(Error::ReadFailed { address, size: len });
        }

        let data = self.data.lock().unwrap();
        let start = (address - self.base) as usize;
        Ok(data[start..start + len].to_vec())
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        if !self.span_ok(address, bytes.len()) || self.fail_writes.contains(&address) {
            return Err(Error::WriteFailed {
                address,
                size: bytes.len(),
            });
        }

        let mut data = self.data.lock().unwrap();
        let start = (address - self.base) as usize;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMemoryBuilder {
    base: u64,
    data: Vec<u8>,
    fail_reads: HashSet<u64>,
    fail_writes: HashSet<u64>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    pub fn bytes(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Make reads starting at `address` fail.
    pub fn fail_read_at(mut self, address: u64) -> Self {
        self.fail_reads.insert(address);
        self
    }

    /// Make writes starting at `address` fail.
    pub fn fail_write_at(mut self, address: u64) -> Self {
        self.fail_writes.insert(address);
        self
    }

    pub fn build(self) -> MockMemory {
        MockMemory {
            base: self.base,
            data: Mutex::new(self.data),
            fail_reads: self.fail_reads,
            fail_writes: self.fail_writes,
            read_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let memory = MockMemoryBuilder::new()
            .base(0x2000)
            .bytes(vec![0u8; 8])
            .build();

        memory.write_bytes(0x2002, &[0xAB, 0xCD]).unwrap();
        assert_eq!(memory.read_bytes(0x2002, 2).unwrap(), vec![0xAB, 0xCD]);
        assert_eq!(memory.write_calls(), 1);
        assert_eq!(memory.read_calls(), 1);
    }

    #[test]
    fn test_out_of_bounds_access_fails() {
        let memory = MockMemoryBuilder::new()
            .base(0x2000)
            .bytes(vec![0u8; 4])
            .build();

        assert!(memory.read_bytes(0x1FFF, 2).is_err());
        assert!(memory.read_bytes(0x2003, 2).is_err());
        assert!(memory.write_bytes(0x2004, &[0]).is_err());
    }

    #[test]
    fn test_injected_failures() {
        let memory = MockMemoryBuilder::new()
            .base(0x2000)
            .bytes(vec![0u8; 8])
            .fail_read_at(0x2004)
            .fail_write_at(0x2006)
            .build();

        // Only accesses starting at the poisoned address fail.
        assert!(memory.read_bytes(0x2004, 2).is_err());
        assert!(memory.read_bytes(0x2000, 8).is_ok());
        assert!(memory.write_bytes(0x2006, &[1, 2]).is_err());
        assert!(memory.write_bytes(0x2000, &[1, 2]).is_ok());
    }
}
