//! Address resolution: turning named patterns into absolute addresses.
//!
//! Resolution runs once at startup. Each label is bound to at most one
//! address; module-relative deltas are logged for diagnostics, since absolute
//! addresses differ between runs while the delta is stable for a given
//! binary.

use tracing::{debug, info, warn};

use crate::memory::{MemoryAccess, MemoryRegion};
use crate::pattern::Pattern;
use crate::scanner::PatternScanner;

/// A label bound to the address its pattern resolved to, if any.
///
/// Written exactly once during [`AddressResolver::resolve`] and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct NamedOffset {
    name: String,
    pattern: Pattern,
    address: Option<u64>,
}

impl NamedOffset {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn address(&self) -> Option<u64> {
        self.address
    }

    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }
}

/// Result of one resolution pass over the module image.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    image: MemoryRegion,
    offsets: Vec<NamedOffset>,
}

impl AddressResolver {
    /// Scan the module image once per named pattern.
    ///
    /// A missing base address short-circuits: every offset stays unresolved
    /// and no memory is read. Unreadable regions and unmatched patterns leave
    /// the affected offset unresolved; resolution itself never fails.
    pub fn resolve<M: MemoryAccess>(
        memory: &M,
        image: MemoryRegion,
        targets: Vec<(String, Pattern)>,
    ) -> Self {
        debug!(
            "Resolving {} offset(s) in image {:#x}..{:#x}",
            targets.len(),
            image.base(),
            image.end()
        );

        if image.base() == 0 || image.is_empty() {
            warn!("Module base address unavailable; all offsets unresolved");
            let offsets = targets
                .into_iter()
                .map(|(name, pattern)| NamedOffset {
                    name,
                    pattern,
                    address: None,
                })
                .collect();
            return Self { image, offsets };
        }

        let scanner = PatternScanner::new(memory);
        let mut offsets = Vec::with_capacity(targets.len());

        for (name, pattern) in targets {
            let address = match scanner.scan(image, &pattern) {
                Ok(found) => found,
                Err(e) => {
                    warn!("Scan for '{}' failed: {}", name, e);
                    None
                }
            };

            match address {
                Some(addr) => info!("{}: module+{:#x}", name, addr - image.base()),
                None => warn!("{}: pattern not found", name),
            }

            offsets.push(NamedOffset {
                name,
                pattern,
                address,
            });
        }

        Self { image, offsets }
    }

    /// True only when every named pattern resolved.
    ///
    /// Partial resolution is reported per-offset but invalid overall; the
    /// offsets typically implement one logical behavior together, so none is
    /// usable on its own.
    pub fn is_valid(&self) -> bool {
        !self.offsets.is_empty() && self.offsets.iter().all(NamedOffset::is_resolved)
    }

    pub fn image(&self) -> MemoryRegion {
        self.image
    }

    pub fn offsets(&self) -> &[NamedOffset] {
        &self.offsets
    }

    pub fn address_of(&self, name: &str) -> Option<u64> {
        self.offsets
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .and_then(|o| o.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    const BASE: u64 = 0x7FF6_0000_0000;

    fn targets(defs: &[(&str, &str)]) -> Vec<(String, Pattern)> {
        defs.iter()
            .map(|(name, text)| (name.to_string(), Pattern::compile(text).unwrap()))
            .collect()
    }

    #[test]
    fn test_resolve_all_found() {
        let memory = MockMemoryBuilder::new()
            .base(BASE)
            .bytes(vec![0x10, 0xAA, 0x20, 0xBB, 0x30, 0x74, 0x18, 0x8B])
            .build();
        let image = MemoryRegion::new(BASE, 8);

        let resolver = AddressResolver::resolve(
            &memory,
            image,
            targets(&[("Offset1", "AA ?? BB"), ("Offset2", "74 18 8B")]),
        );

        assert!(resolver.is_valid());
        assert_eq!(resolver.address_of("Offset1"), Some(BASE + 1));
        assert_eq!(resolver.address_of("Offset2"), Some(BASE + 5));
        // Lookup is case-insensitive, same as profile target lookup.
        assert_eq!(resolver.address_of("offset1"), Some(BASE + 1));
    }

    #[test]
    fn test_partial_resolution_is_invalid() {
        let memory = MockMemoryBuilder::new()
            .base(BASE)
            .bytes(vec![0x10, 0xAA, 0x20, 0xBB, 0x30])
            .build();
        let image = MemoryRegion::new(BASE, 5);

        let resolver = AddressResolver::resolve(
            &memory,
            image,
            targets(&[("Offset1", "AA ?? BB"), ("Offset2", "74 18 8B")]),
        );

        assert!(!resolver.is_valid());
        assert_eq!(resolver.address_of("Offset1"), Some(BASE + 1));
        assert_eq!(resolver.address_of("Offset2"), None);
        assert_eq!(resolver.offsets().len(), 2);
    }

    #[test]
    fn test_zero_base_short_circuits() {
        let memory = MockMemoryBuilder::new()
            .base(BASE)
            .bytes(vec![0xAA, 0xBB])
            .build();
        let image = MemoryRegion::new(0, 0);

        let resolver =
            AddressResolver::resolve(&memory, image, targets(&[("Offset1", "AA BB")]));

        assert!(!resolver.is_valid());
        assert_eq!(resolver.address_of("Offset1"), None);
        // Short-circuit means the accessor is never touched.
        assert_eq!(memory.read_calls(), 0);
    }

    #[test]
    fn test_unreadable_image_leaves_offsets_unresolved() {
        let memory = MockMemoryBuilder::new()
            .base(BASE)
            .bytes(vec![0xAA, 0xBB, 0xCC])
            .fail_read_at(BASE)
            .build();
        let image = MemoryRegion::new(BASE, 3);

        let resolver =
            AddressResolver::resolve(&memory, image, targets(&[("Offset1", "AA BB")]));

        assert!(!resolver.is_valid());
        assert_eq!(resolver.address_of("Offset1"), None);
    }

    #[test]
    fn test_no_targets_is_invalid() {
        let memory = MockMemoryBuilder::new().base(BASE).bytes(vec![0]).build();
        let resolver =
            AddressResolver::resolve(&memory, MemoryRegion::new(BASE, 1), Vec::new());
        assert!(!resolver.is_valid());
    }
}
