//! # sigpatch
//!
//! In-memory code patching driven by wildcard byte-pattern scanning.
//!
//! This crate provides:
//! - Pattern compilation from hex/wildcard signature strings
//! - First-match scanning over a module's loaded image
//! - Named offset resolution with module-relative diagnostics
//! - Checked scalar reads/writes that never crash the host
//! - A thread-safe patch lifecycle that snapshots originals, applies the
//!   patch, and restores the exact prior bytes on disable or dispose
//!
//! The host supplies the module image bounds, a patch profile (labels,
//! patterns, patched values), and a `tracing` subscriber if it wants the
//! diagnostic output. On Windows, [`ProcessMemory`] provides the real
//! in-process accessor; everything else works against the [`MemoryAccess`]
//! trait and is OS-independent.
//!
//! ## Example
//!
//! ```ignore
//! use sigpatch::{PatchController, ProcessMemory, load_profile};
//!
//! let profile = load_profile("skip.json")?;
//! let image = ProcessMemory::main_module_region()?;
//! let controller = PatchController::new(ProcessMemory::new());
//! controller.initialize(image, &profile)?;
//! controller.set_enabled(true)?;
//! // ... later, on teardown:
//! controller.dispose();
//! ```

pub mod controller;
pub mod error;
pub mod memory;
pub mod pattern;
pub mod profile;
pub mod resolver;
pub mod scanner;

pub use controller::{PatchController, PatchState};
pub use error::{Error, Result};
pub use memory::{MemoryAccess, MemoryRegion};
pub use pattern::Pattern;
pub use profile::{PatchProfile, PatchTarget, load_profile, save_profile};
pub use resolver::{AddressResolver, NamedOffset};
pub use scanner::PatternScanner;

#[cfg(target_os = "windows")]
pub use memory::ProcessMemory;
