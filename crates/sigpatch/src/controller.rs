//! Patch lifecycle state machine.
//!
//! The controller resolves its targets once at startup, then serializes all
//! enable/disable/dispose calls behind one mutex that also guards the state
//! field. Applying a patch snapshots every original value before the first
//! write; a failed apply rolls back anything already written, so memory is
//! never left half-patched. Restoration is best-effort: a failed restore
//! write is logged and the controller still shuts down.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::memory::{MemoryAccess, MemoryRegion};
use crate::profile::PatchProfile;
use crate::resolver::{AddressResolver, NamedOffset};

/// Lifecycle of a [`PatchController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PatchState {
    Uninitialized,
    Resolving,
    Ready,
    ResolutionFailed,
    Applied,
    Disabled,
    Aborted,
    Disposed,
}

struct PatchEntry {
    name: String,
    address: u64,
    patched_value: i16,
}

struct Inner {
    state: PatchState,
    resolver: Option<AddressResolver>,
    entries: Vec<PatchEntry>,
    // Original values, parallel to `entries`; captured once, dropped on dispose.
    snapshot: Option<Vec<i16>>,
}

/// Applies and reverses a set of scalar patches at resolved addresses.
pub struct PatchController<M: MemoryAccess> {
    memory: M,
    inner: Mutex<Inner>,
}

impl<M: MemoryAccess> PatchController<M> {
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            inner: Mutex::new(Inner {
                state: PatchState::Uninitialized,
                resolver: None,
                entries: Vec::new(),
                snapshot: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock still holds consistent state: every transition
        // completes its memory writes before releasing the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> PatchState {
        self.lock().state
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().state == PatchState::Applied
    }

    /// Resolved offsets for diagnostics, empty before initialization.
    pub fn offsets(&self) -> Vec<NamedOffset> {
        self.lock()
            .resolver
            .as_ref()
            .map(|r| r.offsets().to_vec())
            .unwrap_or_default()
    }

    /// Resolve every profile target against the module image.
    ///
    /// Ends in `Ready` when all targets resolved, `ResolutionFailed`
    /// otherwise; a failed resolution leaves the patch permanently inactive
    /// for this process instance and is not an error. Malformed patterns are
    /// a configuration bug and are returned as one.
    pub fn initialize(&self, image: MemoryRegion, profile: &PatchProfile) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != PatchState::Uninitialized {
            warn!(
                "initialize called in state {}; ignoring",
                inner.state
            );
            return Ok(());
        }
        inner.state = PatchState::Resolving;

        info!("Resolving patch profile '{}'", profile.name);
        let mut targets = Vec::with_capacity(profile.targets.len());
        for target in &profile.targets {
            let pattern = match target.compiled_pattern() {
                Ok(p) => p,
                Err(e) => {
                    inner.state = PatchState::ResolutionFailed;
                    return Err(e);
                }
            };
            targets.push((target.name.clone(), pattern));
        }

        let resolver = AddressResolver::resolve(&self.memory, image, targets);

        if resolver.is_valid() {
            let mut entries = Vec::with_capacity(profile.targets.len());
            for (target, offset) in profile.targets.iter().zip(resolver.offsets()) {
                // is_valid() guarantees every offset carries an address.
                let Some(address) = offset.address() else {
                    continue;
                };
                entries.push(PatchEntry {
                    name: target.name.clone(),
                    address,
                    patched_value: target.patched_value,
                });
            }
            inner.entries = entries;
            inner.state = PatchState::Ready;
            info!("Patch '{}' ready", profile.name);
        } else {
            inner.state = PatchState::ResolutionFailed;
            warn!("Patch '{}' resolution failed; patch stays inactive", profile.name);
        }

        inner.resolver = Some(resolver);
        Ok(())
    }

    /// Apply or remove the patch. Idempotent: requesting the current state is
    /// a no-op. Safe to call from multiple threads.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut inner = self.lock();
        if enabled {
            self.apply_locked(&mut inner)
        } else {
            self.disable_locked(&mut inner)
        }
    }

    /// Restore originals (if applied) and retire the controller.
    ///
    /// Idempotent from any state and any thread: the restoration runs at most
    /// once, and later calls are no-ops.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.state == PatchState::Disposed {
            return;
        }
        if inner.state == PatchState::Applied {
            self.restore_locked(&mut inner);
        }
        inner.snapshot = None;
        inner.state = PatchState::Disposed;
        debug!("Patch controller disposed");
    }

    fn apply_locked(&self, inner: &mut Inner) -> Result<()> {
        match inner.state {
            PatchState::Applied => return Ok(()),
            PatchState::Ready | PatchState::Disabled => {}
            state => return Err(Error::NotReady(state)),
        }

        // Capture originals once, before anything is written. All reads must
        // succeed or the transition aborts without touching memory.
        let snapshot = match inner.snapshot.clone() {
            Some(snapshot) => snapshot,
            None => {
                let mut originals = Vec::with_capacity(inner.entries.len());
                for i in 0..inner.entries.len() {
                    let address = inner.entries[i].address;
                    match self.memory.read_i16(address) {
                        Ok(value) => originals.push(value),
                        Err(e) => {
                            warn!(
                                "Aborting enable: could not read original value at {:#x}: {}",
                                address, e
                            );
                            inner.state = PatchState::Aborted;
                            return Err(e);
                        }
                    }
                }
                inner.snapshot = Some(originals.clone());
                originals
            }
        };

        for i in 0..inner.entries.len() {
            let address = inner.entries[i].address;
            let value = inner.entries[i].patched_value;
            if let Err(e) = self.memory.write_i16(address, value) {
                warn!(
                    "Aborting enable: write at {:#x} failed, rolling back {} prior write(s): {}",
                    address, i, e
                );
                for j in 0..i {
                    let prior = inner.entries[j].address;
                    if let Err(re) = self.memory.write_i16(prior, snapshot[j]) {
                        warn!("Rollback write at {:#x} failed: {}", prior, re);
                    }
                }
                inner.state = PatchState::Aborted;
                return Err(e);
            }
            debug!("Patched '{}' at {:#x}", inner.entries[i].name, address);
        }

        inner.state = PatchState::Applied;
        info!("Patch applied ({} location(s))", inner.entries.len());
        Ok(())
    }

    fn disable_locked(&self, inner: &mut Inner) -> Result<()> {
        match inner.state {
            PatchState::Applied => {
                self.restore_locked(inner);
                inner.state = PatchState::Disabled;
                info!("Patch disabled");
                Ok(())
            }
            // Nothing was ever applied; disabling is a no-op.
            _ => Ok(()),
        }
    }

    /// Best-effort restore of every entry from the snapshot. Failures are
    /// logged, never propagated: leaving one location patched is preferable
    /// to a controller that cannot shut down.
    fn restore_locked(&self, inner: &mut Inner) {
        let Some(snapshot) = inner.snapshot.clone() else {
            return;
        };
        for i in 0..inner.entries.len() {
            let name = inner.entries[i].name.clone();
            let address = inner.entries[i].address;
            match self.memory.write_i16(address, snapshot[i]) {
                Ok(()) => debug!("Restored '{}' at {:#x}", name, address),
                Err(e) => warn!(
                    "Restore of '{}' at {:#x} failed; memory left patched: {}",
                    name, address, e
                ),
            }
        }
    }
}

impl<M: MemoryAccess> Drop for PatchController<M> {
    fn drop(&mut self) {
        self.dispose();
    }
}
