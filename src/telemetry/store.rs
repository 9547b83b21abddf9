//! # Module Status Store
//!
//! Per-module persisted state: protocol status, sync/timing status and
//! bind status. Pure data, mutated by the dispatcher and read by the
//! presentation layer.
//!
//! The store is sized at construction for the configured module count
//! (one or two slots). With a single slot, every module index resolves to
//! the same shared instance; per-module isolation is a property of the
//! configuration, not of the accessor signatures.

use super::status::{BindStatus, ModuleStatus};
use super::sync::SyncStatus;

/// Largest number of module slots any hardware configuration carries
pub const MAX_MODULES: usize = 2;

/// Runtime-sized container for the per-module status data.
#[derive(Debug)]
pub struct ModuleStore {
    status: Vec<ModuleStatus>,
    sync: Vec<SyncStatus>,
    bind: Vec<BindStatus>,
}

impl ModuleStore {
    /// Create a store with `module_count` slots, clamped to `1..=2`.
    pub fn new(module_count: usize) -> Self {
        let count = module_count.clamp(1, MAX_MODULES);
        Self {
            status: (0..count).map(|_| ModuleStatus::new()).collect(),
            sync: (0..count).map(|_| SyncStatus::new()).collect(),
            bind: vec![BindStatus::default(); count],
        }
    }

    /// Number of module slots.
    pub fn module_count(&self) -> usize {
        self.status.len()
    }

    /// Resolve a module index onto an owned slot.
    fn slot(&self, module: usize) -> usize {
        module.min(self.status.len() - 1)
    }

    pub fn module_status(&self, module: usize) -> &ModuleStatus {
        &self.status[self.slot(module)]
    }

    pub fn module_status_mut(&mut self, module: usize) -> &mut ModuleStatus {
        let slot = self.slot(module);
        &mut self.status[slot]
    }

    pub fn sync_status(&self, module: usize) -> &SyncStatus {
        &self.sync[self.slot(module)]
    }

    pub fn sync_status_mut(&mut self, module: usize) -> &mut SyncStatus {
        let slot = self.slot(module);
        &mut self.sync[slot]
    }

    pub fn bind_status(&self, module: usize) -> BindStatus {
        self.bind[self.slot(module)]
    }

    pub fn set_bind_status(&mut self, module: usize, bind_status: BindStatus) {
        let slot = self.slot(module);
        self.bind[slot] = bind_status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot_ignores_module_index() {
        let mut store = ModuleStore::new(1);
        assert_eq!(store.module_count(), 1);

        store.module_status_mut(1).flags = 0x04;
        assert_eq!(store.module_status(0).flags, 0x04);

        store.set_bind_status(5, BindStatus::Initiated);
        assert_eq!(store.bind_status(0), BindStatus::Initiated);
    }

    #[test]
    fn test_dual_slots_are_independent() {
        let mut store = ModuleStore::new(2);
        assert_eq!(store.module_count(), 2);

        store.module_status_mut(0).flags = 0x01;
        store.module_status_mut(1).flags = 0x02;
        assert_eq!(store.module_status(0).flags, 0x01);
        assert_eq!(store.module_status(1).flags, 0x02);

        store.sync_status_mut(1).refresh_rate = 9000;
        assert_eq!(store.sync_status(0).refresh_rate, 0);
        assert_eq!(store.sync_status(1).refresh_rate, 9000);
    }

    #[test]
    fn test_count_is_clamped() {
        assert_eq!(ModuleStore::new(0).module_count(), 1);
        assert_eq!(ModuleStore::new(7).module_count(), 2);
    }
}
