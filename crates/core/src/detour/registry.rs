//! Target method registry
//!
//! Maps method identity to its ordering/chain state. Entries appear on
//! first use and can be pruned once their record set empties, keeping the
//! map bounded in long-lived processes that load and unload many plugins.

use std::sync::Arc;

use dashmap::DashMap;

use hookshim_sdk::MethodId;

use super::chain::TargetChain;

#[derive(Default)]
pub(crate) struct TargetRegistry {
    targets: DashMap<MethodId, Arc<TargetChain>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain state for `target`, allocating empty state on first access.
    pub fn get_or_create(&self, target: &MethodId) -> Arc<TargetChain> {
        self.targets
            .entry(target.clone())
            .or_insert_with(|| Arc::new(TargetChain::new(target.clone())))
            .value()
            .clone()
    }

    pub fn get(&self, target: &MethodId) -> Option<Arc<TargetChain>> {
        self.targets.get(target).map(|entry| entry.value().clone())
    }

    /// Drop the registry entry for `target` if `chain` is still the live
    /// state and no records remain. The emptiness check runs under the
    /// chain lock inside the map entry lock, so a concurrent register
    /// keeps the entry alive.
    pub fn prune(&self, target: &MethodId, chain: &Arc<TargetChain>) {
        self.targets.remove_if(target, |_, existing| {
            Arc::ptr_eq(existing, chain) && existing.state.lock().records.is_empty()
        });
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookshim_sdk::Signature;

    fn method(addr: usize) -> MethodId {
        MethodId::new(addr, Signature::nullary())
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let registry = TargetRegistry::new();
        let m = method(0x100);
        let a = registry.get_or_create(&m);
        let b = registry.get_or_create(&m);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_targets_get_distinct_chains() {
        let registry = TargetRegistry::new();
        let a = registry.get_or_create(&method(0x100));
        let b = registry.get_or_create(&method(0x200));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_prune_removes_only_empty_chains() {
        let registry = TargetRegistry::new();
        let m = method(0x100);
        let chain = registry.get_or_create(&m);

        registry.prune(&m, &chain);
        assert_eq!(registry.len(), 0);

        // Recreated entry with a record survives pruning.
        use super::super::record::{HookKind, HookRecord};
        let chain = registry.get_or_create(&m);
        chain.state.lock().records.insert(HookRecord::new(
            HookKind::Entry(hookshim_sdk::Entry(0x1)),
            None,
            String::new(),
            0,
            Vec::new(),
            Vec::new(),
            hookshim_sdk::Entry(0x2),
        ));
        registry.prune(&m, &chain);
        assert_eq!(registry.len(), 1);
    }
}
