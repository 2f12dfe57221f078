use rustc_hash::FxHashMap;

use super::chain::EffectChain;
use crate::traits::{AudioHost, ElementKey, MediaElement};

pub struct ChainEntry<H: AudioHost> {
    pub element: H::Element,
    pub chain: EffectChain<H::Context>,
}

/// Element → chain association, keyed by element identity.
///
/// Entries are only ever dropped through [`ChainRegistry::evict`], which the
/// removal path, the detached-element check and the end-of-batch sweep call.
/// Elements are held strongly until then.
pub struct ChainRegistry<H: AudioHost> {
    entries: FxHashMap<ElementKey, ChainEntry<H>>,
}

impl<H: AudioHost> ChainRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn contains(&self, key: ElementKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: ElementKey) -> Option<&ChainEntry<H>> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: ElementKey) -> Option<&mut ChainEntry<H>> {
        self.entries.get_mut(&key)
    }

    /// Registers `chain` for `element`. An existing entry is released first,
    /// so an element never owns two chains.
    pub fn insert(&mut self, element: H::Element, chain: EffectChain<H::Context>) {
        let key = element.key();
        if let Some(previous) = self.entries.insert(key, ChainEntry { element, chain }) {
            previous.chain.release();
        }
    }

    /// Drops the entry for `key` and disconnects its nodes.
    pub fn evict(&mut self, key: ElementKey) -> Option<ChainEntry<H>> {
        let entry = self.entries.remove(&key)?;
        entry.chain.release();
        Some(entry)
    }

    /// Snapshot of every registered element, in key order.
    pub fn elements(&self) -> Vec<H::Element> {
        let mut keys: Vec<ElementKey> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys.iter()
            .map(|key| self.entries[key].element.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: AudioHost> Default for ChainRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
