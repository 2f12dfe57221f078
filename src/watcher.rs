use crate::discovery::find_media_elements;
use crate::graph::{GraphSynchronizer, PassMarks, PassReport};
use crate::traits::{AudioHost, PageNode};
use crate::utils::log_console;

/// Child-list change on one target, as delivered by the page observer.
#[derive(Clone)]
pub struct MutationRecord<N> {
    pub added: Vec<N>,
    pub removed: Vec<N>,
}

impl<N> MutationRecord<N> {
    pub fn added(nodes: Vec<N>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(nodes: Vec<N>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}

/// Routes structural changes under the body to discovery and eviction.
///
/// Only child-list changes matter. Each delivered batch is one pass with its
/// own visited marks. A batch ends with a sweep of registered elements that
/// left the document without a removal record reaching the body observer.
#[derive(Debug, Default)]
pub struct MutationWatcher {
    active: bool,
    batches: u64,
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the watcher was already running.
    pub fn start(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        log_console("MutationObserver started.");
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn process<H: AudioHost>(
        &mut self,
        records: &[MutationRecord<H::Node>],
        sync: &mut GraphSynchronizer<'_, H>,
    ) -> PassReport {
        let mut report = PassReport::default();
        if !self.active {
            return report;
        }
        self.batches += 1;

        let mut marks = PassMarks::new();
        for record in records {
            for node in record.added.iter().filter(|n| n.is_element()) {
                for element in find_media_elements(node) {
                    let outcome = sync.apply_or_update(&element, &mut marks);
                    report.record(&outcome);
                }
            }

            for node in record.removed.iter().filter(|n| n.is_element()) {
                for element in find_media_elements(node) {
                    if sync.evict(&element, &mut marks) {
                        report.evicted += 1;
                    }
                }
            }
        }
        report.evicted += sync.sweep_detached(&mut marks);
        report
    }
}
