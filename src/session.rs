//! Page-scoped state of the effect manager.
//!
//! One [`FxSession`] owns the parameter bus, the shared context with its
//! impulse cache, the chain registry and the watcher. Every entry point
//! (bootstrap, parameter delivery, mutation batches) goes through it.

use crate::config::FxConfig;
use crate::context::SharedContext;
use crate::discovery::find_media_elements;
use crate::graph::{ChainRegistry, ChainTopology, GraphSynchronizer, PassMarks, PassReport};
use crate::params::{ParameterBus, ParameterSet};
use crate::traits::{AudioHost, ContextState, MediaElement};
use crate::utils::{error_console, log_console};
use crate::watcher::{MutationRecord, MutationWatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Started { discovered: usize, created: usize },
    AlreadyInitialized,
    /// No audio API in this environment; the session stays inert.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Fresh,
    Running,
    Disabled,
}

pub struct FxSession<H: AudioHost> {
    config: FxConfig,
    bus: ParameterBus,
    context: SharedContext<H>,
    registry: ChainRegistry<H>,
    watcher: MutationWatcher,
    lifecycle: Lifecycle,
}

impl<H: AudioHost> FxSession<H> {
    pub fn new(host: H, config: FxConfig) -> Self {
        Self {
            bus: ParameterBus::new(config.initial_params),
            context: SharedContext::new(host, config.reverb),
            registry: ChainRegistry::new(),
            watcher: MutationWatcher::new(),
            lifecycle: Lifecycle::Fresh,
            config,
        }
    }

    /// Scans `body` once and starts watching it. Safe to call again.
    pub fn bootstrap(&mut self, body: &H::Node) -> BootstrapOutcome {
        match self.lifecycle {
            Lifecycle::Running => {
                log_console("Already initialized, skipping bootstrap.");
                return BootstrapOutcome::AlreadyInitialized;
            }
            Lifecycle::Disabled => return BootstrapOutcome::Disabled,
            Lifecycle::Fresh => {}
        }

        if !self.context.is_supported() {
            error_console("Web Audio API not supported, effects disabled.");
            self.lifecycle = Lifecycle::Disabled;
            return BootstrapOutcome::Disabled;
        }

        let elements = find_media_elements(body);
        log_console(&format!("Initial scan found {} media element(s).", elements.len()));

        let report = self.sync_all(&elements);
        self.watcher.start();
        self.lifecycle = Lifecycle::Running;

        BootstrapOutcome::Started {
            discovered: elements.len(),
            created: report.created,
        }
    }

    /// Replaces the latest parameters and resynchronises every element that
    /// already has a chain. Elements without one are left to discovery.
    pub fn set_latest(&mut self, params: ParameterSet) -> PassReport {
        self.bus.set_latest(params);
        let elements = self.registry.elements();
        log_console(&format!(
            "Params revision {} (gain {}, reverb {}), resyncing {} chain(s).",
            self.bus.revision(),
            params.gain_value,
            params.reverb_enabled,
            elements.len()
        ));
        self.sync_all(&elements)
    }

    /// One mutation batch.
    pub fn handle_mutations(&mut self, records: &[MutationRecord<H::Node>]) -> PassReport {
        let mut sync = GraphSynchronizer::new(
            &mut self.context,
            &mut self.registry,
            &self.config,
            self.bus.latest(),
        );
        self.watcher.process(records, &mut sync)
    }

    fn sync_all(&mut self, elements: &[H::Element]) -> PassReport {
        let mut marks = PassMarks::new();
        let mut report = PassReport::default();
        let mut sync = GraphSynchronizer::new(
            &mut self.context,
            &mut self.registry,
            &self.config,
            self.bus.latest(),
        );
        for element in elements {
            report.record(&sync.apply_or_update(element, &mut marks));
        }
        report
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    pub fn is_disabled(&self) -> bool {
        self.lifecycle == Lifecycle::Disabled
    }

    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    pub fn latest(&self) -> ParameterSet {
        self.bus.latest()
    }

    pub fn chain_count(&self) -> usize {
        self.registry.len()
    }

    pub fn has_chain(&self, element: &H::Element) -> bool {
        self.registry.contains(element.key())
    }

    pub fn chain_topology(&self, element: &H::Element) -> Option<ChainTopology> {
        self.registry
            .get(element.key())
            .map(|entry| entry.chain.topology())
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    pub fn impulse_generations(&self) -> usize {
        self.context.impulse_generations()
    }

    pub fn watcher(&self) -> &MutationWatcher {
        &self.watcher
    }
}
