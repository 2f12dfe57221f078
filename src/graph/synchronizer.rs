use rustc_hash::FxHashSet;

use super::chain::{ChainTopology, EffectChain};
use super::registry::ChainRegistry;
use crate::config::FxConfig;
use crate::context::SharedContext;
use crate::error::FxError;
use crate::params::ParameterSet;
use crate::traits::{
    AudioHost, CapturedStream, ContextState, ElementKey, MediaElement, ProcessingContext,
};
use crate::utils::{error_console, log_console, tagged, warn_console};

/// Elements already attempted during one initiating pass (initial scan,
/// mutation batch or parameter resync). Dropped when the pass ends.
#[derive(Debug, Default)]
pub struct PassMarks {
    visited: FxHashSet<ElementKey>,
}

impl PassMarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `key` is seen in this pass.
    pub fn first_visit(&mut self, key: ElementKey) -> bool {
        self.visited.insert(key)
    }

    /// Clears the mark for `key`, so a later path in the same pass may
    /// process it again.
    pub fn forget(&mut self, key: ElementKey) -> bool {
        self.visited.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CaptureUnavailable,
    Detached,
    VisitedThisPass,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Created(ChainTopology),
    Updated(ChainTopology),
    Unchanged,
    Evicted,
    Skipped(SkipReason),
    Failed(FxError),
}

/// Tally of one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub examined: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub evicted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failures a later pass may clear, a subset of `failed`.
    pub retryable: usize,
}

impl PassReport {
    pub fn record(&mut self, outcome: &SyncOutcome) {
        self.examined += 1;
        match outcome {
            SyncOutcome::Created(_) => self.created += 1,
            SyncOutcome::Updated(_) => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Evicted => self.evicted += 1,
            SyncOutcome::Skipped(_) => self.skipped += 1,
            SyncOutcome::Failed(err) => {
                self.failed += 1;
                if err.is_retryable() {
                    self.retryable += 1;
                }
            }
        }
    }
}

/// Brings one element's chain in line with the latest parameters.
pub struct GraphSynchronizer<'a, H: AudioHost> {
    context: &'a mut SharedContext<H>,
    registry: &'a mut ChainRegistry<H>,
    config: &'a FxConfig,
    params: ParameterSet,
}

impl<'a, H: AudioHost> GraphSynchronizer<'a, H> {
    pub fn new(
        context: &'a mut SharedContext<H>,
        registry: &'a mut ChainRegistry<H>,
        config: &'a FxConfig,
        params: ParameterSet,
    ) -> Self {
        Self {
            context,
            registry,
            config,
            params,
        }
    }

    pub fn apply_or_update(&mut self, element: &H::Element, marks: &mut PassMarks) -> SyncOutcome {
        let label = element.label();
        let key = element.key();

        if !element.can_capture() {
            log_console(&tagged(&label, "Skipped: captureStream not available."));
            return SyncOutcome::Skipped(SkipReason::CaptureUnavailable);
        }

        if !element.is_connected() {
            log_console(&tagged(&label, "Skipped: element not in document."));
            return match self.registry.evict(key) {
                Some(_) => SyncOutcome::Evicted,
                None => SyncOutcome::Skipped(SkipReason::Detached),
            };
        }

        if !self.registry.contains(key) && !marks.first_visit(key) {
            log_console(&tagged(&label, "Skipped: already processed this pass."));
            return SyncOutcome::Skipped(SkipReason::VisitedThisPass);
        }

        let context = match self.context.ensure_context() {
            Ok(context) => context,
            Err(err) => {
                error_console(&tagged(&label, &format!("Context error: {}", err)));
                return SyncOutcome::Failed(err);
            }
        };
        self.context.resume_if_suspended(&label);

        if let Err(err) = probe_capture(element, &label) {
            return SyncOutcome::Failed(err);
        }

        let stale = self
            .registry
            .get(key)
            .map_or(false, |entry| entry.chain.context().id() != context.id());
        if stale {
            log_console(&tagged(&label, "Owning context was closed, rebuilding chain."));
            self.registry.evict(key);
        }

        if self.registry.contains(key) {
            self.update(element, &label)
        } else {
            self.create(element, &context, &label)
        }
    }

    /// Drops the chain registered for `element`, if any. The element's mark
    /// is cleared too, so a re-insertion later in the same pass is processed.
    pub fn evict(&mut self, element: &H::Element, marks: &mut PassMarks) -> bool {
        marks.forget(element.key());
        let evicted = self.registry.evict(element.key()).is_some();
        if evicted {
            log_console(&tagged(&element.label(), "Removed from document, chain evicted."));
        }
        evicted
    }

    /// Evicts every registered element that is no longer in the document.
    /// Catches removals the page observer never reports, such as those
    /// inside shadow roots.
    pub fn sweep_detached(&mut self, marks: &mut PassMarks) -> usize {
        let detached: Vec<H::Element> = self
            .registry
            .elements()
            .into_iter()
            .filter(|element| !element.is_connected())
            .collect();
        for element in &detached {
            self.evict(element, marks);
        }
        detached.len()
    }

    fn create(&mut self, element: &H::Element, context: &H::Context, label: &str) -> SyncOutcome {
        let params = self.params;
        log_console(&tagged(
            label,
            &format!(
                "Creating chain (gain {}, reverb {}), context {}.",
                params.gain_value,
                params.reverb_enabled,
                context.state().as_str()
            ),
        ));

        // The source node takes a capture of its own, never the probe's.
        let stream = match element.capture_stream() {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                let err = FxError::CaptureFailed("captureStream() returned nothing".into());
                error_console(&tagged(label, &format!("Graph setup error: {}", err)));
                return SyncOutcome::Failed(err);
            }
            Err(err) => {
                error_console(&tagged(label, &format!("Graph setup error: {}", err)));
                return SyncOutcome::Failed(err);
            }
        };

        let impulse = if params.reverb_enabled {
            match self.context.impulse_for(context) {
                Ok(buffer) => Some(buffer),
                Err(err) => {
                    error_console(&tagged(
                        label,
                        &format!("Failed to get impulse, chain not created: {}", err),
                    ));
                    return SyncOutcome::Failed(err);
                }
            }
        } else {
            None
        };

        match EffectChain::build(context, &stream, params.gain_value, impulse.as_ref()) {
            Ok(chain) => {
                let topology = chain.topology();
                self.registry.insert(element.clone(), chain);
                log_console(&tagged(label, "Chain created and registered."));
                apply_mute_policy(context, element, label, true);
                SyncOutcome::Created(topology)
            }
            Err(err) => {
                error_console(&tagged(
                    label,
                    &format!("Graph setup error, nodes rolled back: {}", err),
                ));
                SyncOutcome::Failed(err)
            }
        }
    }

    fn update(&mut self, element: &H::Element, label: &str) -> SyncOutcome {
        let params = self.params;
        let config = self.config;
        let Some(entry) = self.registry.get_mut(element.key()) else {
            return SyncOutcome::Skipped(SkipReason::Detached);
        };
        let chain = &mut entry.chain;

        if chain.matches(&params, config.gain_tolerance) {
            log_console(&tagged(label, "Params unchanged, skipping update."));
            return SyncOutcome::Unchanged;
        }

        log_console(&tagged(
            label,
            &format!(
                "Updating params: gain {}, reverb {}.",
                params.gain_value, params.reverb_enabled
            ),
        ));
        if let Err(err) = chain.ramp_gain(params.gain_value, config.gain_time_constant) {
            warn_console(&tagged(label, &format!("Gain ramp failed: {}", err)));
        }

        match (params.reverb_enabled, chain.topology()) {
            (true, ChainTopology::Dry) => {
                let context = chain.context().clone();
                match self.context.impulse_for(&context) {
                    Ok(buffer) => match chain.add_stage(&buffer) {
                        Ok(()) => log_console(&tagged(label, "Reverb stage added.")),
                        Err(err) => {
                            error_console(&tagged(label, &format!("Reverb add failed: {}", err)))
                        }
                    },
                    Err(err) => error_console(&tagged(
                        label,
                        &format!("Failed to get impulse, reverb not added: {}", err),
                    )),
                }
            }
            (false, ChainTopology::Reverb) => match chain.remove_stage() {
                Ok(()) => log_console(&tagged(label, "Reverb stage removed.")),
                Err(err) => {
                    error_console(&tagged(label, &format!("Reverb removal failed: {}", err)))
                }
            },
            _ => {}
        }

        let topology = chain.topology();
        apply_mute_policy(chain.context(), element, label, false);
        SyncOutcome::Updated(topology)
    }
}

/// Checks that the element yields a stream right now. An inactive stream is
/// logged but accepted, since it may become active later.
fn probe_capture<E: MediaElement>(element: &E, label: &str) -> Result<(), FxError> {
    match element.capture_stream() {
        Ok(Some(stream)) => {
            if stream.is_active() {
                log_console(&tagged(label, "captureStream() succeeded, stream active."));
            } else {
                warn_console(&tagged(label, "captureStream() returned inactive stream."));
            }
            Ok(())
        }
        Ok(None) => {
            warn_console(&tagged(label, "captureStream() returned null/undefined."));
            Err(FxError::CaptureFailed("captureStream() returned nothing".into()))
        }
        Err(err) => {
            error_console(&tagged(label, &format!("Ctx/capture error: {}", err)));
            Err(err)
        }
    }
}

/// Silences the element's own output once processed audio can play.
///
/// With a running context the element is muted now. Otherwise, when `arm`
/// is set, a one-shot listener mutes it on the next transition if that
/// transition is to `running`.
fn apply_mute_policy<C, E>(context: &C, element: &E, label: &str, arm: bool)
where
    C: ProcessingContext,
    E: MediaElement,
{
    match context.state() {
        ContextState::Running => {
            if !element.is_muted() {
                element.set_muted(true);
                log_console(&tagged(label, "Element muted, context running."));
            }
        }
        ContextState::Closed => {
            log_console(&tagged(label, "Context closed, not muting."));
        }
        state if arm => {
            log_console(&tagged(
                label,
                &format!("Context {}, muting once it runs.", state.as_str()),
            ));
            let element = element.clone();
            let label = label.to_string();
            context.on_next_state_change(Box::new(move |next| match next {
                ContextState::Running => {
                    element.set_muted(true);
                    log_console(&tagged(&label, "Context running, element muted."));
                }
                ContextState::Closed => {
                    log_console(&tagged(&label, "Context closed before running."));
                }
                _ => {}
            }));
        }
        state => {
            log_console(&tagged(
                label,
                &format!("Context {}, not muting yet.", state.as_str()),
            ));
        }
    }
}
