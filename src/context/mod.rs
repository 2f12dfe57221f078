//! Owner of the single shared processing context.
//!
//! The context is created lazily on first use. A context that has reached
//! `closed` is never handed out again: the next access builds a fresh one and
//! drops the cached reverb kernel along with it, since a kernel is only
//! trusted for the context whose sample rate produced it.

mod impulse_cache;

pub use impulse_cache::ImpulseCache;

use crate::config::ReverbConfig;
use crate::error::{FxError, Result};
use crate::traits::{AudioHost, ContextState, ProcessingContext};
use crate::utils::{log_console, tagged};

pub type BufferOf<H> = <<H as AudioHost>::Context as ProcessingContext>::Buffer;

pub struct SharedContext<H: AudioHost> {
    host: H,
    current: Option<H::Context>,
    impulse: ImpulseCache<BufferOf<H>>,
    reverb: ReverbConfig,
    created: usize,
}

impl<H: AudioHost> SharedContext<H> {
    pub fn new(host: H, reverb: ReverbConfig) -> Self {
        Self {
            host,
            current: None,
            impulse: ImpulseCache::new(),
            reverb,
            created: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_supported(&self) -> bool {
        self.host.is_supported()
    }

    /// Returns the live context, creating one if there is none or the last
    /// one was closed.
    pub fn ensure_context(&mut self) -> Result<H::Context> {
        if let Some(context) = self
            .current
            .as_ref()
            .filter(|c| c.state() != ContextState::Closed)
        {
            return Ok(context.clone());
        }

        if !self.host.is_supported() {
            return Err(FxError::AudioUnsupported);
        }

        let replacing = self.current.is_some();
        let context = self.host.create_context()?;
        self.impulse.invalidate();
        self.current = Some(context.clone());
        self.created += 1;

        log_console(&format!(
            "{} shared AudioContext ({} Hz, {})",
            if replacing { "Recreated closed" } else { "Created" },
            context.sample_rate(),
            context.state().as_str()
        ));
        Ok(context)
    }

    /// Fire-and-forget resume of a suspended context.
    pub fn resume_if_suspended(&self, label: &str) {
        if let Some(context) = self.current.as_ref() {
            if context.state() == ContextState::Suspended {
                log_console(&tagged(label, "Context suspended, attempting resume..."));
                context.resume();
            }
        }
    }

    /// Cached kernel for `context`, synthesised if the sample rate changed.
    pub fn impulse_for(&mut self, context: &H::Context) -> Result<BufferOf<H>> {
        self.impulse.get_or_create(context, &self.reverb)
    }

    pub fn state(&self) -> ContextState {
        self.current
            .as_ref()
            .map_or(ContextState::Uninitialized, |c| c.state())
    }

    pub fn current(&self) -> Option<&H::Context> {
        self.current.as_ref()
    }

    pub fn contexts_created(&self) -> usize {
        self.created
    }

    pub fn impulse_generations(&self) -> usize {
        self.impulse.generations()
    }

    pub fn cached_impulse_rate(&self) -> Option<f32> {
        self.impulse.cached_sample_rate()
    }
}
