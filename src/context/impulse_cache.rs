use crate::config::ReverbConfig;
use crate::error::Result;
use crate::impulse_generator::ImpulseResponseGenerator;
use crate::traits::ProcessingContext;

struct CachedImpulse<B> {
    sample_rate: f32,
    buffer: B,
}

/// Reverb kernel keyed by the sample rate it was synthesised for.
pub struct ImpulseCache<B> {
    entry: Option<CachedImpulse<B>>,
    generations: usize,
}

impl<B: Clone> ImpulseCache<B> {
    pub fn new() -> Self {
        Self {
            entry: None,
            generations: 0,
        }
    }

    pub fn get_or_create<C>(&mut self, context: &C, shape: &ReverbConfig) -> Result<B>
    where
        C: ProcessingContext<Buffer = B>,
    {
        let sample_rate = context.sample_rate();
        if let Some(cached) = self.entry.as_ref().filter(|e| e.sample_rate == sample_rate) {
            return Ok(cached.buffer.clone());
        }

        let impulse = ImpulseResponseGenerator::new(sample_rate).decaying_noise(shape)?;
        let buffer = context.create_buffer(&impulse)?;
        self.generations += 1;
        self.entry = Some(CachedImpulse {
            sample_rate,
            buffer: buffer.clone(),
        });
        Ok(buffer)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn cached_sample_rate(&self) -> Option<f32> {
        self.entry.as_ref().map(|e| e.sample_rate)
    }

    /// How many kernels have been synthesised so far.
    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl<B: Clone> Default for ImpulseCache<B> {
    fn default() -> Self {
        Self::new()
    }
}
