use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ReverbConfig;
use crate::error::{FxError, Result};

/// Synthetic reverb kernel, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub sample_rate: f32,
    pub channels: Vec<Vec<f32>>,
}

impl ImpulseResponse {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_seconds(&self) -> f32 {
        self.len() as f32 / self.sample_rate
    }
}

pub struct ImpulseResponseGenerator {
    sample_rate: f32,
}

impl ImpulseResponseGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    /// Samples per channel for a kernel of `duration_seconds`, never zero.
    pub fn length_for(&self, duration_seconds: f32) -> usize {
        ((self.sample_rate * duration_seconds).round() as usize).max(1)
    }

    /// Uniform noise shaped by `(1 - i/len)^decay`, drawn independently per
    /// channel.
    pub fn decaying_noise(&self, shape: &ReverbConfig) -> Result<ImpulseResponse> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(FxError::ImpulseUnavailable(format!(
                "invalid sample rate {}",
                self.sample_rate
            )));
        }

        // Seed from the platform source; on wasm this goes through crypto.getRandomValues.
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed)
            .map_err(|e| FxError::ImpulseUnavailable(format!("no entropy source: {}", e)))?;
        let mut rng = StdRng::from_seed(seed);

        let length = self.length_for(shape.duration_seconds);
        let channels = (0..shape.channel_count)
            .map(|_| {
                (0..length)
                    .map(|i| {
                        let envelope = (1.0 - i as f32 / length as f32).powf(shape.decay_exponent);
                        rng.random_range(-1.0_f32..1.0_f32) * envelope
                    })
                    .collect()
            })
            .collect();

        Ok(ImpulseResponse {
            sample_rate: self.sample_rate,
            channels,
        })
    }
}
