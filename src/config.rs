use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};
use crate::params::ParameterSet;

/// Shape of the synthetic reverb kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbConfig {
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: f32,
    #[serde(rename = "decayExponent")]
    pub decay_exponent: f32,
    #[serde(rename = "channelCount")]
    pub channel_count: usize,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.8,
            decay_exponent: 2.0,
            channel_count: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    #[serde(rename = "initialParams")]
    pub initial_params: ParameterSet,
    pub reverb: ReverbConfig,
    /// Time constant (seconds) of the smoothed gain change on update.
    #[serde(rename = "gainTimeConstant")]
    pub gain_time_constant: f64,
    /// Gain differences below this are treated as unchanged.
    #[serde(rename = "gainTolerance")]
    pub gain_tolerance: f32,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            initial_params: ParameterSet::default(),
            reverb: ReverbConfig::default(),
            gain_time_constant: 0.01,
            gain_tolerance: 0.001,
        }
    }
}

impl FxConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FxConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_params.gain_value.is_finite() {
            return Err(FxError::Config("initialParams.gainValue must be finite".into()));
        }
        if !(self.reverb.duration_seconds.is_finite() && self.reverb.duration_seconds > 0.0) {
            return Err(FxError::Config(format!(
                "reverb.durationSeconds must be positive, got {}",
                self.reverb.duration_seconds
            )));
        }
        if !self.reverb.decay_exponent.is_finite() || self.reverb.decay_exponent < 0.0 {
            return Err(FxError::Config(format!(
                "reverb.decayExponent must be non-negative, got {}",
                self.reverb.decay_exponent
            )));
        }
        if self.reverb.channel_count == 0 {
            return Err(FxError::Config("reverb.channelCount must be at least 1".into()));
        }
        if !(self.gain_time_constant.is_finite() && self.gain_time_constant > 0.0) {
            return Err(FxError::Config(format!(
                "gainTimeConstant must be positive, got {}",
                self.gain_time_constant
            )));
        }
        if !(self.gain_tolerance.is_finite() && self.gain_tolerance >= 0.0) {
            return Err(FxError::Config(format!(
                "gainTolerance must be non-negative, got {}",
                self.gain_tolerance
            )));
        }
        Ok(())
    }
}
