use serde::{Deserialize, Serialize};

/// `type` tag of the window message that carries new parameters.
pub const PARAMS_MESSAGE_TYPE: &str = "WEBAUDIO_EFFECT_PARAMS";

/// Latest requested effect settings. Always replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    #[serde(rename = "gainValue")]
    pub gain_value: f32,
    #[serde(rename = "reverbEnabled")]
    pub reverb_enabled: bool,
}

impl ParameterSet {
    pub fn new(gain_value: f32, reverb_enabled: bool) -> Self {
        Self {
            gain_value,
            reverb_enabled,
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            gain_value: 0.7,
            reverb_enabled: false,
        }
    }
}

/// Single slot holding the latest [`ParameterSet`].
///
/// Readers get a copy, so a value read before a later `set_latest` never
/// changes under them.
#[derive(Debug, Clone)]
pub struct ParameterBus {
    latest: ParameterSet,
    revision: u64,
}

impl ParameterBus {
    pub fn new(initial: ParameterSet) -> Self {
        Self {
            latest: initial,
            revision: 0,
        }
    }

    pub fn set_latest(&mut self, params: ParameterSet) {
        self.latest = params;
        self.revision += 1;
    }

    pub fn latest(&self) -> ParameterSet {
        self.latest
    }

    /// Number of replacements since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for ParameterBus {
    fn default() -> Self {
        Self::new(ParameterSet::default())
    }
}

/// Window message envelope posted by the page-side relay.
#[derive(Debug, Clone, Deserialize)]
pub struct EffectParamsMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: Option<ParameterSet>,
}

impl EffectParamsMessage {
    /// The payload, if this envelope is addressed to us.
    pub fn into_params(self) -> Option<ParameterSet> {
        if self.message_type == PARAMS_MESSAGE_TYPE {
            self.payload
        } else {
            None
        }
    }
}
