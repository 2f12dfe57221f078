use crate::error::Result;
use crate::params::ParameterSet;
use crate::traits::ProcessingContext;

/// Shape of the segment after the gain stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTopology {
    /// source → gain → output
    Dry,
    /// source → gain → convolver → output
    Reverb,
}

impl ChainTopology {
    pub fn for_params(params: &ParameterSet) -> Self {
        if params.reverb_enabled {
            ChainTopology::Reverb
        } else {
            ChainTopology::Dry
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReverbStage<N> {
    Bypassed,
    Engaged(N),
}

/// Processing nodes attached to one media element.
///
/// The source node is bound to the element's stream once, at build time.
/// Reverb changes only rewire the segment after the gain node.
pub struct EffectChain<C: ProcessingContext> {
    context: C,
    source: C::Node,
    gain: C::Node,
    reverb: ReverbStage<C::Node>,
    gain_target: f32,
}

impl<C: ProcessingContext> EffectChain<C> {
    /// Builds and wires a chain. If any step fails, every node created so far
    /// is disconnected and nothing is returned.
    pub fn build(
        context: &C,
        stream: &C::Stream,
        gain: f32,
        impulse: Option<&C::Buffer>,
    ) -> Result<Self> {
        let mut created = Vec::with_capacity(3);
        let chain = Self::wire(context, stream, gain, impulse, &mut created);
        if chain.is_err() {
            for node in &created {
                context.disconnect(node);
            }
        }
        chain
    }

    fn wire(
        context: &C,
        stream: &C::Stream,
        gain: f32,
        impulse: Option<&C::Buffer>,
        created: &mut Vec<C::Node>,
    ) -> Result<Self> {
        let source = context.create_media_stream_source(stream)?;
        created.push(source.clone());

        let gain_node = context.create_gain(gain)?;
        created.push(gain_node.clone());

        context.connect(&source, &gain_node)?;

        let reverb = match impulse {
            Some(buffer) => {
                let convolver = context.create_convolver(buffer)?;
                created.push(convolver.clone());
                context.connect(&gain_node, &convolver)?;
                context.connect_to_output(&convolver)?;
                ReverbStage::Engaged(convolver)
            }
            None => {
                context.connect_to_output(&gain_node)?;
                ReverbStage::Bypassed
            }
        };

        Ok(Self {
            context: context.clone(),
            source,
            gain: gain_node,
            reverb,
            gain_target: gain,
        })
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn source(&self) -> &C::Node {
        &self.source
    }

    pub fn gain_node(&self) -> &C::Node {
        &self.gain
    }

    pub fn convolver(&self) -> Option<&C::Node> {
        match &self.reverb {
            ReverbStage::Engaged(node) => Some(node),
            ReverbStage::Bypassed => None,
        }
    }

    pub fn topology(&self) -> ChainTopology {
        match self.reverb {
            ReverbStage::Engaged(_) => ChainTopology::Reverb,
            ReverbStage::Bypassed => ChainTopology::Dry,
        }
    }

    /// Gain most recently requested of the gain stage.
    pub fn gain_target(&self) -> f32 {
        self.gain_target
    }

    pub fn matches(&self, params: &ParameterSet, tolerance: f32) -> bool {
        (self.gain_target - params.gain_value).abs() < tolerance
            && self.topology() == ChainTopology::for_params(params)
    }

    pub fn ramp_gain(&mut self, target: f32, time_constant: f64) -> Result<()> {
        self.context.ramp_gain(&self.gain, target, time_constant)?;
        self.gain_target = target;
        Ok(())
    }

    /// gain → output becomes gain → convolver → output.
    ///
    /// On a wiring failure the convolver is dropped and the dry path restored.
    pub fn add_stage(&mut self, impulse: &C::Buffer) -> Result<()> {
        if let ReverbStage::Engaged(_) = self.reverb {
            return Ok(());
        }

        let convolver = self.context.create_convolver(impulse)?;
        self.context.disconnect(&self.gain);
        let wired = self
            .context
            .connect(&self.gain, &convolver)
            .and_then(|_| self.context.connect_to_output(&convolver));

        if let Err(err) = wired {
            self.context.disconnect(&convolver);
            self.context.disconnect(&self.gain);
            self.context.connect_to_output(&self.gain)?;
            return Err(err);
        }

        self.reverb = ReverbStage::Engaged(convolver);
        Ok(())
    }

    /// gain → convolver → output becomes gain → output.
    pub fn remove_stage(&mut self) -> Result<()> {
        let ReverbStage::Engaged(convolver) =
            std::mem::replace(&mut self.reverb, ReverbStage::Bypassed)
        else {
            return Ok(());
        };

        self.context.disconnect(&self.gain);
        self.context.disconnect(&convolver);
        self.context.connect_to_output(&self.gain)
    }

    /// Disconnects every node. The chain is unusable afterwards.
    pub fn release(&self) {
        self.context.disconnect(&self.source);
        self.context.disconnect(&self.gain);
        if let ReverbStage::Engaged(convolver) = &self.reverb {
            self.context.disconnect(convolver);
        }
    }
}
