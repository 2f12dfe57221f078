mod chain;
mod registry;
mod synchronizer;

pub use chain::{ChainTopology, EffectChain, ReverbStage};
pub use registry::{ChainEntry, ChainRegistry};
pub use synchronizer::{GraphSynchronizer, PassMarks, PassReport, SkipReason, SyncOutcome};
