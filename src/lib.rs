pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod impulse_generator;
pub mod params;
pub mod session;
pub mod traits;
pub mod utils;
pub mod watcher;

#[cfg(feature = "wasm")]
pub mod web;

#[cfg(test)]
mod testing;

pub use config::{FxConfig, ReverbConfig};
pub use context::SharedContext;
pub use discovery::find_media_elements;
pub use error::{FxError, Result};
pub use graph::{
    ChainRegistry, ChainTopology, EffectChain, GraphSynchronizer, PassMarks, PassReport,
    SyncOutcome,
};
pub use impulse_generator::{ImpulseResponse, ImpulseResponseGenerator};
pub use params::{EffectParamsMessage, ParameterBus, ParameterSet, PARAMS_MESSAGE_TYPE};
pub use session::{BootstrapOutcome, FxSession};
pub use traits::{AudioHost, ContextState, ElementKey, MediaElement, PageNode, ProcessingContext};
pub use watcher::{MutationRecord, MutationWatcher};
