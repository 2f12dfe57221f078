// src/traits/mod.rs
//
// Seams between the graph manager and whatever owns the page and the audio
// device. The `web` module implements them over web-sys; tests use the
// in-crate fake host.
use crate::error::Result;
use crate::impulse_generator::ImpulseResponse;

/// Stable identity of a media element for the lifetime of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub u64);

impl From<u64> for ElementKey {
    fn from(value: u64) -> Self {
        ElementKey(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    Uninitialized,
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        }
    }
}

pub trait CapturedStream {
    fn is_active(&self) -> bool;
}

pub trait MediaElement: Clone + 'static {
    type Stream: CapturedStream;

    fn key(&self) -> ElementKey;

    /// Short label for log lines: the element id, else its source, else its tag.
    fn label(&self) -> String;

    /// Whether the element exposes stream capture at all.
    fn can_capture(&self) -> bool;

    fn is_connected(&self) -> bool;

    /// Every call yields a fresh capture. `Ok(None)` means the host handed
    /// back nothing.
    fn capture_stream(&self) -> Result<Option<Self::Stream>>;

    fn is_muted(&self) -> bool;

    fn set_muted(&self, muted: bool);
}

pub trait PageNode: Clone {
    type Element: MediaElement;

    fn is_element(&self) -> bool;

    /// The node itself, if it is an `audio` or `video` element.
    fn as_media(&self) -> Option<Self::Element>;

    /// Media elements in the node's light subtree, excluding the node itself.
    fn media_descendants(&self) -> Result<Vec<Self::Element>>;

    /// Shadow roots hosted by the node or by any element in its light subtree.
    fn shadow_roots(&self) -> Result<Vec<Self>>;
}

pub trait ProcessingContext: Clone + 'static {
    type Stream;
    type Node: Clone;
    type Buffer: Clone;

    /// Identity of this context instance, used to tell a chain's owner apart
    /// from a recreated shared context.
    fn id(&self) -> u64;

    fn state(&self) -> ContextState;

    fn sample_rate(&self) -> f32;

    /// Requests a resume and returns immediately. Failures are logged by the
    /// implementation.
    fn resume(&self);

    /// Registers a listener invoked once, on the next state transition.
    fn on_next_state_change(&self, listener: Box<dyn FnOnce(ContextState)>);

    fn create_media_stream_source(&self, stream: &Self::Stream) -> Result<Self::Node>;

    fn create_gain(&self, initial: f32) -> Result<Self::Node>;

    fn create_convolver(&self, impulse: &Self::Buffer) -> Result<Self::Node>;

    fn create_buffer(&self, impulse: &ImpulseResponse) -> Result<Self::Buffer>;

    /// Moves the gain towards `target` with a first-order approach of the
    /// given time constant, starting now.
    fn ramp_gain(&self, gain: &Self::Node, target: f32, time_constant: f64) -> Result<()>;

    fn connect(&self, from: &Self::Node, to: &Self::Node) -> Result<()>;

    fn connect_to_output(&self, from: &Self::Node) -> Result<()>;

    /// Drops every outgoing connection of `node`.
    fn disconnect(&self, node: &Self::Node);
}

pub trait AudioHost {
    type Element: MediaElement;
    type Node: PageNode<Element = Self::Element>;
    type Context: ProcessingContext<Stream = <Self::Element as MediaElement>::Stream>;

    /// False when the environment has no Web Audio API at all.
    fn is_supported(&self) -> bool;

    fn create_context(&self) -> Result<Self::Context>;
}
