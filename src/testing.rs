// In-crate fake host: a small DOM with shadow roots, scriptable media
// elements and an audio context that records every graph operation.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::error::{FxError, Result};
use crate::impulse_generator::ImpulseResponse;
use crate::traits::{
    AudioHost, CapturedStream, ContextState, ElementKey, MediaElement, PageNode,
    ProcessingContext,
};

// ---------------------------------------------------------------------------
// Media elements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Active,
    Inactive,
    Null,
    Throws,
}

#[derive(Debug)]
pub struct FakeStream {
    active: bool,
}

impl CapturedStream for FakeStream {
    fn is_active(&self) -> bool {
        self.active
    }
}

struct ElementInner {
    key: ElementKey,
    tag: &'static str,
    id: String,
    capturable: Cell<bool>,
    capture_mode: Cell<CaptureMode>,
    captures: Cell<usize>,
    muted: Cell<bool>,
    node: RefCell<Weak<NodeInner>>,
}

#[derive(Clone)]
pub struct FakeElement(Rc<ElementInner>);

impl FakeElement {
    pub fn set_capturable(&self, capturable: bool) {
        self.0.capturable.set(capturable);
    }

    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.0.capture_mode.set(mode);
    }

    /// Number of capture calls made against this element.
    pub fn captures(&self) -> usize {
        self.0.captures.get()
    }
}

impl MediaElement for FakeElement {
    type Stream = FakeStream;

    fn key(&self) -> ElementKey {
        self.0.key
    }

    fn label(&self) -> String {
        if self.0.id.is_empty() {
            self.0.tag.to_uppercase()
        } else {
            self.0.id.clone()
        }
    }

    fn can_capture(&self) -> bool {
        self.0.capturable.get()
    }

    fn is_connected(&self) -> bool {
        self.0
            .node
            .borrow()
            .upgrade()
            .map_or(false, |node| FakeNode(node).is_connected())
    }

    fn capture_stream(&self) -> Result<Option<FakeStream>> {
        self.0.captures.set(self.0.captures.get() + 1);
        match self.0.capture_mode.get() {
            CaptureMode::Active => Ok(Some(FakeStream { active: true })),
            CaptureMode::Inactive => Ok(Some(FakeStream { active: false })),
            CaptureMode::Null => Ok(None),
            CaptureMode::Throws => Err(FxError::CaptureFailed("NotSupportedError".into())),
        }
    }

    fn is_muted(&self) -> bool {
        self.0.muted.get()
    }

    fn set_muted(&self, muted: bool) {
        self.0.muted.set(muted);
    }
}

// ---------------------------------------------------------------------------
// DOM
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element,
    ShadowRoot,
    Text,
}

struct NodeInner {
    kind: NodeKind,
    media: Option<FakeElement>,
    children: RefCell<Vec<FakeNode>>,
    shadow: RefCell<Option<FakeNode>>,
    // For a shadow root this is its host.
    parent: RefCell<Weak<NodeInner>>,
    restricted: Cell<bool>,
}

#[derive(Clone)]
pub struct FakeNode(Rc<NodeInner>);

impl FakeNode {
    fn new(kind: NodeKind, media: Option<FakeElement>) -> Self {
        FakeNode(Rc::new(NodeInner {
            kind,
            media,
            children: RefCell::new(Vec::new()),
            shadow: RefCell::new(None),
            parent: RefCell::new(Weak::new()),
            restricted: Cell::new(false),
        }))
    }

    pub fn append(&self, child: &FakeNode) {
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    pub fn remove(&self, child: &FakeNode) {
        self.0
            .children
            .borrow_mut()
            .retain(|existing| !Rc::ptr_eq(&existing.0, &child.0));
        *child.0.parent.borrow_mut() = Weak::new();
    }

    pub fn attach_shadow(&self) -> FakeNode {
        let root = FakeNode::new(NodeKind::ShadowRoot, None);
        *root.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        *self.0.shadow.borrow_mut() = Some(root.clone());
        root
    }

    /// Queries against a restricted node fail, like a cross-origin frame.
    pub fn set_restricted(&self, restricted: bool) {
        self.0.restricted.set(restricted);
    }

    pub fn is_connected(&self) -> bool {
        if self.0.kind == NodeKind::Document {
            return true;
        }
        match self.0.parent.borrow().upgrade() {
            Some(parent) => FakeNode(parent).is_connected(),
            None => false,
        }
    }

    fn check_access(&self) -> Result<()> {
        if self.0.restricted.get() {
            Err(FxError::Traversal("SecurityError: access denied".into()))
        } else {
            Ok(())
        }
    }

    fn walk_light<F: FnMut(&FakeNode)>(&self, visit: &mut F) {
        for child in self.0.children.borrow().iter() {
            visit(child);
            child.walk_light(visit);
        }
    }
}

impl PageNode for FakeNode {
    type Element = FakeElement;

    fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    fn as_media(&self) -> Option<FakeElement> {
        self.0.media.clone()
    }

    fn media_descendants(&self) -> Result<Vec<FakeElement>> {
        self.check_access()?;
        let mut found = Vec::new();
        self.walk_light(&mut |node| {
            if let Some(media) = node.as_media() {
                found.push(media);
            }
        });
        Ok(found)
    }

    fn shadow_roots(&self) -> Result<Vec<FakeNode>> {
        self.check_access()?;
        let mut roots: Vec<FakeNode> = self.0.shadow.borrow().iter().cloned().collect();
        self.walk_light(&mut |node| {
            if let Some(root) = node.0.shadow.borrow().as_ref() {
                roots.push(root.clone());
            }
        });
        Ok(roots)
    }
}

/// Owns the document and hands out element keys.
pub struct FakeDom {
    next_key: Cell<u64>,
    document: FakeNode,
    body: FakeNode,
}

impl FakeDom {
    pub fn new() -> Self {
        let document = FakeNode::new(NodeKind::Document, None);
        let body = FakeNode::new(NodeKind::Element, None);
        document.append(&body);
        Self {
            next_key: Cell::new(1),
            document,
            body,
        }
    }

    pub fn body(&self) -> FakeNode {
        self.body.clone()
    }

    pub fn document(&self) -> FakeNode {
        self.document.clone()
    }

    pub fn element(&self) -> FakeNode {
        FakeNode::new(NodeKind::Element, None)
    }

    pub fn text(&self) -> FakeNode {
        FakeNode::new(NodeKind::Text, None)
    }

    pub fn media(&self, tag: &'static str, id: &str) -> (FakeNode, FakeElement) {
        let key = ElementKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        let element = FakeElement(Rc::new(ElementInner {
            key,
            tag,
            id: id.to_string(),
            capturable: Cell::new(true),
            capture_mode: Cell::new(CaptureMode::Active),
            captures: Cell::new(0),
            muted: Cell::new(false),
            node: RefCell::new(Weak::new()),
        }));
        let node = FakeNode::new(NodeKind::Element, Some(element.clone()));
        *element.0.node.borrow_mut() = Rc::downgrade(&node.0);
        (node, element)
    }

    /// Media element appended straight to the body.
    pub fn add_media(&self, tag: &'static str, id: &str) -> (FakeNode, FakeElement) {
        let (node, element) = self.media(tag, id);
        self.body.append(&node);
        (node, element)
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeNodeKind {
    Source,
    Gain,
    Convolver,
}

impl FakeNodeKind {
    fn as_str(&self) -> &'static str {
        match self {
            FakeNodeKind::Source => "source",
            FakeNodeKind::Gain => "gain",
            FakeNodeKind::Convolver => "convolver",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeAudioNode {
    pub id: usize,
    pub kind: FakeNodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Node(usize),
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Source,
    Gain,
    Convolver,
    Buffer,
    /// The n-th connect call (1-based, counted per context) fails.
    Connect(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeBuffer {
    pub sample_rate: f32,
    pub len: usize,
    pub channels: usize,
}

#[derive(Default)]
struct Journal {
    nodes: Vec<FakeAudioNode>,
    edges: Vec<(usize, Endpoint)>,
    disconnects: Vec<usize>,
    gains: HashMap<usize, f32>,
    ramps: Vec<(usize, f32, f64)>,
    buffers: Vec<FakeBuffer>,
    resumes: usize,
    connect_calls: usize,
    listeners: Vec<Box<dyn FnOnce(ContextState)>>,
    fail: Option<FailPoint>,
}

struct ContextInner {
    id: u64,
    sample_rate: f32,
    state: Cell<ContextState>,
    journal: RefCell<Journal>,
}

#[derive(Clone)]
pub struct FakeContext(Rc<ContextInner>);

impl FakeContext {
    fn new(id: u64, sample_rate: f32, state: ContextState) -> Self {
        FakeContext(Rc::new(ContextInner {
            id,
            sample_rate,
            state: Cell::new(state),
            journal: RefCell::new(Journal::default()),
        }))
    }

    /// Moves the context to `state` and fires every pending one-shot listener.
    pub fn set_state(&self, state: ContextState) {
        self.0.state.set(state);
        let listeners = std::mem::take(&mut self.0.journal.borrow_mut().listeners);
        for listener in listeners {
            listener(state);
        }
    }

    pub fn fail_at(&self, point: Option<FailPoint>) {
        self.0.journal.borrow_mut().fail = point;
    }

    pub fn nodes(&self) -> Vec<FakeAudioNode> {
        self.0.journal.borrow().nodes.clone()
    }

    pub fn nodes_of(&self, kind: FakeNodeKind) -> usize {
        self.0
            .journal
            .borrow()
            .nodes
            .iter()
            .filter(|node| node.kind == kind)
            .count()
    }

    pub fn disconnect_count(&self) -> usize {
        self.0.journal.borrow().disconnects.len()
    }

    pub fn disconnected(&self, node: &FakeAudioNode) -> bool {
        self.0.journal.borrow().disconnects.contains(&node.id)
    }

    pub fn edge_count(&self) -> usize {
        self.0.journal.borrow().edges.len()
    }

    pub fn buffers(&self) -> Vec<FakeBuffer> {
        self.0.journal.borrow().buffers.clone()
    }

    pub fn ramps(&self) -> Vec<(usize, f32, f64)> {
        self.0.journal.borrow().ramps.clone()
    }

    pub fn resume_requests(&self) -> usize {
        self.0.journal.borrow().resumes
    }

    pub fn pending_listeners(&self) -> usize {
        self.0.journal.borrow().listeners.len()
    }

    pub fn gain_of(&self, node: &FakeAudioNode) -> f32 {
        self.0.journal.borrow().gains[&node.id]
    }

    /// Follows outgoing edges from `start`, e.g. `["source", "gain", "output"]`.
    pub fn route_from(&self, start: &FakeAudioNode) -> Vec<&'static str> {
        let journal = self.0.journal.borrow();
        let kind_of = |id: usize| {
            journal
                .nodes
                .iter()
                .find(|node| node.id == id)
                .map(|node| node.kind.as_str())
                .unwrap_or("?")
        };
        let mut route = vec![start.kind.as_str()];
        let mut current = start.id;
        for _ in 0..8 {
            let next: Vec<Endpoint> = journal
                .edges
                .iter()
                .filter(|(from, _)| *from == current)
                .map(|(_, to)| *to)
                .collect();
            match next.as_slice() {
                [Endpoint::Node(id)] => {
                    route.push(kind_of(*id));
                    current = *id;
                }
                [Endpoint::Output] => {
                    route.push("output");
                    break;
                }
                [] => break,
                _ => {
                    route.push("fan-out");
                    break;
                }
            }
        }
        route
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.0.journal.borrow().fail == Some(point) {
            Err(FxError::GraphConstruction(format!("injected failure at {:?}", point)))
        } else {
            Ok(())
        }
    }

    fn push_node(&self, kind: FakeNodeKind) -> FakeAudioNode {
        let mut journal = self.0.journal.borrow_mut();
        let node = FakeAudioNode {
            id: journal.nodes.len(),
            kind,
        };
        journal.nodes.push(node);
        node
    }

    fn push_edge(&self, from: usize, to: Endpoint) -> Result<()> {
        let call = {
            let mut journal = self.0.journal.borrow_mut();
            journal.connect_calls += 1;
            journal.connect_calls
        };
        self.check(FailPoint::Connect(call))?;
        self.0.journal.borrow_mut().edges.push((from, to));
        Ok(())
    }
}

impl ProcessingContext for FakeContext {
    type Stream = FakeStream;
    type Node = FakeAudioNode;
    type Buffer = FakeBuffer;

    fn id(&self) -> u64 {
        self.0.id
    }

    fn state(&self) -> ContextState {
        self.0.state.get()
    }

    fn sample_rate(&self) -> f32 {
        self.0.sample_rate
    }

    fn resume(&self) {
        self.0.journal.borrow_mut().resumes += 1;
    }

    fn on_next_state_change(&self, listener: Box<dyn FnOnce(ContextState)>) {
        self.0.journal.borrow_mut().listeners.push(listener);
    }

    fn create_media_stream_source(&self, _stream: &FakeStream) -> Result<FakeAudioNode> {
        self.check(FailPoint::Source)?;
        Ok(self.push_node(FakeNodeKind::Source))
    }

    fn create_gain(&self, initial: f32) -> Result<FakeAudioNode> {
        self.check(FailPoint::Gain)?;
        let node = self.push_node(FakeNodeKind::Gain);
        self.0.journal.borrow_mut().gains.insert(node.id, initial);
        Ok(node)
    }

    fn create_convolver(&self, _impulse: &FakeBuffer) -> Result<FakeAudioNode> {
        self.check(FailPoint::Convolver)?;
        Ok(self.push_node(FakeNodeKind::Convolver))
    }

    fn create_buffer(&self, impulse: &ImpulseResponse) -> Result<FakeBuffer> {
        self.check(FailPoint::Buffer)?;
        let buffer = FakeBuffer {
            sample_rate: impulse.sample_rate,
            len: impulse.len(),
            channels: impulse.channel_count(),
        };
        self.0.journal.borrow_mut().buffers.push(buffer.clone());
        Ok(buffer)
    }

    fn ramp_gain(&self, gain: &FakeAudioNode, target: f32, time_constant: f64) -> Result<()> {
        let mut journal = self.0.journal.borrow_mut();
        journal.ramps.push((gain.id, target, time_constant));
        journal.gains.insert(gain.id, target);
        Ok(())
    }

    fn connect(&self, from: &FakeAudioNode, to: &FakeAudioNode) -> Result<()> {
        self.push_edge(from.id, Endpoint::Node(to.id))
    }

    fn connect_to_output(&self, from: &FakeAudioNode) -> Result<()> {
        self.push_edge(from.id, Endpoint::Output)
    }

    fn disconnect(&self, node: &FakeAudioNode) {
        let mut journal = self.0.journal.borrow_mut();
        journal.edges.retain(|(from, _)| *from != node.id);
        journal.disconnects.push(node.id);
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

struct HostInner {
    supported: Cell<bool>,
    fail_create: Cell<bool>,
    initial_state: Cell<ContextState>,
    sample_rate: Cell<f32>,
    contexts: RefCell<Vec<FakeContext>>,
}

#[derive(Clone)]
pub struct FakeHost(Rc<HostInner>);

impl FakeHost {
    pub fn new() -> Self {
        FakeHost(Rc::new(HostInner {
            supported: Cell::new(true),
            fail_create: Cell::new(false),
            initial_state: Cell::new(ContextState::Suspended),
            sample_rate: Cell::new(48_000.0),
            contexts: RefCell::new(Vec::new()),
        }))
    }

    pub fn unsupported() -> Self {
        let host = Self::new();
        host.0.supported.set(false);
        host
    }

    /// State new contexts start in, standing in for the autoplay policy.
    pub fn set_initial_state(&self, state: ContextState) {
        self.0.initial_state.set(state);
    }

    /// Sample rate of contexts created from now on.
    pub fn set_sample_rate(&self, sample_rate: f32) {
        self.0.sample_rate.set(sample_rate);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.0.fail_create.set(fail);
    }

    pub fn contexts(&self) -> Vec<FakeContext> {
        self.0.contexts.borrow().clone()
    }

    pub fn last_context(&self) -> FakeContext {
        self.0
            .contexts
            .borrow()
            .last()
            .cloned()
            .expect("no context created yet")
    }
}

impl AudioHost for FakeHost {
    type Element = FakeElement;
    type Node = FakeNode;
    type Context = FakeContext;

    fn is_supported(&self) -> bool {
        self.0.supported.get()
    }

    fn create_context(&self) -> Result<FakeContext> {
        if self.0.fail_create.get() {
            return Err(FxError::Context("NotAllowedError".into()));
        }
        let mut contexts = self.0.contexts.borrow_mut();
        let context = FakeContext::new(
            contexts.len() as u64 + 1,
            self.0.sample_rate.get(),
            self.0.initial_state.get(),
        );
        contexts.push(context.clone());
        Ok(context)
    }
}
