// src/web/host.rs
//
// web-sys implementation of the host traits: page nodes and media elements
// from the live DOM, processing nodes from a real AudioContext.
use std::cell::Cell;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AddEventListenerOptions, AudioBuffer, AudioContext, AudioContextState, AudioNode, Document,
    DocumentFragment, Element, GainNode, HtmlMediaElement, MediaStream, Node,
};

use crate::error::{FxError, Result};
use crate::impulse_generator::ImpulseResponse;
use crate::traits::{
    AudioHost, CapturedStream, ContextState, ElementKey, MediaElement, PageNode, ProcessingContext,
};
use crate::utils::error_console;

const MEDIA_SELECTOR: &str = "audio, video";
const CAPTURE_METHODS: [&str; 2] = ["captureStream", "mozCaptureStream"];

thread_local! {
    // Element identities live in a WeakMap so the page keeps ownership.
    static ELEMENT_KEYS: js_sys::WeakMap = js_sys::WeakMap::new();
    static NEXT_ELEMENT_KEY: Cell<u64> = Cell::new(1);
    static NEXT_CONTEXT_ID: Cell<u64> = Cell::new(1);
}

/// Best-effort message from a thrown JS value.
pub(crate) fn describe(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", err)
}

fn key_for(element: &HtmlMediaElement) -> ElementKey {
    ELEMENT_KEYS.with(|keys| {
        if let Some(existing) = keys.get(element).as_f64() {
            return ElementKey(existing as u64);
        }
        let key = NEXT_ELEMENT_KEY.with(|next| {
            let key = next.get();
            next.set(key + 1);
            key
        });
        keys.set(element, &JsValue::from_f64(key as f64));
        ElementKey(key)
    })
}

pub struct WebStream(MediaStream);

impl CapturedStream for WebStream {
    fn is_active(&self) -> bool {
        self.0.active()
    }
}

#[derive(Clone)]
pub struct WebElement {
    element: HtmlMediaElement,
    key: ElementKey,
}

impl WebElement {
    pub fn new(element: HtmlMediaElement) -> Self {
        let key = key_for(&element);
        Self { element, key }
    }

    fn capture_method(&self) -> Option<js_sys::Function> {
        CAPTURE_METHODS.iter().find_map(|name| {
            js_sys::Reflect::get(&self.element, &JsValue::from_str(name))
                .ok()
                .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
        })
    }
}

impl MediaElement for WebElement {
    type Stream = WebStream;

    fn key(&self) -> ElementKey {
        self.key
    }

    fn label(&self) -> String {
        let id = self.element.id();
        if !id.is_empty() {
            return id;
        }
        let src = self.element.current_src();
        if !src.is_empty() {
            return src.chars().take(40).collect();
        }
        self.element.tag_name()
    }

    fn can_capture(&self) -> bool {
        self.capture_method().is_some()
    }

    fn is_connected(&self) -> bool {
        self.element.is_connected()
    }

    fn capture_stream(&self) -> Result<Option<WebStream>> {
        let method = self
            .capture_method()
            .ok_or(FxError::CaptureUnavailable)?;
        let value = method
            .call0(&self.element)
            .map_err(|err| FxError::CaptureFailed(describe(&err)))?;
        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }
        value
            .dyn_into::<MediaStream>()
            .map(|stream| Some(WebStream(stream)))
            .map_err(|_| FxError::CaptureFailed("capture did not return a MediaStream".into()))
    }

    fn is_muted(&self) -> bool {
        self.element.muted()
    }

    fn set_muted(&self, muted: bool) {
        self.element.set_muted(muted);
    }
}

#[derive(Clone)]
pub struct WebNode(pub Node);

impl WebNode {
    fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let list = if let Some(element) = self.0.dyn_ref::<Element>() {
            element.query_selector_all(selector)
        } else if let Some(fragment) = self.0.dyn_ref::<DocumentFragment>() {
            fragment.query_selector_all(selector)
        } else if let Some(document) = self.0.dyn_ref::<Document>() {
            document.query_selector_all(selector)
        } else {
            return Ok(Vec::new());
        };
        let list = list.map_err(|err| FxError::Traversal(describe(&err)))?;

        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }
}

impl PageNode for WebNode {
    type Element = WebElement;

    fn is_element(&self) -> bool {
        self.0.node_type() == Node::ELEMENT_NODE
    }

    fn as_media(&self) -> Option<WebElement> {
        self.0
            .dyn_ref::<HtmlMediaElement>()
            .map(|element| WebElement::new(element.clone()))
    }

    fn media_descendants(&self) -> Result<Vec<WebElement>> {
        Ok(self
            .query_all(MEDIA_SELECTOR)?
            .into_iter()
            .filter_map(|element| element.dyn_into::<HtmlMediaElement>().ok())
            .map(WebElement::new)
            .collect())
    }

    fn shadow_roots(&self) -> Result<Vec<WebNode>> {
        let own = self
            .0
            .dyn_ref::<Element>()
            .and_then(|element| element.shadow_root());
        let nested = self
            .query_all("*")?
            .into_iter()
            .filter_map(|element| element.shadow_root());

        Ok(own
            .into_iter()
            .chain(nested)
            .map(|root| WebNode(root.into()))
            .collect())
    }
}

fn map_state(state: AudioContextState) -> ContextState {
    match state {
        AudioContextState::Running => ContextState::Running,
        AudioContextState::Closed => ContextState::Closed,
        _ => ContextState::Suspended,
    }
}

#[derive(Clone)]
pub struct WebContext {
    id: u64,
    context: AudioContext,
}

impl WebContext {
    fn graph_error(err: JsValue) -> FxError {
        FxError::GraphConstruction(describe(&err))
    }
}

impl ProcessingContext for WebContext {
    type Stream = WebStream;
    type Node = AudioNode;
    type Buffer = AudioBuffer;

    fn id(&self) -> u64 {
        self.id
    }

    fn state(&self) -> ContextState {
        map_state(self.context.state())
    }

    fn sample_rate(&self) -> f32 {
        self.context.sample_rate()
    }

    fn resume(&self) {
        match self.context.resume() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    error_console(&format!("Error resuming context: {}", describe(&err)));
                }
            }),
            Err(err) => error_console(&format!("Error resuming context: {}", describe(&err))),
        }
    }

    fn on_next_state_change(&self, listener: Box<dyn FnOnce(ContextState)>) {
        let context = self.context.clone();
        let callback = Closure::once_into_js(move || listener(map_state(context.state())));
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        if let Err(err) = self
            .context
            .add_event_listener_with_callback_and_add_event_listener_options(
                "statechange",
                callback.unchecked_ref(),
                &options,
            )
        {
            error_console(&format!("Failed to watch context state: {}", describe(&err)));
        }
    }

    fn create_media_stream_source(&self, stream: &WebStream) -> Result<AudioNode> {
        self.context
            .create_media_stream_source(&stream.0)
            .map(AudioNode::from)
            .map_err(Self::graph_error)
    }

    fn create_gain(&self, initial: f32) -> Result<AudioNode> {
        let gain = self.context.create_gain().map_err(Self::graph_error)?;
        gain.gain().set_value(initial);
        Ok(gain.into())
    }

    fn create_convolver(&self, impulse: &AudioBuffer) -> Result<AudioNode> {
        let convolver = self.context.create_convolver().map_err(Self::graph_error)?;
        convolver.set_buffer(Some(impulse));
        Ok(convolver.into())
    }

    fn create_buffer(&self, impulse: &ImpulseResponse) -> Result<AudioBuffer> {
        let unavailable = |err: JsValue| FxError::ImpulseUnavailable(describe(&err));
        let buffer = self
            .context
            .create_buffer(
                impulse.channel_count() as u32,
                impulse.len() as u32,
                impulse.sample_rate,
            )
            .map_err(unavailable)?;
        for (channel, data) in impulse.channels.iter().enumerate() {
            buffer
                .copy_to_channel(data, channel as i32)
                .map_err(unavailable)?;
        }
        Ok(buffer)
    }

    fn ramp_gain(&self, gain: &AudioNode, target: f32, time_constant: f64) -> Result<()> {
        let param = gain.unchecked_ref::<GainNode>().gain();
        let now = self.context.current_time();
        param
            .set_value_at_time(param.value(), now)
            .and_then(|param| param.set_target_at_time(target, now, time_constant))
            .map(|_| ())
            .map_err(Self::graph_error)
    }

    fn connect(&self, from: &AudioNode, to: &AudioNode) -> Result<()> {
        from.connect_with_audio_node(to)
            .map(|_| ())
            .map_err(Self::graph_error)
    }

    fn connect_to_output(&self, from: &AudioNode) -> Result<()> {
        from.connect_with_audio_node(&self.context.destination())
            .map(|_| ())
            .map_err(Self::graph_error)
    }

    fn disconnect(&self, node: &AudioNode) {
        let _ = node.disconnect();
    }
}

const CONTEXT_CONSTRUCTORS: [&str; 2] = ["AudioContext", "webkitAudioContext"];

/// First constructor, in preference order, that `lookup` resolves.
fn first_constructor<T>(lookup: impl Fn(&'static str) -> Option<T>) -> Option<T> {
    CONTEXT_CONSTRUCTORS.iter().copied().find_map(lookup)
}

/// The page's context constructor, prefixed or not.
fn context_constructor() -> Option<js_sys::Function> {
    let window = web_sys::window()?;
    first_constructor(|name| {
        js_sys::Reflect::get(&window, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
    })
}

/// The browser page.
#[derive(Clone, Default)]
pub struct WebHost;

impl AudioHost for WebHost {
    type Element = WebElement;
    type Node = WebNode;
    type Context = WebContext;

    fn is_supported(&self) -> bool {
        context_constructor().is_some()
    }

    fn create_context(&self) -> Result<WebContext> {
        let constructor = context_constructor().ok_or(FxError::AudioUnsupported)?;
        let context = js_sys::Reflect::construct(&constructor, &js_sys::Array::new())
            .map_err(|err| FxError::Context(describe(&err)))?
            .unchecked_into::<AudioContext>();
        let id = NEXT_CONTEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Ok(WebContext { id, context })
    }
}
