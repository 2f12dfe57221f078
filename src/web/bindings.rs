use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, MutationObserver, MutationObserverInit, Node};

use super::host::{describe, WebHost, WebNode};
use crate::config::FxConfig;
use crate::params::{EffectParamsMessage, ParameterSet};
use crate::session::{BootstrapOutcome, FxSession};
use crate::utils::{error_console, log_console, warn_console};
use crate::watcher::MutationRecord;

type SharedSession = Rc<RefCell<FxSession<WebHost>>>;

thread_local! {
    static SESSION: OnceCell<SharedSession> = OnceCell::new();
}

fn current_session() -> Option<SharedSession> {
    SESSION.with(|slot| slot.get().cloned())
}

fn page_body() -> Result<web_sys::HtmlElement, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body())
        .ok_or_else(|| JsValue::from_str("document has no body"))
}

fn parse_config(config: JsValue) -> FxConfig {
    if config.is_undefined() || config.is_null() {
        return FxConfig::default();
    }
    let parsed = serde_wasm_bindgen::from_value::<FxConfig>(config)
        .map_err(|err| err.to_string())
        .and_then(|config| config.validate().map(|_| config).map_err(|err| err.to_string()));
    match parsed {
        Ok(config) => config,
        Err(reason) => {
            warn_console(&format!("Invalid config, using defaults: {}", reason));
            FxConfig::default()
        }
    }
}

/// One-time page setup. Returns `true` if this call started the session.
///
/// Calling it again is a no-op: the existing session, observer and message
/// listener are reused.
#[wasm_bindgen]
pub fn bootstrap(config: JsValue) -> Result<bool, JsValue> {
    if let Some(session) = current_session() {
        let body = WebNode(page_body()?.into());
        let outcome = session.borrow_mut().bootstrap(&body);
        return Ok(matches!(outcome, BootstrapOutcome::Started { .. }));
    }

    let config = parse_config(config);
    let body: Node = page_body()?.into();
    let session: SharedSession = Rc::new(RefCell::new(FxSession::new(WebHost, config)));
    SESSION
        .with(|slot| slot.set(session.clone()))
        .map_err(|_| JsValue::from_str("session already installed"))?;

    let outcome = session.borrow_mut().bootstrap(&WebNode(body.clone()));
    match outcome {
        BootstrapOutcome::Started {
            discovered,
            created,
        } => {
            log_console(&format!(
                "Initialized: {} element(s) found, {} chain(s) created.",
                discovered, created
            ));
            install_observer(&session, &body)?;
            install_message_listener()?;
            Ok(true)
        }
        BootstrapOutcome::AlreadyInitialized | BootstrapOutcome::Disabled => Ok(false),
    }
}

/// Delivers new parameters. Returns whether they were accepted.
#[wasm_bindgen(js_name = setEffectParams)]
pub fn set_effect_params(params: JsValue) -> bool {
    let params: ParameterSet = match serde_wasm_bindgen::from_value(params) {
        Ok(params) => params,
        Err(err) => {
            warn_console(&format!("Ignoring malformed effect params: {}", err));
            return false;
        }
    };
    apply_params(params)
}

#[wasm_bindgen(js_name = activeChainCount)]
pub fn active_chain_count() -> usize {
    current_session().map_or(0, |session| session.borrow().chain_count())
}

fn apply_params(params: ParameterSet) -> bool {
    let Some(session) = current_session() else {
        warn_console("Effect params received before bootstrap.");
        return false;
    };
    let Ok(mut session) = session.try_borrow_mut() else {
        warn_console("Session busy, effect params dropped.");
        return false;
    };
    if session.is_disabled() {
        return false;
    }
    session.set_latest(params);
    true
}

fn node_list(list: &web_sys::NodeList) -> Vec<WebNode> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .map(WebNode)
        .collect()
}

fn install_observer(session: &SharedSession, body: &Node) -> Result<(), JsValue> {
    let session = session.clone();
    let callback = Closure::wrap(Box::new(move |mutations: js_sys::Array, _: MutationObserver| {
        let records: Vec<MutationRecord<WebNode>> = mutations
            .iter()
            .filter_map(|value| value.dyn_into::<web_sys::MutationRecord>().ok())
            .map(|record| MutationRecord {
                added: node_list(&record.added_nodes()),
                removed: node_list(&record.removed_nodes()),
            })
            .collect();

        match session.try_borrow_mut() {
            Ok(mut session) => {
                session.handle_mutations(&records);
            }
            Err(_) => error_console("Session busy, mutation batch dropped."),
        }
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(body, &options)?;

    // Lives for the page.
    callback.forget();
    Ok(())
}

fn install_message_listener() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let own_window = window.clone();

    let callback = Closure::wrap(Box::new(move |event: MessageEvent| {
        let from_page = event
            .source()
            .map_or(false, |source| js_sys::Object::is(&source, &own_window));
        if !from_page {
            return;
        }
        let Ok(message) = serde_wasm_bindgen::from_value::<EffectParamsMessage>(event.data())
        else {
            return;
        };
        if let Some(params) = message.into_params() {
            log_console(&format!(
                "Received params via postMessage: gain {}, reverb {}",
                params.gain_value, params.reverb_enabled
            ));
            apply_params(params);
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    window
        .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        .map_err(|err| JsValue::from_str(&describe(&err)))?;
    callback.forget();
    Ok(())
}
