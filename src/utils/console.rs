// src/utils/console.rs
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
use web_sys::console;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub fn log_console(message: &str) {
    console::log_1(&message.into());
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub fn warn_console(message: &str) {
    console::warn_1(&message.into());
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub fn error_console(message: &str) {
    console::error_1(&message.into());
}

#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
pub fn log_console(_message: &str) {}

#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
pub fn warn_console(message: &str) {
    eprintln!("warning: {}", message);
}

#[cfg(not(all(feature = "wasm", target_arch = "wasm32")))]
pub fn error_console(message: &str) {
    eprintln!("error: {}", message);
}

/// Prefixes a message with the element label, e.g. `[intro-video] muted`.
pub fn tagged(label: &str, message: &str) -> String {
    format!("[{}] {}", label, message)
}
