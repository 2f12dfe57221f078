//! Browser bindings: the web-sys host and the exported entry points.

mod bindings;
mod host;

pub use bindings::{active_chain_count, bootstrap, set_effect_params};
pub use host::{WebContext, WebElement, WebHost, WebNode, WebStream};
