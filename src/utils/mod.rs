pub mod console;

pub use console::{error_console, log_console, tagged, warn_console};
