// handlers/protected/mod.rs - routes behind the auth gate
//
// Console pages run the gate and may redirect; JSON endpoints never redirect
// and answer 401 instead.

pub mod console;
pub mod context;
pub mod forward;

pub use console::console_page;
pub use context::context_get;
pub use forward::forward_any;
