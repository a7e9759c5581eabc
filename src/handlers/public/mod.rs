// handlers/public/mod.rs - routes reachable without a session
//
// None of these may redirect into the sign-in flow on their own; they are the
// targets of that flow.

pub mod auth;
pub mod health;
pub mod unauthorized;

pub use health::health_get;
pub use unauthorized::unauthorized_get;
