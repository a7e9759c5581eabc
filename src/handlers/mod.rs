// handlers/mod.rs - console route handlers in two tiers
//
// Public (never gated: sign-in flow, error pages, health) and
// Protected (pass through the auth gate or require a signed-in session).

pub mod protected;
pub mod public;
