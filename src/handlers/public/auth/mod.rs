// handlers/public/auth/mod.rs - sign-in flow endpoints
//
// GET /auth/login     start a sign-in, optionally with ?returnTo=
// GET /auth/signup    start a sign-in on the signup screen with a chosen ?role=
// GET /auth/callback  identity provider redirect target
// GET /auth/logout    end the session and sign out at the provider
// GET /auth/error     classified error page with a retry or support action

pub mod callback;
pub mod error;
pub mod login;
pub mod logout;
pub mod signup;

pub use callback::callback_get;
pub use error::error_get;
pub use login::login_get;
pub use logout::logout_get;
pub use signup::signup_get;
