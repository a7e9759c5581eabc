pub mod client;

pub use client::{BackendClient, ClientError, ForwardedResponse, RequestContext};
