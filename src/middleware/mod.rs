pub mod response;
pub mod session;
pub mod tenant;

pub use response::{ApiResponse, ApiResult};
pub use session::{removal_cookie, require_principal, session_cookie, session_id};
pub use tenant::{resolve_tenant_middleware, RequestTenant};
