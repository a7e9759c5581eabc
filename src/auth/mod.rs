pub mod classify;
pub mod identity;
pub mod pkce;
pub mod roles;

pub use classify::{AuthErrorCode, Remediation};
pub use identity::{
    AuthorizeRequest, IdentityClaims, IdentityError, IdentityProvider, OidcProvider, SignedIn, TokenSet,
};
pub use pkce::PkcePair;
pub use roles::{Role, RoleSet};
