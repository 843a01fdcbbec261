//! `chatgate-auth`: identity tokens, RBAC and credential primitives.
//!
//! This crate is decoupled from HTTP and storage: it issues and verifies
//! tokens, evaluates role allow-lists and hashes passwords.

pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{authorize, require_role, AllowList, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use error::AuthError;
pub use password::{hash_password, verify_password};
pub use principal::Principal;
pub use roles::Role;
pub use token::{JwtValidator, TokenService, TOKEN_LIFETIME_HOURS};
pub use user::{User, UserPatch};
