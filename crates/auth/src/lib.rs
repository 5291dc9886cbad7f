//! `rentloop-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Token
//! *issuance* (registration, login, OTP) is an external system; only claim
//! validation and role gating live here.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use principal::Principal;
pub use roles::Role;
