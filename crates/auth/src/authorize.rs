use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires role '{required}'")]
    Forbidden { required: Role },
}

/// Require the principal to hold an exact role.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
///
/// Ownership checks (does this store own this rental?) are domain state and
/// are enforced inside the lifecycle engine, not here.
pub fn require_role(principal: &Principal, required: Role) -> Result<(), AuthzError> {
    if principal.role == required {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { required })
    }
}
