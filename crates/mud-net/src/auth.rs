//! The authentication boundary (§6). A full OAuth-callback → session flow
//! lives entirely behind an HTTP front end out of this crate's scope; what
//! the simulation core needs from it is a single synchronous question —
//! "does this line prove who the owner is?" — asked once, on the
//! connection's first line, per the `allow_local_auth` escape hatch (§10).

use crate::error::{NetError, NetResult};

/// Resolves a connection's first line of text to an owner id, or rejects
/// it outright — the Rust-native stand-in for a full OAuth redirect
/// chain.
pub trait AuthPort: Send + Sync {
    fn authenticate(&self, first_line: &str) -> NetResult<String>;
}

/// Accepts the first line verbatim as the owner id. Only wired up when
/// `allow_local_auth` is set — real deployments front this crate with an
/// OAuth callback that mints a session token instead.
pub struct LocalAuth;

impl AuthPort for LocalAuth {
    fn authenticate(&self, first_line: &str) -> NetResult<String> {
        let owner = first_line.trim();
        if owner.is_empty() {
            return Err(NetError::AuthRejected("empty owner id".into()));
        }
        Ok(owner.to_string())
    }
}
