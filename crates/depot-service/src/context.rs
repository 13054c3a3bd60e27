//! Per-request caller context.

use uuid::Uuid;

/// Identity of the calling user, injected by the upstream gateway.
///
/// Authentication itself is out of scope; the gateway contract is a
/// trusted user id per request, which the engine uses for session
/// ownership checks and quota accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// The acting user.
    pub user_id: Uuid,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}
