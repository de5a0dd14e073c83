//! # Domain Layer
//!
//! The update command and its input validation.

use shared_types::{AttributeUpdate, EntityId, Version};

use crate::error::CommandError;

/// A client request to change an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCommand {
    pub id: EntityId,
    /// Client-supplied idempotency key (`X-Request-ID`).
    pub request_id: Option<String>,
    pub update: AttributeUpdate,
    /// Version the client read. `0` creates the entity.
    pub expected_version: Version,
}

impl UpdateCommand {
    pub fn new(
        id: EntityId,
        request_id: impl Into<String>,
        update: AttributeUpdate,
        expected_version: Version,
    ) -> Self {
        Self {
            id,
            request_id: Some(request_id.into()),
            update,
            expected_version,
        }
    }

    /// The request id, if present and not blank.
    pub fn validated_request_id(&self) -> Result<&str, CommandError> {
        self.request_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(CommandError::MissingRequestId)
    }
}
