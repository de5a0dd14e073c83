use serde::Deserialize;
use shared_types::{AttributeUpdate, Version};

/// Idempotency key header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body of `PUT /entities/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateBody {
    pub price: f64,
    /// The version the client last read.
    pub version: Version,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
}

impl UpdateBody {
    #[must_use]
    pub fn attributes(&self) -> AttributeUpdate {
        AttributeUpdate {
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
        }
    }
}
