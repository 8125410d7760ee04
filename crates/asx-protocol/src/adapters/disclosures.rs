//! In-memory credential disclosure source.

use crate::config::ConfigError;
use crate::domain::entities::ResourceId;
use crate::domain::session::CredentialDisclosure;
use crate::ports::outbound::{DisclosureError, DisclosureSource};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Disclosures received by this service, in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryDisclosureStore {
    disclosures: RwLock<Vec<CredentialDisclosure>>,
}

impl InMemoryDisclosureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of disclosures.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let disclosures: Vec<CredentialDisclosure> =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self {
            disclosures: RwLock::new(disclosures),
        })
    }

    /// Record a newly presented disclosure.
    pub fn add(&self, disclosure: CredentialDisclosure) {
        self.disclosures.write().push(disclosure);
    }

    pub fn len(&self) -> usize {
        self.disclosures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DisclosureSource for InMemoryDisclosureStore {
    async fn disclosures(
        &self,
        schema: &str,
        issuer: &ResourceId,
    ) -> Result<Vec<CredentialDisclosure>, DisclosureError> {
        Ok(self
            .disclosures
            .read()
            .iter()
            .filter(|d| d.schema == schema && &d.issuer == issuer)
            .cloned()
            .collect())
    }
}
