use serde::Serialize;
use serde_json::Value;

use crate::payload::RawPayload;

/// Service-endpoint catalog carried by a token response.
///
/// Opaque to the accessor core: it only holds the raw endpoint entries the
/// payload carried. Built at most once per accessor, on first access.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceCatalog {
    entries: Vec<Value>,
}

impl ServiceCatalog {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Construction contract for the catalog collaborator.
///
/// Each schema generation ships a default builder; tests may inject their
/// own to observe build counts.
pub trait CatalogBuilder: Send + Sync {
    fn build(&self, payload: &RawPayload) -> ServiceCatalog;
}

/// Reads `access.serviceCatalog` (older schema).
#[derive(Debug, Default)]
pub struct V2CatalogBuilder;

impl CatalogBuilder for V2CatalogBuilder {
    fn build(&self, payload: &RawPayload) -> ServiceCatalog {
        from_entries(payload, &["access", "serviceCatalog"])
    }
}

/// Reads `token.catalog` (newer schema).
#[derive(Debug, Default)]
pub struct V3CatalogBuilder;

impl CatalogBuilder for V3CatalogBuilder {
    fn build(&self, payload: &RawPayload) -> ServiceCatalog {
        from_entries(payload, &["token", "catalog"])
    }
}

fn from_entries(payload: &RawPayload, path: &[&str]) -> ServiceCatalog {
    match payload.list_at(path) {
        Ok(list) => ServiceCatalog::new(list.clone()),
        Err(_) => ServiceCatalog::empty(),
    }
}
