//! Newer-generation token schema, rooted at `token.*`.
//!
//! Federated identities may lack a home domain, trust and oauth live under
//! vendor-extension subtrees, and the project family is hard once the
//! `token.project` subtree is present.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::access::{
    audit_entry, lookup_error, parse_timestamp, soft, AccessCore, Issued, TokenAccess,
};
use crate::catalog::{CatalogBuilder, ServiceCatalog, V3CatalogBuilder};
use crate::error::{AccessError, SchemaVersion};
use crate::payload::{Lookup, RawPayload};

const SCHEMA: SchemaVersion = SchemaVersion::V3;

const FEDERATION_KEY: &str = "OS-FEDERATION";
const TRUST_KEY: &str = "OS-TRUST:trust";
const OAUTH_KEY: &str = "OS-OAUTH1";

const PROJECT: [&str; 2] = ["token", "project"];
const ROLES: [&str; 2] = ["token", "roles"];
const AUDIT_IDS: [&str; 2] = ["token", "audit_ids"];

pub struct AccessInfoV3 {
    core: AccessCore,
}

impl AccessInfoV3 {
    pub fn new(body: Value, auth_token: Option<String>) -> Self {
        Self {
            core: AccessCore::new(
                RawPayload::new(body),
                auth_token,
                Box::new(V3CatalogBuilder),
            ),
        }
    }

    /// Replace the catalog collaborator (stubbed out in tests).
    pub fn with_catalog_builder(mut self, builder: Box<dyn CatalogBuilder>) -> Self {
        self.core.set_builder(builder);
        self
    }

    fn hard_str(&self, path: &[&str]) -> Result<String, AccessError> {
        self.core
            .data()
            .str_at(path)
            .map_err(|kind| lookup_error(SCHEMA, path, kind))
    }

    /// `user.domain.*` lookup: hard for a regular identity, absent for a
    /// federated one (which may have no home domain).
    fn user_domain_field(&self, key: &str) -> Result<Option<String>, AccessError> {
        match self.hard_str(&["token", "user", "domain", key]) {
            Ok(v) => Ok(Some(v)),
            Err(AccessError::MissingField { .. }) if self.is_federated() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Absent subtree means an unscoped token, not an error.
    fn project_present(&self) -> Result<bool, AccessError> {
        match self.core.data().at(&PROJECT) {
            Ok(_) => Ok(true),
            Err(Lookup::Missing) => Ok(false),
            Err(kind) => Err(lookup_error(SCHEMA, &PROJECT, kind)),
        }
    }

    fn role_field(&self, key: &str) -> Result<Vec<String>, AccessError> {
        let list = match self.core.data().list_at(&ROLES) {
            Ok(list) => list,
            Err(Lookup::Missing) => return Ok(Vec::new()),
            Err(kind) => return Err(lookup_error(SCHEMA, &ROLES, kind)),
        };
        list.iter()
            .map(|r| {
                r.get(key)
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| lookup_error(SCHEMA, &ROLES, Lookup::WrongShape))
            })
            .collect()
    }

    /// Hard once the oauth extension subtree is assumed present.
    fn oauth_field(&self, key: &str) -> Result<Option<String>, AccessError> {
        let path = ["token", OAUTH_KEY];
        match self.core.data().at(&path) {
            Ok(_) => self.hard_str(&["token", OAUTH_KEY, key]).map(Some),
            Err(Lookup::Missing) => Ok(None),
            Err(kind) => Err(lookup_error(SCHEMA, &path, kind)),
        }
    }
}

impl TokenAccess for AccessInfoV3 {
    fn version(&self) -> SchemaVersion {
        SCHEMA
    }

    /// Only the explicitly supplied value; this schema carries the bearer
    /// token in a response header, not in the payload.
    fn auth_token(&self) -> Result<Option<String>, AccessError> {
        Ok(self.core.auth_token().cloned())
    }

    fn expires(&self) -> Result<DateTime<Utc>, AccessError> {
        let path = ["token", "expires_at"];
        let raw = self.hard_str(&path)?;
        parse_timestamp(SCHEMA, &path, &raw)
    }

    fn issued(&self) -> Result<Issued, AccessError> {
        let path = ["token", "issued_at"];
        let raw = self.hard_str(&path)?;
        parse_timestamp(SCHEMA, &path, &raw).map(Issued::At)
    }

    fn username(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", "user", "name"]))
    }

    fn user_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", "user", "id"]))
    }

    fn user_domain_id(&self) -> Result<Option<String>, AccessError> {
        self.user_domain_field("id")
    }

    fn user_domain_name(&self) -> Result<Option<String>, AccessError> {
        self.user_domain_field("name")
    }

    fn role_ids(&self) -> Result<Vec<String>, AccessError> {
        self.role_field("id")
    }

    fn role_names(&self) -> Result<Vec<String>, AccessError> {
        self.role_field("name")
    }

    fn domain_name(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", "domain", "name"]))
    }

    fn domain_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", "domain", "id"]))
    }

    fn project_name(&self) -> Result<Option<String>, AccessError> {
        if !self.project_present()? {
            return Ok(None);
        }
        self.hard_str(&["token", "project", "name"]).map(Some)
    }

    fn project_id(&self) -> Result<Option<String>, AccessError> {
        if !self.project_present()? {
            return Ok(None);
        }
        self.hard_str(&["token", "project", "id"]).map(Some)
    }

    fn project_domain_id(&self) -> Result<Option<String>, AccessError> {
        if !self.project_present()? {
            return Ok(None);
        }
        self.hard_str(&["token", "project", "domain", "id"]).map(Some)
    }

    fn project_domain_name(&self) -> Result<Option<String>, AccessError> {
        if !self.project_present()? {
            return Ok(None);
        }
        soft(self.hard_str(&["token", "project", "domain", "name"]))
    }

    fn project_scoped(&self) -> bool {
        self.core.data().truthy_at(&PROJECT)
    }

    fn domain_scoped(&self) -> bool {
        self.core.data().truthy_at(&["token", "domain"])
    }

    fn trust_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", TRUST_KEY, "id"]))
    }

    fn trust_scoped(&self) -> bool {
        self.core.data().truthy_at(&["token", TRUST_KEY])
    }

    fn trustee_user_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", TRUST_KEY, "trustee_user", "id"]))
    }

    fn trustor_user_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["token", TRUST_KEY, "trustor_user", "id"]))
    }

    fn oauth_access_token_id(&self) -> Result<Option<String>, AccessError> {
        self.oauth_field("access_token_id")
    }

    fn oauth_consumer_id(&self) -> Result<Option<String>, AccessError> {
        self.oauth_field("consumer_id")
    }

    fn is_federated(&self) -> bool {
        self.core.data().contains(&["token", "user", FEDERATION_KEY])
    }

    fn audit_id(&self) -> Result<Option<String>, AccessError> {
        audit_entry(self.core.data(), SCHEMA, &AUDIT_IDS, 0)
    }

    fn audit_chain_id(&self) -> Result<Option<String>, AccessError> {
        audit_entry(self.core.data(), SCHEMA, &AUDIT_IDS, 1)
    }

    fn has_service_catalog(&self) -> bool {
        self.core.data().contains(&["token", "catalog"])
    }

    fn service_catalog(&self) -> &ServiceCatalog {
        self.core.service_catalog()
    }
}
