//! Older-generation token schema, rooted at `access.*`.
//!
//! Carries the legacy fallback chains: project name/id walk three field
//! generations, and several concepts (domains, federation, oauth) simply do
//! not exist in this schema.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::access::{
    audit_entry, lookup_error, optional_str, parse_timestamp, soft, AccessCore, Issued,
    TokenAccess,
};
use crate::catalog::{CatalogBuilder, ServiceCatalog, V2CatalogBuilder};
use crate::error::{AccessError, SchemaVersion};
use crate::payload::{Lookup, RawPayload};

const SCHEMA: SchemaVersion = SchemaVersion::V2;

const TENANT: [&str; 3] = ["access", "token", "tenant"];
const USER_ROLES: [&str; 3] = ["access", "user", "roles"];
const METADATA_ROLES: [&str; 3] = ["access", "metadata", "roles"];
const AUDIT_IDS: [&str; 3] = ["access", "token", "audit_ids"];

pub struct AccessInfoV2 {
    core: AccessCore,
}

impl AccessInfoV2 {
    pub fn new(body: Value, auth_token: Option<String>) -> Self {
        Self {
            core: AccessCore::new(
                RawPayload::new(body),
                auth_token,
                Box::new(V2CatalogBuilder),
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

    /// Ordered project-field fallback: `token.tenant.<key>`, then the
    /// pre-grizzly `user.<legacy_key>`, then the pre-diablo `token.tenantId`.
    /// A present tenant subtree wins even when its field is absent.
    fn tenant_field(
        &self,
        key: &str,
        legacy_user_key: &str,
    ) -> Result<Option<String>, AccessError> {
        match self.core.data().at(&TENANT) {
            Ok(tenant) => return optional_str(tenant, key, SCHEMA, &TENANT),
            Err(Lookup::Missing) => {}
            Err(kind) => return Err(lookup_error(SCHEMA, &TENANT, kind)),
        }

        if let Some(v) = soft(self.hard_str(&["access", "user", legacy_user_key]))? {
            return Ok(Some(v));
        }
        soft(self.hard_str(&["access", "token", "tenantId"]))
    }
}

impl TokenAccess for AccessInfoV2 {
    fn version(&self) -> SchemaVersion {
        SCHEMA
    }

    /// Hard with fallback: the explicitly supplied bearer token, else the
    /// token id carried in the payload itself.
    fn auth_token(&self) -> Result<Option<String>, AccessError> {
        if let Some(t) = self.core.auth_token() {
            return Ok(Some(t.clone()));
        }
        self.hard_str(&["access", "token", "id"]).map(Some)
    }

    fn expires(&self) -> Result<DateTime<Utc>, AccessError> {
        let path = ["access", "token", "expires"];
        let raw = self.hard_str(&path)?;
        parse_timestamp(SCHEMA, &path, &raw)
    }

    /// Returned exactly as it appeared on the wire, never parsed. The newer
    /// schema parses this field; kept asymmetric on purpose.
    fn issued(&self) -> Result<Issued, AccessError> {
        let path = ["access", "token", "issued_at"];
        self.core
            .data()
            .at(&path)
            .map(|v| Issued::Raw(v.clone()))
            .map_err(|kind| lookup_error(SCHEMA, &path, kind))
    }

    /// `user.name`, falling back to `user.username`.
    fn username(&self) -> Result<Option<String>, AccessError> {
        if let Some(name) = soft(self.hard_str(&["access", "user", "name"]))? {
            return Ok(Some(name));
        }
        soft(self.hard_str(&["access", "user", "username"]))
    }

    fn user_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["access", "user", "id"]))
    }

    // no user-domain concept in this schema generation
    fn user_domain_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn user_domain_name(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn role_ids(&self) -> Result<Vec<String>, AccessError> {
        let list = match self.core.data().list_at(&METADATA_ROLES) {
            Ok(list) => list,
            Err(Lookup::Missing) => return Ok(Vec::new()),
            Err(kind) => return Err(lookup_error(SCHEMA, &METADATA_ROLES, kind)),
        };
        list.iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| lookup_error(SCHEMA, &METADATA_ROLES, Lookup::WrongShape))
            })
            .collect()
    }

    fn role_names(&self) -> Result<Vec<String>, AccessError> {
        let list = match self.core.data().list_at(&USER_ROLES) {
            Ok(list) => list,
            Err(Lookup::Missing) => return Ok(Vec::new()),
            Err(kind) => return Err(lookup_error(SCHEMA, &USER_ROLES, kind)),
        };
        list.iter()
            .map(|r| {
                r.get("name")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .ok_or_else(|| lookup_error(SCHEMA, &USER_ROLES, Lookup::WrongShape))
            })
            .collect()
    }

    // no domain scoping in this schema generation
    fn domain_name(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn domain_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn project_name(&self) -> Result<Option<String>, AccessError> {
        self.tenant_field("name", "tenantName")
    }

    fn project_id(&self) -> Result<Option<String>, AccessError> {
        self.tenant_field("id", "tenantId")
    }

    fn project_domain_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn project_domain_name(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn project_scoped(&self) -> bool {
        self.core.data().contains(&TENANT)
    }

    fn domain_scoped(&self) -> bool {
        false
    }

    fn trust_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["access", "trust", "id"]))
    }

    fn trust_scoped(&self) -> bool {
        self.core.data().truthy_at(&["access", "trust"])
    }

    fn trustee_user_id(&self) -> Result<Option<String>, AccessError> {
        soft(self.hard_str(&["access", "trust", "trustee_user_id"]))
    }

    // not representable in this schema generation
    fn trustor_user_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn oauth_access_token_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn oauth_consumer_id(&self) -> Result<Option<String>, AccessError> {
        Ok(None)
    }

    fn is_federated(&self) -> bool {
        false
    }

    fn audit_id(&self) -> Result<Option<String>, AccessError> {
        audit_entry(self.core.data(), SCHEMA, &AUDIT_IDS, 0)
    }

    fn audit_chain_id(&self) -> Result<Option<String>, AccessError> {
        audit_entry(self.core.data(), SCHEMA, &AUDIT_IDS, 1)
    }

    fn has_service_catalog(&self) -> bool {
        self.core.data().contains(&["access", "serviceCatalog"])
    }

    fn service_catalog(&self) -> &ServiceCatalog {
        self.core.service_catalog()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn scoped_body() -> Value {
        json!({
            "access": {
                "token": {
                    "id": "tok-v2",
                    "expires": "2030-01-01T00:00:00Z",
                    "issued_at": "2029-12-31T23:00:00.000000Z",
                    "tenant": {"id": "proj-1", "name": "alpha"},
                    "audit_ids": ["a1", "a2"]
                },
                "user": {
                    "id": "u1",
                    "name": "demo",
                    "roles": [{"name": "member"}, {"name": "reader"}]
                },
                "metadata": {"roles": ["r1", "r2"]},
                "serviceCatalog": [{"type": "compute"}]
            }
        })
    }

    #[test]
    fn reads_scoped_token_fields() {
        let access = AccessInfoV2::new(scoped_body(), None);

        assert_eq!(access.version(), SchemaVersion::V2);
        assert_eq!(access.project_name().unwrap().as_deref(), Some("alpha"));
        assert_eq!(access.project_id().unwrap().as_deref(), Some("proj-1"));
        assert_eq!(access.tenant_name().unwrap(), access.project_name().unwrap());
        assert_eq!(access.tenant_id().unwrap(), access.project_id().unwrap());
        assert!(access.project_scoped());
        assert!(!access.domain_scoped());
        assert!(access.scoped());
        assert_eq!(access.username().unwrap().as_deref(), Some("demo"));
        assert_eq!(access.user_id().unwrap().as_deref(), Some("u1"));
        assert_eq!(access.role_ids().unwrap(), vec!["r1", "r2"]);
        assert_eq!(access.role_names().unwrap(), vec!["member", "reader"]);
        assert!(access.has_service_catalog());
        assert!(!access.is_federated());
        assert_eq!(access.audit_id().unwrap().as_deref(), Some("a1"));
        assert_eq!(access.audit_chain_id().unwrap().as_deref(), Some("a2"));
    }

    #[test]
    fn project_name_falls_back_through_field_generations() {
        // tenant subtree wins
        let access = AccessInfoV2::new(scoped_body(), None);
        assert_eq!(access.project_name().unwrap().as_deref(), Some("alpha"));

        // pre-grizzly: user.tenantName
        let body = json!({
            "access": {
                "token": {"id": "t"},
                "user": {"tenantName": "beta", "tenantId": "proj-2"}
            }
        });
        let access = AccessInfoV2::new(body, None);
        assert_eq!(access.project_name().unwrap().as_deref(), Some("beta"));
        assert_eq!(access.project_id().unwrap().as_deref(), Some("proj-2"));

        // pre-diablo: only token.tenantId, used for both name and id
        let body = json!({
            "access": {"token": {"id": "t", "tenantId": "X"}, "user": {}}
        });
        let access = AccessInfoV2::new(body, None);
        assert_eq!(access.project_name().unwrap().as_deref(), Some("X"));
        assert_eq!(access.project_id().unwrap().as_deref(), Some("X"));

        // nothing anywhere
        let body = json!({"access": {"token": {"id": "t"}, "user": {}}});
        let access = AccessInfoV2::new(body, None);
        assert_eq!(access.project_name().unwrap(), None);
        assert_eq!(access.project_id().unwrap(), None);
        assert!(!access.project_scoped());
    }

    #[test]
    fn present_tenant_subtree_stops_the_fallback() {
        // tenant exists but has no name: fallback must NOT kick in
        let body = json!({
            "access": {
                "token": {"id": "t", "tenant": {"id": "p"}},
                "user": {"tenantName": "should-not-win"}
            }
        });
        let access = AccessInfoV2::new(body, None);
        assert_eq!(access.project_name().unwrap(), None);
        assert!(access.project_scoped());
    }

    #[test]
    fn auth_token_explicit_else_payload_else_hard_error() {
        let access = AccessInfoV2::new(scoped_body(), Some("explicit".into()));
        assert_eq!(access.auth_token().unwrap().as_deref(), Some("explicit"));

        let access = AccessInfoV2::new(scoped_body(), None);
        assert_eq!(access.auth_token().unwrap().as_deref(), Some("tok-v2"));

        let access = AccessInfoV2::new(json!({"access": {"token": {}}}), None);
        assert!(matches!(
            access.auth_token(),
            Err(AccessError::MissingField { schema: SchemaVersion::V2, .. })
        ));
    }

    #[test]
    fn username_falls_back_to_legacy_key() {
        let body = json!({"access": {"user": {"username": "old-style"}}});
        let access = AccessInfoV2::new(body, None);
        assert_eq!(access.username().unwrap().as_deref(), Some("old-style"));

        let access = AccessInfoV2::new(json!({"access": {}}), None);
        assert_eq!(access.username().unwrap(), None);
    }

    #[test]
    fn issued_is_returned_raw() {
        let access = AccessInfoV2::new(scoped_body(), None);
        assert_eq!(
            access.issued().unwrap(),
            Issued::Raw(json!("2029-12-31T23:00:00.000000Z"))
        );

        let access = AccessInfoV2::new(json!({"access": {"token": {}}}), None);
        assert!(matches!(
            access.issued(),
            Err(AccessError::MissingField { .. })
        ));
    }

    #[test]
    fn expires_is_hard_and_parsed() {
        let access = AccessInfoV2::new(scoped_body(), None);
        assert_eq!(access.expires().unwrap().to_rfc3339(), "2030-01-01T00:00:00+00:00");

        let body = json!({"access": {"token": {"expires": "garbage"}}});
        let access = AccessInfoV2::new(body, None);
        assert!(matches!(
            access.expires(),
            Err(AccessError::InvalidTimestamp { .. })
        ));

        let access = AccessInfoV2::new(json!({"access": {"token": {}}}), None);
        assert!(matches!(
            access.expires(),
            Err(AccessError::MissingField { .. })
        ));
    }

    #[test]
    fn trust_fields_and_scoping() {
        let body = json!({
            "access": {
                "token": {"id": "t"},
                "trust": {"id": "tr-1", "trustee_user_id": "u-trustee"}
            }
        });
        let access = AccessInfoV2::new(body, None);
        assert!(access.trust_scoped());
        assert_eq!(access.trust_id().unwrap().as_deref(), Some("tr-1"));
        assert_eq!(access.trustee_user_id().unwrap().as_deref(), Some("u-trustee"));
        // not representable in this generation
        assert_eq!(access.trustor_user_id().unwrap(), None);

        let access = AccessInfoV2::new(json!({"access": {"trust": {}}}), None);
        assert!(!access.trust_scoped());

        let access = AccessInfoV2::new(json!({"access": {}}), None);
        assert!(!access.trust_scoped());
        assert_eq!(access.trust_id().unwrap(), None);
    }

    #[test]
    fn absent_concepts_stay_absent() {
        let access = AccessInfoV2::new(scoped_body(), None);
        assert_eq!(access.user_domain_id().unwrap(), None);
        assert_eq!(access.user_domain_name().unwrap(), None);
        assert_eq!(access.domain_id().unwrap(), None);
        assert_eq!(access.domain_name().unwrap(), None);
        assert_eq!(access.project_domain_id().unwrap(), None);
        assert_eq!(access.project_domain_name().unwrap(), None);
        assert_eq!(access.oauth_access_token_id().unwrap(), None);
        assert_eq!(access.oauth_consumer_id().unwrap(), None);
    }

    #[test]
    fn role_lists_default_empty_and_reject_bad_shapes() {
        let access = AccessInfoV2::new(json!({"access": {}}), None);
        assert!(access.role_ids().unwrap().is_empty());
        assert!(access.role_names().unwrap().is_empty());

        let body = json!({"access": {"metadata": {"roles": [1, 2]}}});
        let access = AccessInfoV2::new(body, None);
        assert!(matches!(
            access.role_ids(),
            Err(AccessError::MalformedField { .. })
        ));

        let body = json!({"access": {"user": {"roles": [{"id": "no-name"}]}}});
        let access = AccessInfoV2::new(body, None);
        assert!(matches!(
            access.role_names(),
            Err(AccessError::MalformedField { .. })
        ));
    }
}
