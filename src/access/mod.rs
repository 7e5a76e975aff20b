//! Versioned token accessor: schema-dispatch factory, shared read contract,
//! and the glue both schema variants share (soft lookups, lazy catalog).

pub mod v2;
pub mod v3;

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{CatalogBuilder, ServiceCatalog};
use crate::error::{AccessError, SchemaVersion};
use crate::helpers::time;
use crate::payload::{Lookup, RawPayload};
use crate::transport::{TransportResponse, SUBJECT_TOKEN_HEADER};

pub use v2::AccessInfoV2;
pub use v3::AccessInfoV3;

/// Gap, in seconds, to determine whether a token is about to expire.
pub const STALE_TOKEN_DURATION: i64 = 30;

const V2_ROOT: &str = "access";
const V3_ROOT: &str = "token";

/// Issue time of a token.
///
/// The older schema hands the value back exactly as it appeared on the wire,
/// the newer schema parses it. Historical behavior, kept on purpose; the
/// variant tells you which one you got.
#[derive(Debug, Clone, PartialEq)]
pub enum Issued {
    /// Unparsed wire value (older schema).
    Raw(Value),
    /// Parsed timestamp (newer schema).
    At(DateTime<Utc>),
}

/// Inspect the payload shape and produce the matching accessor.
///
/// If only a transport response is given, the payload is decoded from its
/// body. For newer-schema payloads the bearer token is taken from the
/// `X-Subject-Token` response header when not explicitly supplied.
pub fn create(
    body: Option<Value>,
    resp: Option<&TransportResponse>,
    auth_token: Option<String>,
) -> Result<Box<dyn TokenAccess>, AccessError> {
    let body = match (body, resp) {
        (Some(body), _) => body,
        (None, Some(resp)) => resp.json()?,
        (None, None) => return Err(AccessError::UnrecognizedPayload),
    };

    if body.get(V3_ROOT).is_some() {
        let auth_token =
            auth_token.or_else(|| resp.and_then(|r| r.header(SUBJECT_TOKEN_HEADER)));
        debug!(schema = %SchemaVersion::V3, "dispatching token payload");
        return Ok(Box::new(AccessInfoV3::new(body, auth_token)));
    }
    if body.get(V2_ROOT).is_some() {
        debug!(schema = %SchemaVersion::V2, "dispatching token payload");
        return Ok(Box::new(AccessInfoV2::new(body, auth_token)));
    }

    warn!("auth payload has neither schema root key");
    Err(AccessError::UnrecognizedPayload)
}

/// Shared per-accessor state: the payload, the explicitly supplied bearer
/// token, and the one-shot catalog cell. Immutable apart from the cell fill.
pub(crate) struct AccessCore {
    data: RawPayload,
    auth_token: Option<String>,
    builder: Box<dyn CatalogBuilder>,
    catalog: OnceLock<ServiceCatalog>,
}

impl AccessCore {
    pub(crate) fn new(
        data: RawPayload,
        auth_token: Option<String>,
        builder: Box<dyn CatalogBuilder>,
    ) -> Self {
        Self {
            data,
            auth_token,
            builder,
            catalog: OnceLock::new(),
        }
    }

    pub(crate) fn data(&self) -> &RawPayload {
        &self.data
    }

    pub(crate) fn auth_token(&self) -> Option<&String> {
        self.auth_token.as_ref()
    }

    pub(crate) fn set_builder(&mut self, builder: Box<dyn CatalogBuilder>) {
        self.builder = builder;
    }

    /// Build-once catalog access. `OnceLock` gives single-flight semantics:
    /// concurrent first readers block on one build and share the result.
    pub(crate) fn service_catalog(&self) -> &ServiceCatalog {
        self.catalog
            .get_or_init(|| self.builder.build(&self.data))
    }
}

/// Soft-lookup combinator: absorb "key absent" into `None`, let every other
/// failure kind through.
pub fn soft<T>(res: Result<T, AccessError>) -> Result<Option<T>, AccessError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(AccessError::MissingField { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn lookup_error(schema: SchemaVersion, path: &[&str], kind: Lookup) -> AccessError {
    let field = path.join(".");
    match kind {
        Lookup::Missing => AccessError::MissingField { schema, field },
        Lookup::WrongShape => AccessError::MalformedField { schema, field },
    }
}

/// Hard timestamp parse for `expires`/`issued` style fields.
pub(crate) fn parse_timestamp(
    schema: SchemaVersion,
    path: &[&str],
    raw: &str,
) -> Result<DateTime<Utc>, AccessError> {
    time::parse_isotime(raw).ok_or_else(|| AccessError::InvalidTimestamp {
        schema,
        field: path.join("."),
        value: raw.to_owned(),
    })
}

/// Index into the `audit_ids` list; short lists yield `None`.
pub(crate) fn audit_entry(
    data: &RawPayload,
    schema: SchemaVersion,
    path: &[&str],
    idx: usize,
) -> Result<Option<String>, AccessError> {
    let list = match data.list_at(path) {
        Ok(list) => list,
        Err(Lookup::Missing) => return Ok(None),
        Err(kind) => return Err(lookup_error(schema, path, kind)),
    };
    match list.get(idx) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| lookup_error(schema, path, Lookup::WrongShape)),
    }
}

/// Extract an optional string from an already-located node's child; absent
/// or null children yield `None`, non-string children are malformed.
pub(crate) fn optional_str(
    node: &Value,
    key: &str,
    schema: SchemaVersion,
    path: &[&str],
) -> Result<Option<String>, AccessError> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(lookup_error(schema, path, Lookup::WrongShape)),
    }
}

/// Uniform read contract over a decoded identity-token payload.
///
/// Required capabilities are implemented per schema variant; the handful of
/// genuinely shared derivations live here as provided methods, written only
/// in terms of the capabilities.
///
/// Soft fields resolve absent key paths to `Ok(None)`; hard fields surface
/// `AccessError::MissingField`. Wrong-shaped nodes always surface as
/// `AccessError::MalformedField`, even through soft fields.
pub trait TokenAccess: Send + Sync {
    /// Schema generation governing this accessor.
    fn version(&self) -> SchemaVersion;

    /// Bearer token for subsequent API calls: the explicitly supplied value
    /// if one was given at construction, else the variant's fallback.
    fn auth_token(&self) -> Result<Option<String>, AccessError>;

    /// Token expiration instant (hard).
    fn expires(&self) -> Result<DateTime<Utc>, AccessError>;

    /// Token issue time (hard). See [`Issued`] for the per-schema shape.
    fn issued(&self) -> Result<Issued, AccessError>;

    fn username(&self) -> Result<Option<String>, AccessError>;
    fn user_id(&self) -> Result<Option<String>, AccessError>;
    fn user_domain_id(&self) -> Result<Option<String>, AccessError>;
    fn user_domain_name(&self) -> Result<Option<String>, AccessError>;

    /// Role ids granted by the token; empty when absent.
    fn role_ids(&self) -> Result<Vec<String>, AccessError>;
    /// Role names granted by the token; empty when absent.
    fn role_names(&self) -> Result<Vec<String>, AccessError>;

    fn domain_name(&self) -> Result<Option<String>, AccessError>;
    fn domain_id(&self) -> Result<Option<String>, AccessError>;

    fn project_name(&self) -> Result<Option<String>, AccessError>;
    fn project_id(&self) -> Result<Option<String>, AccessError>;
    fn project_domain_id(&self) -> Result<Option<String>, AccessError>;
    fn project_domain_name(&self) -> Result<Option<String>, AccessError>;

    fn project_scoped(&self) -> bool;
    fn domain_scoped(&self) -> bool;

    fn trust_id(&self) -> Result<Option<String>, AccessError>;
    fn trust_scoped(&self) -> bool;
    fn trustee_user_id(&self) -> Result<Option<String>, AccessError>;
    fn trustor_user_id(&self) -> Result<Option<String>, AccessError>;

    fn oauth_access_token_id(&self) -> Result<Option<String>, AccessError>;
    fn oauth_consumer_id(&self) -> Result<Option<String>, AccessError>;

    fn is_federated(&self) -> bool;

    fn audit_id(&self) -> Result<Option<String>, AccessError>;
    fn audit_chain_id(&self) -> Result<Option<String>, AccessError>;

    fn has_service_catalog(&self) -> bool;

    /// Lazily built endpoint catalog; built at most once per accessor.
    fn service_catalog(&self) -> &ServiceCatalog;

    /// Synonym for `project_name`, kept for historical naming.
    fn tenant_name(&self) -> Result<Option<String>, AccessError> {
        self.project_name()
    }

    /// Synonym for `project_id`, kept for historical naming.
    fn tenant_id(&self) -> Result<Option<String>, AccessError> {
        self.project_id()
    }

    /// Scoped to a project or a domain.
    fn scoped(&self) -> bool {
        self.project_scoped() || self.domain_scoped()
    }

    /// Audit id of the initially requested token: the chain id when the
    /// token was rescoped, else its own audit id.
    fn initial_audit_id(&self) -> Result<Option<String>, AccessError> {
        Ok(self.audit_chain_id()?.or(self.audit_id()?))
    }

    /// True iff expiration falls within `stale_duration` from now
    /// (default 30s).
    fn will_expire_soon(&self, stale_duration: Option<Duration>) -> Result<bool, AccessError> {
        let window = stale_duration.unwrap_or_else(|| Duration::seconds(STALE_TOKEN_DURATION));
        let soon = time::utcnow() + window;
        Ok(self.expires()? < soon)
    }
}

impl std::fmt::Debug for dyn TokenAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccess")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
