//! # Token Access Library
//!
//! Normalizes the two generations of identity-token response schemas into
//! one uniform, read-only accessor. Hand the factory an already-received
//! payload (and optionally the transport response it came from) and read
//! identity, scope, trust, federation, oauth and audit fields through one
//! contract, regardless of which schema produced them.
//!
//! Modules:
//! - `access` — schema-dispatch factory, the `TokenAccess` contract, and the two variants
//! - `payload` — immutable raw-payload wrapper with path lookups
//! - `transport` — the already-received response (JSON body + header lookup)
//! - `catalog` — lazily built service-endpoint catalog and its builder contract
//! - `error` — the error taxonomy

pub mod access;
pub mod catalog;
pub mod error;
pub mod helpers;
pub mod payload;
pub mod transport;

pub use crate::access::{create, AccessInfoV2, AccessInfoV3, Issued, TokenAccess, STALE_TOKEN_DURATION};
pub use crate::catalog::{CatalogBuilder, ServiceCatalog};
pub use crate::error::{AccessError, SchemaVersion};
pub use crate::transport::{TransportResponse, SUBJECT_TOKEN_HEADER};
