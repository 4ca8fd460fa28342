//! # xrefbridge kernel
//!
//! Federated identifier mapping: one logical mapper over any number of
//! independently maintained backends (gene databases, flat files, remote
//! services).
//!
//! This crate is **storage-agnostic**: it does not say how a backend keeps
//! its links. It prescribes how backends must behave behind the
//! [`IdMapper`] contract and how a [`IdMapperStack`] federates them.
//!
//! ## Architecture
//!
//! ```text
//! DataSourceRegistry    ← Namespaces, keyed by system code and full name
//!     │
//! Xref                  ← (identifier, namespace)
//!     │
//! IdMapper              ← Single-hop mapping, search, exists, capabilities
//!     │
//! Capabilities          ← Per-mapper report; union across a stack
//!     │
//! IdMapperStack         ← Fan-out, set union, transitive closure
//!     │
//! DriverRegistry        ← "idmapper-<scheme>:<location>" → IdMapper
//! ```

pub mod capabilities;
pub mod catalog;
pub mod datasource;
pub mod driver;
pub mod error;
pub mod mapper;
pub mod organism;
pub mod stack;
pub mod xref;

pub use capabilities::{
    BUILD_DATE, Capabilities, DATA_SOURCE_NAME, MemberCapabilities, SCHEMA_VERSION, SPECIES,
};
pub use catalog::{BIO_CATALOG, Catalog, CatalogEntry, register_bio_defaults};
pub use datasource::{Builder, DataSource, DataSourceInfo, DataSourceRegistry, ID_MARKER};
pub use driver::{Driver, DriverRegistry, SCHEME_PREFIX, split_connection, with_default_scheme};
pub use error::{IdMapperError, MemberFailure, Result};
pub use mapper::{AttributeMapper, IdMapper, Lifecycle, XrefMap, retain_targets, same_mapper};
pub use organism::Organism;
pub use stack::{FailurePolicy, Federated, IdMapperStack};
pub use xref::Xref;

pub use tokio_util::sync::CancellationToken;
