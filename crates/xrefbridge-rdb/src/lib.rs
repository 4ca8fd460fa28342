//! # xrefbridge rdb
//!
//! Relational gene databases come in several schema generations. The
//! [`SchemaDispatcher`] reads the version marker through a transient
//! connection and hands the target to the implementation registered for
//! that exact version.
//!
//! ```text
//! "idmapper-pgdb:/data/Hs.bridge"
//!     │  SchemaDriver
//!     ▼
//! ConnectionTarget ──► RelationalConnector ──► SELECT schemaversion FROM info
//!     │                                              │
//!     │                 version → SchemaConstructor ◄┘
//!     ▼
//! Arc<dyn IdMapper>
//! ```
//!
//! SQL drivers live outside this crate: they plug in as a
//! [`RelationalConnector`] and one [`SchemaConstructor`] per schema version.

pub mod connector;
pub mod dispatch;
pub mod target;

pub use connector::{RelationalConnection, RelationalConnector};
pub use dispatch::{PGDB_SCHEME, SCHEMA_VERSION_QUERY, SchemaConstructor, SchemaDispatcher, SchemaDriver};
pub use target::ConnectionTarget;
