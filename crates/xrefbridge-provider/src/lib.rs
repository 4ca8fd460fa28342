//! # xrefbridge provider
//!
//! Chooses which backends answer a request. Each organism owns a composite
//! stack; wildcard backends (metabolite databases, cross-species files)
//! join every organism's stack.
//!
//! ```text
//! routing config ──► OrganismRouter ──route_for(Human)──► IdMapperStack
//!   Homo sapiens  Hs.bridge           ├── Hs.bridge
//!   *             metabolites.bridge  └── metabolites.bridge  (wildcard, last)
//! ```

pub mod config;
pub mod router;

pub use config::{
    ConfigReport, DEFAULT_SCHEME, RoutingConfigError, RoutingLine, Scope, WILDCARD, parse_line,
};
pub use router::OrganismRouter;
