//! The identifier-mapping contract every backend satisfies.
//!
//! Relational gene databases, flat files and remote services all plug in
//! behind [`IdMapper`]. The federation layer ([`crate::stack`]) only ever
//! talks to this trait.

use crate::capabilities::Capabilities;
use crate::datasource::DataSource;
use crate::error::{IdMapperError, Result};
use crate::xref::Xref;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of a batch mapping: every input maps to its (possibly empty) set.
pub type XrefMap = BTreeMap<Xref, BTreeSet<Xref>>;

/// A backend that translates identifiers between namespaces.
#[async_trait]
pub trait IdMapper: Send + Sync + fmt::Debug {
    /// Label used in logs and failure reports.
    fn name(&self) -> &str;

    /// Single-hop translation of `xref`. Empty `targets` means every
    /// namespace this mapper can produce.
    async fn map_id(&self, xref: &Xref, targets: &[DataSource]) -> Result<BTreeSet<Xref>>;

    /// Batch form of [`IdMapper::map_id`]. Must be equivalent to one call
    /// per input; overriding it is purely a performance decision.
    async fn map_ids(&self, xrefs: &BTreeSet<Xref>, targets: &[DataSource]) -> Result<XrefMap> {
        let mut result = XrefMap::new();
        for xref in xrefs {
            let mapped = self.map_id(xref, targets).await?;
            result.insert(xref.clone(), mapped);
        }
        Ok(result)
    }

    /// Whether the backend holds any record of `xref`.
    async fn xref_exists(&self, xref: &Xref) -> Result<bool>;

    /// Free-text search, at most `limit` results. Mappers whose
    /// capabilities deny free search return an empty set; mappers that
    /// claim it must surface failures as errors.
    async fn free_search(&self, text: &str, limit: usize) -> Result<BTreeSet<Xref>>;

    /// Static description of the backend. Unlike every other operation it
    /// keeps answering after [`IdMapper::close`], so a closed member still
    /// shows up in an aggregate report.
    fn capabilities(&self) -> Capabilities;

    /// Attribute access, when the capability report advertises it.
    fn attribute_mapper(&self) -> Option<&dyn AttributeMapper> {
        None
    }

    fn is_connected(&self) -> bool;

    /// Release backend resources. Every later call fails with
    /// [`IdMapperError::Closed`].
    async fn close(&self) -> Result<()>;
}

/// Optional key/value annotations per Xref.
#[async_trait]
pub trait AttributeMapper: Send + Sync {
    /// Values of one attribute for `xref`.
    async fn attributes(&self, xref: &Xref, attr_type: &str) -> Result<BTreeSet<String>>;

    /// All attributes for `xref`, keyed by attribute type.
    async fn all_attributes(&self, xref: &Xref) -> Result<BTreeMap<String, BTreeSet<String>>>;

    /// Xrefs whose `attr_type` value contains `query`, with the matching
    /// value. At most `limit` entries.
    async fn free_attribute_search(
        &self,
        query: &str,
        attr_type: &str,
        limit: usize,
    ) -> Result<BTreeMap<Xref, String>>;

    /// Every attribute type this mapper knows.
    async fn attribute_set(&self) -> Result<BTreeSet<String>>;
}

/// Identity of a shared mapper handle, ignoring vtable metadata.
pub fn same_mapper(a: &Arc<dyn IdMapper>, b: &Arc<dyn IdMapper>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Open/closed flag shared by mapper implementations.
#[derive(Debug, Default)]
pub struct Lifecycle {
    closed: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// `Err(Closed)` once [`Lifecycle::close`] has run.
    pub fn ensure_open(&self, mapper: &str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(IdMapperError::closed(mapper))
        }
    }

    /// Returns whether this call performed the transition.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Same flag state in a new, independent cell.
    pub fn snapshot(&self) -> Self {
        Self {
            closed: AtomicBool::new(!self.is_open()),
        }
    }
}

/// Keep only Xrefs in `targets`; an empty target list keeps everything.
pub fn retain_targets(xrefs: BTreeSet<Xref>, targets: &[DataSource]) -> BTreeSet<Xref> {
    if targets.is_empty() {
        return xrefs;
    }
    xrefs
        .into_iter()
        .filter(|x| targets.contains(x.data_source()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DataSourceRegistry;

    #[test]
    fn lifecycle_closes_once() {
        let life = Lifecycle::new();
        assert!(life.ensure_open("m").is_ok());
        assert!(life.close());
        assert!(!life.close());
        assert!(matches!(
            life.ensure_open("m"),
            Err(IdMapperError::Closed { mapper }) if mapper == "m"
        ));
        assert!(!life.snapshot().is_open());
    }

    #[test]
    fn retain_targets_filters_by_namespace() {
        let reg = DataSourceRegistry::new();
        let l = reg.register("L", "Entrez Gene").unwrap().as_data_source();
        let en = reg.register("En", "Ensembl").unwrap().as_data_source();
        let all = BTreeSet::from([Xref::new("3643", l.clone()), Xref::new("ENSG1", en.clone())]);

        assert_eq!(retain_targets(all.clone(), &[]).len(), 2);
        let only_en = retain_targets(all, &[en.clone()]);
        assert_eq!(only_en, BTreeSet::from([Xref::new("ENSG1", en)]));
    }
}
