//! In-memory mapping backend.
//!
//! Holds directed links between Xrefs plus optional attributes and capability
//! properties. Populate it with `&mut self` methods, then share it as an
//! `Arc<dyn IdMapper>`.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use xrefbridge_kernel::{
    AttributeMapper, Capabilities, DataSource, IdMapper, Lifecycle, Result, Xref, retain_targets,
};

#[derive(Debug, Default)]
pub struct MemoryMapper {
    name: String,
    links: BTreeMap<Xref, BTreeSet<Xref>>,
    known: BTreeSet<Xref>,
    sources: BTreeSet<DataSource>,
    targets: BTreeSet<DataSource>,
    attributes: BTreeMap<Xref, BTreeMap<String, BTreeSet<String>>>,
    properties: BTreeMap<String, String>,
    lifecycle: Lifecycle,
}

impl MemoryMapper {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// One directed link. `to` becomes reachable from `from` only.
    pub fn link(&mut self, from: Xref, to: Xref) {
        self.sources.insert(from.data_source().clone());
        self.targets.insert(to.data_source().clone());
        self.known.insert(from.clone());
        self.known.insert(to.clone());
        self.links.entry(from).or_default().insert(to);
    }

    /// Link every member of `group` to every other member, both ways.
    pub fn group(&mut self, group: impl IntoIterator<Item = Xref>) {
        let members: Vec<Xref> = group.into_iter().collect();
        for from in &members {
            self.known.insert(from.clone());
            for to in &members {
                if from != to {
                    self.link(from.clone(), to.clone());
                }
            }
        }
    }

    /// Advertise `data_source` as both source and target even without links.
    pub fn declare_namespace(&mut self, data_source: DataSource) {
        self.sources.insert(data_source.clone());
        self.targets.insert(data_source);
    }

    pub fn add_attribute(&mut self, xref: Xref, attr_type: &str, value: &str) {
        self.known.insert(xref.clone());
        self.attributes
            .entry(xref)
            .or_default()
            .entry(attr_type.to_string())
            .or_default()
            .insert(value.to_string());
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        self.properties.insert(key.to_string(), value.to_string());
    }

    /// Number of distinct Xrefs this mapper has seen.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    fn single_hop(&self, xref: &Xref) -> BTreeSet<Xref> {
        self.links.get(xref).cloned().unwrap_or_default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl IdMapper for MemoryMapper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn map_id(&self, xref: &Xref, targets: &[DataSource]) -> Result<BTreeSet<Xref>> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(retain_targets(self.single_hop(xref), targets))
    }

    async fn xref_exists(&self, xref: &Xref) -> Result<bool> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(self.known.contains(xref))
    }

    /// Case-insensitive substring match on identifiers.
    async fn free_search(&self, text: &str, limit: usize) -> Result<BTreeSet<Xref>> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(self
            .known
            .iter()
            .filter(|x| contains_ignore_case(x.id(), text))
            .take(limit)
            .cloned()
            .collect())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.sources.clone(), self.targets.clone(), true)
            .with_attributes(true)
            .with_properties(self.properties.clone())
    }

    fn attribute_mapper(&self) -> Option<&dyn AttributeMapper> {
        Some(self)
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_open()
    }

    async fn close(&self) -> Result<()> {
        if self.lifecycle.close() {
            tracing::debug!(mapper = %self.name, "closed in-memory mapper");
        }
        Ok(())
    }
}

#[async_trait]
impl AttributeMapper for MemoryMapper {
    async fn attributes(&self, xref: &Xref, attr_type: &str) -> Result<BTreeSet<String>> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(self
            .attributes
            .get(xref)
            .and_then(|attrs| attrs.get(attr_type))
            .cloned()
            .unwrap_or_default())
    }

    async fn all_attributes(&self, xref: &Xref) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(self.attributes.get(xref).cloned().unwrap_or_default())
    }

    async fn free_attribute_search(
        &self,
        query: &str,
        attr_type: &str,
        limit: usize,
    ) -> Result<BTreeMap<Xref, String>> {
        self.lifecycle.ensure_open(&self.name)?;
        let mut found = BTreeMap::new();
        for (xref, attrs) in &self.attributes {
            if found.len() >= limit {
                break;
            }
            let hit = attrs
                .get(attr_type)
                .and_then(|values| values.iter().find(|v| contains_ignore_case(v, query)));
            if let Some(value) = hit {
                found.insert(xref.clone(), value.clone());
            }
        }
        Ok(found)
    }

    async fn attribute_set(&self) -> Result<BTreeSet<String>> {
        self.lifecycle.ensure_open(&self.name)?;
        Ok(self
            .attributes
            .values()
            .flat_map(|attrs| attrs.keys().cloned())
            .collect())
    }
}
