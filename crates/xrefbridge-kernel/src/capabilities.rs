//! Capability reports and their aggregation across stacked mappers.
//!
//! Namespace sets and the free-search / attribute flags merge by union.
//! Scalar properties (SCHEMAVERSION, BUILDDATE, SPECIES, ...) do not merge:
//! an aggregate keeps one report per member and answers property queries
//! per member, so heterogeneous members stay visible.

use crate::datasource::DataSource;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, BTreeSet};

pub const SCHEMA_VERSION: &str = "SCHEMAVERSION";
pub const SPECIES: &str = "SPECIES";
pub const BUILD_DATE: &str = "BUILDDATE";
pub const DATA_SOURCE_NAME: &str = "DATASOURCENAME";

/// What one mapper, or one stack of mappers, can do.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    properties: BTreeMap<String, String>,
    sources: BTreeSet<DataSource>,
    targets: BTreeSet<DataSource>,
    free_search: bool,
    attributes: bool,
    members: Vec<MemberCapabilities>,
}

/// One member's report inside an aggregate.
#[derive(Debug, Clone)]
pub struct MemberCapabilities {
    pub member: String,
    pub capabilities: Capabilities,
}

impl Capabilities {
    /// Report for a single mapper.
    pub fn new(
        sources: impl IntoIterator<Item = DataSource>,
        targets: impl IntoIterator<Item = DataSource>,
        free_search: bool,
    ) -> Self {
        Self {
            sources: sources.into_iter().collect(),
            targets: targets.into_iter().collect(),
            free_search,
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_attributes(mut self, supported: bool) -> Self {
        self.attributes = supported;
        self
    }

    /// Merge member reports: union of namespace sets and flags, no scalar
    /// properties at the aggregate level.
    pub fn aggregate(members: impl IntoIterator<Item = (String, Capabilities)>) -> Self {
        let mut merged = Self::default();
        for (member, capabilities) in members {
            merged.sources.extend(capabilities.sources.iter().cloned());
            merged.targets.extend(capabilities.targets.iter().cloned());
            merged.free_search |= capabilities.free_search;
            merged.attributes |= capabilities.attributes;
            merged.members.push(MemberCapabilities {
                member,
                capabilities,
            });
        }
        merged
    }

    pub fn is_aggregate(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn members(&self) -> &[MemberCapabilities] {
        &self.members
    }

    /// This report's own value for `key`. Aggregates carry none; use
    /// [`Capabilities::property_by_member`].
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// `(member, value)` for every leaf report that defines `key`, in stack
    /// order. Nested aggregates are flattened; a leaf report yields itself
    /// with an empty member name.
    pub fn property_by_member(&self, key: &str) -> Vec<(String, String)> {
        let mut found = Vec::new();
        self.collect_property("", key, &mut found);
        found
    }

    fn collect_property(&self, member: &str, key: &str, found: &mut Vec<(String, String)>) {
        if !self.is_aggregate() {
            if let Some(value) = self.properties.get(key) {
                found.push((member.to_string(), value.clone()));
            }
            return;
        }
        for m in &self.members {
            m.capabilities.collect_property(&m.member, key, found);
        }
    }

    pub fn supported_sources(&self) -> &BTreeSet<DataSource> {
        &self.sources
    }

    pub fn supported_targets(&self) -> &BTreeSet<DataSource> {
        &self.targets
    }

    pub fn is_free_search_supported(&self) -> bool {
        self.free_search
    }

    pub fn is_attributes_supported(&self) -> bool {
        self.attributes
    }

    /// Direct capability only: some single member must accept `src` and
    /// produce `tgt`. Transitive paths through several members do not count.
    pub fn is_mapping_supported(&self, src: &DataSource, tgt: &DataSource) -> bool {
        if self.is_aggregate() {
            return self
                .members
                .iter()
                .any(|m| m.capabilities.is_mapping_supported(src, tgt));
        }
        self.sources.contains(src) && self.targets.contains(tgt)
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = |set: &BTreeSet<DataSource>| -> Vec<String> {
            set.iter().map(ToString::to_string).collect()
        };
        let mut state = serializer.serialize_struct("Capabilities", 6)?;
        state.serialize_field("properties", &self.properties)?;
        state.serialize_field("sources", &names(&self.sources))?;
        state.serialize_field("targets", &names(&self.targets))?;
        state.serialize_field("freeSearch", &self.free_search)?;
        state.serialize_field("attributes", &self.attributes)?;
        let members: Vec<MemberView<'_>> = self
            .members
            .iter()
            .map(|m| MemberView {
                member: &m.member,
                capabilities: &m.capabilities,
            })
            .collect();
        state.serialize_field("members", &members)?;
        state.end()
    }
}

#[derive(serde::Serialize)]
struct MemberView<'a> {
    member: &'a str,
    capabilities: &'a Capabilities,
}
