//! Organism → stack routing table.

use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use xrefbridge_kernel::{FailurePolicy, IdMapper, IdMapperStack, Organism, Result, same_mapper};

#[derive(Debug, Default)]
struct RoutingTable {
    organisms: BTreeMap<Organism, IdMapperStack>,
    wildcard: Vec<Arc<dyn IdMapper>>,
}

/// Routes requests for an organism to that organism's backends plus every
/// wildcard backend.
///
/// Reads take a snapshot under a read lock, so a concurrent add or remove is
/// either fully visible in a returned stack or not at all.
#[derive(Debug, Default)]
pub struct OrganismRouter {
    transitive: bool,
    policy: FailurePolicy,
    table: RwLock<RoutingTable>,
}

impl OrganismRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitive flag for every stack this router builds.
    pub fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    fn new_stack(&self, name: String) -> IdMapperStack {
        IdMapperStack::named(name)
            .with_transitive(self.transitive)
            .with_policy(self.policy)
    }

    pub fn add_organism_backend(&self, organism: Organism, mapper: Arc<dyn IdMapper>) {
        let mut table = self.table.write();
        let stack = table
            .organisms
            .entry(organism)
            .or_insert_with(|| self.new_stack(organism.latin_name().to_string()));
        stack.add_member(mapper);
    }

    /// Returns false when `mapper` was not routed for `organism`.
    pub fn remove_organism_backend(&self, organism: Organism, mapper: &Arc<dyn IdMapper>) -> bool {
        self.table
            .write()
            .organisms
            .get_mut(&organism)
            .is_some_and(|stack| stack.remove_member(mapper))
    }

    /// Add a backend for every organism. Adding the same handle twice is a no-op.
    pub fn add_wildcard_backend(&self, mapper: Arc<dyn IdMapper>) {
        let mut table = self.table.write();
        if !table.wildcard.iter().any(|m| same_mapper(m, &mapper)) {
            table.wildcard.push(mapper);
        }
    }

    pub fn remove_wildcard_backend(&self, mapper: &Arc<dyn IdMapper>) -> bool {
        let mut table = self.table.write();
        let before = table.wildcard.len();
        table.wildcard.retain(|m| !same_mapper(m, mapper));
        table.wildcard.len() != before
    }

    /// Organisms with at least one dedicated backend entry.
    pub fn organisms(&self) -> BTreeSet<Organism> {
        self.table.read().organisms.keys().copied().collect()
    }

    pub fn wildcard_backends(&self) -> Vec<Arc<dyn IdMapper>> {
        self.table.read().wildcard.clone()
    }

    /// A fresh stack: the organism's own backends in insertion order, then
    /// the wildcard backends. An organism without entries gets the wildcard
    /// backends alone. Mutating the returned stack never touches the table.
    pub fn route_for(&self, organism: Organism) -> IdMapperStack {
        let table = self.table.read();
        let mut stack = match table.organisms.get(&organism) {
            Some(stack) => stack.clone(),
            None => self.new_stack(organism.latin_name().to_string()),
        };
        for mapper in &table.wildcard {
            if !stack.contains(mapper) {
                stack.add_member(Arc::clone(mapper));
            }
        }
        stack
    }

    /// Every distinct backend in the table, organism entries first.
    pub fn backends(&self) -> Vec<Arc<dyn IdMapper>> {
        let table = self.table.read();
        let mut all: Vec<Arc<dyn IdMapper>> = Vec::new();
        let routed = table
            .organisms
            .values()
            .flat_map(|stack| stack.members().iter())
            .chain(table.wildcard.iter());
        for mapper in routed {
            if !all.iter().any(|m| same_mapper(m, mapper)) {
                all.push(Arc::clone(mapper));
            }
        }
        all
    }

    /// Close every backend once. Failures are logged; the first is returned.
    pub async fn close(&self) -> Result<()> {
        let mut first_error = None;
        for mapper in self.backends() {
            if let Err(error) = mapper.close().await {
                tracing::warn!(mapper = mapper.name(), %error, "closing backend failed");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
