//! Composite stack: many mappers behaving as one.
//!
//! Requests fan out to every member concurrently and results merge by set
//! union in member order. With `transitive` set, `map_id` explores the
//! reachable closure breadth-first: each round maps every frontier Xref
//! through every member without a target filter, and the loop stops at the
//! first round that discovers nothing new.
//!
//! ```text
//!            ┌── member 0 ──┐
//! request ───┼── member 1 ──┼──► union ──► (closure round) ──► filter
//!            └── member n ──┘
//! ```
//!
//! Member failures follow [`FailurePolicy`]. Cancellation is request-scoped:
//! the `*_with` methods take a [`CancellationToken`] that is checked before
//! each round and raced against in-flight member calls.

use crate::capabilities::Capabilities;
use crate::datasource::DataSource;
use crate::error::{IdMapperError, MemberFailure, Result};
use crate::mapper::{AttributeMapper, IdMapper, Lifecycle, XrefMap, retain_targets, same_mapper};
use crate::xref::Xref;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_STACK_NAME: &str = "stack";

/// What a stack does when a member fails during fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole request, naming every failed member.
    #[default]
    FailFast,
    /// Drop the failed members' contributions, log a warning each, and
    /// report them in [`Federated::skipped`].
    Skip,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(Self::FailFast),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown failure policy: {other}")),
        }
    }
}

/// A merged value plus the members skipped while producing it.
#[derive(Debug)]
pub struct Federated<T> {
    pub value: T,
    pub skipped: Vec<MemberFailure>,
}

impl<T> Federated<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    /// No member was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Ordered collection of mappers that is itself an [`IdMapper`].
#[derive(Debug)]
pub struct IdMapperStack {
    name: String,
    members: Vec<Arc<dyn IdMapper>>,
    transitive: bool,
    policy: FailurePolicy,
    lifecycle: Lifecycle,
}

impl Default for IdMapperStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IdMapperStack {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            members: self.members.clone(),
            transitive: self.transitive,
            policy: self.policy,
            lifecycle: self.lifecycle.snapshot(),
        }
    }
}

impl IdMapperStack {
    pub fn new() -> Self {
        Self::named(DEFAULT_STACK_NAME)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            transitive: false,
            policy: FailurePolicy::default(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn add_member(&mut self, mapper: Arc<dyn IdMapper>) {
        self.members.push(mapper);
    }

    /// Remove `mapper` by identity. Returns false when it was not a member.
    pub fn remove_member(&mut self, mapper: &Arc<dyn IdMapper>) -> bool {
        match self.members.iter().position(|m| same_mapper(m, mapper)) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, mapper: &Arc<dyn IdMapper>) -> bool {
        self.members.iter().any(|m| same_mapper(m, mapper))
    }

    pub fn members(&self) -> &[Arc<dyn IdMapper>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_transitive(&self) -> bool {
        self.transitive
    }

    pub fn set_transitive(&mut self, transitive: bool) {
        self.transitive = transitive;
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: FailurePolicy) {
        self.policy = policy;
    }

    /// Map one Xref, directly or through the reachable closure.
    pub async fn map_id_with(
        &self,
        xref: &Xref,
        targets: &[DataSource],
        cancel: &CancellationToken,
    ) -> Result<Federated<BTreeSet<Xref>>> {
        self.lifecycle.ensure_open(&self.name)?;
        let outcome = self.map_one(xref, targets, cancel).await?;
        Ok(self.report_skipped(outcome))
    }

    async fn map_one(
        &self,
        xref: &Xref,
        targets: &[DataSource],
        cancel: &CancellationToken,
    ) -> Result<Federated<BTreeSet<Xref>>> {
        if self.transitive {
            let closure = self.closure(xref, cancel).await?;
            return Ok(Federated {
                value: retain_targets(closure.value, targets),
                skipped: closure.skipped,
            });
        }
        let outcome = self.fan_out(cancel, |m| m.map_id(xref, targets)).await?;
        Ok(Federated {
            value: outcome.value.into_iter().flatten().collect(),
            skipped: outcome.skipped,
        })
    }

    /// Map many Xrefs; every input appears in the result.
    pub async fn map_ids_with(
        &self,
        xrefs: &BTreeSet<Xref>,
        targets: &[DataSource],
        cancel: &CancellationToken,
    ) -> Result<Federated<XrefMap>> {
        self.lifecycle.ensure_open(&self.name)?;
        let mut merged: XrefMap = xrefs.iter().map(|x| (x.clone(), BTreeSet::new())).collect();
        let mut skipped = Vec::new();

        if self.transitive {
            let closures = join_all(xrefs.iter().map(|x| self.map_one(x, targets, cancel)));
            for (xref, outcome) in xrefs.iter().zip(closures.await) {
                let outcome = outcome?;
                skipped.extend(outcome.skipped);
                merged.entry(xref.clone()).or_default().extend(outcome.value);
            }
        } else {
            let outcome = self.fan_out(cancel, |m| m.map_ids(xrefs, targets)).await?;
            skipped = outcome.skipped;
            for partial in outcome.value {
                for (xref, mapped) in partial {
                    merged.entry(xref).or_default().extend(mapped);
                }
            }
        }
        Ok(self.report_skipped(Federated {
            value: merged,
            skipped,
        }))
    }

    /// True when any member knows `xref`.
    pub async fn xref_exists_with(
        &self,
        xref: &Xref,
        cancel: &CancellationToken,
    ) -> Result<Federated<bool>> {
        self.lifecycle.ensure_open(&self.name)?;
        let outcome = self.fan_out(cancel, |m| m.xref_exists(xref)).await?;
        Ok(self.report_skipped(Federated {
            value: outcome.value.into_iter().any(|found| found),
            skipped: outcome.skipped,
        }))
    }

    /// Union of member searches, truncated to `limit`.
    pub async fn free_search_with(
        &self,
        text: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Federated<BTreeSet<Xref>>> {
        self.lifecycle.ensure_open(&self.name)?;
        let outcome = self
            .fan_out_where(
                |m| m.capabilities().is_free_search_supported(),
                cancel,
                |m| m.free_search(text, limit),
            )
            .await?;
        let merged: BTreeSet<Xref> = outcome.value.into_iter().flatten().collect();
        Ok(self.report_skipped(Federated {
            value: merged.into_iter().take(limit).collect(),
            skipped: outcome.skipped,
        }))
    }

    /// Breadth-first fixpoint over single-hop mappings of every member.
    async fn closure(
        &self,
        xref: &Xref,
        cancel: &CancellationToken,
    ) -> Result<Federated<BTreeSet<Xref>>> {
        let mut visited = BTreeSet::from([xref.clone()]);
        let mut frontier = vec![xref.clone()];
        let mut skipped = Vec::new();
        let mut round = 0usize;

        while !frontier.is_empty() {
            if cancel.is_cancelled() {
                return Err(IdMapperError::Cancelled);
            }
            round += 1;
            let hops = join_all(
                frontier
                    .iter()
                    .map(|x| self.fan_out(cancel, |m| m.map_id(x, &[]))),
            )
            .await;

            let mut next = Vec::new();
            for hop in hops {
                let hop = hop?;
                skipped.extend(hop.skipped);
                for found in hop.value.into_iter().flatten() {
                    if visited.insert(found.clone()) {
                        next.push(found);
                    }
                }
            }
            tracing::debug!(
                stack = %self.name,
                start = %xref,
                round,
                discovered = next.len(),
                "closure round"
            );
            frontier = next;
        }

        visited.remove(xref);
        Ok(Federated {
            value: visited,
            skipped,
        })
    }

    async fn fan_out<'a, T>(
        &'a self,
        cancel: &CancellationToken,
        call: impl Fn(&'a dyn IdMapper) -> BoxFuture<'a, Result<T>>,
    ) -> Result<Federated<Vec<T>>> {
        self.fan_out_where(|_| true, cancel, call).await
    }

    /// Run `call` on every member accepted by `filter`, concurrently.
    async fn fan_out_where<'a, T>(
        &'a self,
        filter: impl Fn(&dyn IdMapper) -> bool,
        cancel: &CancellationToken,
        call: impl Fn(&'a dyn IdMapper) -> BoxFuture<'a, Result<T>>,
    ) -> Result<Federated<Vec<T>>> {
        if cancel.is_cancelled() {
            return Err(IdMapperError::Cancelled);
        }
        let selected: Vec<(usize, &'a Arc<dyn IdMapper>)> = self
            .members
            .iter()
            .enumerate()
            .filter(|&(_, m)| filter(m.as_ref()))
            .collect();
        let calls = join_all(selected.iter().map(|&(_, m)| call(&**m)));
        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IdMapperError::Cancelled),
            outcomes = calls => outcomes,
        };

        let mut values = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for ((index, member), outcome) in selected.into_iter().zip(outcomes) {
            match outcome {
                Ok(value) => values.push(value),
                Err(error) => failures.push(MemberFailure {
                    index,
                    member: member.name().to_string(),
                    error,
                }),
            }
        }
        self.settle(values, failures)
    }

    fn settle<T>(
        &self,
        values: Vec<T>,
        failures: Vec<MemberFailure>,
    ) -> Result<Federated<Vec<T>>> {
        if failures.is_empty() {
            return Ok(Federated {
                value: values,
                skipped: failures,
            });
        }
        match self.policy {
            FailurePolicy::FailFast => Err(IdMapperError::PartialFederation { failures }),
            FailurePolicy::Skip => Ok(Federated {
                value: values,
                skipped: failures,
            }),
        }
    }

    /// Collapse skipped members to one entry each, first error kept, and
    /// warn once per member. A closure meets the same failing member once
    /// per frontier Xref.
    fn report_skipped<T>(&self, outcome: Federated<T>) -> Federated<T> {
        let mut by_member: BTreeMap<usize, MemberFailure> = BTreeMap::new();
        for failure in outcome.skipped {
            by_member.entry(failure.index).or_insert(failure);
        }
        for failure in by_member.values() {
            tracing::warn!(
                stack = %self.name,
                member = %failure.member,
                index = failure.index,
                error = %failure.error,
                "skipping failed stack member"
            );
        }
        Federated {
            value: outcome.value,
            skipped: by_member.into_values().collect(),
        }
    }

    fn any_attribute_member(&self) -> bool {
        self.members.iter().any(|m| m.attribute_mapper().is_some())
    }
}

/// Call `f` on the member's attribute mapper, or yield `empty` when it has none.
fn with_attributes<'a, T: Send + 'a>(
    member: &'a dyn IdMapper,
    empty: T,
    f: impl FnOnce(&'a dyn AttributeMapper) -> BoxFuture<'a, Result<T>>,
) -> BoxFuture<'a, Result<T>> {
    match member.attribute_mapper() {
        Some(attrs) => f(attrs),
        None => futures::future::ready(Ok(empty)).boxed(),
    }
}

#[async_trait]
impl IdMapper for IdMapperStack {
    fn name(&self) -> &str {
        &self.name
    }

    async fn map_id(&self, xref: &Xref, targets: &[DataSource]) -> Result<BTreeSet<Xref>> {
        let cancel = CancellationToken::new();
        Ok(self.map_id_with(xref, targets, &cancel).await?.into_value())
    }

    async fn map_ids(&self, xrefs: &BTreeSet<Xref>, targets: &[DataSource]) -> Result<XrefMap> {
        let cancel = CancellationToken::new();
        Ok(self.map_ids_with(xrefs, targets, &cancel).await?.into_value())
    }

    async fn xref_exists(&self, xref: &Xref) -> Result<bool> {
        let cancel = CancellationToken::new();
        Ok(self.xref_exists_with(xref, &cancel).await?.into_value())
    }

    async fn free_search(&self, text: &str, limit: usize) -> Result<BTreeSet<Xref>> {
        let cancel = CancellationToken::new();
        Ok(self.free_search_with(text, limit, &cancel).await?.into_value())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::aggregate(
            self.members
                .iter()
                .map(|m| (m.name().to_string(), m.capabilities())),
        )
    }

    fn attribute_mapper(&self) -> Option<&dyn AttributeMapper> {
        if self.any_attribute_member() {
            Some(self)
        } else {
            None
        }
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_open()
    }

    /// Closes every member, then the stack itself.
    async fn close(&self) -> Result<()> {
        if !self.lifecycle.close() {
            return Ok(());
        }
        let outcomes = join_all(self.members.iter().map(|m| m.close())).await;
        let failures: Vec<MemberFailure> = self
            .members
            .iter()
            .enumerate()
            .zip(outcomes)
            .filter_map(|((index, member), outcome)| {
                outcome.err().map(|error| MemberFailure {
                    index,
                    member: member.name().to_string(),
                    error,
                })
            })
            .collect();
        let outcome = self.settle(Vec::<()>::new(), failures)?;
        self.report_skipped(outcome);
        Ok(())
    }
}

#[async_trait]
impl AttributeMapper for IdMapperStack {
    async fn attributes(&self, xref: &Xref, attr_type: &str) -> Result<BTreeSet<String>> {
        self.lifecycle.ensure_open(&self.name)?;
        let cancel = CancellationToken::new();
        let outcome = self
            .fan_out(&cancel, |m| {
                with_attributes(m, BTreeSet::new(), |a| a.attributes(xref, attr_type))
            })
            .await?;
        let outcome = self.report_skipped(outcome);
        Ok(outcome.value.into_iter().flatten().collect())
    }

    async fn all_attributes(&self, xref: &Xref) -> Result<BTreeMap<String, BTreeSet<String>>> {
        self.lifecycle.ensure_open(&self.name)?;
        let cancel = CancellationToken::new();
        let outcome = self
            .fan_out(&cancel, |m| {
                with_attributes(m, BTreeMap::new(), |a| a.all_attributes(xref))
            })
            .await?;
        let outcome = self.report_skipped(outcome);
        let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for partial in outcome.value {
            for (key, values) in partial {
                merged.entry(key).or_default().extend(values);
            }
        }
        Ok(merged)
    }

    async fn free_attribute_search(
        &self,
        query: &str,
        attr_type: &str,
        limit: usize,
    ) -> Result<BTreeMap<Xref, String>> {
        self.lifecycle.ensure_open(&self.name)?;
        let cancel = CancellationToken::new();
        let outcome = self
            .fan_out(&cancel, |m| {
                with_attributes(m, BTreeMap::new(), |a| {
                    a.free_attribute_search(query, attr_type, limit)
                })
            })
            .await?;
        let outcome = self.report_skipped(outcome);
        let mut merged = BTreeMap::new();
        for partial in outcome.value {
            for (xref, value) in partial {
                merged.entry(xref).or_insert(value);
            }
        }
        Ok(merged.into_iter().take(limit).collect())
    }

    async fn attribute_set(&self) -> Result<BTreeSet<String>> {
        self.lifecycle.ensure_open(&self.name)?;
        let cancel = CancellationToken::new();
        let outcome = self
            .fan_out(&cancel, |m| {
                with_attributes(m, BTreeSet::new(), |a| a.attribute_set())
            })
            .await?;
        let outcome = self.report_skipped(outcome);
        Ok(outcome.value.into_iter().flatten().collect())
    }
}
