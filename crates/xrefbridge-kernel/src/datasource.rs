//! Namespace registry.
//!
//! A [`DataSource`] identifies one identifier system ("Entrez Gene", "L").
//! Data sources are process-lifetime singletons keyed by two independent
//! indexes, system code and full name. Once both keys are known for a
//! namespace they resolve to the same handle. Looking up an unknown
//! non-empty key creates a namespace carrying only that key.
//!
//! Handles compare by an internal sequence id, never by metadata, so a
//! namespace keeps its identity while a [`Builder`] fills in details.

use crate::error::{IdMapperError, Result};
use crate::organism::Organism;
use crate::xref::Xref;
use parking_lot::RwLock;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

/// Substitution marker in URL templates.
pub const ID_MARKER: &str = "$id";

const DEFAULT_TYPE: &str = "unknown";
const METABOLITE_TYPE: &str = "metabolite";

static NEXT_SEQ: AtomicU64 = AtomicU64::new(1);
static GLOBAL: OnceLock<DataSourceRegistry> = OnceLock::new();

/// Snapshot of everything known about one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub system_code: Option<String>,
    pub full_name: Option<String>,
    pub url_pattern: Option<String>,
    pub main_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub organism: Option<Organism>,
    pub primary: bool,
    pub urn_base: Option<String>,
    pub id_example: Option<String>,
}

impl Default for DataSourceInfo {
    fn default() -> Self {
        Self {
            system_code: None,
            full_name: None,
            url_pattern: None,
            main_url: None,
            kind: DEFAULT_TYPE.to_string(),
            organism: None,
            primary: true,
            urn_base: None,
            id_example: None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    info: RwLock<DataSourceInfo>,
}

/// Shared handle to a registered namespace.
#[derive(Clone)]
pub struct DataSource(Arc<Entry>);

impl DataSource {
    fn fresh() -> Self {
        Self(Arc::new(Entry {
            seq: NEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            info: RwLock::new(DataSourceInfo::default()),
        }))
    }

    /// Register in the process-wide registry. See [`DataSourceRegistry::register`].
    pub fn register(system_code: &str, full_name: &str) -> Result<Builder<'static>> {
        DataSourceRegistry::global().register(system_code, full_name)
    }

    pub fn get_by_system_code(code: &str) -> Option<DataSource> {
        DataSourceRegistry::global().get_by_system_code(code)
    }

    pub fn get_by_full_name(name: &str) -> Option<DataSource> {
        DataSourceRegistry::global().get_by_full_name(name)
    }

    pub fn get_by_alias(alias: &str) -> Option<DataSource> {
        DataSourceRegistry::global().get_by_alias(alias)
    }

    pub fn get_by_urn_base(base: &str) -> Option<DataSource> {
        DataSourceRegistry::global().get_by_urn_base(base)
    }

    /// Add an alias in the process-wide registry.
    pub fn register_alias(&self, alias: &str) {
        DataSourceRegistry::global().register_alias(self, alias);
    }

    /// Internal unique key. Stable for the life of the process.
    pub fn seq(&self) -> u64 {
        self.0.seq
    }

    pub fn info(&self) -> DataSourceInfo {
        self.0.info.read().clone()
    }

    pub fn system_code(&self) -> Option<String> {
        self.0.info.read().system_code.clone()
    }

    pub fn full_name(&self) -> Option<String> {
        self.0.info.read().full_name.clone()
    }

    pub fn main_url(&self) -> Option<String> {
        self.0.info.read().main_url.clone()
    }

    /// Entity type tag: "gene", "protein", "metabolite", "probe", or "unknown".
    pub fn kind(&self) -> String {
        self.0.info.read().kind.clone()
    }

    /// `None` means any organism / not applicable.
    pub fn organism(&self) -> Option<Organism> {
        self.0.info.read().organism
    }

    pub fn is_primary(&self) -> bool {
        self.0.info.read().primary
    }

    pub fn is_metabolite(&self) -> bool {
        self.0.info.read().kind == METABOLITE_TYPE
    }

    pub fn urn_base(&self) -> Option<String> {
        self.0.info.read().urn_base.clone()
    }

    /// Link-out URL for `id`, if a URL template is known.
    pub fn url(&self, id: &str) -> Option<String> {
        self.0
            .info
            .read()
            .url_pattern
            .as_ref()
            .map(|pattern| pattern.replacen(ID_MARKER, id, 1))
    }

    /// Global identifier such as `urn:miriam:uniprot:P12345`.
    pub fn urn(&self, id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        let base = self.urn_base().unwrap_or_default();
        format!("{base}:{encoded}")
    }

    /// Example identifier from this system, mostly for testing.
    pub fn example(&self) -> Option<Xref> {
        let id = self.0.info.read().id_example.clone()?;
        Some(Xref::new(id, self.clone()))
    }
}

impl PartialEq for DataSource {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}

impl Eq for DataSource {}

impl Hash for DataSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.seq.hash(state);
    }
}

impl PartialOrd for DataSource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataSource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.seq.cmp(&other.0.seq)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.0.info.read();
        match (&info.full_name, &info.system_code) {
            (Some(name), _) => f.write_str(name),
            (None, Some(code)) => f.write_str(code),
            (None, None) => write!(f, "#{}", self.0.seq),
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.0.info.read();
        f.debug_struct("DataSource")
            .field("seq", &self.0.seq)
            .field("system_code", &info.system_code)
            .field("full_name", &info.full_name)
            .finish()
    }
}

/// Chainable setters over a registered namespace.
///
/// Holds the registry handle, not a copy: every setter is immediately
/// visible through later lookups.
pub struct Builder<'r> {
    registry: &'r DataSourceRegistry,
    current: DataSource,
}

impl Builder<'_> {
    pub fn as_data_source(&self) -> DataSource {
        self.current.clone()
    }

    /// Template for link-outs; must contain `$id`. An empty pattern clears it.
    pub fn url_pattern(self, pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            self.current.0.info.write().url_pattern = None;
            return Ok(self);
        }
        if !pattern.contains(ID_MARKER) {
            return Err(IdMapperError::InvalidUrlPattern {
                data_source: self.current.to_string(),
                pattern: pattern.to_string(),
            });
        }
        self.current.0.info.write().url_pattern = Some(pattern.to_string());
        Ok(self)
    }

    pub fn main_url(self, url: &str) -> Self {
        self.current.0.info.write().main_url = Some(url.to_string());
        self
    }

    pub fn id_example(self, id: &str) -> Self {
        self.current.0.info.write().id_example = Some(id.to_string());
        self
    }

    /// Secondary systems (probes, EC numbers) occur in data but are
    /// discouraged as primary annotation.
    pub fn primary(self, primary: bool) -> Self {
        self.current.0.info.write().primary = primary;
        self
    }

    pub fn kind(self, kind: &str) -> Self {
        self.current.0.info.write().kind = kind.to_string();
        self
    }

    pub fn organism(self, organism: Option<Organism>) -> Self {
        self.current.0.info.write().organism = organism;
        self
    }

    pub fn urn_base(self, base: &str) -> Self {
        self.current.0.info.write().urn_base = Some(base.to_string());
        self.registry.index_urn_base(&self.current, base);
        self
    }

    pub fn alias(self, alias: &str) -> Self {
        self.registry.register_alias(&self.current, alias);
        self
    }
}

#[derive(Default)]
struct Index {
    by_code: HashMap<String, DataSource>,
    by_name: HashMap<String, DataSource>,
    by_alias: HashMap<String, DataSource>,
    by_urn_base: HashMap<String, DataSource>,
    all: Vec<DataSource>,
}

/// The two-keyed singleton table plus alias and URN-base indexes.
///
/// Entries are never removed: mappers and Xrefs hold handles for the
/// lifetime of the process.
#[derive(Default)]
pub struct DataSourceRegistry {
    index: RwLock<Index>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static DataSourceRegistry {
        GLOBAL.get_or_init(DataSourceRegistry::new)
    }

    /// Register or update a namespace. Empty strings mean "not given".
    ///
    /// An existing entry bound to `full_name` wins, then one bound to
    /// `system_code`; otherwise a new entry is created. Both given keys are
    /// then bound to the chosen entry.
    pub fn register(&self, system_code: &str, full_name: &str) -> Result<Builder<'_>> {
        let code = non_empty(system_code);
        let name = non_empty(full_name);
        if code.is_none() && name.is_none() {
            return Err(IdMapperError::MissingKey);
        }

        let mut index = self.index.write();
        let existing = name
            .and_then(|n| index.by_name.get(n))
            .or_else(|| code.and_then(|c| index.by_code.get(c)))
            .cloned();
        let current = match existing {
            Some(ds) => ds,
            None => {
                let ds = DataSource::fresh();
                index.all.push(ds.clone());
                ds
            }
        };

        {
            let mut info = current.0.info.write();
            if let Some(code) = code {
                info.system_code = Some(code.to_string());
            }
            if let Some(name) = name {
                info.full_name = Some(name.to_string());
            }
        }
        if let Some(code) = code {
            index.by_code.insert(code.to_string(), current.clone());
        }
        if let Some(name) = name {
            index.by_name.insert(name.to_string(), current.clone());
        }

        Ok(Builder {
            registry: self,
            current,
        })
    }

    /// Existing namespace for `code`, or a new one carrying only the code.
    pub fn get_by_system_code(&self, code: &str) -> Option<DataSource> {
        let code = non_empty(code)?;
        if let Some(ds) = self.index.read().by_code.get(code) {
            return Some(ds.clone());
        }
        tracing::debug!(code, "auto-registering unknown system code");
        self.register(code, "").ok().map(|b| b.as_data_source())
    }

    /// Existing namespace for `name`, or a new one carrying only the name.
    pub fn get_by_full_name(&self, name: &str) -> Option<DataSource> {
        let name = non_empty(name)?;
        if let Some(ds) = self.index.read().by_name.get(name) {
            return Some(ds.clone());
        }
        tracing::debug!(name, "auto-registering unknown full name");
        self.register("", name).ok().map(|b| b.as_data_source())
    }

    /// Full name first, then system code. Never auto-registers.
    pub fn find(&self, key: &str) -> Option<DataSource> {
        let index = self.index.read();
        index
            .by_name
            .get(key)
            .or_else(|| index.by_code.get(key))
            .cloned()
    }

    pub fn get_by_alias(&self, alias: &str) -> Option<DataSource> {
        self.index.read().by_alias.get(alias).cloned()
    }

    pub fn get_by_urn_base(&self, base: &str) -> Option<DataSource> {
        self.index.read().by_urn_base.get(base).cloned()
    }

    pub fn register_alias(&self, data_source: &DataSource, alias: &str) {
        if let Some(alias) = non_empty(alias) {
            self.index
                .write()
                .by_alias
                .insert(alias.to_string(), data_source.clone());
        }
    }

    fn index_urn_base(&self, data_source: &DataSource, base: &str) {
        if let Some(base) = non_empty(base) {
            self.index
                .write()
                .by_urn_base
                .insert(base.to_string(), data_source.clone());
        }
    }

    pub fn full_names(&self) -> BTreeSet<String> {
        self.index.read().by_name.keys().cloned().collect()
    }

    pub fn data_sources(&self) -> BTreeSet<DataSource> {
        self.index.read().all.iter().cloned().collect()
    }

    /// Subset matching every given filter. A namespace without an organism
    /// passes any organism filter.
    pub fn filtered(
        &self,
        primary: Option<bool>,
        metabolite: Option<bool>,
        organism: Option<Organism>,
    ) -> BTreeSet<DataSource> {
        self.index
            .read()
            .all
            .iter()
            .filter(|ds| {
                let info = ds.0.info.read();
                primary.is_none_or(|p| info.primary == p)
                    && metabolite.is_none_or(|m| (info.kind == METABOLITE_TYPE) == m)
                    && organism.is_none_or(|o| info.organism.is_none_or(|own| own == o))
            })
            .cloned()
            .collect()
    }
}

fn non_empty(key: &str) -> Option<&str> {
    if key.is_empty() { None } else { Some(key) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_twice_returns_same_singleton() {
        let reg = DataSourceRegistry::new();
        let a = reg.register("@@", "ZiZaZo").unwrap().as_data_source();
        let b = reg.register("@@", "ZiZaZo").unwrap().as_data_source();
        assert_eq!(a, b);
        assert_eq!(reg.get_by_system_code("@@"), Some(a.clone()));
        assert_eq!(reg.get_by_full_name("ZiZaZo"), Some(a));
        assert_eq!(reg.data_sources().len(), 1);
    }

    #[test]
    fn auto_vivification_is_idempotent() {
        let reg = DataSourceRegistry::new();
        let first = reg.get_by_system_code("ZZ").expect("non-empty code vivifies");
        let second = reg.get_by_system_code("ZZ").expect("non-empty code vivifies");
        assert_eq!(first, second);
        assert_eq!(first.system_code().as_deref(), Some("ZZ"));
        assert_eq!(first.full_name(), None);
        assert_eq!(reg.data_sources().len(), 1);
    }

    #[test]
    fn empty_keys_never_vivify() {
        let reg = DataSourceRegistry::new();
        assert!(reg.get_by_system_code("").is_none());
        assert!(reg.get_by_full_name("").is_none());
        assert!(matches!(reg.register("", ""), Err(IdMapperError::MissingKey)));
        assert!(reg.data_sources().is_empty());
    }

    #[test]
    fn code_vivified_first_merges_with_later_name() {
        let reg = DataSourceRegistry::new();
        let by_code = reg.get_by_system_code("En").unwrap();
        let registered = reg.register("En", "Ensembl").unwrap().as_data_source();
        assert_eq!(by_code, registered);
        assert_eq!(reg.get_by_full_name("Ensembl"), Some(by_code.clone()));
        assert_eq!(by_code.full_name().as_deref(), Some("Ensembl"));
    }

    #[test]
    fn later_registration_does_not_clear_known_keys() {
        let reg = DataSourceRegistry::new();
        let ds = reg.register("L", "Entrez Gene").unwrap().as_data_source();
        reg.register("", "Entrez Gene").unwrap();
        assert_eq!(ds.system_code().as_deref(), Some("L"));
    }

    #[test]
    fn builder_mutates_the_registered_entry() {
        let reg = DataSourceRegistry::new();
        reg.register("X", "Affymetrix")
            .unwrap()
            .main_url("http://www.affymetrix.com")
            .kind("probe")
            .primary(false)
            .url_pattern("https://www.affymetrix.com/probe?id=$id")
            .unwrap();
        let ds = reg.get_by_system_code("X").unwrap();
        assert_eq!(ds.main_url().as_deref(), Some("http://www.affymetrix.com"));
        assert_eq!(ds.kind(), "probe");
        assert!(!ds.is_primary());
        assert_eq!(
            ds.url("1000_at").as_deref(),
            Some("https://www.affymetrix.com/probe?id=1000_at")
        );
    }

    #[test]
    fn url_pattern_without_marker_is_rejected() {
        let reg = DataSourceRegistry::new();
        let err = reg
            .register("S", "Uniprot-TrEMBL")
            .unwrap()
            .url_pattern("http://www.uniprot.org/uniprot/")
            .err()
            .expect("pattern without $id must fail");
        assert!(matches!(err, IdMapperError::InvalidUrlPattern { .. }));
    }

    #[test]
    fn alias_and_urn_indexes_resolve_to_singleton() {
        let reg = DataSourceRegistry::new();
        let ds = reg
            .register("S", "Uniprot-TrEMBL")
            .unwrap()
            .urn_base("urn:miriam:uniprot")
            .alias("UniProt")
            .as_data_source();
        assert_eq!(reg.get_by_urn_base("urn:miriam:uniprot"), Some(ds.clone()));
        assert_eq!(reg.get_by_alias("UniProt"), Some(ds.clone()));
        assert_eq!(reg.get_by_alias("Swissprot"), None);
        assert_eq!(ds.urn("P12 345"), "urn:miriam:uniprot:P12+345");
    }

    #[test]
    fn filtered_set_treats_missing_organism_as_any() {
        let reg = DataSourceRegistry::new();
        let entrez = reg.register("L", "Entrez Gene").unwrap().kind("gene").as_data_source();
        let hmdb = reg.register("Ch", "HMDB").unwrap().kind("metabolite").as_data_source();
        let affy = reg
            .register("X", "Affy")
            .unwrap()
            .primary(false)
            .organism(Some(Organism::HomoSapiens))
            .as_data_source();
        let flybase = reg
            .register("F", "FlyBase")
            .unwrap()
            .organism(Some(Organism::DrosophilaMelanogaster))
            .as_data_source();

        let human = reg.filtered(None, None, Some(Organism::HomoSapiens));
        assert!(human.contains(&entrez) && human.contains(&hmdb) && human.contains(&affy));
        assert!(!human.contains(&flybase));

        let metabolites = reg.filtered(None, Some(true), None);
        assert_eq!(metabolites.into_iter().collect::<Vec<_>>(), vec![hmdb]);

        let secondary = reg.filtered(Some(false), None, None);
        assert_eq!(secondary.into_iter().collect::<Vec<_>>(), vec![affy]);

        assert_eq!(reg.filtered(None, None, None).len(), 4);
    }

    #[test]
    fn full_names_lists_only_named_entries() {
        let reg = DataSourceRegistry::new();
        reg.register("L", "Entrez Gene").unwrap();
        reg.get_by_system_code("??");
        let names = reg.full_names();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["Entrez Gene"]);
    }

    #[test]
    fn concurrent_lookups_converge_on_one_entry() {
        let reg = Arc::new(DataSourceRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.get_by_system_code("Race").unwrap())
            })
            .collect();
        let seen: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(reg.data_sources().len(), 1);
    }
}
