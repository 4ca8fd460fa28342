//! TOML namespace catalogs.
//!
//! ```toml
//! [[datasource]]
//! code = "L"
//! name = "Entrez Gene"
//! url_pattern = "https://www.ncbi.nlm.nih.gov/gene/$id"
//! type = "gene"
//! urn_base = "urn:miriam:ncbigene"
//! example = "3643"
//! ```
//!
//! Loading goes through [`DataSourceRegistry::register`], so catalog
//! entries merge with namespaces that were already looked up or registered.

use crate::datasource::{DataSource, DataSourceRegistry};
use crate::error::{IdMapperError, Result};
use crate::organism::Organism;
use serde::Deserialize;
use std::path::Path;

/// Common biological namespaces shipped with the kernel.
pub const BIO_CATALOG: &str = include_str!("../catalog/bio.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "datasource")]
    pub data_sources: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub url_pattern: Option<String>,
    pub main_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub primary: Option<bool>,
    pub organism: Option<String>,
    pub urn_base: Option<String>,
    pub example: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| IdMapperError::Configuration(e.to_string()))
    }
}

impl DataSourceRegistry {
    /// Register every entry of a TOML catalog. Stops at the first invalid entry.
    pub fn load_catalog(&self, text: &str) -> Result<Vec<DataSource>> {
        let catalog = Catalog::parse(text)?;
        let mut loaded = Vec::with_capacity(catalog.data_sources.len());
        for (idx, entry) in catalog.data_sources.iter().enumerate() {
            let ds = self.register_entry(entry).map_err(|e| {
                IdMapperError::Configuration(format!("datasource[{idx}]: {e}"))
            })?;
            loaded.push(ds);
        }
        tracing::debug!(count = loaded.len(), "loaded namespace catalog");
        Ok(loaded)
    }

    pub fn load_catalog_file(&self, path: impl AsRef<Path>) -> Result<Vec<DataSource>> {
        let text = std::fs::read_to_string(path)?;
        self.load_catalog(&text)
    }

    fn register_entry(&self, entry: &CatalogEntry) -> Result<DataSource> {
        let organism = match entry.organism.as_deref() {
            None | Some("") => None,
            Some(token) => Some(Organism::lookup(token).ok_or_else(|| {
                IdMapperError::Configuration(format!("unknown organism: {token}"))
            })?),
        };

        let mut builder = self.register(&entry.code, &entry.name)?;
        if let Some(pattern) = &entry.url_pattern {
            builder = builder.url_pattern(pattern)?;
        }
        if let Some(url) = &entry.main_url {
            builder = builder.main_url(url);
        }
        if let Some(kind) = &entry.kind {
            builder = builder.kind(kind);
        }
        if let Some(primary) = entry.primary {
            builder = builder.primary(primary);
        }
        if organism.is_some() {
            builder = builder.organism(organism);
        }
        if let Some(base) = &entry.urn_base {
            builder = builder.urn_base(base);
        }
        if let Some(example) = &entry.example {
            builder = builder.id_example(example);
        }
        for alias in &entry.aliases {
            builder = builder.alias(alias);
        }
        Ok(builder.as_data_source())
    }
}

/// Register [`BIO_CATALOG`] in the process-wide registry.
pub fn register_bio_defaults() -> Result<Vec<DataSource>> {
    DataSourceRegistry::global().load_catalog(BIO_CATALOG)
}
