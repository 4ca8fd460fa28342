//! Connection strings: `scheme:rest` resolved through registered drivers.
//!
//! ```text
//! "idmapper-text:/data/yeast.txt"  ──► TextDriver   ──► Arc<dyn IdMapper>
//! "idmapper-pgdb:/data/Hs.bridge"  ──► SchemaDriver ──► Arc<dyn IdMapper>
//! ```

use crate::error::{IdMapperError, Result};
use crate::mapper::IdMapper;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prefix shared by every mapper scheme.
pub const SCHEME_PREFIX: &str = "idmapper-";

/// Turns the location part of a connection string into a mapper.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&self, location: &str) -> Result<Arc<dyn IdMapper>>;
}

/// Scheme → driver table, populated explicitly at start-up.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<BTreeMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver` for `scheme` (without the trailing colon).
    /// A later registration for the same scheme replaces the earlier one.
    pub fn register(&self, scheme: &str, driver: Arc<dyn Driver>) {
        self.drivers.write().insert(scheme.to_string(), driver);
    }

    pub fn schemes(&self) -> Vec<String> {
        self.drivers.read().keys().cloned().collect()
    }

    /// Connect through the driver named by the scheme of `connection`.
    pub async fn connect(&self, connection: &str) -> Result<Arc<dyn IdMapper>> {
        let (scheme, location) = split_connection(connection)?;
        let driver = self
            .drivers
            .read()
            .get(scheme)
            .cloned()
            .ok_or_else(|| IdMapperError::UnknownScheme(scheme.to_string()))?;
        tracing::debug!(scheme, location, "connecting mapper");
        driver.connect(location).await
    }
}

/// Split `scheme:location` at the first colon.
pub fn split_connection(connection: &str) -> Result<(&str, &str)> {
    match connection.split_once(':') {
        Some((scheme, location)) if !scheme.is_empty() => Ok((scheme, location)),
        _ => Err(IdMapperError::Configuration(format!(
            "connection string has no scheme: {connection}"
        ))),
    }
}

/// `connection` with `default_scheme` prepended unless it already names
/// an `idmapper-` scheme.
pub fn with_default_scheme(connection: &str, default_scheme: &str) -> String {
    if connection.starts_with(SCHEME_PREFIX) {
        connection.to_string()
    } else {
        format!("{default_scheme}:{connection}")
    }
}
