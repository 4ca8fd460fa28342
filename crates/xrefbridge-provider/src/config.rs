//! Routing configuration: one `<scope>\t<connection>` pair per line.
//!
//! ```text
//! # organism<TAB>connection
//! Homo sapiens<TAB>idmapper-text:/data/Hs_genes.txt
//! Rattus norvegicus<TAB>idmapper-text:/data/rat_custom.txt
//! *<TAB>idmapper-pgdb:/data/metabolites_20110523.bridge
//! ```
//!
//! The scope is an organism's latin name, English name or code, or `*`.
//! Connections without an `idmapper-` scheme get [`DEFAULT_SCHEME`]; such
//! lines only connect when the [`DriverRegistry`] has a driver for that
//! scheme, otherwise they are skipped as `UnknownScheme`.
//! Bad lines are skipped and reported, never fatal.

use crate::router::OrganismRouter;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use xrefbridge_kernel::{DriverRegistry, IdMapper, IdMapperError, Organism, with_default_scheme};

/// Scope token for backends that serve every organism.
pub const WILDCARD: &str = "*";

/// Scheme assumed for bare connection strings.
pub const DEFAULT_SCHEME: &str = "idmapper-pgdb";

/// Why a configuration line was skipped, or why the file could not be read.
#[derive(Debug, thiserror::Error)]
pub enum RoutingConfigError {
    #[error("line {line}: expected <organism>\\t<connection>, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: unable to parse organism: {scope}")]
    UnknownScope { line: usize, scope: String },

    #[error("line {line}: cannot open {connection}: {source}")]
    Connect {
        line: usize,
        connection: String,
        #[source]
        source: IdMapperError,
    },

    #[error("cannot read routing configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RoutingConfigError> for IdMapperError {
    fn from(err: RoutingConfigError) -> Self {
        match err {
            RoutingConfigError::Io(e) => IdMapperError::Io(e),
            other => IdMapperError::Configuration(other.to_string()),
        }
    }
}

/// Which stacks a configured backend joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Organism(Organism),
    Wildcard,
}

impl Scope {
    pub fn parse(token: &str) -> Option<Scope> {
        if token == WILDCARD {
            Some(Scope::Wildcard)
        } else {
            Organism::lookup(token).map(Scope::Organism)
        }
    }
}

/// One well-formed configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingLine {
    pub line: usize,
    pub scope: Scope,
    /// Full connection string, default scheme applied.
    pub connection: String,
}

/// Parse line `line` (1-based). `Ok(None)` for blank lines and comments.
pub fn parse_line(line: usize, text: &str) -> Result<Option<RoutingLine>, RoutingConfigError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = trimmed.split('\t').collect();
    let [scope, connection] = fields.as_slice() else {
        return Err(RoutingConfigError::Malformed {
            line,
            content: trimmed.to_string(),
        });
    };
    let (scope, connection) = (scope.trim(), connection.trim());
    if scope.is_empty() || connection.is_empty() {
        return Err(RoutingConfigError::Malformed {
            line,
            content: trimmed.to_string(),
        });
    }
    let scope = Scope::parse(scope).ok_or_else(|| RoutingConfigError::UnknownScope {
        line,
        scope: scope.to_string(),
    })?;
    Ok(Some(RoutingLine {
        line,
        scope,
        connection: with_default_scheme(connection, DEFAULT_SCHEME),
    }))
}

/// Outcome of loading a configuration: what was routed, what was skipped.
#[derive(Debug, Default)]
pub struct ConfigReport {
    /// Lines whose backend was connected and routed.
    pub routed: usize,
    pub skipped: Vec<RoutingConfigError>,
}

impl ConfigReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    fn skip(&mut self, error: RoutingConfigError) {
        tracing::warn!(%error, "skipping routing configuration line");
        self.skipped.push(error);
    }
}

impl OrganismRouter {
    /// Connect and route every line of `text`.
    ///
    /// A connection string used on several lines is opened once and shared.
    pub async fn load_config(&self, text: &str, drivers: &DriverRegistry) -> ConfigReport {
        let mut report = ConfigReport::default();
        let mut opened: HashMap<String, Arc<dyn IdMapper>> = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let entry = match parse_line(idx + 1, raw) {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(error) => {
                    report.skip(error);
                    continue;
                }
            };

            let mapper = match opened.get(&entry.connection) {
                Some(mapper) => Arc::clone(mapper),
                None => match drivers.connect(&entry.connection).await {
                    Ok(mapper) => {
                        opened.insert(entry.connection.clone(), Arc::clone(&mapper));
                        mapper
                    }
                    Err(source) => {
                        report.skip(RoutingConfigError::Connect {
                            line: entry.line,
                            connection: entry.connection,
                            source,
                        });
                        continue;
                    }
                },
            };

            match entry.scope {
                Scope::Organism(organism) => self.add_organism_backend(organism, mapper),
                Scope::Wildcard => self.add_wildcard_backend(mapper),
            }
            report.routed += 1;
        }

        tracing::info!(
            routed = report.routed,
            skipped = report.skipped.len(),
            "loaded routing configuration"
        );
        report
    }

    /// [`OrganismRouter::load_config`] over a file. Only an unreadable file
    /// is an error.
    pub async fn load_config_file(
        &self,
        path: impl AsRef<Path>,
        drivers: &DriverRegistry,
    ) -> Result<ConfigReport, RoutingConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "parsing routing configuration");
        let text = tokio::fs::read_to_string(path).await?;
        Ok(self.load_config(&text, drivers).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_accept_every_organism_spelling() {
        for token in ["Homo sapiens", "human", "Hs"] {
            let entry = parse_line(1, &format!("{token}\t/data/Hs.bridge")).unwrap().unwrap();
            assert_eq!(entry.scope, Scope::Organism(Organism::HomoSapiens));
            assert_eq!(entry.connection, "idmapper-pgdb:/data/Hs.bridge");
        }
        let wildcard = parse_line(7, "*\tidmapper-text:/data/m.txt").unwrap().unwrap();
        assert_eq!(wildcard.scope, Scope::Wildcard);
        assert_eq!(wildcard.connection, "idmapper-text:/data/m.txt");
        assert_eq!(wildcard.line, 7);
    }

    #[test]
    fn blank_lines_and_comments_are_ignored() {
        assert!(parse_line(1, "").unwrap().is_none());
        assert!(parse_line(2, "   ").unwrap().is_none());
        assert!(parse_line(3, "# Homo sapiens\t/data/Hs.bridge").unwrap().is_none());
    }

    #[test]
    fn malformed_lines_are_rejected_with_their_number() {
        let err = parse_line(4, "Homo sapiens /data/Hs.bridge").unwrap_err();
        assert!(matches!(err, RoutingConfigError::Malformed { line: 4, .. }));

        let err = parse_line(5, "Homo sapiens\ta\tb").unwrap_err();
        assert!(matches!(err, RoutingConfigError::Malformed { line: 5, .. }));

        let err = parse_line(6, "Homo sapiens\t ").unwrap_err();
        assert!(matches!(err, RoutingConfigError::Malformed { line: 6, .. }));

        let err = parse_line(9, "Unicornus magicus\t/data/u.bridge").unwrap_err();
        assert_eq!(err.to_string(), "line 9: unable to parse organism: Unicornus magicus");
    }

    #[test]
    fn config_errors_convert_to_configuration_errors() {
        let err: IdMapperError = RoutingConfigError::UnknownScope {
            line: 2,
            scope: "Martian".into(),
        }
        .into();
        assert!(matches!(err, IdMapperError::Configuration(msg) if msg.contains("Martian")));
    }
}
