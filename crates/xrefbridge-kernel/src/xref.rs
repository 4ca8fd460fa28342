//! Cross-references: an identifier paired with its namespace.

use crate::datasource::DataSource;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Immutable (identifier, namespace) pair.
///
/// Ordering is by identifier first, then by namespace sequence id, which
/// keeps result sets deterministic within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Xref {
    id: String,
    data_source: DataSource,
}

impl Xref {
    pub fn new(id: impl Into<String>, data_source: DataSource) -> Self {
        Self {
            id: id.into(),
            data_source,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn url(&self) -> Option<String> {
        self.data_source.url(&self.id)
    }

    pub fn urn(&self) -> String {
        self.data_source.urn(&self.id)
    }
}

impl fmt::Display for Xref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .data_source
            .system_code()
            .unwrap_or_else(|| self.data_source.to_string());
        write!(f, "{}:{}", code, self.id)
    }
}

impl Serialize for Xref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Xref", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("systemCode", &self.data_source.system_code())?;
        state.serialize_field("dataSource", &self.data_source.to_string())?;
        state.end()
    }
}
