//! Error types for identifier mapping and federation.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IdMapperError>;

/// Errors raised by mappers, stacks, drivers and the namespace registry.
#[derive(Debug, thiserror::Error)]
pub enum IdMapperError {
    /// A configuration entry is malformed or names something unknown.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend could not be reached, or refused the request.
    #[error("cannot connect to {target}: {message}")]
    Connection { target: String, message: String },

    /// No implementation is registered for the schema version a backend reported.
    #[error(
        "unsupported schema version '{version}', please make sure you have the latest version of this software and databases"
    )]
    UnsupportedSchema { version: i64 },

    /// An operation was attempted on a mapper after `close()`.
    #[error("mapper is closed: {mapper}")]
    Closed { mapper: String },

    /// The request-scoped cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// One or more stack members failed during fan-out.
    #[error("{} stack member(s) failed: {}", .failures.len(), MemberFailure::join(.failures))]
    PartialFederation { failures: Vec<MemberFailure> },

    /// A namespace URL template without the `$id` marker.
    #[error("url pattern for '{data_source}' should contain $id: {pattern}")]
    InvalidUrlPattern { data_source: String, pattern: String },

    /// Namespace registration needs a system code or a full name.
    #[error("a data source needs a system code or a full name")]
    MissingKey,

    /// No driver is registered for a connection-string scheme.
    #[error("no driver registered for scheme '{0}'")]
    UnknownScheme(String),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Storage or I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One stack member that failed while a request fanned out.
#[derive(Debug)]
pub struct MemberFailure {
    /// Position of the member in the stack.
    pub index: usize,
    /// The member's `name()`.
    pub member: String,
    pub error: IdMapperError,
}

impl MemberFailure {
    fn join(failures: &[MemberFailure]) -> String {
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for MemberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.member, self.error)
    }
}

impl IdMapperError {
    /// Shorthand for [`IdMapperError::Connection`].
    pub fn connection(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for [`IdMapperError::Closed`].
    pub fn closed(mapper: impl Into<String>) -> Self {
        Self::Closed {
            mapper: mapper.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_federation_names_every_member() {
        let err = IdMapperError::PartialFederation {
            failures: vec![
                MemberFailure {
                    index: 0,
                    member: "hs-gdb".to_string(),
                    error: IdMapperError::closed("hs-gdb"),
                },
                MemberFailure {
                    index: 2,
                    member: "remote".to_string(),
                    error: IdMapperError::connection("http://example.org", "timeout"),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 stack member(s) failed"));
        assert!(text.contains("#0 hs-gdb: mapper is closed: hs-gdb"));
        assert!(text.contains("#2 remote: cannot connect to http://example.org: timeout"));
    }

    #[test]
    fn unsupported_schema_names_version() {
        let err = IdMapperError::UnsupportedSchema { version: 99 };
        assert!(err.to_string().contains("'99'"));
    }
}
