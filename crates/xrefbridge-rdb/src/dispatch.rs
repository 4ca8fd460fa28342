//! Schema version probe and version → implementation dispatch.

use crate::connector::RelationalConnector;
use crate::target::ConnectionTarget;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use xrefbridge_kernel::{Driver, IdMapper, IdMapperError, Result};

/// Reads the schema-version marker.
pub const SCHEMA_VERSION_QUERY: &str = "SELECT schemaversion FROM info";

/// Scheme served by [`SchemaDriver`].
pub const PGDB_SCHEME: &str = "idmapper-pgdb";

/// Builds the mapper for one schema version.
#[async_trait]
pub trait SchemaConstructor: Send + Sync {
    async fn open(&self, name: &str, target: &ConnectionTarget) -> Result<Arc<dyn IdMapper>>;
}

/// Static table of known schema versions over one connector.
pub struct SchemaDispatcher {
    connector: Arc<dyn RelationalConnector>,
    schemas: BTreeMap<i64, Arc<dyn SchemaConstructor>>,
}

impl SchemaDispatcher {
    pub fn new(connector: Arc<dyn RelationalConnector>) -> Self {
        Self {
            connector,
            schemas: BTreeMap::new(),
        }
    }

    /// Register the implementation for `version`. Replaces an earlier one.
    pub fn with_schema(mut self, version: i64, constructor: Arc<dyn SchemaConstructor>) -> Self {
        self.schemas.insert(version, constructor);
        self
    }

    pub fn versions(&self) -> Vec<i64> {
        self.schemas.keys().copied().collect()
    }

    /// Read the version marker over a transient connection.
    ///
    /// The connection is closed whether or not the query succeeds. A
    /// database without a marker row reports version 0.
    pub async fn probe_version(&self, target: &ConnectionTarget) -> Result<i64> {
        let mut conn = self.connector.connect(target).await.map_err(|e| {
            IdMapperError::connection(&target.location, format!("could not connect to database: {e}"))
        })?;

        let outcome = conn.query_scalar(SCHEMA_VERSION_QUERY).await;
        if let Err(e) = conn.close().await {
            tracing::warn!(location = %target, error = %e, "closing schema probe connection failed");
        }

        let version = outcome.map_err(|e| {
            IdMapperError::connection(
                &target.location,
                format!("cannot determine schema, info table or schemaversion column missing: {e}"),
            )
        })?;
        Ok(version.unwrap_or(0))
    }

    /// The version a target reports and the implementation registered for it.
    pub async fn resolve(
        &self,
        target: &ConnectionTarget,
    ) -> Result<(i64, Arc<dyn SchemaConstructor>)> {
        let version = self.probe_version(target).await?;
        match self.schemas.get(&version) {
            Some(constructor) => {
                tracing::info!(location = %target, version, "detected schema version");
                Ok((version, Arc::clone(constructor)))
            }
            None => Err(IdMapperError::UnsupportedSchema { version }),
        }
    }

    /// Probe `target` and open it with the matching implementation.
    pub async fn create(&self, name: &str, target: &ConnectionTarget) -> Result<Arc<dyn IdMapper>> {
        let (_, constructor) = self.resolve(target).await?;
        constructor.open(name, target).await
    }
}

/// `idmapper-pgdb:<location>` through a [`SchemaDispatcher`].
pub struct SchemaDriver {
    dispatcher: Arc<SchemaDispatcher>,
}

impl SchemaDriver {
    pub fn new(dispatcher: Arc<SchemaDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Driver for SchemaDriver {
    async fn connect(&self, location: &str) -> Result<Arc<dyn IdMapper>> {
        let target = ConnectionTarget::parse(location);
        self.dispatcher.create(&target.location, &target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::RelationalConnection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use xrefbridge_kernel::SCHEMA_VERSION;
    use xrefbridge_store::MemoryMapper;

    /// Answers the version query from a fixed script and counts closes.
    struct Scripted {
        reachable: bool,
        answer: std::result::Result<Option<i64>, String>,
        seen: Arc<Seen>,
    }

    #[derive(Default)]
    struct Seen {
        opened: AtomicUsize,
        closed: AtomicUsize,
        credentials: std::sync::Mutex<Option<(String, String)>>,
    }

    struct ScriptedConnection {
        answer: std::result::Result<Option<i64>, String>,
        seen: Arc<Seen>,
    }

    #[async_trait]
    impl RelationalConnector for Scripted {
        async fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn RelationalConnection>> {
            if !self.reachable {
                return Err(IdMapperError::Backend("connection refused".into()));
            }
            self.seen.opened.fetch_add(1, Ordering::SeqCst);
            *self.seen.credentials.lock().unwrap() = target
                .credentials()
                .map(|(u, p)| (u.to_string(), p.to_string()));
            Ok(Box::new(ScriptedConnection {
                answer: self.answer.clone(),
                seen: Arc::clone(&self.seen),
            }))
        }
    }

    #[async_trait]
    impl RelationalConnection for ScriptedConnection {
        async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>> {
            assert_eq!(sql, SCHEMA_VERSION_QUERY);
            self.answer.clone().map_err(IdMapperError::Backend)
        }

        async fn close(&mut self) -> Result<()> {
            self.seen.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Generation(i64);

    #[async_trait]
    impl SchemaConstructor for Generation {
        async fn open(&self, name: &str, _: &ConnectionTarget) -> Result<Arc<dyn IdMapper>> {
            let mut mapper = MemoryMapper::new(name);
            mapper.set_property(SCHEMA_VERSION, &self.0.to_string());
            Ok(Arc::new(mapper))
        }
    }

    fn scripted_dispatcher(
        reachable: bool,
        answer: std::result::Result<Option<i64>, String>,
    ) -> (SchemaDispatcher, Arc<Seen>) {
        let seen = Arc::new(Seen::default());
        let connector = Scripted {
            reachable,
            answer,
            seen: Arc::clone(&seen),
        };
        let dispatcher = SchemaDispatcher::new(Arc::new(connector))
            .with_schema(2, Arc::new(Generation(2)))
            .with_schema(3, Arc::new(Generation(3)));
        (dispatcher, seen)
    }

    #[tokio::test]
    async fn known_version_selects_its_constructor() {
        let (dispatcher, seen) = scripted_dispatcher(true, Ok(Some(2)));
        let target = ConnectionTarget::new("/data/Hs.pgdb");

        let (version, _) = dispatcher.resolve(&target).await.unwrap();
        assert_eq!(version, 2);

        let mapper = dispatcher.create("Hs", &target).await.unwrap();
        assert_eq!(mapper.name(), "Hs");
        assert_eq!(mapper.capabilities().property(SCHEMA_VERSION), Some("2"));
        assert_eq!(seen.opened.load(Ordering::SeqCst), 2);
        assert_eq!(seen.closed.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.versions(), vec![2, 3]);
    }

    #[tokio::test]
    async fn unknown_version_is_unsupported() {
        let (dispatcher, seen) = scripted_dispatcher(true, Ok(Some(99)));
        let err = dispatcher
            .create("Hs", &ConnectionTarget::new("/data/Hs.pgdb"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdMapperError::UnsupportedSchema { version: 99 }));
        assert!(err.to_string().contains("'99'"));
        assert_eq!(seen.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_marker_is_version_zero() {
        let (dispatcher, _) = scripted_dispatcher(true, Ok(None));
        let Err(err) = dispatcher.resolve(&ConnectionTarget::new("/data/empty.pgdb")).await else {
            panic!("probe should fail");
        };
        assert!(matches!(err, IdMapperError::UnsupportedSchema { version: 0 }));
    }

    #[tokio::test]
    async fn failed_probe_is_a_connection_error_and_still_closes() {
        let (dispatcher, seen) = scripted_dispatcher(true, Err("no such table: info".into()));
        let Err(err) = dispatcher.resolve(&ConnectionTarget::new("/data/old.pgdb")).await else {
            panic!("probe should fail");
        };
        match err {
            IdMapperError::Connection { target, message } => {
                assert_eq!(target, "/data/old.pgdb");
                assert!(message.contains("cannot determine schema"));
            }
            other => panic!("expected connection error, got {other:?}"),
        }
        assert_eq!(seen.closed.load(Ordering::SeqCst), 1);

        let (unreachable, seen) = scripted_dispatcher(false, Ok(Some(2)));
        let Err(err) = unreachable.resolve(&ConnectionTarget::new("/data/gone.pgdb")).await else {
            panic!("probe should fail");
        };
        assert!(matches!(err, IdMapperError::Connection { .. }));
        assert_eq!(seen.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn driver_passes_credentials_through() {
        let (dispatcher, seen) = scripted_dispatcher(true, Ok(Some(3)));
        let driver = SchemaDriver::new(Arc::new(dispatcher));
        let mapper = driver
            .connect("postgres://bridge@db.example.org/hs")
            .await
            .unwrap();
        assert_eq!(mapper.name(), "postgres://db.example.org/hs");
        assert_eq!(mapper.capabilities().property(SCHEMA_VERSION), Some("3"));
        assert_eq!(
            *seen.credentials.lock().unwrap(),
            Some(("bridge".to_string(), String::new()))
        );
    }
}
