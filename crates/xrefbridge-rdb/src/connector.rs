//! The seam to concrete SQL drivers.

use crate::target::ConnectionTarget;
use async_trait::async_trait;
use xrefbridge_kernel::Result;

/// Opens connections to one kind of relational database.
#[async_trait]
pub trait RelationalConnector: Send + Sync {
    async fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn RelationalConnection>>;
}

/// A live connection. Used only for short probes by the dispatcher.
#[async_trait]
pub trait RelationalConnection: Send {
    /// First column of the first row as an integer, or `None` when the query
    /// yields no rows.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>>;

    async fn close(&mut self) -> Result<()>;
}
