//! Cluster capability probe
//!
//! Two small queries against cluster topology. The node count clamps the
//! `wait_for_active_shards` parameter on write operations so a migration
//! cannot wait forever for acknowledgements the cluster can never deliver;
//! the shard count is exposed for collaborators sizing batch work.

use serde_json::Value;

use crate::error::MigrationError;
use crate::operation::{Method, Operation};
use crate::transport::{Transport, TransportError};

pub struct ClusterProbe<'a, T: Transport> {
    transport: &'a T,
}

impl<'a, T: Transport> ClusterProbe<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Total number of nodes in the cluster, from `GET /_nodes`
    pub async fn node_count(&self) -> Result<u64, MigrationError> {
        let response = self
            .transport
            .execute(&Operation::new(Method::Get, "/_nodes"))
            .await?;
        let value: Value = response.json()?;
        value
            .pointer("/_nodes/total")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                TransportError::InvalidResponse(
                    "missing _nodes.total in nodes response".to_string(),
                )
                .into()
            })
    }

    /// Configured shard count of a named index, from its settings
    pub async fn shard_count(&self, index: &str) -> Result<u64, MigrationError> {
        let response = self
            .transport
            .execute(&Operation::new(Method::Get, format!("/{}/_settings", index)))
            .await?;
        let value: Value = response.json()?;
        value
            .pointer(&format!("/{}/settings/index/number_of_shards", index))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                TransportError::InvalidResponse(format!(
                    "missing number_of_shards in settings for '{}'",
                    index
                ))
                .into()
            })
    }
}
