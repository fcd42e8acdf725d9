//! In-memory repository
//!
//! Holds persisted-shaped records for any number of networks. Used by tests,
//! benches and the CLI in place of a relational store.

use super::{GraphRepository, RepositoryError, RepositoryResult};
use crate::duplicates::{plan_merge, MergePlan};
use crate::graph::{EdgeRecord, GraphSchema, NetworkId, VertexId, VertexRecord};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Everything persisted for one network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkData {
    /// Schemas keyed by locale; the first one answers unknown locales
    #[serde(default)]
    pub schemas: IndexMap<String, GraphSchema>,
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    networks: RwLock<HashMap<NetworkId, NetworkData>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<NetworkId, NetworkData>>> {
        self.networks
            .read()
            .map_err(|_| RepositoryError::Other(anyhow::anyhow!("repository lock poisoned")))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<NetworkId, NetworkData>>> {
        self.networks
            .write()
            .map_err(|_| RepositoryError::Other(anyhow::anyhow!("repository lock poisoned")))
    }

    fn with_network<T>(&self, network: NetworkId, f: impl FnOnce(&NetworkData) -> T) -> RepositoryResult<T> {
        let networks = self.read()?;
        let data = networks
            .get(&network)
            .ok_or(RepositoryError::NetworkNotFound(network))?;
        Ok(f(data))
    }

    fn with_network_mut<T>(&self, network: NetworkId, f: impl FnOnce(&mut NetworkData) -> T) -> RepositoryResult<T> {
        let mut networks = self.write()?;
        Ok(f(networks.entry(network).or_default()))
    }

    /// Replace everything stored for a network
    pub fn insert_network(&self, network: NetworkId, data: NetworkData) -> RepositoryResult<()> {
        self.write()?.insert(network, data);
        Ok(())
    }

    pub fn set_schema(&self, network: NetworkId, locale: &str, schema: GraphSchema) -> RepositoryResult<()> {
        self.with_network_mut(network, |data| {
            data.schemas.insert(locale.to_string(), schema);
        })
    }

    /// Insert or replace a vertex record
    pub fn put_vertex(&self, network: NetworkId, record: VertexRecord) -> RepositoryResult<()> {
        self.with_network_mut(network, |data| {
            match data.vertices.iter_mut().find(|v| v.id == record.id) {
                Some(existing) => *existing = record,
                None => data.vertices.push(record),
            }
        })
    }

    /// Remove a vertex record and every edge record touching it
    pub fn remove_vertex(&self, network: NetworkId, id: VertexId) -> RepositoryResult<()> {
        self.with_network_mut(network, |data| {
            data.vertices.retain(|v| v.id != id);
            data.edges.retain(|e| e.source != id && e.target != id);
        })
    }

    /// Insert or replace the edge record for (source, target, uri)
    pub fn put_edge(&self, network: NetworkId, record: EdgeRecord) -> RepositoryResult<()> {
        self.with_network_mut(network, |data| {
            let existing = data
                .edges
                .iter_mut()
                .find(|e| e.source == record.source && e.target == record.target && e.uri == record.uri);
            match existing {
                Some(existing) => *existing = record,
                None => data.edges.push(record),
            }
        })
    }

    pub fn remove_edge(&self, network: NetworkId, source: VertexId, target: VertexId, uri: &str) -> RepositoryResult<()> {
        self.with_network_mut(network, |data| {
            data.edges
                .retain(|e| !(e.source == source && e.target == target && e.uri == uri));
        })
    }

    /// Fold `duplicate` into `vertex`: move its edges over, then delete it.
    ///
    /// Cached graphs of the network are stale afterwards; callers publish
    /// [`GraphEvent::NetworkCacheCleared`](crate::graph::GraphEvent).
    pub fn merge_duplicate(&self, network: NetworkId, vertex: VertexId, duplicate: VertexId) -> RepositoryResult<MergePlan> {
        if vertex == duplicate {
            return Err(RepositoryError::Other(anyhow::anyhow!("cannot merge vertex {} into itself", vertex)));
        }
        let mut networks = self.write()?;
        let data = networks
            .get_mut(&network)
            .ok_or(RepositoryError::NetworkNotFound(network))?;
        for id in [vertex, duplicate] {
            if !data.vertices.iter().any(|v| v.id == id) {
                return Err(RepositoryError::VertexNotFound(id));
            }
        }

        let plan = plan_merge(vertex, duplicate, &data.edges);
        data.edges.retain(|e| e.source != duplicate && e.target != duplicate);
        data.edges.extend(plan.relinked.iter().cloned());
        data.vertices.retain(|v| v.id != duplicate);
        info!(
            "Merged vertex {} into {}: {} edges relinked, {} dropped",
            duplicate,
            vertex,
            plan.relinked.len(),
            plan.dropped.len()
        );
        Ok(plan)
    }
}

#[async_trait]
impl GraphRepository for InMemoryRepository {
    async fn schema(&self, network: NetworkId, locale: &str) -> RepositoryResult<GraphSchema> {
        self.with_network(network, |data| {
            data.schemas
                .get(locale)
                .or_else(|| data.schemas.values().next())
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn vertices(&self, network: NetworkId) -> RepositoryResult<Vec<VertexRecord>> {
        self.with_network(network, |data| data.vertices.clone())
    }

    async fn vertex(&self, network: NetworkId, id: VertexId) -> RepositoryResult<Option<VertexRecord>> {
        self.with_network(network, |data| data.vertices.iter().find(|v| v.id == id).cloned())
    }

    async fn edges(&self, network: NetworkId) -> RepositoryResult<Vec<EdgeRecord>> {
        self.with_network(network, |data| data.edges.clone())
    }

    async fn edges_between(
        &self,
        network: NetworkId,
        source: VertexId,
        target: VertexId,
        uri: &str,
    ) -> RepositoryResult<Vec<EdgeRecord>> {
        self.with_network(network, |data| {
            data.edges
                .iter()
                .filter(|e| e.source == source && e.target == target && e.uri == uri)
                .cloned()
                .collect()
        })
    }

    async fn network_of_vertex(&self, id: VertexId) -> RepositoryResult<Option<NetworkId>> {
        let networks = self.read()?;
        Ok(networks
            .iter()
            .find(|(_, data)| data.vertices.iter().any(|v| v.id == id))
            .map(|(network, _)| *network))
    }
}
