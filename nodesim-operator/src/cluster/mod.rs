pub mod client;
pub mod selector;

pub use client::KubeClusterApi;
pub use selector::{NodeSelector, node_name};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeSpec, NodeStatus};

use crate::crd::node_simulator::NodeSimulator;

/// Errors surfaced by the cluster API surface. "Not found" outcomes are
/// encoded in return values rather than here; AlreadyExists keeps its own
/// variant because callers treat it as benign.
#[derive(thiserror::Error, Debug)]
pub enum ClusterError {
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("cluster api error: {0}")]
    Api(String),
}

/// Typed surface over the orchestration store. Injected into the reconciler
/// so a pass can run against a real cluster or an in-memory fake.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_sim(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<NodeSimulator>, ClusterError>;

    /// Replace the finalizer list on a simulator resource.
    async fn set_sim_finalizers(
        &self,
        ns: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ClusterError>;

    async fn list_nodes(
        &self,
        selector: &NodeSelector,
    ) -> Result<Vec<Node>, ClusterError>;

    async fn get_node(&self, name: &str)
    -> Result<Option<Node>, ClusterError>;

    async fn create_node(&self, node: &Node) -> Result<(), ClusterError>;

    /// Partial replace of the node spec subtree.
    async fn patch_node_spec(
        &self,
        name: &str,
        spec: &NodeSpec,
    ) -> Result<(), ClusterError>;

    /// Partial replace of the node status sub-resource.
    async fn patch_node_status(
        &self,
        name: &str,
        status: &NodeStatus,
    ) -> Result<(), ClusterError>;

    /// Returns Ok(false) when the node was already gone.
    async fn delete_node(&self, name: &str) -> Result<bool, ClusterError>;
}
