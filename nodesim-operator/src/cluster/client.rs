use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeSpec, NodeStatus};
use kube::Client;
use kube::api::{
    Api, DeleteParams, ListParams, Patch, PatchParams, PostParams,
};
use serde_json::json;

use super::{ClusterApi, ClusterError, NodeSelector};
use crate::crd::node_simulator::NodeSimulator;

/// `ClusterApi` backed by a kube client. Simulator resources are namespaced;
/// the simulated Node objects themselves are cluster-scoped.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn sims(&self, ns: &str) -> Api<NodeSimulator> {
        Api::namespaced(self.client.clone(), ns)
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get_sim(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<NodeSimulator>, ClusterError> {
        self.sims(ns).get_opt(name).await.map_err(map_err)
    }

    async fn set_sim_finalizers(
        &self,
        ns: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ClusterError> {
        let patch = json!({"metadata": {"finalizers": finalizers}});
        self.sims(ns)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn list_nodes(
        &self,
        selector: &NodeSelector,
    ) -> Result<Vec<Node>, ClusterError> {
        let lp = ListParams::default().labels(&selector.to_label_selector());
        self.nodes()
            .list(&lp)
            .await
            .map(|list| list.items)
            .map_err(map_err)
    }

    async fn get_node(
        &self,
        name: &str,
    ) -> Result<Option<Node>, ClusterError> {
        self.nodes().get_opt(name).await.map_err(map_err)
    }

    async fn create_node(&self, node: &Node) -> Result<(), ClusterError> {
        self.nodes()
            .create(&PostParams::default(), node)
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn patch_node_spec(
        &self,
        name: &str,
        spec: &NodeSpec,
    ) -> Result<(), ClusterError> {
        let patch = json!({"spec": spec});
        self.nodes()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn patch_node_status(
        &self,
        name: &str,
        status: &NodeStatus,
    ) -> Result<(), ClusterError> {
        let patch = json!({"status": status});
        self.nodes()
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(map_err)
    }

    async fn delete_node(&self, name: &str) -> Result<bool, ClusterError> {
        match self.nodes().delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(map_err(e)),
        }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

fn map_err(err: kube::Error) -> ClusterError {
    match &err {
        kube::Error::Api(ae) if ae.code == 409 => {
            ClusterError::AlreadyExists(ae.message.clone())
        }
        _ => ClusterError::Api(err.to_string()),
    }
}
