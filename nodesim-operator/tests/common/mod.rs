#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Node, NodeSpec, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use nodesim_operator::cluster::{ClusterApi, ClusterError, NodeSelector};
use nodesim_operator::crd::node_simulator::{NodeSimulator, NodeSimulatorSpec};

pub fn new_sim(ns: &str, name: &str, number: i32) -> NodeSimulator {
    let mut sim = NodeSimulator::new(
        name,
        NodeSimulatorSpec {
            number,
            cpu: "4".into(),
            memory: "8Gi".into(),
            pods: "64".into(),
            gpu: None,
            kubelet_version: "v1.29.0".into(),
            node_labels: None,
        },
    );
    sim.metadata.namespace = Some(ns.to_string());
    sim
}

fn sim_key(ns: &str, name: &str) -> String {
    format!("{}/{}", ns, name)
}

#[derive(Default)]
struct State {
    sims: HashMap<String, NodeSimulator>,
    nodes: BTreeMap<String, Node>,
    create_calls: usize,
    patch_spec_calls: usize,
    patch_status_calls: usize,
    delete_calls: Vec<String>,
}

/// In-memory stand-in for the orchestration store. Tracks call counts and the
/// dispatcher's concurrency high-water mark, and can inject failures per
/// operation or per node name.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    /// Artificial latency per node operation; makes concurrency observable.
    op_delay: Option<Duration>,
    pub fail_next_list: AtomicBool,
    pub fail_deletes: Mutex<HashSet<String>>,
    pub fail_creates: Mutex<HashSet<String>>,
}

impl FakeCluster {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            op_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn put_sim(&self, sim: NodeSimulator) {
        let ns = sim
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| "default".into());
        let name = sim.metadata.name.clone().unwrap_or_default();
        self.state
            .lock()
            .unwrap()
            .sims
            .insert(sim_key(&ns, &name), sim);
    }

    pub fn stored_sim(&self, ns: &str, name: &str) -> Option<NodeSimulator> {
        self.state
            .lock()
            .unwrap()
            .sims
            .get(&sim_key(ns, name))
            .cloned()
    }

    pub fn set_number(&self, ns: &str, name: &str, number: i32) {
        if let Some(sim) =
            self.state.lock().unwrap().sims.get_mut(&sim_key(ns, name))
        {
            sim.spec.number = number;
        }
    }

    pub fn mark_deleting(&self, ns: &str, name: &str) {
        if let Some(sim) =
            self.state.lock().unwrap().sims.get_mut(&sim_key(ns, name))
        {
            sim.metadata.deletion_timestamp = Some(Time(Utc::now()));
        }
    }

    pub fn node_names(&self) -> Vec<String> {
        self.state.lock().unwrap().nodes.keys().cloned().collect()
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        self.state.lock().unwrap().nodes.get(name).cloned()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn patch_spec_calls(&self) -> usize {
        self.state.lock().unwrap().patch_spec_calls
    }

    pub fn patch_status_calls(&self) -> usize {
        self.state.lock().unwrap().patch_status_calls
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> OpGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.op_delay {
            tokio::time::sleep(delay).await;
        }
        OpGuard {
            active: &self.active,
        }
    }
}

struct OpGuard<'a> {
    active: &'a AtomicUsize,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_sim(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<NodeSimulator>, ClusterError> {
        Ok(self.stored_sim(ns, name))
    }

    async fn set_sim_finalizers(
        &self,
        ns: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ClusterError> {
        let mut state = self.state.lock().unwrap();
        match state.sims.get_mut(&sim_key(ns, name)) {
            Some(sim) => {
                sim.metadata.finalizers = if finalizers.is_empty() {
                    None
                } else {
                    Some(finalizers)
                };
                Ok(())
            }
            None => Err(ClusterError::Api(format!(
                "simulator {}/{} not found",
                ns, name
            ))),
        }
    }

    async fn list_nodes(
        &self,
        selector: &NodeSelector,
    ) -> Result<Vec<Node>, ClusterError> {
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(ClusterError::Api("injected list failure".into()));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .nodes
            .values()
            .filter(|n| selector.matches(n.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn get_node(
        &self,
        name: &str,
    ) -> Result<Option<Node>, ClusterError> {
        let _op = self.enter().await;
        Ok(self.state.lock().unwrap().nodes.get(name).cloned())
    }

    async fn create_node(&self, node: &Node) -> Result<(), ClusterError> {
        let _op = self.enter().await;
        let name = node.metadata.name.clone().unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            state.create_calls += 1;
        }
        if self.fail_creates.lock().unwrap().contains(&name) {
            return Err(ClusterError::Api(format!(
                "injected create failure for {}",
                name
            )));
        }
        let mut state = self.state.lock().unwrap();
        if state.nodes.contains_key(&name) {
            return Err(ClusterError::AlreadyExists(name));
        }
        state.nodes.insert(name, node.clone());
        Ok(())
    }

    async fn patch_node_spec(
        &self,
        name: &str,
        spec: &NodeSpec,
    ) -> Result<(), ClusterError> {
        let _op = self.enter().await;
        let mut state = self.state.lock().unwrap();
        state.patch_spec_calls += 1;
        match state.nodes.get_mut(name) {
            Some(node) => {
                node.spec = Some(spec.clone());
                Ok(())
            }
            None => {
                Err(ClusterError::Api(format!("node {} not found", name)))
            }
        }
    }

    async fn patch_node_status(
        &self,
        name: &str,
        status: &NodeStatus,
    ) -> Result<(), ClusterError> {
        let _op = self.enter().await;
        let mut state = self.state.lock().unwrap();
        state.patch_status_calls += 1;
        match state.nodes.get_mut(name) {
            Some(node) => {
                node.status = Some(status.clone());
                Ok(())
            }
            None => {
                Err(ClusterError::Api(format!("node {} not found", name)))
            }
        }
    }

    async fn delete_node(&self, name: &str) -> Result<bool, ClusterError> {
        let _op = self.enter().await;
        self.state
            .lock()
            .unwrap()
            .delete_calls
            .push(name.to_string());
        if self.fail_deletes.lock().unwrap().contains(name) {
            return Err(ClusterError::Api(format!(
                "injected delete failure for {}",
                name
            )));
        }
        Ok(self.state.lock().unwrap().nodes.remove(name).is_some())
    }
}
