use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declarative population of simulated nodes. The controller keeps `number`
/// fake Node objects registered against the cluster, each shaped by the
/// capacity fields below.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "sim.k8s.io",
    version = "v1",
    kind = "NodeSimulator",
    plural = "nodesimulators",
    namespaced
)]
pub struct NodeSimulatorSpec {
    /// Target number of simulated nodes; values <= 0 mean none.
    pub number: i32,
    /// CPU capacity advertised by each simulated node (quantity string).
    #[serde(default = "default_cpu")]
    pub cpu: String,
    /// Memory capacity advertised by each simulated node.
    #[serde(default = "default_memory")]
    pub memory: String,
    /// Pod capacity advertised by each simulated node; must be an integer count.
    #[serde(default = "default_pods")]
    pub pods: String,
    /// Optional GPU count advertised as nvidia.com/gpu capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
    /// Kubelet version reported in the simulated nodeInfo.
    #[serde(default = "default_kubelet_version")]
    pub kubelet_version: String,
    /// Extra labels stamped onto every simulated node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_labels: Option<BTreeMap<String, String>>,
}

// --- Defaults helpers ---
fn default_cpu() -> String {
    "8".to_string()
}

fn default_memory() -> String {
    "32Gi".to_string()
}

fn default_pods() -> String {
    "110".to_string()
}

fn default_kubelet_version() -> String {
    "v1.29.0".to_string()
}
