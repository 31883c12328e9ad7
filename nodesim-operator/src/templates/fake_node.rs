use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::api::core::v1::{
    Node, NodeCondition, NodeStatus, NodeSystemInfo,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::cluster::{NodeSelector, node_name};
use crate::crd::node_simulator::NodeSimulator;

pub const HOSTNAME_LABEL_KEY: &str = "kubernetes.io/hostname";

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("invalid {field} capacity {value:?}: expected an integer count")]
    InvalidCount { field: &'static str, value: String },
}

/// One fully rendered node value. Immutable once built; per-index instances
/// come out of [`NodeTemplate::materialize`].
#[derive(Clone, Debug)]
pub struct NodeTemplate {
    node: Node,
}

/// Render the template node for one simulator. Capacity counts are validated
/// here so a bad spec aborts the pass before any store writes happen.
pub fn build_node_template(
    sim: &NodeSimulator,
) -> Result<NodeTemplate, TemplateError> {
    let ns = sim.namespace().unwrap_or_else(|| "default".to_string());
    let name = sim.name_any();
    let spec = &sim.spec;

    let pods: i64 =
        spec.pods.parse().map_err(|_| TemplateError::InvalidCount {
            field: "pods",
            value: spec.pods.clone(),
        })?;

    let mut capacity = BTreeMap::from([
        ("cpu".to_string(), Quantity(spec.cpu.clone())),
        ("memory".to_string(), Quantity(spec.memory.clone())),
        ("pods".to_string(), Quantity(pods.to_string())),
    ]);
    if let Some(gpu) = spec.gpu.as_deref() {
        let count: i64 = gpu.parse().map_err(|_| TemplateError::InvalidCount {
            field: "gpu",
            value: gpu.to_string(),
        })?;
        capacity
            .insert("nvidia.com/gpu".to_string(), Quantity(count.to_string()));
    }

    let mut labels = NodeSelector::owned_by(&ns, &name).labels();
    if let Some(extra) = spec.node_labels.as_ref() {
        labels.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let now = Time(Utc::now());
    let conditions = vec![
        condition("Ready", "True", "KubeletReady", &now),
        condition("MemoryPressure", "False", "KubeletHasSufficientMemory", &now),
        condition("DiskPressure", "False", "KubeletHasNoDiskPressure", &now),
        condition("PIDPressure", "False", "KubeletHasSufficientPID", &now),
    ];

    let node = Node {
        metadata: ObjectMeta {
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(Default::default()),
        status: Some(NodeStatus {
            allocatable: Some(capacity.clone()),
            capacity: Some(capacity),
            conditions: Some(conditions),
            node_info: Some(NodeSystemInfo {
                architecture: "amd64".to_string(),
                operating_system: "linux".to_string(),
                os_image: "nodesim".to_string(),
                kubelet_version: spec.kubelet_version.clone(),
                kube_proxy_version: spec.kubelet_version.clone(),
                container_runtime_version: "sim://0.1.0".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
    };

    Ok(NodeTemplate { node })
}

fn condition(
    type_: &str,
    status: &str,
    reason: &str,
    at: &Time,
) -> NodeCondition {
    NodeCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        last_heartbeat_time: Some(at.clone()),
        last_transition_time: Some(at.clone()),
        ..Default::default()
    }
}

impl NodeTemplate {
    /// Stamp out `count` independently owned copies, one per index. Each copy
    /// gets the deterministic node name and its own hostname label; mutating
    /// one copy never bleeds into another.
    pub fn materialize(&self, ns: &str, name: &str, count: usize) -> Vec<Node> {
        (0..count)
            .map(|index| {
                let mut node = self.node.clone();
                let instance = node_name(ns, name, index);
                if let Some(labels) = node.metadata.labels.as_mut() {
                    labels.insert(
                        HOSTNAME_LABEL_KEY.to_string(),
                        instance.clone(),
                    );
                }
                node.metadata.name = Some(instance);
                node
            })
            .collect()
    }
}
