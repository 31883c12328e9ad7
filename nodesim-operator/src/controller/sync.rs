use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use tracing::debug;

use crate::cluster::{ClusterApi, ClusterError};
use crate::crd::node_simulator::NodeSimulator;
use crate::templates::build_node_template;

use super::dispatch::run_bounded;
use super::observer::SyncObserver;

/// Aggregated result of one convergence pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub created: usize,
    pub patched: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl SyncOutcome {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, op: NodeOp) {
        match op {
            NodeOp::Created => self.created += 1,
            NodeOp::Patched => self.patched += 1,
            NodeOp::Noop => {}
            NodeOp::Failed => self.failed += 1,
        }
    }
}

/// Per-entry result of the create-or-patch operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeOp {
    Created,
    Patched,
    /// The entry appeared between our fetch and create (a concurrent pass).
    Noop,
    Failed,
}

/// Drive the desired node population for one simulator: build the template,
/// materialize one copy per index, and create-or-patch each copy through the
/// bounded dispatcher. Failures stay per-entry; once templating succeeded the
/// pass never aborts.
pub async fn sync_nodes<A, O>(
    api: &A,
    observer: &O,
    parallelism: usize,
    sim: &NodeSimulator,
) -> SyncOutcome
where
    A: ClusterApi + ?Sized,
    O: SyncObserver + ?Sized,
{
    let mut outcome = SyncOutcome::default();
    if sim.spec.number <= 0 {
        return outcome;
    }

    let ns = sim.namespace().unwrap_or_else(|| "default".to_string());
    let name = sim.name_any();

    let template = match build_node_template(sim) {
        Ok(t) => t,
        Err(e) => {
            observer.sync_aborted(&ns, &name, &e);
            return outcome;
        }
    };

    let nodes = template.materialize(&ns, &name, sim.spec.number as usize);
    debug!(%ns, %name, total = nodes.len(), "dispatching node sync");

    let ops =
        run_bounded(parallelism, nodes, |node| sync_one(api, observer, node))
            .await;
    for op in ops {
        outcome.record(op);
    }
    outcome
}

/// Create-or-patch one materialized node. Safe to run concurrently with the
/// operations for other names; the spec and status patches are issued
/// independently so one failing leg never blocks the other.
async fn sync_one<A, O>(api: &A, observer: &O, node: Node) -> NodeOp
where
    A: ClusterApi + ?Sized,
    O: SyncObserver + ?Sized,
{
    let name = node.metadata.name.clone().unwrap_or_default();
    match api.get_node(&name).await {
        Ok(Some(_)) => {
            let mut failed = false;
            if let Some(spec) = node.spec.as_ref() {
                if let Err(e) = api.patch_node_spec(&name, spec).await {
                    observer.node_failed(&name, &e);
                    failed = true;
                }
            }
            if let Some(status) = node.status.as_ref() {
                if let Err(e) = api.patch_node_status(&name, status).await {
                    observer.node_failed(&name, &e);
                    failed = true;
                }
            }
            if failed {
                NodeOp::Failed
            } else {
                observer.node_patched(&name);
                NodeOp::Patched
            }
        }
        Ok(None) => match api.create_node(&node).await {
            Ok(()) => {
                observer.node_created(&name);
                NodeOp::Created
            }
            Err(ClusterError::AlreadyExists(_)) => NodeOp::Noop,
            Err(e) => {
                observer.node_failed(&name, &e);
                NodeOp::Failed
            }
        },
        Err(e) => {
            observer.node_failed(&name, &e);
            NodeOp::Failed
        }
    }
}
