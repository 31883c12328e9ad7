use k8s_openapi::api::core::v1::Node;
use tracing::{debug, instrument, warn};

use crate::cluster::{ClusterApi, NodeSelector, node_name};
use crate::crd::node_simulator::NodeSimulator;

use super::ReconcileErr;
use super::observer::SyncObserver;
use super::sync::{SyncOutcome, sync_nodes};

/// Finalizer guarding simulator deletion until managed nodes are cleaned up.
pub const FINALIZER: &str = "sim.k8s.io/node-cleanup";

/// What a single convergence pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// The simulator no longer exists; nothing to do.
    Gone,
    /// The simulator is terminating: observed nodes were deleted best-effort
    /// and the finalizer released.
    Cleaned(SyncOutcome),
    /// Normal convergence: scale-down deletes plus the sync fan-out.
    Applied(SyncOutcome),
}

/// One convergence pass for one simulator. Fetch and list errors are
/// retryable and abort the pass; every per-node operation stays best-effort
/// and shows up in the outcome counts instead.
#[instrument(skip_all, fields(ns = %ns, name = %name))]
pub async fn reconcile_sim<A, O>(
    api: &A,
    observer: &O,
    parallelism: usize,
    ns: &str,
    name: &str,
) -> Result<PassOutcome, ReconcileErr>
where
    A: ClusterApi + ?Sized,
    O: SyncObserver + ?Sized,
{
    let Some(mut sim) = api.get_sim(ns, name).await? else {
        debug!(%ns, %name, "simulator not found; pass is a no-op");
        return Ok(PassOutcome::Gone);
    };

    let selector = NodeSelector::owned_by(ns, name);
    let observed = api.list_nodes(&selector).await?;

    if !has_finalizer(&sim) {
        let mut finalizers =
            sim.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(FINALIZER.to_string());
        match api.set_sim_finalizers(ns, name, finalizers).await {
            Ok(()) => observer.finalizer_added(ns, name),
            Err(e) => {
                warn!(%ns, %name, error = %e, "failed to add finalizer; continuing")
            }
        }
        // Refresh so the rest of the pass sees the persisted state; keep the
        // stale copy when the refresh fails.
        match api.get_sim(ns, name).await {
            Ok(Some(fresh)) => sim = fresh,
            Ok(None) => {}
            Err(e) => {
                warn!(%ns, %name, error = %e, "failed to refresh simulator after finalizer update")
            }
        }
    }

    if sim.metadata.deletion_timestamp.is_some() {
        let outcome = cleanup(api, observer, ns, name, &sim, &observed).await;
        return Ok(PassOutcome::Cleaned(outcome));
    }

    let desired = sim.spec.number.max(0) as usize;
    let mut outcome = SyncOutcome::default();

    // Scale-down runs before the sync fan-out and addresses nodes by their
    // deterministic name rather than by walking the observed list.
    if observed.len() > desired {
        for index in desired..observed.len() {
            let node = node_name(ns, name, index);
            match api.delete_node(&node).await {
                Ok(true) => {
                    observer.node_deleted(&node);
                    outcome.deleted += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    observer.node_failed(&node, &e);
                    outcome.failed += 1;
                }
            }
        }
    }

    let synced = sync_nodes(api, observer, parallelism, &sim).await;
    outcome.created += synced.created;
    outcome.patched += synced.patched;
    outcome.failed += synced.failed;

    Ok(PassOutcome::Applied(outcome))
}

/// Terminal branch for a terminating simulator: best-effort delete of every
/// observed node, then release the finalizer regardless of individual delete
/// outcomes so a stuck node can never block resource removal.
async fn cleanup<A, O>(
    api: &A,
    observer: &O,
    ns: &str,
    name: &str,
    sim: &NodeSimulator,
    observed: &[Node],
) -> SyncOutcome
where
    A: ClusterApi + ?Sized,
    O: SyncObserver + ?Sized,
{
    let mut outcome = SyncOutcome::default();
    for node in observed {
        let Some(node_name) = node.metadata.name.as_deref() else {
            continue;
        };
        match api.delete_node(node_name).await {
            Ok(true) => {
                observer.node_deleted(node_name);
                outcome.deleted += 1;
            }
            Ok(false) => {}
            Err(e) => {
                observer.node_failed(node_name, &e);
                outcome.failed += 1;
            }
        }
    }

    let finalizers: Vec<String> = sim
        .metadata
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != FINALIZER)
        .collect();
    match api.set_sim_finalizers(ns, name, finalizers).await {
        Ok(()) => observer.finalizer_cleared(ns, name),
        Err(e) => {
            warn!(%ns, %name, error = %e, "failed to clear finalizer; a later pass will retry")
        }
    }
    outcome
}

fn has_finalizer(sim: &NodeSimulator) -> bool {
    sim.metadata
        .finalizers
        .as_ref()
        .map(|f| f.iter().any(|x| x == FINALIZER))
        .unwrap_or(false)
}
