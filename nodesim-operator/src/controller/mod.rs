pub mod dispatch;
pub mod events;
pub mod observer;
pub mod reconcile;
pub mod sync;

pub use observer::{SyncObserver, TracingObserver};
pub use reconcile::{FINALIZER, PassOutcome, reconcile_sim};
pub use sync::SyncOutcome;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Recorder, Reporter};
use kube::runtime::{Controller, controller::Action, watcher};
use kube::{Api, Client, Resource, ResourceExt};
use tokio::time::Duration;
use tracing::{error, info};

use crate::cluster::{ClusterError, KubeClusterApi};
use crate::config::SimConfig;
use crate::crd::node_simulator::NodeSimulator;
use events::{REASON_SYNCED, emit_event};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("cluster api error: {0}")]
    Api(#[from] ClusterError),
}

#[derive(Clone)]
pub struct ControllerContext {
    pub api: KubeClusterApi,
    pub cfg: SimConfig,
    pub recorder: Recorder,
}

/// Watch all NodeSimulator resources and keep their node populations
/// converged. Runs until the watch stream ends.
pub async fn run_controller(
    client: Client,
    cfg: SimConfig,
) -> anyhow::Result<()> {
    let sims: Api<NodeSimulator> = Api::all(client.clone());
    let reporter = Reporter {
        controller: "nodesim-operator".into(),
        instance: None,
    };
    let ctx = Arc::new(ControllerContext {
        api: KubeClusterApi::new(client.clone()),
        cfg,
        recorder: Recorder::new(client, reporter),
    });

    Controller::new(sims, watcher::Config::default())
        .run(reconcile_kube, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    info!("reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

/// Kube-facing wrapper: extract the object reference, run the pass against
/// the injected cluster surface, and map the outcome report onto the
/// controller's scheduling decision.
async fn reconcile_kube(
    obj: Arc<NodeSimulator>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();

    let pass = reconcile_sim(
        &ctx.api,
        &TracingObserver,
        ctx.cfg.sync_parallelism,
        &ns,
        &name,
    )
    .await?;

    match pass {
        PassOutcome::Gone | PassOutcome::Cleaned(_) => {
            Ok(Action::await_change())
        }
        PassOutcome::Applied(outcome) => {
            emit_event(
                &ctx.recorder,
                &ns,
                &name,
                obj.meta().uid.as_deref(),
                REASON_SYNCED,
                "Sync",
                Some(format!(
                    "created={} patched={} deleted={} failed={}",
                    outcome.created,
                    outcome.patched,
                    outcome.deleted,
                    outcome.failed
                )),
            )
            .await;
            if outcome.has_failures() {
                // Bounded internal retry instead of waiting for an external
                // change to re-trigger the pass.
                Ok(Action::requeue(Duration::from_secs(
                    ctx.cfg.retry_delay_secs,
                )))
            } else {
                Ok(Action::await_change())
            }
        }
    }
}

fn error_policy(
    _obj: Arc<NodeSimulator>,
    _error: &ReconcileErr,
    _ctx: Arc<ControllerContext>,
) -> Action {
    Action::requeue(Duration::from_secs(30))
}

pub(crate) fn build_obj_ref(
    ns: &str,
    name: &str,
    uid: Option<&str>,
) -> ObjectReference {
    ObjectReference {
        api_version: Some("sim.k8s.io/v1".into()),
        kind: Some("NodeSimulator".into()),
        namespace: Some(ns.into()),
        name: Some(name.into()),
        uid: uid.map(Into::into),
        ..Default::default()
    }
}
