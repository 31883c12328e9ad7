use tracing::{info, warn};

use crate::cluster::ClusterError;
use crate::templates::TemplateError;

/// Decision-point events emitted by a reconcile pass. Implementations must be
/// cheap and non-blocking; control flow never depends on them.
pub trait SyncObserver: Send + Sync {
    fn finalizer_added(&self, _ns: &str, _name: &str) {}
    fn finalizer_cleared(&self, _ns: &str, _name: &str) {}
    fn node_created(&self, _node: &str) {}
    fn node_patched(&self, _node: &str) {}
    fn node_deleted(&self, _node: &str) {}
    fn node_failed(&self, _node: &str, _err: &ClusterError) {}
    fn sync_aborted(&self, _ns: &str, _name: &str, _err: &TemplateError) {}
}

/// Default observer: structured tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn finalizer_added(&self, ns: &str, name: &str) {
        info!(%ns, %name, "finalizer added");
    }

    fn finalizer_cleared(&self, ns: &str, name: &str) {
        info!(%ns, %name, "finalizer cleared");
    }

    fn node_created(&self, node: &str) {
        info!(%node, "node created");
    }

    fn node_patched(&self, node: &str) {
        info!(%node, "node patched");
    }

    fn node_deleted(&self, node: &str) {
        info!(%node, "node deleted");
    }

    fn node_failed(&self, node: &str, err: &ClusterError) {
        warn!(%node, error = %err, "node operation failed");
    }

    fn sync_aborted(&self, ns: &str, name: &str, err: &TemplateError) {
        warn!(%ns, %name, error = %err, "sync aborted: template build failed");
    }
}
