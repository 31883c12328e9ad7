use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct SimConfig {
    /// Upper bound on concurrently in-flight node operations per sync pass.
    /// Env: NODESIM_SYNC_PARALLELISM
    #[envconfig(from = "NODESIM_SYNC_PARALLELISM", default = "5")]
    pub sync_parallelism: usize,

    /// Requeue delay after a pass that recorded per-node failures.
    /// Env: NODESIM_RETRY_DELAY_SECS
    #[envconfig(from = "NODESIM_RETRY_DELAY_SECS", default = "5")]
    pub retry_delay_secs: u64,
}
