use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Port for the liveness/readiness HTTP surface.
    /// Env: SHOAL_HTTP_PORT
    #[envconfig(from = "SHOAL_HTTP_PORT", default = "8080")]
    pub http_port: u16,

    /// Image for the reef cluster daemons when the StorageCluster spec
    /// does not pin one.
    /// Env: SHOAL_BACKEND_IMAGE
    #[envconfig(
        from = "SHOAL_BACKEND_IMAGE",
        default = "quay.io/shoal/reef:v18.2.0"
    )]
    pub backend_image: String,

    /// Image for the object gateway when the StorageCluster spec does not
    /// pin one.
    /// Env: SHOAL_GATEWAY_IMAGE
    #[envconfig(
        from = "SHOAL_GATEWAY_IMAGE",
        default = "quay.io/shoal/tern-core:v5.15.0"
    )]
    pub gateway_image: String,

    /// Directory scanned for quickstart YAML manifests.
    /// Env: SHOAL_QUICKSTART_DIR
    #[envconfig(
        from = "SHOAL_QUICKSTART_DIR",
        default = "/opt/shoal/quickstarts"
    )]
    pub quickstart_dir: String,

    /// Marker file backing the /readyz probe.
    /// Env: SHOAL_READY_FILE
    #[envconfig(from = "SHOAL_READY_FILE", default = "/tmp/shoal-operator-ready")]
    pub ready_file: String,

    /// Steady-state requeue interval in seconds.
    /// Env: SHOAL_REQUEUE_INTERVAL_SECS
    #[envconfig(from = "SHOAL_REQUEUE_INTERVAL_SECS", default = "30")]
    pub requeue_interval_secs: u64,
}
