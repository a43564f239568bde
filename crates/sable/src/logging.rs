pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter("trace,wgpu_core=info,naga=info,wgpu_hal=info")
        .init();
}
