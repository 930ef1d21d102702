/// HTTP server for the dashboard
/// Serves the JSON API and the embedded browser client

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub mod static_files;

#[cfg(feature = "server")]
pub use routes::create_router;

#[cfg(feature = "server")]
pub async fn run(app: std::sync::Arc<crate::App>, host: &str, port: u16, enable_cors: bool) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::net::SocketAddr;

    let router = create_router(app, enable_cors);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    println!("🏠 homewatch {}", env!("CARGO_PKG_VERSION"));
    println!("   📍 Dashboard: http://{}", addr);
    println!("   🔌 API:       http://{}/api", addr);
    println!();
    println!("📚 API Endpoints:");
    println!("   GET  /api/health - Probe all services and return status with sparklines");
    println!("   GET  /api/stats  - Host stats: containers, volumes, CPU, RAM");
    println!("   GET  /api/ping   - Liveness check");
    println!();

    tracing::info!(%addr, cors = enable_cors, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

#[cfg(feature = "server")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
