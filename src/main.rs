use identity::{app, initialize_state, telemetry};

#[tokio::main]
async fn main() {
    telemetry::setup_tracing();

    let state = match initialize_state().await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "cannot start identity service");
            std::process::exit(1);
        },
    };

    let address = format!("0.0.0.0:{}", state.config.port);
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%address, error = %err, "cannot bind listener");
            std::process::exit(1);
        },
    };

    tracing::info!(%address, version = env!("CARGO_PKG_VERSION"), "server started");

    if let Err(err) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server stopped unexpectedly");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
