use hyper::Server;
use hyper::service::{make_service_fn, service_fn as hyper_service_fn};
use image_compressor_service::config::AppConfig;
use image_compressor_service::handlers::ImageHandler;
use lambda_runtime::service_fn;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AppConfig::from_env();
    let on_lambda = config.is_running_on_lambda();

    // CloudWatch gets one JSON object per line.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_compressor_service=info".into()),
        )
        .with(on_lambda.then(|| fmt::layer().json()))
        .with((!on_lambda).then(fmt::layer))
        .init();

    let handler = Arc::new(ImageHandler::new(&config));

    if on_lambda {
        tracing::info!("starting Lambda function");

        lambda_runtime::run(service_fn(move |event| {
            let handler = Arc::clone(&handler);
            async move { handler.handle_lambda_event(event).await }
        }))
        .await?;
    } else {
        let addr = config.server_address().parse()?;
        let request_timeout = Duration::from_secs(config.server.timeout_seconds);

        tracing::info!(
            %addr,
            max_image_size = config.compression.max_image_size,
            max_files = config.compression.max_files,
            default_quality = config.compression.default_quality,
            max_width = config.compression.max_width,
            max_height = config.compression.max_height,
            "starting local server"
        );

        let make_svc = make_service_fn(move |_conn| {
            let handler = Arc::clone(&handler);
            async move {
                Ok::<_, Infallible>(hyper_service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move {
                        match tokio::time::timeout(request_timeout, handler.handle_http_request(req))
                            .await
                        {
                            Ok(response) => response,
                            Err(_) => Ok(handler.timeout_response()),
                        }
                    }
                }))
            }
        });

        let server = Server::bind(&addr)
            .serve(make_svc)
            .with_graceful_shutdown(shutdown_signal());

        if let Err(e) = server.await {
            tracing::error!(error = %e, "server error");
        }
        tracing::info!("server stopped");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
