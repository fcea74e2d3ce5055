use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use st_racing_server::{
    config::Config,
    delivery::DeliveryTable,
    events::EventSender,
    handlers::{router, AppState},
    notifications::{OrderNotifier, SmtpNotificationTransport},
    service::OrderService,
    stripe_integration::{PaymentGateway, StripePaymentProcessor},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting ST Racing order server...");

    // Payment gateway; without the secret key the workflow fails fast with
    // a configuration error instead of calling the processor.
    let gateway: Option<Arc<dyn PaymentGateway>> = match &config.stripe_secret_key {
        Some(secret_key) => Some(Arc::new(StripePaymentProcessor::new(secret_key.clone()))),
        None => {
            warn!("STRIPE_SECRET_KEY not set; order initiation is disabled");
            None
        }
    };

    // Notification dispatcher
    let notifier = match (&config.smtp, &config.admin_email) {
        (Some(smtp), Some(admin_email)) => {
            let transport = Arc::new(SmtpNotificationTransport::from_config(smtp)?);
            Some(Arc::new(OrderNotifier::new(
                transport,
                smtp.from.clone(),
                admin_email.clone(),
            )))
        }
        _ => {
            warn!("SMTP_HOST or ADMIN_EMAIL not set; order emails are disabled");
            None
        }
    };

    // Delivery pricing table
    let delivery = Arc::new(DeliveryTable::new());

    // Initialize event sender and drain task
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel(1024);
    let event_sender = Arc::new(EventSender::new(event_tx));

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!("Event received: {:?}", event);
        }
    });

    // Initialize order service
    let order_service = Arc::new(OrderService::new(
        gateway,
        notifier,
        delivery.clone(),
        event_sender,
    ));
    info!("Order service initialized");

    let app_state = AppState {
        order_service,
        delivery,
        config: Arc::new(config.clone()),
    };

    let app = router(app_state);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
