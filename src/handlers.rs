use crate::{
    config::Config,
    delivery::DeliveryTable,
    errors::ApiError,
    models::{
        ConfirmOrderResponse, CreateOrderRequest, InitiateOrderResponse, OrderPendingResponse,
        PaymentConfigResponse,
    },
    service::{ConfirmOutcome, OrderService},
};
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderService>,
    pub delivery: Arc<DeliveryTable>,
    pub config: Arc<Config>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Checkout endpoints
        .route("/orders", post(create_order))
        .route("/delivery-options", get(delivery_options))
        .route("/payment-config", get(payment_config))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Handler functions

async fn root_handler() -> &'static str {
    "ST Racing Shop - Order API"
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "st-racing-server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn readiness_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "ready": true
    }))
}

/// Two-phase order endpoint. Without `confirmPayment` the order is
/// initiated and the client secret returned; with it (plus the intent id)
/// the payment is re-verified and the order emails go out.
async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    if payload.confirm_payment {
        let Some(intent_id) = payload.payment_intent_id.as_deref() else {
            return Err(ApiError::BadRequest {
                message: "Nedostaje identifikator plaćanja za potvrdu narudžbe".to_string(),
                error_code: Some("missing_payment_intent".to_string()),
            });
        };

        let outcome = state
            .order_service
            .confirm_order(intent_id, &payload.order_details, &payload.customer_details)
            .await?;

        match outcome {
            ConfirmOutcome::Confirmed { order_id } => Ok(Json(ConfirmOrderResponse {
                success: true,
                order_id,
                message: "Narudžba je uspješno potvrđena.".to_string(),
            })
            .into_response()),
            ConfirmOutcome::NotConfirmed { status } => Ok(Json(OrderPendingResponse {
                success: false,
                status: status.as_str().to_string(),
            })
            .into_response()),
        }
    } else {
        let initiated = state
            .order_service
            .initiate_order(&payload.order_details, &payload.customer_details)
            .await?;

        Ok(Json(InitiateOrderResponse {
            client_secret: initiated.client_secret,
            order_id: initiated.order_id,
        })
        .into_response())
    }
}

/// Courier options per country, for the checkout form.
async fn delivery_options(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.delivery.all().clone())
}

/// Publishable key for the client-side card form.
async fn payment_config(
    State(state): State<AppState>,
) -> Result<Json<PaymentConfigResponse>, ApiError> {
    let publishable_key = state.config.stripe_publishable_key.clone().ok_or_else(|| {
        ApiError::InternalServerError {
            message: "Payment configuration is unavailable".to_string(),
        }
    })?;

    Ok(Json(PaymentConfigResponse { publishable_key }))
}
