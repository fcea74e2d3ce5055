/// End-to-end tests for the two-phase order flow, driving the real router
/// with in-memory gateway/transport doubles.
use async_trait::async_trait;
use axum::{body::Body, http::Request, http::StatusCode, Router};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use st_racing_server::{
    config::Config,
    delivery::DeliveryTable,
    errors::ServiceError,
    events::EventSender,
    handlers::{router, AppState},
    models::{Country, CustomerDetails, LineItem, OrderDetails},
    notifications::{EmailMessage, NotificationTransport, OrderNotifier},
    service::{ConfirmOutcome, OrderService},
    stripe_integration::{
        CreatedIntent, IntentMetadata, IntentStatus, PaymentGateway, RetrievedIntent,
    },
};

const ADMIN_EMAIL: &str = "admin@stracing-shop.example";
const SHOP_FROM: &str = "shop@stracing-shop.example";
const TEST_INTENT_ID: &str = "pi_test_123";
const TEST_ORDER_ID: &str = "order_1700000000000";

/// Gateway double: records create calls, returns a fixed intent, and
/// serves retrievals with a configurable status.
struct RecordingGateway {
    created: Mutex<Vec<(i64, String, String)>>,
    retrieve_status: String,
}

impl RecordingGateway {
    fn new(retrieve_status: &str) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            retrieve_status: retrieve_status.to_string(),
        }
    }

    fn created_calls(&self) -> Vec<(i64, String, String)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, ServiceError> {
        self.created.lock().unwrap().push((
            amount_minor,
            currency.to_string(),
            metadata.order_id.clone(),
        ));
        Ok(CreatedIntent {
            intent_id: TEST_INTENT_ID.to_string(),
            client_secret: format!("{TEST_INTENT_ID}_secret_abc"),
        })
    }

    async fn retrieve_intent(&self, _intent_id: &str) -> Result<RetrievedIntent, ServiceError> {
        let mut metadata = HashMap::new();
        metadata.insert("orderId".to_string(), TEST_ORDER_ID.to_string());
        Ok(RetrievedIntent {
            status: IntentStatus::parse(&self.retrieve_status),
            metadata,
        })
    }
}

/// Transport double: records sent messages, optionally failing on demand.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::NotificationFailed("smtp refused".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "info".to_string(),
        stripe_secret_key: Some("sk_test_123".to_string()),
        stripe_publishable_key: Some("pk_test_123".to_string()),
        smtp: None,
        admin_email: Some(ADMIN_EMAIL.to_string()),
    }
}

fn build_service(
    gateway: Arc<RecordingGateway>,
    transport: Arc<RecordingTransport>,
) -> Arc<OrderService> {
    let (event_tx, _event_rx) = tokio::sync::mpsc::channel(1024);
    let event_sender = Arc::new(EventSender::new(event_tx));
    let notifier = Arc::new(OrderNotifier::new(
        transport,
        SHOP_FROM.to_string(),
        ADMIN_EMAIL.to_string(),
    ));

    Arc::new(OrderService::new(
        Some(gateway),
        Some(notifier),
        Arc::new(DeliveryTable::new()),
        event_sender,
    ))
}

fn build_app(
    gateway: Arc<RecordingGateway>,
    transport: Arc<RecordingTransport>,
) -> Router {
    let state = AppState {
        order_service: build_service(gateway, transport),
        delivery: Arc::new(DeliveryTable::new()),
        config: Arc::new(test_config()),
    };
    router(state)
}

async fn post_orders(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn order_body(confirm_payment: bool, payment_intent_id: Option<&str>) -> Value {
    json!({
        "orderDetails": {
            "items": [
                {
                    "id": 1,
                    "name": "Racing Majica",
                    "price": 35,
                    "quantity": 2,
                    "size": "M",
                    "image": "/majice/1.jpg",
                    "color": "crna"
                }
            ],
            "totalPrice": 70,
            "deliveryPrice": 20,
            "totalAmount": 90
        },
        "customerDetails": {
            "email": "kupac@example.com",
            "name": "Ivan Horvat",
            "address": "Ilica 1",
            "city": "Zagreb",
            "postalCode": "10000",
            "country": "Hrvatska",
            "deliveryMethod": "hp"
        },
        "confirmPayment": confirm_payment,
        "paymentIntentId": payment_intent_id
    })
}

#[tokio::test]
async fn initiate_charges_subtotal_plus_delivery_in_cents() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway.clone(), transport);

    let (status, body) = post_orders(&app, order_body(false, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], format!("{TEST_INTENT_ID}_secret_abc"));
    let order_id = body["orderId"].as_str().unwrap();
    assert!(order_id.starts_with("order_"));

    // 35 € x 2 + 20 € delivery = 90 € -> 9000 cents
    let created = gateway.created_calls();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, 9000);
    assert_eq!(created[0].1, "eur");
    assert_eq!(created[0].2, order_id);
}

#[tokio::test]
async fn cart_snapshot_round_trips_through_phase_one() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway.clone(), transport);

    let mut cart = st_racing_server::cart::CartStore::new();
    let shirt = LineItem {
        id: 1,
        name: "Racing Majica".to_string(),
        price: dec!(35),
        quantity: 1,
        size: "M".to_string(),
        image: "/majice/1.jpg".to_string(),
        color: "crna".to_string(),
    };
    cart.add_item(shirt.clone());
    cart.add_item(shirt);

    let mut body = order_body(false, None);
    body["orderDetails"] = serde_json::to_value(cart.to_order_details(dec!(20))).unwrap();

    let (status, _) = post_orders(&app, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateway.created_calls()[0].0, 9000);
}

#[tokio::test]
async fn initiate_with_invalid_email_is_rejected_before_the_processor() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway.clone(), transport);

    let mut body = order_body(false, None);
    body["customerDetails"]["email"] = json!("nije-email");

    let (status, response) = post_orders(&app, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["type"], "invalid_request");
    assert_eq!(response["message"], "Unesite ispravnu email adresu");
    assert!(gateway.created_calls().is_empty());
}

#[tokio::test]
async fn initiate_with_empty_cart_is_rejected() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway.clone(), transport);

    let mut body = order_body(false, None);
    body["orderDetails"]["items"] = json!([]);
    body["orderDetails"]["totalPrice"] = json!(0);
    body["orderDetails"]["totalAmount"] = json!(20);

    let (status, response) = post_orders(&app, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Košarica je prazna");
    assert!(gateway.created_calls().is_empty());
}

#[tokio::test]
async fn unknown_delivery_method_falls_back_to_zero_fee() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway.clone(), transport);

    // "hp" does not ship to Slovenija; the fee defaults to zero.
    let mut body = order_body(false, None);
    body["customerDetails"]["country"] = json!("Slovenija");
    body["orderDetails"]["deliveryPrice"] = json!(0);
    body["orderDetails"]["totalAmount"] = json!(70);

    let (status, _) = post_orders(&app, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateway.created_calls()[0].0, 7000);
}

#[tokio::test]
async fn confirm_pending_intent_returns_waiting_state_without_emails() {
    let gateway = Arc::new(RecordingGateway::new("requires_payment_method"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport.clone());

    let (status, body) = post_orders(&app, order_body(true, Some(TEST_INTENT_ID))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "requires_payment_method");
    assert!(transport.sent_messages().is_empty());
}

#[tokio::test]
async fn confirm_succeeded_intent_sends_merchant_and_customer_emails() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport.clone());

    let (status, body) = post_orders(&app, order_body(true, Some(TEST_INTENT_ID))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["orderId"], TEST_ORDER_ID);

    let sent = transport.sent_messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, ADMIN_EMAIL);
    assert_eq!(sent[0].subject, "Nova Porudžbina - ST Racing Shop");
    assert!(sent[0].html.contains(TEST_ORDER_ID));
    assert_eq!(sent[1].to, "kupac@example.com");
    assert_eq!(sent[1].subject, "Potvrda Porudžbine - ST Racing Shop");
    assert!(sent[1].html.contains("Racing Majica"));
}

#[tokio::test]
async fn double_confirm_sends_the_email_pair_once() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport.clone());

    let (first_status, first) = post_orders(&app, order_body(true, Some(TEST_INTENT_ID))).await;
    let (second_status, second) = post_orders(&app, order_body(true, Some(TEST_INTENT_ID))).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(second["success"], true);
    assert_eq!(second["orderId"], TEST_ORDER_ID);

    assert_eq!(transport.sent_messages().len(), 2);
}

#[tokio::test]
async fn confirm_without_intent_id_is_rejected() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport.clone());

    let (status, body) = post_orders(&app, order_body(true, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "missing_payment_intent");
    assert!(transport.sent_messages().is_empty());
}

#[tokio::test]
async fn failed_email_dispatch_surfaces_and_stays_retryable() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let service = build_service(gateway, transport.clone());

    let order = OrderDetails {
        items: vec![LineItem {
            id: 1,
            name: "Racing Majica".to_string(),
            price: dec!(35),
            quantity: 2,
            size: "M".to_string(),
            image: String::new(),
            color: "crna".to_string(),
        }],
        total_price: dec!(70),
        delivery_price: dec!(20),
        total_amount: dec!(90),
    };
    let customer = CustomerDetails {
        email: "kupac@example.com".to_string(),
        name: "Ivan Horvat".to_string(),
        address: "Ilica 1".to_string(),
        city: "Zagreb".to_string(),
        postal_code: "10000".to_string(),
        country: Country::Hrvatska,
        delivery_method: "hp".to_string(),
    };

    transport.fail.store(true, Ordering::SeqCst);
    let result = service
        .confirm_order(TEST_INTENT_ID, &order, &customer)
        .await;
    assert!(matches!(result, Err(ServiceError::NotificationFailed(_))));
    assert!(transport.sent_messages().is_empty());

    // The payment stands; a retry after the outage delivers the emails.
    transport.fail.store(false, Ordering::SeqCst);
    let outcome = service
        .confirm_order(TEST_INTENT_ID, &order, &customer)
        .await
        .unwrap();
    assert!(matches!(outcome, ConfirmOutcome::Confirmed { .. }));
    assert_eq!(transport.sent_messages().len(), 2);
}

#[tokio::test]
async fn missing_processor_key_fails_fast_with_a_configuration_error() {
    let (event_tx, _event_rx) = tokio::sync::mpsc::channel(1024);
    let service = OrderService::new(
        None,
        None,
        Arc::new(DeliveryTable::new()),
        Arc::new(EventSender::new(event_tx)),
    );

    let order = OrderDetails {
        items: vec![LineItem {
            id: 1,
            name: "Racing Majica".to_string(),
            price: dec!(35),
            quantity: 1,
            size: "M".to_string(),
            image: String::new(),
            color: String::new(),
        }],
        total_price: dec!(35),
        delivery_price: dec!(20),
        total_amount: dec!(55),
    };
    let customer = CustomerDetails {
        email: "kupac@example.com".to_string(),
        name: "Ivan Horvat".to_string(),
        address: "Ilica 1".to_string(),
        city: "Zagreb".to_string(),
        postal_code: "10000".to_string(),
        country: Country::Hrvatska,
        delivery_method: "hp".to_string(),
    };

    let result = service.initiate_order(&order, &customer).await;
    assert!(matches!(result, Err(ServiceError::Configuration(_))));
}

#[tokio::test]
async fn payment_config_exposes_the_publishable_key() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/payment-config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["publishableKey"], "pk_test_123");
}

#[tokio::test]
async fn delivery_options_lists_every_country() {
    let gateway = Arc::new(RecordingGateway::new("succeeded"));
    let transport = Arc::new(RecordingTransport::default());
    let app = build_app(gateway, transport);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/delivery-options")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["Hrvatska"].as_array().unwrap().len(), 2);
    assert_eq!(body["Slovenija"][0]["id"], "posta");
    assert_eq!(body["Bosna i Hercegovina"][0]["name"], "BH Pošta");
}
