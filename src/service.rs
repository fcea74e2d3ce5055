use crate::{
    delivery::DeliveryTable,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CustomerDetails, OrderDetails},
    notifications::{NotificationLedger, OrderNotifier},
    stripe_integration::{IntentMetadata, IntentStatus, PaymentGateway},
    validation::{validate_input, validate_order_details},
};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The shop charges in euros only.
pub const CURRENCY: &str = "eur";

/// Metadata key under which the order id rides on the intent.
const METADATA_ORDER_ID: &str = "orderId";

/// Phase-1 result: the caller completes the card payment with the client
/// secret, then calls back with the intent id.
#[derive(Debug)]
pub struct InitiatedOrder {
    pub client_secret: String,
    pub order_id: String,
}

/// Phase-2 result. `NotConfirmed` is a legitimate waiting state, not an
/// error; the caller may retry once the processor settles the payment.
#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed { order_id: String },
    NotConfirmed { status: IntentStatus },
}

/// Order confirmation workflow: prices the cart, creates the payment
/// intent, re-verifies it after the shopper confirms the card payment, and
/// dispatches the order emails exactly once per intent.
pub struct OrderService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: Option<Arc<OrderNotifier>>,
    delivery: Arc<DeliveryTable>,
    event_sender: Arc<EventSender>,
    ledger: NotificationLedger,
}

impl OrderService {
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        notifier: Option<Arc<OrderNotifier>>,
        delivery: Arc<DeliveryTable>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            gateway,
            notifier,
            delivery,
            event_sender,
            ledger: NotificationLedger::new(),
        }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>, ServiceError> {
        self.gateway.as_ref().ok_or_else(|| {
            ServiceError::Configuration("STRIPE_SECRET_KEY is not configured".to_string())
        })
    }

    /// Server-side total: subtotal plus the fee from the pricing table. The
    /// posted totals are advisory; a mismatch is logged and the recomputed
    /// value wins.
    fn price_order(&self, order: &OrderDetails, customer: &CustomerDetails) -> (Decimal, Decimal) {
        let delivery_fee = self
            .delivery
            .fee_for(customer.country, &customer.delivery_method);
        let total = order.total_price + delivery_fee;

        if total != order.total_amount || delivery_fee != order.delivery_price {
            warn!(
                posted_total = %order.total_amount,
                computed_total = %total,
                "posted totals disagree with server pricing, using server value"
            );
        }

        (delivery_fee, total)
    }

    /// Phase 1: price the order and create a payment intent carrying the
    /// order snapshot. The card payment itself happens in the caller's
    /// environment against the returned client secret.
    #[instrument(skip(self, order, customer))]
    pub async fn initiate_order(
        &self,
        order: &OrderDetails,
        customer: &CustomerDetails,
    ) -> Result<InitiatedOrder, ServiceError> {
        validate_input(customer)?;
        validate_order_details(order)?;

        let gateway = self.gateway()?;
        let (_, total) = self.price_order(order, customer);

        let amount_minor = to_minor_units(total)?;
        if amount_minor <= 0 {
            return Err(ServiceError::InvalidInput(
                "Iznos narudžbe mora biti veći od nule".to_string(),
            ));
        }

        let order_id = generate_order_id();
        let metadata = IntentMetadata::new(order_id.clone(), &order.items, customer)?;

        let created = gateway.create_intent(amount_minor, CURRENCY, metadata).await?;

        self.event_sender
            .send_or_log(Event::OrderInitiated {
                order_id: order_id.clone(),
                amount_minor,
            })
            .await;

        info!("Order initiated: {} ({})", order_id, created.intent_id);
        Ok(InitiatedOrder {
            client_secret: created.client_secret,
            order_id,
        })
    }

    /// Phase 2: re-read the intent from the processor and, when it has
    /// succeeded, send the order emails. A second confirmation of the same
    /// intent succeeds without re-sending.
    #[instrument(skip(self, order, customer))]
    pub async fn confirm_order(
        &self,
        payment_intent_id: &str,
        order: &OrderDetails,
        customer: &CustomerDetails,
    ) -> Result<ConfirmOutcome, ServiceError> {
        let gateway = self.gateway()?;

        let intent = gateway.retrieve_intent(payment_intent_id).await?;
        if !intent.status.is_succeeded() {
            info!(
                "Intent {} not confirmed yet (status: {})",
                payment_intent_id,
                intent.status.as_str()
            );
            return Ok(ConfirmOutcome::NotConfirmed {
                status: intent.status,
            });
        }

        let notifier = self.notifier.as_ref().ok_or_else(|| {
            ServiceError::Configuration("SMTP transport is not configured".to_string())
        })?;

        // The processor record is authoritative for the order id; the
        // request's own details fill the email bodies.
        let order_id = intent
            .metadata
            .get(METADATA_ORDER_ID)
            .cloned()
            .unwrap_or_else(|| payment_intent_id.to_string());

        if !self.ledger.try_begin(payment_intent_id).await {
            info!(
                "Intent {} already notified, skipping emails",
                payment_intent_id
            );
            return Ok(ConfirmOutcome::Confirmed { order_id });
        }

        let (delivery_fee, total) = self.price_order(order, customer);
        if let Err(err) = notifier
            .notify_order_confirmed(&order_id, order, customer, delivery_fee, total)
            .await
        {
            // Payment stands; release the reservation so a retry can
            // deliver the emails.
            self.ledger.release(payment_intent_id).await;
            warn!("Order {} paid but notification failed: {}", order_id, err);
            return Err(err);
        }

        self.event_sender
            .send_or_log(Event::OrderConfirmed {
                order_id: order_id.clone(),
                payment_intent_id: payment_intent_id.to_string(),
            })
            .await;
        self.event_sender
            .send_or_log(Event::NotificationsSent {
                order_id: order_id.clone(),
            })
            .await;

        info!("Order confirmed: {}", order_id);
        Ok(ConfirmOutcome::Confirmed { order_id })
    }
}

fn generate_order_id() -> String {
    format!("order_{}", Utc::now().timestamp_millis())
}

/// Decimal euros to integer cents, round-half-up.
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidInput("Iznos narudžbe nije ispravan".to_string()))
}
