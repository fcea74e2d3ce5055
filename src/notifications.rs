use crate::config::SmtpConfig;
use crate::errors::ServiceError;
use crate::models::{CustomerDetails, OrderDetails};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

pub const MERCHANT_SUBJECT: &str = "Nova Porudžbina - ST Racing Shop";
pub const CUSTOMER_SUBJECT: &str = "Potvrda Porudžbine - ST Racing Shop";

/// A rendered email ready for the transport.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery contract. Failures propagate to the caller; there is no
/// retry at this layer.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

/// SMTP (STARTTLS) transport.
pub struct SmtpNotificationTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotificationTransport {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ServiceError::Configuration(format!("SMTP relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl NotificationTransport for SmtpNotificationTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| ServiceError::NotificationFailed(format!("from address: {e}")))?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| ServiceError::NotificationFailed(format!("to address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|e| ServiceError::NotificationFailed(format!("build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| ServiceError::NotificationFailed(format!("SMTP send: {e}")))?;

        Ok(())
    }
}

/// Renders and sends the two order emails: one to the shop inbox, one to
/// the customer.
pub struct OrderNotifier {
    transport: Arc<dyn NotificationTransport>,
    from: String,
    admin_email: String,
}

impl OrderNotifier {
    pub fn new(transport: Arc<dyn NotificationTransport>, from: String, admin_email: String) -> Self {
        Self {
            transport,
            from,
            admin_email,
        }
    }

    #[instrument(skip(self, order, customer))]
    pub async fn notify_order_confirmed(
        &self,
        order_id: &str,
        order: &OrderDetails,
        customer: &CustomerDetails,
        delivery_fee: Decimal,
        total: Decimal,
    ) -> Result<(), ServiceError> {
        let merchant = EmailMessage {
            from: self.from.clone(),
            to: self.admin_email.clone(),
            subject: MERCHANT_SUBJECT.to_string(),
            html: render_merchant_email(order_id, order, customer, delivery_fee, total),
        };
        self.transport.send(&merchant).await?;

        let confirmation = EmailMessage {
            from: self.from.clone(),
            to: customer.email.clone(),
            subject: CUSTOMER_SUBJECT.to_string(),
            html: render_customer_email(order_id, order, customer, delivery_fee, total),
        };
        self.transport.send(&confirmation).await?;

        info!("Order emails sent: {}", order_id);
        Ok(())
    }
}

fn format_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

fn render_item_list(order: &OrderDetails) -> String {
    let mut list = String::new();
    for item in &order.items {
        let _ = write!(
            list,
            "<li>{} - Veličina: {}<br>Količina: {}<br>Cena: {} €</li>",
            item.name, item.size, item.quantity, item.price
        );
    }
    list
}

fn render_merchant_email(
    order_id: &str,
    order: &OrderDetails,
    customer: &CustomerDetails,
    delivery_fee: Decimal,
    total: Decimal,
) -> String {
    format!(
        "<h1>Nova porudžbina je primljena!</h1>\
         <h2>Detalji porudžbine:</h2>\
         <p><strong>Broj porudžbine:</strong> {order_id}</p>\
         <p><strong>Ukupan iznos:</strong> {total} €</p>\
         <h3>Kupac:</h3>\
         <p>Ime: {name}</p>\
         <p>Email: {email}</p>\
         <p>Adresa: {address}</p>\
         <p>Grad: {city}</p>\
         <p>Poštanski broj: {postal_code}</p>\
         <p>Država: {country}</p>\
         <h3>Proizvodi:</h3>\
         <ul>{items}</ul>\
         <p><strong>Dostava:</strong> {delivery} €</p>",
        order_id = order_id,
        total = format_amount(total),
        name = customer.name,
        email = customer.email,
        address = customer.address,
        city = customer.city,
        postal_code = customer.postal_code,
        country = customer.country,
        items = render_item_list(order),
        delivery = delivery_fee,
    )
}

fn render_customer_email(
    order_id: &str,
    order: &OrderDetails,
    customer: &CustomerDetails,
    delivery_fee: Decimal,
    total: Decimal,
) -> String {
    format!(
        "<h1>Hvala na porudžbini!</h1>\
         <p>Vaša porudžbina <strong>{order_id}</strong> je uspješno plaćena.</p>\
         <h3>Pregled porudžbine:</h3>\
         <ul>{items}</ul>\
         <p><strong>Dostava:</strong> {delivery} €</p>\
         <p><strong>Ukupan iznos:</strong> {total} €</p>\
         <p>Porudžbina će biti poslana na adresu: {address}, {postal_code} {city}, {country}.</p>",
        order_id = order_id,
        items = render_item_list(order),
        delivery = delivery_fee,
        total = format_amount(total),
        address = customer.address,
        postal_code = customer.postal_code,
        city = customer.city,
        country = customer.country,
    )
}

/// In-memory set of intent ids whose order emails already went out.
///
/// `try_begin` reserves the id before dispatch so a concurrent or repeated
/// confirmation cannot double-send; `release` undoes the reservation when
/// dispatch fails so a later retry can still deliver.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    notified: RwLock<HashSet<String>>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the intent was already notified (or reserved).
    pub async fn try_begin(&self, intent_id: &str) -> bool {
        let mut notified = self.notified.write().await;
        notified.insert(intent_id.to_string())
    }

    pub async fn release(&self, intent_id: &str) {
        let mut notified = self.notified.write().await;
        notified.remove(intent_id);
    }

    pub async fn is_notified(&self, intent_id: &str) -> bool {
        self.notified.read().await.contains(intent_id)
    }
}
