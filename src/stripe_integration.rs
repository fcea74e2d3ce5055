use crate::errors::ServiceError;
use crate::models::{CustomerDetails, LineItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

const PAYMENT_INTENTS_URL: &str = "https://api.stripe.com/v1/payment_intents";

/// Stripe caps every metadata value at 500 characters.
pub const METADATA_VALUE_LIMIT: usize = 500;

/// Processor-side lifecycle state of a payment intent. Only `Succeeded`
/// authorizes order finalization; everything else is "not yet confirmed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Canceled,
    Other(String),
}

impl IntentStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Other(other) => other,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Order snapshot carried in the intent's metadata bag so the order can be
/// reconstructed from the processor record alone. Values are truncated to
/// the processor's per-value limit instead of failing the checkout.
#[derive(Debug, Clone)]
pub struct IntentMetadata {
    pub order_id: String,
    pub items: String,
    pub shipping: String,
}

#[derive(Serialize)]
struct MetadataItem<'a> {
    id: u32,
    name: &'a str,
    size: &'a str,
    quantity: u32,
    price: rust_decimal::Decimal,
}

impl IntentMetadata {
    pub fn new(
        order_id: String,
        items: &[LineItem],
        customer: &CustomerDetails,
    ) -> Result<Self, ServiceError> {
        let compact: Vec<MetadataItem<'_>> = items
            .iter()
            .map(|item| MetadataItem {
                id: item.id,
                name: &item.name,
                size: &item.size,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let items_json = serde_json::to_string(&compact)
            .map_err(|e| ServiceError::ParseError(format!("metadata items: {e}")))?;
        let shipping_json = serde_json::to_string(customer)
            .map_err(|e| ServiceError::ParseError(format!("metadata shipping: {e}")))?;

        Ok(Self {
            order_id: truncate_value("orderId", order_id),
            items: truncate_value("items", items_json),
            shipping: truncate_value("shipping", shipping_json),
        })
    }

    /// Metadata form parameters for the create-intent call.
    pub fn into_params(self) -> Vec<(String, String)> {
        vec![
            ("metadata[orderId]".to_string(), self.order_id),
            ("metadata[items]".to_string(), self.items),
            ("metadata[shipping]".to_string(), self.shipping),
        ]
    }
}

fn truncate_value(key: &str, value: String) -> String {
    if value.chars().count() <= METADATA_VALUE_LIMIT {
        return value;
    }
    warn!(
        key,
        limit = METADATA_VALUE_LIMIT,
        "metadata value exceeds processor limit, truncating"
    );
    value.chars().take(METADATA_VALUE_LIMIT).collect()
}

/// A freshly created intent; the client secret goes back to the card form.
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    pub intent_id: String,
    pub client_secret: String,
}

/// An intent re-read from the processor, the source of truth for status.
#[derive(Debug, Clone)]
pub struct RetrievedIntent {
    pub status: IntentStatus,
    pub metadata: HashMap<String, String>,
}

/// Payment processor contract: create an intent for an amount in minor
/// units, and re-read an intent by id. Errors are surfaced, never retried.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, ServiceError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<RetrievedIntent, ServiceError>;
}

/// Stripe payment processor
#[derive(Clone)]
pub struct StripePaymentProcessor {
    secret_key: String,
    client: reqwest::Client,
}

impl StripePaymentProcessor {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            client: reqwest::Client::new(),
        }
    }

    async fn read_error(response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        warn!("Stripe API error ({}): {}", status, error_text);

        if status == reqwest::StatusCode::NOT_FOUND {
            ServiceError::NotFound(format!("Payment intent not found: {error_text}"))
        } else if status.is_client_error() {
            ServiceError::ProcessorRejected(format!("Stripe error: {error_text}"))
        } else {
            ServiceError::ProcessorUnavailable(format!("Stripe error: {error_text}"))
        }
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentProcessor {
    #[instrument(skip(self, metadata))]
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> Result<CreatedIntent, ServiceError> {
        if amount_minor <= 0 {
            return Err(ServiceError::ProcessorRejected(format!(
                "amount must be positive, got {amount_minor}"
            )));
        }

        let mut params: Vec<(String, String)> = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        params.extend(metadata.into_params());

        let response = self
            .client
            .post(PAYMENT_INTENTS_URL)
            .basic_auth(&self.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(|e| ServiceError::ProcessorUnavailable(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let payment_intent: PaymentIntentResponse = response.json().await.map_err(|e| {
            ServiceError::ParseError(format!("Failed to parse Stripe response: {e}"))
        })?;

        let client_secret = payment_intent.client_secret.ok_or_else(|| {
            ServiceError::ParseError("Stripe response missing client_secret".to_string())
        })?;

        info!("PaymentIntent created: {}", payment_intent.id);
        Ok(CreatedIntent {
            intent_id: payment_intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<RetrievedIntent, ServiceError> {
        let url = format!("{PAYMENT_INTENTS_URL}/{intent_id}");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await
            .map_err(|e| ServiceError::ProcessorUnavailable(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let payment_intent: PaymentIntentResponse = response.json().await.map_err(|e| {
            ServiceError::ParseError(format!("Failed to parse Stripe response: {e}"))
        })?;

        Ok(RetrievedIntent {
            status: IntentStatus::parse(&payment_intent.status),
            metadata: payment_intent.metadata,
        })
    }
}

// Response types

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
