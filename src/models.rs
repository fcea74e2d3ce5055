use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Shipping countries served by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    Hrvatska,
    Slovenija,
    Srbija,
    #[serde(rename = "Bosna i Hercegovina")]
    BosnaIHercegovina,
}

impl Country {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Hrvatska => "Hrvatska",
            Self::Slovenija => "Slovenija",
            Self::Srbija => "Srbija",
            Self::BosnaIHercegovina => "Bosna i Hercegovina",
        }
    }

    pub const ALL: [Country; 4] = [
        Country::Hrvatska,
        Country::Slovenija,
        Country::Srbija,
        Country::BosnaIHercegovina,
    ];
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One product/size/quantity selection within a cart.
///
/// Two entries are the same cart line when product id AND size match;
/// the same product in a different size is a separate line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: u32,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub size: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub color: String,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Derived cart totals, always recomputed from the current items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_items: u32,
    pub total_price: Decimal,
}

/// Checkout form data, captured once per order request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[validate(email(message = "Unesite ispravnu email adresu"))]
    pub email: String,
    #[validate(length(min = 3, message = "Unesite ime i prezime"))]
    pub name: String,
    #[validate(length(min = 1, message = "Unesite adresu"))]
    pub address: String,
    #[validate(length(min = 1, message = "Unesite grad"))]
    pub city: String,
    #[validate(length(min = 1, message = "Unesite poštanski broj"))]
    pub postal_code: String,
    pub country: Country,
    pub delivery_method: String,
}

/// Cart snapshot posted by the checkout page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
    pub delivery_price: Decimal,
    pub total_amount: Decimal,
}

/// Body of `POST /orders`. The `confirm_payment` flag selects between the
/// two workflow operations; the handler maps it to the right one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_details: OrderDetails,
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub confirm_payment: bool,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

/// Phase-1 response: the card form finishes the payment with this secret.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateOrderResponse {
    pub client_secret: String,
    pub order_id: String,
}

/// Phase-2 response for a confirmed (and notified) order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOrderResponse {
    pub success: bool,
    pub order_id: String,
    pub message: String,
}

/// Phase-2 response when the processor has not (yet) marked the intent
/// succeeded. A waiting state, not an error; the caller may retry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPendingResponse {
    pub success: bool,
    pub status: String,
}

/// Client bootstrap data for the card form.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigResponse {
    pub publishable_key: String,
}
