//! Checkout and order confirmation backend for the ST Racing web shop.
//!
//! The flow is two-phase: `POST /orders` first prices the cart and creates
//! a Stripe payment intent, handing the client secret back to the card
//! form; after the shopper confirms the payment, a second call re-verifies
//! the intent with the processor and sends the order emails exactly once.

pub mod cart;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod service;
pub mod stripe_integration;
pub mod validation;

pub use handlers::AppState;
