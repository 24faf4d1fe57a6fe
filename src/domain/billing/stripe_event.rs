//! Stripe webhook payloads.
//!
//! Only the fields the billing handlers read are modelled; everything else
//! in Stripe's schema is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// `evt_...`
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// Polymorphic on `type`
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Event types the billing handlers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    CustomerSubscriptionDeleted,
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            _ => Self::Unknown,
        }
    }
}

/// `checkout.session` object.
///
/// The checkout page puts `user_id` plus either `plan_id` or `credits`
/// into the session metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub subscription: Option<String>,
}

/// `invoice` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub subscription: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    pub currency: Option<String>,
    /// `subscription_create` for the first invoice, `subscription_cycle` for renewals
    pub billing_reason: Option<String>,
}

/// `subscription` object.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
}

#[cfg(test)]
pub fn event_json(id: &str, event_type: &str, object: serde_json::Value) -> String {
    serde_json::json!({
        "id": id,
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": object },
        "livemode": false,
        "api_version": "2023-10-16"
    })
    .to_string()
}
