//! ProcessWebhook command handler.
//!
//! Verifies a Stripe delivery and applies it to subscriptions, credits and
//! the transaction ledger. Every payment is keyed by a Stripe object id and
//! applied through one atomic repository call, so a redelivered event, even
//! one racing the original, is acknowledged without being applied twice.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::billing::{
    CheckoutSession, Invoice, PaymentTransaction, StripeEvent, StripeEventType,
    StripeWebhookVerifier, SubscriptionObject, TransactionKind, UserSubscription, WebhookError,
};
use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, UserId};
use crate::ports::{BillingRepository, UserRepository};

/// Invoices Stripe raises for the first period, already paid via checkout.
const FIRST_INVOICE_REASON: &str = "subscription_create";

#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What a delivery changed.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    SubscriptionActivated {
        user_id: UserId,
        plan_id: PlanId,
        subscription_id: SubscriptionId,
    },
    CreditsPurchased {
        user_id: UserId,
        credits: i64,
        balance: i64,
    },
    SubscriptionRenewed {
        subscription_id: SubscriptionId,
    },
    PaymentFailed {
        subscription_id: SubscriptionId,
    },
    SubscriptionCancelled {
        subscription_id: SubscriptionId,
    },
    /// Already processed.
    Duplicate,
    /// Acknowledged without action.
    Ignored,
}

pub struct ProcessWebhookHandler {
    verifier: Option<StripeWebhookVerifier>,
    users: Arc<dyn UserRepository>,
    billing: Arc<dyn BillingRepository>,
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, WebhookError> {
    event
        .deserialize_object()
        .map_err(|e| WebhookError::ParseError(e.to_string()))
}

impl ProcessWebhookHandler {
    /// `verifier` is `None` when no webhook secret is configured; every
    /// delivery is then refused.
    pub fn new(
        verifier: Option<StripeWebhookVerifier>,
        users: Arc<dyn UserRepository>,
        billing: Arc<dyn BillingRepository>,
    ) -> Self {
        Self {
            verifier,
            users,
            billing,
        }
    }

    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        // 1. Verify signature and parse
        let verifier = self.verifier.as_ref().ok_or(WebhookError::NotConfigured)?;
        let event = verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;
        info!(event_id = %event.id, event_type = %event.event_type, "stripe webhook received");

        // 2. Dispatch on type
        let outcome = match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                self.checkout_completed(parse_object(&event)?).await?
            }
            StripeEventType::InvoicePaymentSucceeded => {
                self.invoice_paid(parse_object(&event)?).await?
            }
            StripeEventType::InvoicePaymentFailed => {
                self.invoice_failed(parse_object(&event)?).await?
            }
            StripeEventType::CustomerSubscriptionDeleted => {
                self.subscription_deleted(parse_object(&event)?).await?
            }
            StripeEventType::Unknown => WebhookOutcome::Ignored,
        };

        info!(event_id = %event.id, ?outcome, "stripe webhook processed");
        Ok(outcome)
    }

    async fn checkout_completed(
        &self,
        session: CheckoutSession,
    ) -> Result<WebhookOutcome, WebhookError> {
        // Cheap early exit for redeliveries; `apply_payment` settles races.
        if self.billing.transaction_exists(&session.id).await? {
            return Ok(WebhookOutcome::Duplicate);
        }

        let user_id: UserId = session
            .metadata
            .get("user_id")
            .ok_or(WebhookError::MissingMetadata("user_id"))?
            .parse()
            .map_err(|_| WebhookError::InvalidMetadata("user_id"))?;
        if self.users.find_by_id(&user_id).await?.is_none() {
            return Err(WebhookError::UserNotFound);
        }

        let amount = session.amount_total.unwrap_or(0);
        let currency = session.currency.clone().unwrap_or_else(|| "usd".to_string());

        if let Some(raw_plan) = session.metadata.get("plan_id") {
            let plan_id: PlanId = raw_plan
                .parse()
                .map_err(|_| WebhookError::InvalidMetadata("plan_id"))?;
            let plan = self
                .billing
                .find_plan(&plan_id)
                .await?
                .ok_or(WebhookError::PlanNotFound)?;
            let now = Timestamp::now();

            let mut changes = Vec::with_capacity(2);
            if let Some(mut previous) = self.billing.current_subscription(&user_id, now).await? {
                previous.cancel(now);
                changes.push(previous);
            }
            let subscription =
                UserSubscription::activate(user_id, &plan, session.subscription.clone(), now);
            let subscription_id = subscription.id;
            changes.push(subscription);

            let tx = PaymentTransaction::succeeded(
                user_id,
                TransactionKind::Subscription,
                amount,
                currency,
                plan.monthly_credits,
                Some(session.id),
            );
            if self.billing.apply_payment(&tx, &changes).await?.is_none() {
                return Ok(WebhookOutcome::Duplicate);
            }

            return Ok(WebhookOutcome::SubscriptionActivated {
                user_id,
                plan_id,
                subscription_id,
            });
        }

        let credits: i64 = session
            .metadata
            .get("credits")
            .ok_or(WebhookError::MissingMetadata("plan_id or credits"))?
            .parse()
            .ok()
            .filter(|c| *c > 0)
            .ok_or(WebhookError::InvalidMetadata("credits"))?;

        let tx = PaymentTransaction::succeeded(
            user_id,
            TransactionKind::CreditPurchase,
            amount,
            currency,
            credits,
            Some(session.id),
        );
        let Some(balance) = self.billing.apply_payment(&tx, &[]).await? else {
            return Ok(WebhookOutcome::Duplicate);
        };

        Ok(WebhookOutcome::CreditsPurchased {
            user_id,
            credits,
            balance: balance.balance,
        })
    }

    async fn invoice_paid(&self, invoice: Invoice) -> Result<WebhookOutcome, WebhookError> {
        let Some(stripe_subscription) = invoice.subscription.as_deref() else {
            return Ok(WebhookOutcome::Ignored);
        };
        if invoice.billing_reason.as_deref() == Some(FIRST_INVOICE_REASON) {
            return Ok(WebhookOutcome::Ignored);
        }
        if self.billing.transaction_exists(&invoice.id).await? {
            return Ok(WebhookOutcome::Duplicate);
        }
        let Some(mut subscription) = self.find_subscription(stripe_subscription).await? else {
            return Ok(WebhookOutcome::Ignored);
        };

        let plan = self
            .billing
            .find_plan(&subscription.plan_id)
            .await?
            .ok_or(WebhookError::PlanNotFound)?;
        subscription.renew(&plan, Timestamp::now());

        let tx = PaymentTransaction::succeeded(
            subscription.user_id,
            TransactionKind::Renewal,
            invoice.amount_paid,
            invoice.currency.unwrap_or_else(|| plan.currency.clone()),
            plan.monthly_credits,
            Some(invoice.id),
        );
        let subscription_id = subscription.id;
        if self.billing.apply_payment(&tx, &[subscription]).await?.is_none() {
            return Ok(WebhookOutcome::Duplicate);
        }

        Ok(WebhookOutcome::SubscriptionRenewed { subscription_id })
    }

    async fn invoice_failed(&self, invoice: Invoice) -> Result<WebhookOutcome, WebhookError> {
        let Some(stripe_subscription) = invoice.subscription.as_deref() else {
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(mut subscription) = self.find_subscription(stripe_subscription).await? else {
            return Ok(WebhookOutcome::Ignored);
        };

        subscription.mark_past_due(Timestamp::now());
        self.billing.save_subscription(&subscription).await?;
        warn!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            "subscription payment failed"
        );

        Ok(WebhookOutcome::PaymentFailed {
            subscription_id: subscription.id,
        })
    }

    async fn subscription_deleted(
        &self,
        object: SubscriptionObject,
    ) -> Result<WebhookOutcome, WebhookError> {
        let Some(mut subscription) = self.find_subscription(&object.id).await? else {
            return Ok(WebhookOutcome::Ignored);
        };

        subscription.cancel(Timestamp::now());
        self.billing.save_subscription(&subscription).await?;

        Ok(WebhookOutcome::SubscriptionCancelled {
            subscription_id: subscription.id,
        })
    }

    async fn find_subscription(
        &self,
        stripe_id: &str,
    ) -> Result<Option<UserSubscription>, WebhookError> {
        let found = self.billing.find_subscription_by_stripe_id(stripe_id).await?;
        if found.is_none() {
            warn!(stripe_subscription = stripe_id, "webhook for unknown subscription");
        }
        Ok(found)
    }
}
