//! # Checkout State Machine
//!
//! Multi-step checkout as an explicit tagged state enum with guarded
//! transitions: sender info → recipient info → payment → complete.
//! Backward moves keep previously entered data; the payment step binds
//! an authorization to a frozen total exactly once. Orchestration
//! against the cart store and payment gateway lives in
//! [`crate::session::CheckoutService`]; this module is pure state.

use crate::error::{OrderError, OrderResult};
use crate::gateway::Authorization;
use crate::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Step of the checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Session opened, nothing collected yet
    Start,
    /// Collecting who is ordering
    SenderInfo,
    /// Collecting who receives the flowers
    RecipientInfo,
    /// Authorization bound; awaiting payer confirmation
    Payment,
    /// Paid; cart cleared
    Complete,
}

impl CheckoutStep {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutStep::Start => "start",
            CheckoutStep::SenderInfo => "sender_info",
            CheckoutStep::RecipientInfo => "recipient_info",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Complete => "complete",
        }
    }
}

/// Overall session outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// In progress (including after a recoverable decline)
    Active,
    /// Payment confirmed succeeded
    Succeeded,
    /// Authorization canceled/expired; the session is dead
    Failed,
}

/// How the sender prefers to be contacted about the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPreference {
    Text,
    Email,
}

impl Default for ContactPreference {
    fn default() -> Self {
        ContactPreference::Text
    }
}

/// Who is placing the order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub contact_pref: ContactPreference,
}

impl SenderInfo {
    /// Transition guard: name and phone are required
    pub fn validate(&self) -> OrderResult<()> {
        if self.name.trim().is_empty() {
            return Err(OrderError::InvalidRequest(
                "sender name is required".to_string(),
            ));
        }
        if self.phone.trim().is_empty() {
            return Err(OrderError::InvalidRequest(
                "sender phone is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Who receives the flowers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientInfo {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl RecipientInfo {
    /// Transition guard: everything but instructions is required
    pub fn validate(&self) -> OrderResult<()> {
        let required = [
            ("recipient first name", &self.first_name),
            ("recipient last name", &self.last_name),
            ("recipient address", &self.address),
            ("recipient city", &self.city),
            ("recipient country", &self.country),
            ("recipient postal code", &self.postal_code),
            ("recipient phone", &self.phone),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::InvalidRequest(format!("{label} is required")));
            }
        }
        Ok(())
    }
}

/// One checkout attempt for one guest's cart.
///
/// Owned exclusively by that attempt; never persisted beyond it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (generated)
    pub id: String,

    /// Cart owner this attempt will charge and clear
    pub guest_id: String,

    /// Current step
    pub step: CheckoutStep,

    /// Overall outcome
    pub status: CheckoutStatus,

    /// Collected sender info, retained across backward moves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderInfo>,

    /// Collected recipient info, retained across backward moves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientInfo>,

    /// Bound authorization, once Payment has been entered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    /// Payer-side confirmation secret for the bound authorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Cart total the authorization is bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_total: Option<Price>,

    /// Last recoverable payment error, shown on the Payment step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Open a new session at `Start`
    pub fn new(guest_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            guest_id: guest_id.into(),
            step: CheckoutStep::Start,
            status: CheckoutStatus::Active,
            sender: None,
            recipient: None,
            payment_intent_id: None,
            client_secret: None,
            frozen_total: None,
            payment_error: None,
            created_at: Utc::now(),
        }
    }

    fn ensure_active(&self) -> OrderResult<()> {
        match self.status {
            CheckoutStatus::Active => Ok(()),
            _ => Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "session is no longer active".to_string(),
            }),
        }
    }

    /// `Start → SenderInfo`, unconditional. Guests continue without
    /// login; an authenticated branch lands here too.
    pub fn begin(&mut self) -> OrderResult<()> {
        self.ensure_active()?;
        match self.step {
            CheckoutStep::Start => {
                self.step = CheckoutStep::SenderInfo;
                Ok(())
            }
            _ => Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "checkout has already begun".to_string(),
            }),
        }
    }

    /// `SenderInfo → RecipientInfo`, guarded by name and phone
    pub fn submit_sender(&mut self, info: SenderInfo) -> OrderResult<()> {
        self.ensure_active()?;
        if self.step != CheckoutStep::SenderInfo {
            return Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "not collecting sender info".to_string(),
            });
        }
        info.validate()?;
        self.sender = Some(info);
        self.step = CheckoutStep::RecipientInfo;
        Ok(())
    }

    /// `RecipientInfo → Payment`, guarded by the full recipient form
    pub fn submit_recipient(&mut self, info: RecipientInfo) -> OrderResult<()> {
        self.ensure_active()?;
        if self.step != CheckoutStep::RecipientInfo {
            return Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "not collecting recipient info".to_string(),
            });
        }
        info.validate()?;
        self.recipient = Some(info);
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Backward transition; previously entered data stays put
    pub fn back(&mut self) -> OrderResult<()> {
        self.ensure_active()?;
        match self.step {
            CheckoutStep::RecipientInfo => {
                self.step = CheckoutStep::SenderInfo;
                Ok(())
            }
            CheckoutStep::Payment => {
                self.step = CheckoutStep::RecipientInfo;
                Ok(())
            }
            _ => Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "cannot go back from here".to_string(),
            }),
        }
    }

    /// Whether entering Payment must (re)create an authorization: none
    /// bound yet, or the cart total moved since it was frozen.
    pub fn needs_authorization(&self, current_total: &Price) -> bool {
        match (&self.payment_intent_id, &self.frozen_total) {
            (Some(_), Some(frozen)) => frozen != current_total,
            _ => true,
        }
    }

    /// Bind a freshly created authorization and freeze the total
    pub fn bind_authorization(&mut self, auth: Authorization, total: Price) {
        self.payment_intent_id = Some(auth.id);
        self.client_secret = Some(auth.client_secret);
        self.frozen_total = Some(total);
        self.payment_error = None;
    }

    /// Record a recoverable decline; the session stays at Payment
    pub fn record_decline(&mut self, reason: impl Into<String>) {
        self.payment_error = Some(reason.into());
    }

    /// `Payment → Complete` on an authoritative success
    pub fn complete(&mut self) -> OrderResult<()> {
        self.ensure_active()?;
        if self.step != CheckoutStep::Payment {
            return Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "no payment pending".to_string(),
            });
        }
        self.step = CheckoutStep::Complete;
        self.status = CheckoutStatus::Succeeded;
        self.payment_error = None;
        Ok(())
    }

    /// Terminal failure: the bound authorization was voided or expired
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = CheckoutStatus::Failed;
        self.payment_error = Some(reason.into());
    }

    /// Guard shared by payment-step operations
    pub fn ensure_at_payment(&self) -> OrderResult<()> {
        self.ensure_active()?;
        if self.step != CheckoutStep::Payment {
            return Err(OrderError::InvalidTransition {
                from: self.step.name(),
                message: "session is not at the payment step".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn sender() -> SenderInfo {
        SenderInfo {
            name: "Alex Morgan".to_string(),
            phone: "250-555-0199".to_string(),
            email: None,
            address: None,
            postal_code: None,
            contact_pref: ContactPreference::Text,
        }
    }

    fn recipient() -> RecipientInfo {
        RecipientInfo {
            first_name: "Jamie".to_string(),
            last_name: "Lee".to_string(),
            address: "1411 Maple St".to_string(),
            city: "Prince George".to_string(),
            country: "Canada".to_string(),
            postal_code: "V2M 1V8".to_string(),
            phone: "250-555-0142".to_string(),
            instructions: None,
        }
    }

    fn auth() -> Authorization {
        Authorization {
            id: "pi_test_123".to_string(),
            client_secret: "pi_test_123_secret".to_string(),
        }
    }

    #[test]
    fn test_linear_walk_to_payment() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        assert_eq!(session.step, CheckoutStep::SenderInfo);
        session.submit_sender(sender()).unwrap();
        assert_eq!(session.step, CheckoutStep::RecipientInfo);
        session.submit_recipient(recipient()).unwrap();
        assert_eq!(session.step, CheckoutStep::Payment);
    }

    #[test]
    fn test_sender_guard() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        let mut incomplete = sender();
        incomplete.phone = String::new();
        assert!(session.submit_sender(incomplete).is_err());
        assert_eq!(session.step, CheckoutStep::SenderInfo);
        assert!(session.sender.is_none());
    }

    #[test]
    fn test_recipient_guard() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        session.submit_sender(sender()).unwrap();
        let mut incomplete = recipient();
        incomplete.postal_code = "  ".to_string();
        assert!(session.submit_recipient(incomplete).is_err());
        assert_eq!(session.step, CheckoutStep::RecipientInfo);
    }

    #[test]
    fn test_out_of_order_submission_rejected() {
        let mut session = CheckoutSession::new("guest-1");
        assert!(matches!(
            session.submit_recipient(recipient()),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_back_preserves_data() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        session.submit_sender(sender()).unwrap();
        session.submit_recipient(recipient()).unwrap();

        session.back().unwrap();
        assert_eq!(session.step, CheckoutStep::RecipientInfo);
        session.back().unwrap();
        assert_eq!(session.step, CheckoutStep::SenderInfo);
        assert!(session.sender.is_some());
        assert!(session.recipient.is_some());
        assert!(session.back().is_err());
    }

    #[test]
    fn test_needs_authorization() {
        let mut session = CheckoutSession::new("guest-1");
        let total = Price::from_cents(5800, Currency::CAD);
        assert!(session.needs_authorization(&total));

        session.bind_authorization(auth(), total);
        assert!(!session.needs_authorization(&total));

        let changed = Price::from_cents(8800, Currency::CAD);
        assert!(session.needs_authorization(&changed));
    }

    #[test]
    fn test_complete_only_from_payment() {
        let mut session = CheckoutSession::new("guest-1");
        assert!(session.complete().is_err());

        session.begin().unwrap();
        session.submit_sender(sender()).unwrap();
        session.submit_recipient(recipient()).unwrap();
        session.bind_authorization(auth(), Price::from_cents(5800, Currency::CAD));
        session.complete().unwrap();
        assert_eq!(session.status, CheckoutStatus::Succeeded);
        assert_eq!(session.step, CheckoutStep::Complete);

        // Nothing moves after a terminal state
        assert!(session.back().is_err());
        assert!(session.complete().is_err());
    }

    #[test]
    fn test_decline_keeps_session_recoverable() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        session.submit_sender(sender()).unwrap();
        session.submit_recipient(recipient()).unwrap();
        session.bind_authorization(auth(), Price::from_cents(5800, Currency::CAD));

        session.record_decline("insufficient funds");
        assert_eq!(session.status, CheckoutStatus::Active);
        assert_eq!(session.step, CheckoutStep::Payment);
        assert_eq!(session.payment_error.as_deref(), Some("insufficient funds"));

        // Still completable after a retry succeeds
        session.complete().unwrap();
        assert!(session.payment_error.is_none());
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut session = CheckoutSession::new("guest-1");
        session.begin().unwrap();
        session.fail("authorization canceled");
        assert_eq!(session.status, CheckoutStatus::Failed);
        assert!(session.submit_sender(sender()).is_err());
    }
}
