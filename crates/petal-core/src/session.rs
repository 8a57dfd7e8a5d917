//! # Checkout Orchestration
//!
//! Drives [`CheckoutSession`](crate::checkout::CheckoutSession) state
//! against the cart store and payment gateway. Sessions live in an
//! in-memory registry behind per-session async mutexes: repeated or
//! concurrent entry into Payment is serialized here, and the gateway
//! request carries an idempotency key, so one session can never hold two
//! live authorizations for the same total.

use crate::checkout::{CheckoutSession, CheckoutStep, RecipientInfo, SenderInfo};
use crate::error::{OrderError, OrderResult};
use crate::gateway::{AuthorizationStatus, BoxedPaymentGateway, GatewayEvent, GatewayEventType};
use crate::store::CartStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// In-memory registry of live checkout attempts.
///
/// Sessions are owned by one attempt and die with the process; an
/// abandoned session simply expires, and its unconfirmed authorization
/// lapses on the gateway's own schedule.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<CheckoutSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, session: CheckoutSession) -> Arc<Mutex<CheckoutSession>> {
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.lock().await.insert(id, Arc::clone(&handle));
        handle
    }

    async fn get(&self, session_id: &str) -> OrderResult<Arc<Mutex<CheckoutSession>>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| OrderError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    async fn all(&self) -> Vec<Arc<Mutex<CheckoutSession>>> {
        self.sessions.lock().await.values().cloned().collect()
    }
}

/// Checkout flow coordinator: the only code that talks to the payment
/// gateway, and the only code that clears a cart on success.
pub struct CheckoutService {
    store: Arc<CartStore>,
    gateway: BoxedPaymentGateway,
    sessions: SessionStore,
}

impl CheckoutService {
    pub fn new(store: Arc<CartStore>, gateway: BoxedPaymentGateway) -> Self {
        Self {
            store,
            gateway,
            sessions: SessionStore::new(),
        }
    }

    pub fn cart_store(&self) -> &Arc<CartStore> {
        &self.store
    }

    /// Open a session for a guest. The `Start → SenderInfo` transition
    /// is unconditional, so the returned snapshot is already collecting
    /// sender info.
    pub async fn open(&self, guest_id: &str) -> OrderResult<CheckoutSession> {
        let cart = self.store.get(guest_id).await?;
        if cart.is_empty() {
            return Err(OrderError::InvalidRequest(
                "cannot check out an empty cart".to_string(),
            ));
        }

        let mut session = CheckoutSession::new(guest_id);
        session.begin()?;
        info!(session_id = %session.id, guest_id, "checkout session opened");
        let handle = self.sessions.insert(session).await;
        let snapshot = handle.lock().await.clone();
        Ok(snapshot)
    }

    /// Snapshot a session
    pub async fn get(&self, session_id: &str) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// Submit the sender form; advances to recipient collection
    pub async fn submit_sender(
        &self,
        session_id: &str,
        info: SenderInfo,
    ) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.submit_sender(info)?;
        Ok(session.clone())
    }

    /// Submit the recipient form; advances to the payment step
    pub async fn submit_recipient(
        &self,
        session_id: &str,
        info: RecipientInfo,
    ) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.submit_recipient(info)?;
        Ok(session.clone())
    }

    /// Step backward without losing entered data
    pub async fn go_back(&self, session_id: &str) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.back()?;
        Ok(session.clone())
    }

    /// Enter the payment step: freeze the server-computed cart total and
    /// bind exactly one authorization to it.
    ///
    /// Re-entry with an unchanged total reuses the bound authorization.
    /// A changed total voids the old one and binds a fresh authorization
    /// to the new amount. The whole sequence runs under the session's
    /// mutex, so concurrent entries cannot double-create.
    pub async fn enter_payment(&self, session_id: &str) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.ensure_at_payment()?;

        // Recomputed from stored state at charge time; client-supplied
        // totals are never trusted.
        let total = self.store.total(&session.guest_id).await?;

        if !session.needs_authorization(&total) {
            debug!(session_id, "reusing bound authorization");
            return Ok(session.clone());
        }

        if let Some(stale) = session.payment_intent_id.clone() {
            info!(session_id, authorization_id = %stale, "total changed; voiding stale authorization");
            self.gateway.cancel_authorization(&stale).await?;
        }

        let idempotency_key = format!("{}:{}", session.id, total.amount);
        let auth = self
            .gateway
            .create_authorization(&total, &idempotency_key)
            .await?;
        info!(
            session_id,
            authorization_id = %auth.id,
            amount = total.amount,
            "authorization bound to frozen total"
        );
        session.bind_authorization(auth, total);
        Ok(session.clone())
    }

    /// Ask the gateway for the authoritative result of the bound
    /// authorization and advance the session accordingly.
    ///
    /// Success completes the session and clears the cart. A decline
    /// keeps the session at Payment for re-attempt and surfaces a 402. A
    /// canceled authorization kills the session.
    pub async fn confirm_payment(&self, session_id: &str) -> OrderResult<CheckoutSession> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.ensure_at_payment()?;

        let authorization_id = session.payment_intent_id.clone().ok_or_else(|| {
            OrderError::InvalidTransition {
                from: session.step.name(),
                message: "no authorization bound; enter payment first".to_string(),
            }
        })?;

        match self.gateway.confirm_authorization(&authorization_id).await? {
            AuthorizationStatus::Succeeded => {
                session.complete()?;
                self.store.clear(&session.guest_id).await?;
                info!(session_id, guest_id = %session.guest_id, "checkout complete; cart cleared");
                Ok(session.clone())
            }
            AuthorizationStatus::Pending => {
                debug!(session_id, "authorization still awaiting payer confirmation");
                Ok(session.clone())
            }
            AuthorizationStatus::Declined { reason } => {
                session.record_decline(reason.clone());
                warn!(session_id, %reason, "payment declined");
                Err(OrderError::PaymentDeclined { reason })
            }
            AuthorizationStatus::Canceled => {
                session.fail("authorization was canceled");
                warn!(session_id, "authorization canceled; session failed");
                Err(OrderError::PaymentDeclined {
                    reason: "authorization was canceled; start a new checkout".to_string(),
                })
            }
        }
    }

    /// Apply a verified gateway event to the session holding the
    /// matching authorization. Idempotent: an event for an already
    /// completed session is a no-op.
    pub async fn apply_gateway_event(&self, event: GatewayEvent) -> OrderResult<()> {
        let Some(authorization_id) = event.authorization_id.clone() else {
            debug!(event_id = %event.event_id, "gateway event without authorization id; ignored");
            return Ok(());
        };

        for handle in self.sessions.all().await {
            let mut session = handle.lock().await;
            if session.payment_intent_id.as_deref() != Some(authorization_id.as_str()) {
                continue;
            }

            match event.event_type {
                GatewayEventType::PaymentSucceeded => {
                    if session.step == CheckoutStep::Payment {
                        session.complete()?;
                        self.store.clear(&session.guest_id).await?;
                        info!(
                            session_id = %session.id,
                            event_id = %event.event_id,
                            "gateway event completed checkout"
                        );
                    }
                }
                GatewayEventType::PaymentFailed => {
                    let reason = event
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "payment failed".to_string());
                    session.record_decline(reason);
                }
                GatewayEventType::PaymentCanceled => {
                    session.fail("authorization was canceled");
                }
                GatewayEventType::Unknown(ref kind) => {
                    debug!(event_id = %event.event_id, kind, "unhandled gateway event");
                }
            }
            return Ok(());
        }

        debug!(
            event_id = %event.event_id,
            authorization_id,
            "gateway event matched no live session"
        );
        Ok(())
    }
}
