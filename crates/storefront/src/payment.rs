//! Payment confirmation after the customer returns from the payment page.
//!
//! The backend learns about payments asynchronously, so the first status
//! query right after the redirect may still say "unpaid". [`PaymentPoller`]
//! queries a bounded number of times with a fixed delay and reports one of
//! four outcomes. It never fails: request errors become
//! [`PaymentOutcome::Unknown`] so the caller always has something to show.
//!
//! Polling stops as soon as it is cancelled. A poll running in the
//! background through [`PollHandle`] is cancelled by [`PollHandle::cancel`]
//! or by dropping the handle, e.g. when the user navigates away.

use std::fmt;
use std::time::Duration;

use reklama_core::{PaymentSessionId, Price};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{CommerceApi, PaymentStatusResponse};
use crate::cart::CartStore;
use crate::config::PaymentPollConfig;

/// What a payment confirmation ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The payment went through.
    Paid(PaymentReceipt),
    /// The payment session expired before the customer paid.
    Expired,
    /// No definitive answer.
    Unknown(UnknownReason),
    /// Polling was stopped before an answer arrived.
    Cancelled,
}

/// Why a payment outcome is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// Every allowed query reported the payment as still pending.
    AttemptsExhausted,
    /// A status query failed.
    StatusUnavailable,
}

impl PaymentOutcome {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid(_))
    }

    /// Message to show the customer.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Paid(_) => {
                "Thank you for your purchase! Your order has been confirmed and will be processed shortly."
            }
            Self::Expired => "Your payment session has expired. Please try again.",
            Self::Unknown(_) => {
                "We couldn't verify your payment status. Please check your email for confirmation or contact support."
            }
            Self::Cancelled => "Payment check stopped.",
        }
    }
}

/// Amount reported for a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Amount charged in cents.
    pub amount_total: Option<i64>,
    /// ISO currency code as reported by the payment provider.
    pub currency: Option<String>,
}

impl PaymentReceipt {
    fn from_status(status: &PaymentStatusResponse) -> Self {
        Self {
            amount_total: status.amount_total,
            currency: status.currency.clone(),
        }
    }

    /// Amount charged, converted from cents.
    #[must_use]
    pub fn amount(&self) -> Option<Price> {
        self.amount_total.map(Price::from_cents)
    }
}

impl fmt::Display for PaymentReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.amount(), &self.currency) {
            // The code names the currency; `Price` display assumes dollars
            (Some(amount), Some(currency)) => {
                write!(f, "{:.2} {}", amount.rounded(), currency.to_uppercase())
            }
            (Some(amount), None) => write!(f, "{amount}"),
            (None, _) => f.write_str("amount not reported"),
        }
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Bounded, cancellable payment status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPoller {
    max_attempts: u32,
    interval: Duration,
}

impl Default for PaymentPoller {
    fn default() -> Self {
        Self::from_config(&PaymentPollConfig::default())
    }
}

impl PaymentPoller {
    /// Create a poller making at most `max_attempts` queries (at least one),
    /// `interval` apart.
    #[must_use]
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    #[must_use]
    pub fn from_config(config: &PaymentPollConfig) -> Self {
        Self::new(config.max_attempts, config.interval)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Query the status of `session_id` until it is decided.
    ///
    /// Paid wins over expired when a response reports both. Setting `cancel`
    /// to `true`, or dropping its sender, stops the poll at the next check
    /// or mid-wait; no query is issued after that.
    #[instrument(skip(self, api, cancel), fields(session_id = %session_id))]
    pub async fn poll<A: CommerceApi>(
        &self,
        api: &A,
        session_id: &PaymentSessionId,
        cancel: &mut watch::Receiver<bool>,
    ) -> PaymentOutcome {
        for attempt in 1..=self.max_attempts {
            if is_cancelled(cancel) {
                debug!(attempt, "Payment poll cancelled");
                return PaymentOutcome::Cancelled;
            }

            let response = tokio::select! {
                response = api.payment_status(session_id) => response,
                () = cancelled(cancel) => return PaymentOutcome::Cancelled,
            };

            match response {
                Ok(status) if status.payment_status.is_paid() => {
                    info!(attempt, "Payment confirmed");
                    return PaymentOutcome::Paid(PaymentReceipt::from_status(&status));
                }
                Ok(status) if status.status.is_expired() => {
                    info!(attempt, "Payment session expired");
                    return PaymentOutcome::Expired;
                }
                Ok(status) => {
                    debug!(
                        attempt,
                        status = ?status.status,
                        payment_status = ?status.payment_status,
                        "Payment still pending"
                    );
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Payment status query failed");
                    return PaymentOutcome::Unknown(UnknownReason::StatusUnavailable);
                }
            }

            // No point waiting after the last query
            if attempt < self.max_attempts {
                tokio::select! {
                    () = tokio::time::sleep(self.interval) => {}
                    () = cancelled(cancel) => return PaymentOutcome::Cancelled,
                }
            }
        }

        warn!(attempts = self.max_attempts, "Payment still pending after all attempts");
        PaymentOutcome::Unknown(UnknownReason::AttemptsExhausted)
    }

    /// Run [`confirm`] on the tokio runtime.
    ///
    /// The poll stops when the returned handle is cancelled or dropped.
    pub fn spawn<A>(&self, api: A, cart: CartStore, session_id: PaymentSessionId) -> PollHandle
    where
        A: CommerceApi + 'static,
    {
        let (cancel, mut signal) = watch::channel(false);
        let poller = *self;

        let task = tokio::spawn(async move {
            confirm(&poller, &cart, &api, &session_id, &mut signal).await
        });

        PollHandle { cancel, task }
    }
}

/// Poll the payment and clear `cart` once it is confirmed paid.
///
/// Any other outcome leaves the cart untouched.
pub async fn confirm<A: CommerceApi>(
    poller: &PaymentPoller,
    cart: &CartStore,
    api: &A,
    session_id: &PaymentSessionId,
    cancel: &mut watch::Receiver<bool>,
) -> PaymentOutcome {
    let outcome = poller.poll(api, session_id, cancel).await;
    if outcome.is_paid() {
        cart.clear();
        crate::error::add_breadcrumb(
            "payment",
            "Payment confirmed, cart cleared",
            Some(&[("session_id", session_id.as_str())]),
        );
    }
    outcome
}

fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

/// Resolves once `cancel` is set or its sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

// =============================================================================
// PollHandle
// =============================================================================

/// Handle to a payment poll running in the background.
///
/// Dropping the handle cancels the poll.
#[derive(Debug)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<PaymentOutcome>,
}

impl PollHandle {
    /// Stop the poll; no further status queries are made.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Returns `true` once the poll has produced its outcome.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll's outcome.
    pub async fn outcome(self) -> PaymentOutcome {
        let Self { cancel, task } = self;
        let outcome = task.await;
        drop(cancel);

        outcome.unwrap_or_else(|e| {
            if e.is_cancelled() {
                PaymentOutcome::Cancelled
            } else {
                tracing::error!(error = %e, "Payment poll task failed");
                PaymentOutcome::Unknown(UnknownReason::StatusUnavailable)
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use reklama_core::{OrderId, PaymentStatus, SessionStatus};
    use tokio::time::Instant;
    use url::Url;

    use super::*;
    use crate::api::{ApiError, CheckoutSession, OrderCreated, OrderRequest};
    use crate::cart::test_support::product;

    /// Answers status queries from a script, then "pending" forever.
    #[derive(Clone, Default)]
    struct ScriptedApi {
        script: Arc<Mutex<VecDeque<Result<PaymentStatusResponse, ApiError>>>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedApi {
        fn new(script: Vec<Result<PaymentStatusResponse, ApiError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CommerceApi for ScriptedApi {
        async fn create_order(&self, _order: &OrderRequest) -> Result<OrderCreated, ApiError> {
            unreachable!("poller never creates orders")
        }

        async fn create_checkout_session(
            &self,
            _order_id: &OrderId,
            _origin_url: &Url,
        ) -> Result<CheckoutSession, ApiError> {
            unreachable!("poller never opens sessions")
        }

        async fn payment_status(
            &self,
            _session_id: &PaymentSessionId,
        ) -> Result<PaymentStatusResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(pending()))
        }
    }

    fn pending() -> PaymentStatusResponse {
        PaymentStatusResponse {
            status: SessionStatus::Open,
            payment_status: PaymentStatus::Unpaid,
            amount_total: None,
            currency: None,
        }
    }

    fn paid() -> PaymentStatusResponse {
        PaymentStatusResponse {
            status: SessionStatus::Complete,
            payment_status: PaymentStatus::Paid,
            amount_total: Some(4_250),
            currency: Some("usd".to_string()),
        }
    }

    fn expired() -> PaymentStatusResponse {
        PaymentStatusResponse {
            status: SessionStatus::Expired,
            ..pending()
        }
    }

    fn session() -> PaymentSessionId {
        PaymentSessionId::new("cs_test_1")
    }

    fn never_cancelled() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive for the whole test
        std::mem::forget(tx);
        rx
    }

    fn filled_cart() -> CartStore {
        let cart = CartStore::in_memory();
        cart.add_item(&product("a", "42.50", 3), 1);
        cart
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_on_first_attempt() {
        let api = ScriptedApi::new(vec![Ok(paid())]);
        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        let PaymentOutcome::Paid(receipt) = outcome else {
            panic!("expected Paid");
        };
        assert_eq!(receipt.to_string(), "42.50 USD");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_after_pending_attempts() {
        let api = ScriptedApi::new(vec![Ok(pending()), Ok(pending()), Ok(paid())]);
        let start = Instant::now();

        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        assert!(outcome.is_paid());
        assert_eq!(api.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session() {
        let api = ScriptedApi::new(vec![Ok(pending()), Ok(expired())]);
        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        assert_eq!(outcome, PaymentOutcome::Expired);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_wins_over_expired() {
        let api = ScriptedApi::new(vec![Ok(PaymentStatusResponse {
            status: SessionStatus::Expired,
            ..paid()
        })]);
        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        assert!(outcome.is_paid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_without_trailing_wait() {
        let api = ScriptedApi::default();
        let start = Instant::now();

        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        assert_eq!(
            outcome,
            PaymentOutcome::Unknown(UnknownReason::AttemptsExhausted)
        );
        assert_eq!(api.calls(), 5);
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_error_stops_immediately() {
        let api = ScriptedApi::new(vec![
            Ok(pending()),
            Err(ApiError::Status {
                status: 502,
                message: "bad gateway".to_string(),
            }),
        ]);
        let outcome = PaymentPoller::default()
            .poll(&api, &session(), &mut never_cancelled())
            .await;

        assert_eq!(
            outcome,
            PaymentOutcome::Unknown(UnknownReason::StatusUnavailable)
        );
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let api = ScriptedApi::default();
        let (tx, mut rx) = watch::channel(false);
        tx.send_replace(true);

        let outcome = PaymentPoller::default().poll(&api, &session(), &mut rx).await;

        assert_eq!(outcome, PaymentOutcome::Cancelled);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_queries_once() {
        let api = ScriptedApi::default();
        let poller = PaymentPoller::new(0, Duration::from_secs(1));

        let outcome = poller.poll(&api, &session(), &mut never_cancelled()).await;

        assert_eq!(poller.max_attempts(), 1);
        assert_eq!(
            outcome,
            PaymentOutcome::Unknown(UnknownReason::AttemptsExhausted)
        );
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_clears_cart_only_when_paid() {
        let cart = filled_cart();
        let api = ScriptedApi::new(vec![Ok(expired())]);
        let outcome = confirm(
            &PaymentPoller::default(),
            &cart,
            &api,
            &session(),
            &mut never_cancelled(),
        )
        .await;
        assert_eq!(outcome, PaymentOutcome::Expired);
        assert_eq!(cart.cart_count(), 1);

        let api = ScriptedApi::new(vec![Ok(paid())]);
        let outcome = confirm(
            &PaymentPoller::default(),
            &cart,
            &api,
            &session(),
            &mut never_cancelled(),
        )
        .await;
        assert!(outcome.is_paid());
        assert!(cart.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poll_confirms_payment() {
        let cart = filled_cart();
        let api = ScriptedApi::new(vec![Ok(pending()), Ok(paid())]);

        let handle = PaymentPoller::default().spawn(api.clone(), cart.clone(), session());
        let outcome = handle.outcome().await;

        assert!(outcome.is_paid());
        assert!(cart.is_empty());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wakes_waiting_poll() {
        let cart = filled_cart();
        let api = ScriptedApi::default();

        let handle = PaymentPoller::default().spawn(api.clone(), cart.clone(), session());
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        assert_eq!(handle.outcome().await, PaymentOutcome::Cancelled);
        assert_eq!(api.calls(), 1);
        assert_eq!(cart.cart_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let api = ScriptedApi::default();

        let handle = PaymentPoller::default().spawn(api.clone(), filled_cart(), session());
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(api.calls(), 1);
    }

    #[test]
    fn test_receipt_display() {
        let receipt = PaymentReceipt {
            amount_total: Some(199),
            currency: None,
        };
        assert_eq!(receipt.to_string(), "$1.99");

        let receipt = PaymentReceipt {
            amount_total: Some(1_250_000),
            currency: Some("uzs".to_string()),
        };
        assert_eq!(receipt.to_string(), "12500.00 UZS");

        let receipt = PaymentReceipt {
            amount_total: None,
            currency: Some("uzs".to_string()),
        };
        assert_eq!(receipt.to_string(), "amount not reported");
    }
}
