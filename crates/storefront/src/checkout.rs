//! Checkout handoff: turn the cart into an order and a hosted payment page.
//!
//! The cart is read, never modified. It is cleared only after the payment
//! is confirmed (see [`crate::payment::confirm`]), so a failed or abandoned
//! checkout leaves it intact for another attempt.

use reklama_core::{Email, EmailError, OrderId, PaymentSessionId};
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use crate::api::{ApiError, CommerceApi, OrderItem, OrderRequest};
use crate::cart::{CartLineItem, CartStore};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// A required customer field was blank.
    #[error("Missing customer {0}")]
    MissingField(&'static str),

    /// The customer email was rejected.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Creating the order or the payment session failed.
    #[error("Checkout failed: {0}")]
    Api(#[from] ApiError),
}

impl CheckoutError {
    /// Whether submitting the same cart and details again may succeed.
    ///
    /// Input problems must be fixed first; API failures can be retried
    /// as-is since the cart is left untouched.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

/// Contact and delivery details collected on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    name: String,
    email: Email,
    phone: String,
    address: String,
}

impl CustomerDetails {
    /// Validate and build customer details.
    ///
    /// All fields are trimmed and required.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingField` for a blank field, or
    /// `CheckoutError::InvalidEmail` if the email is malformed.
    pub fn new(
        name: &str,
        email: &str,
        phone: &str,
        address: &str,
    ) -> Result<Self, CheckoutError> {
        let name = required("name", name)?;
        let email = Email::parse(&required("email", email)?)?;
        let phone = required("phone", phone)?;
        let address = required("address", address)?;

        Ok(Self {
            name,
            email,
            phone,
            address,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

fn required(field: &'static str, value: &str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::MissingField(field));
    }
    Ok(value.to_owned())
}

/// Where to send the customer to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    /// Order created for the cart.
    pub order_id: OrderId,
    /// Hosted payment page.
    pub checkout_url: Url,
    /// Session to confirm once the customer returns.
    pub session_id: PaymentSessionId,
}

/// Build the order body for the given cart lines.
fn order_request(lines: &[CartLineItem], customer: &CustomerDetails) -> OrderRequest {
    OrderRequest {
        items: lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
            })
            .collect(),
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone(),
        customer_phone: customer.phone.clone(),
        customer_address: customer.address.clone(),
    }
}

/// Submit the cart as an order and open a payment session for it.
///
/// `origin_url` is where the payment page returns the customer.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` without contacting the API when the
/// cart has no lines, or `CheckoutError::Api` if either request fails. The
/// cart is unchanged in every case.
#[instrument(skip_all, fields(lines, total))]
pub async fn submit<A: CommerceApi>(
    cart: &CartStore,
    api: &A,
    customer: &CustomerDetails,
    origin_url: &Url,
) -> Result<CheckoutRedirect, CheckoutError> {
    let snapshot = cart.snapshot();
    if snapshot.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let span = tracing::Span::current();
    span.record("lines", snapshot.items().len());
    span.record("total", tracing::field::display(snapshot.total()));

    crate::error::add_breadcrumb("checkout", "Submitting order", None);

    let order = api
        .create_order(&order_request(snapshot.items(), customer))
        .await?;
    info!(order_id = %order.id, "Order created");

    let session = api.create_checkout_session(&order.id, origin_url).await?;
    info!(order_id = %order.id, session_id = %session.session_id, "Payment session opened");

    Ok(CheckoutRedirect {
        order_id: order.id,
        checkout_url: session.checkout_url,
        session_id: session.session_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::api::{CheckoutSession, OrderCreated, PaymentStatusResponse};
    use crate::cart::test_support::product;

    #[derive(Default)]
    struct FakeApi {
        orders: Mutex<Vec<OrderRequest>>,
        sessions: Mutex<Vec<(OrderId, Url)>>,
        fail_orders: bool,
        fail_sessions: bool,
    }

    impl CommerceApi for FakeApi {
        async fn create_order(&self, order: &OrderRequest) -> Result<OrderCreated, ApiError> {
            if self.fail_orders {
                return Err(ApiError::Status {
                    status: 500,
                    message: "database unavailable".to_string(),
                });
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(OrderCreated {
                id: OrderId::new("ord-1"),
                total_amount: None,
            })
        }

        async fn create_checkout_session(
            &self,
            order_id: &OrderId,
            origin_url: &Url,
        ) -> Result<CheckoutSession, ApiError> {
            if self.fail_sessions {
                return Err(ApiError::NotFound(format!("order {order_id}")));
            }
            self.sessions
                .lock()
                .unwrap()
                .push((order_id.clone(), origin_url.clone()));
            Ok(CheckoutSession {
                checkout_url: Url::parse("https://pay.example.com/c/cs_1").unwrap(),
                session_id: PaymentSessionId::new("cs_1"),
            })
        }

        async fn payment_status(
            &self,
            _session_id: &PaymentSessionId,
        ) -> Result<PaymentStatusResponse, ApiError> {
            unreachable!("checkout never polls")
        }
    }

    fn customer() -> CustomerDetails {
        CustomerDetails::new(" Dilnoza ", "dilnoza@example.uz", "+998901234567", "Samarkand").unwrap()
    }

    fn origin() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    fn filled_cart() -> CartStore {
        let cart = CartStore::in_memory();
        cart.add_item(&product("a", "10.00", 5), 2);
        cart.add_item(&product("b", "0.75", 100), 40);
        cart
    }

    #[test]
    fn test_customer_fields_are_trimmed() {
        let details = customer();
        assert_eq!(details.name(), "Dilnoza");
        assert_eq!(details.email().as_str(), "dilnoza@example.uz");
    }

    #[test]
    fn test_customer_blank_field_rejected() {
        let err = CustomerDetails::new("Ali", "ali@example.uz", "   ", "Bukhara").unwrap_err();
        assert!(matches!(err, CheckoutError::MissingField("phone")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_customer_invalid_email_rejected() {
        let err = CustomerDetails::new("Ali", "ali.example.uz", "1", "Bukhara").unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_calls() {
        let api = FakeApi::default();
        let err = submit(&CartStore::in_memory(), &api, &customer(), &origin())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(api.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_builds_order_from_cart() {
        let cart = filled_cart();
        let api = FakeApi::default();

        let redirect = submit(&cart, &api, &customer(), &origin()).await.unwrap();

        assert_eq!(redirect.order_id.as_str(), "ord-1");
        assert_eq!(redirect.session_id.as_str(), "cs_1");
        assert_eq!(redirect.checkout_url.host_str(), Some("pay.example.com"));

        let orders = api.orders.lock().unwrap();
        let order = &orders[0];
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_id.as_str(), "a");
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[1].quantity, 40);
        assert_eq!(order.customer_name, "Dilnoza");

        let sessions = api.sessions.lock().unwrap();
        assert_eq!(sessions[0], (OrderId::new("ord-1"), origin()));
    }

    #[tokio::test]
    async fn test_submit_leaves_cart_untouched() {
        let cart = filled_cart();
        let before = cart.items();

        submit(&cart, &FakeApi::default(), &customer(), &origin())
            .await
            .unwrap();

        assert_eq!(cart.items(), before);
    }

    #[tokio::test]
    async fn test_order_failure_preserves_cart() {
        let cart = filled_cart();
        let before = cart.items();
        let api = FakeApi {
            fail_orders: true,
            ..FakeApi::default()
        };

        let err = submit(&cart, &api, &customer(), &origin()).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(cart.items(), before);
        assert!(api.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_failure_preserves_cart() {
        let cart = filled_cart();
        let api = FakeApi {
            fail_sessions: true,
            ..FakeApi::default()
        };

        let err = submit(&cart, &api, &customer(), &origin()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Api(ApiError::NotFound(_))));
        assert_eq!(cart.cart_count(), 42);
    }
}
