//! Reklama Storefront library.
//!
//! The client side of the Reklama shop: a persisted shopping cart with
//! derived totals, a REST client for the catalog/order/payment API, the
//! checkout handoff, and the payment-status confirmation poll.
//!
//! # Modules
//!
//! - [`cart`] - Cart store, line items, persistence adapter
//! - [`storage`] - Durable key-value medium (file-backed or in-memory)
//! - [`api`] - REST client for products, orders and payments
//! - [`checkout`] - Order submission and payment-session handoff
//! - [`payment`] - Cancellable payment-status poll
//! - [`preferences`] - Persisted language and admin token
//! - [`state`] - Explicitly injected application state
//! - [`config`] - Environment-driven configuration
//! - [`error`] - `AppError` and Sentry reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod payment;
pub mod preferences;
pub mod state;
pub mod storage;
