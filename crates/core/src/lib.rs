//! Reklama Core - Shared domain types.
//!
//! This crate provides the types shared by every Reklama component:
//! - `storefront` - Cart store, REST client, checkout and payment confirmation
//! - `cli` - The `rk` command-line storefront
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, statuses and languages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
