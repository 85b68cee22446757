//! Bearing Shop Core - Shared types library.
//!
//! This crate provides common types used across all Bearing Shop components:
//! - `storefront` - Public-facing catalog, cart and checkout
//! - `admin` - Catalog, order and home-page content administration
//! - `cli` - Command-line tools for migrations, roles and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and arithmetic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, money, locales and statuses
//! - [`catalog`] - Product and product family shapes, including nested specs
//! - [`order`] - Shipping address
//! - [`content`] - Home page content block payloads and translation overlay
//! - [`cart`] - Shopping cart operations
//! - [`pricing`] - Checkout totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod content;
pub mod order;
pub mod pricing;
pub mod types;

pub use cart::{Cart, CartItem};
pub use pricing::{CheckoutPolicy, CheckoutTotals};
pub use types::*;
