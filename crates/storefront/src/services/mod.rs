//! Business logic that spans repositories and external APIs.

pub mod checkout;
pub mod email;
pub mod feed;
pub mod home;

pub use checkout::{CheckoutError, CheckoutService, PlacedOrder};
pub use email::{EmailError, EmailService};
pub use feed::NotificationFeed;
pub use home::HomeCache;
