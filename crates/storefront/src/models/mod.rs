//! Row types and view models for the storefront.

pub mod content;
pub mod notification;
pub mod order;
pub mod product;
pub mod session;

pub use content::{BannerView, BlockView, HomePage, SectionView, safe_footer};
pub use notification::Notification;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use product::{FamilySummary, Product, ProductFamily};
pub use session::{CurrentUser, keys};
