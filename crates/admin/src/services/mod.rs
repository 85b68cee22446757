//! Business logic that spans repositories and external services.
//!
//! # Services
//!
//! - `email` - Status-update email delivery via SMTP
//! - `images` - Multipart image uploads to the storage bucket
//! - `orders` - Order status changes with their customer side effects

pub mod email;
pub mod images;
pub mod orders;

pub use email::{EmailError, EmailService, StatusUpdate};
pub use images::{ImageUpload, discard_images, read_image_upload, store_image};
pub use orders::{
    AppliedChange, StatusChange, StatusChangeError, apply_status_change, validate_status_change,
};
