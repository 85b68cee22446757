//! Session-related types.
//!
//! Types stored in the session for authentication state and visitor
//! preferences.

use serde::{Deserialize, Serialize};

use bearing_shop_core::{Email, ProfileRole, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Supabase auth user ID (also the `profiles` primary key).
    pub id: UserId,
    pub email: Email,
    pub role: ProfileRole,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the Supabase access token, used to revoke the session on logout.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the visitor's cart.
    pub const CART: &str = "cart";

    /// Key for the selected display currency.
    pub const CURRENCY: &str = "currency";

    /// Key for the selected content locale.
    pub const LOCALE: &str = "locale";

    /// Key for the page to return to after login.
    pub const RETURN_TO: &str = "return_to";
}
