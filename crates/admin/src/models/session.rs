//! Session-stored staff identity.

use serde::{Deserialize, Serialize};

use bearing_shop_core::{Email, ProfileRole, UserId};

/// The signed-in staff member.
///
/// Written at login once the profile role has been checked; only `viewer`
/// and `admin` profiles ever get here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Supabase auth user ID (also the `profiles` primary key).
    pub id: UserId,
    pub email: Email,
    pub role: ProfileRole,
}

impl CurrentAdmin {
    /// Whether this staff member may change data.
    #[must_use]
    pub const fn can_edit(&self) -> bool {
        self.role.can_edit()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current staff member.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the Supabase access token, revoked on logout.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// One-shot message shown on the next page (e.g. "Product saved").
    pub const FLASH: &str = "flash";
}
