//! Staff role management.
//!
//! Staff accounts are ordinary Supabase users. After someone signs up on
//! the storefront, `role grant` lifts their profile to `viewer` (read-only
//! admin) or `admin`; granting `customer` blocks new admin sign-ins.

use bearing_shop_core::{Email, ProfileRole};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum RoleError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: customer, viewer, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No profile yet; the user has to sign up first.
    #[error("No profile with email {0}; the user must sign up on the storefront first")]
    ProfileNotFound(String),
}

fn parse_args(email: &str, role: &str) -> Result<(Email, ProfileRole), RoleError> {
    let role: ProfileRole = role
        .trim()
        .parse()
        .map_err(|_| RoleError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| RoleError::InvalidEmail(email.to_owned()))?;
    Ok((email, role))
}

/// Set the role of the profile with this email.
///
/// # Errors
///
/// Returns an error for an unknown role, a malformed email, a missing
/// profile, or a database failure.
pub async fn grant(email: &str, role: &str) -> Result<(), RoleError> {
    let (email, role) = parse_args(email, role)?;
    let pool = connect().await?;

    let previous: Option<ProfileRole> = sqlx::query_scalar(
        r"
        UPDATE profiles p
        SET role = $2
        FROM (SELECT id, role FROM profiles WHERE LOWER(email) = LOWER($1) FOR UPDATE) old
        WHERE p.id = old.id
        RETURNING old.role
        ",
    )
    .bind(email.as_str())
    .bind(role)
    .fetch_optional(&pool)
    .await?;

    let Some(previous) = previous else {
        return Err(RoleError::ProfileNotFound(email.to_string()));
    };

    tracing::info!(%email, from = %previous, to = %role, "Role updated");
    if role.can_access_admin() {
        tracing::info!("{email} can now sign in to the admin panel");
    } else {
        tracing::warn!("{email} can no longer sign in; an open admin session lasts until it expires");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let (email, role) = parse_args("Staff@Example.com", "viewer").unwrap();
        assert_eq!(email.domain(), "example.com");
        assert_eq!(role, ProfileRole::Viewer);

        assert!(matches!(
            parse_args("staff@example.com", "owner"),
            Err(RoleError::InvalidRole(_))
        ));
        assert!(matches!(
            parse_args("not-an-email", "admin"),
            Err(RoleError::InvalidEmail(_))
        ));
    }
}
