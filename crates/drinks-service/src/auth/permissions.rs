//! Permission names and the post-verification permission check.

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use std::fmt;

/// Permissions the drink menu grants through the identity provider's RBAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// View the full recipe of every drink.
    GetDrinksDetail,
    /// Add a drink to the menu.
    PostDrinks,
    /// Modify an existing drink.
    PatchDrinks,
    /// Remove a drink from the menu.
    DeleteDrinks,
}

impl Permission {
    /// Permission string as it appears in the `permissions` claim.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::GetDrinksDetail => "get:drinks-detail",
            Permission::PostDrinks => "post:drinks",
            Permission::PatchDrinks => "patch:drinks",
            Permission::DeleteDrinks => "delete:drinks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that verified `claims` grant `required`.
///
/// `None` means no permission is required and always succeeds.
///
/// # Errors
///
/// - `PermissionsMissing` - the token has no `permissions` claim
/// - `PermissionDenied` - the claim does not contain `required`
pub fn check_permission(claims: &Claims, required: Option<&str>) -> Result<(), AuthError> {
    let Some(required) = required else {
        return Ok(());
    };

    let Some(granted) = claims.permissions.as_ref() else {
        tracing::debug!(target: "drinks.auth.permissions", "Token carries no permissions claim");
        return Err(AuthError::PermissionsMissing);
    };

    if granted.iter().any(|p| p == required) {
        Ok(())
    } else {
        tracing::debug!(
            target: "drinks.auth.permissions",
            required = %required,
            "Required permission not granted"
        );
        Err(AuthError::PermissionDenied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(permissions: Option<&[&str]>) -> Claims {
        let mut value = serde_json::json!({
            "sub": "auth0|barista",
            "iss": "https://coffee-shop.auth0.com/",
            "aud": "drinks",
            "exp": 4_102_444_800_i64,
        });
        if let Some(permissions) = permissions {
            value["permissions"] = serde_json::json!(permissions);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_no_permission_required() {
        assert_eq!(check_permission(&claims(None), None), Ok(()));
        assert_eq!(check_permission(&claims(Some(&[])), None), Ok(()));
    }

    #[test]
    fn test_permissions_claim_absent() {
        assert_eq!(
            check_permission(&claims(None), Some("patch:drinks")),
            Err(AuthError::PermissionsMissing)
        );
    }

    #[test]
    fn test_permission_not_granted() {
        assert_eq!(
            check_permission(&claims(Some(&["get:drinks-detail"])), Some("patch:drinks")),
            Err(AuthError::PermissionDenied)
        );
        assert_eq!(
            check_permission(&claims(Some(&[])), Some("patch:drinks")),
            Err(AuthError::PermissionDenied)
        );
    }

    #[test]
    fn test_permission_granted() {
        let claims = claims(Some(&["get:drinks-detail", "patch:drinks"]));
        assert_eq!(check_permission(&claims, Some("patch:drinks")), Ok(()));
        assert_eq!(
            check_permission(&claims, Some(Permission::GetDrinksDetail.as_str())),
            Ok(())
        );
    }

    #[test]
    fn test_permission_strings() {
        assert_eq!(Permission::GetDrinksDetail.as_str(), "get:drinks-detail");
        assert_eq!(Permission::PostDrinks.as_str(), "post:drinks");
        assert_eq!(Permission::PatchDrinks.to_string(), "patch:drinks");
        assert_eq!(Permission::DeleteDrinks.to_string(), "delete:drinks");
    }
}
