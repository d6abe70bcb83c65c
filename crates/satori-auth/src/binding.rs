//! Framework-binding capability interface.
//!
//! Web-framework adapters implement this one trait instead of each
//! re-deriving login/permission/role plumbing: a binding supplies how to
//! extract the token from its request type and how to write an error to
//! its response type, and inherits the checks. The core depends on no
//! binding.

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::manager::Manager;

/// Capabilities a web-framework binding provides around one request.
#[async_trait]
pub trait RequestGuard: Send + Sync {
    /// Extracts the login token carried by the request (header, cookie,
    /// or query parameter, per the binding's convention and the
    /// configured token name).
    fn token(&self) -> Option<String>;

    /// Translates an auth error into the binding's response, mapping
    /// [`AuthError::category`] to a transport status.
    fn write_error(&mut self, error: &AuthError);

    /// Checks the request's login and returns the login id.
    ///
    /// # Errors
    ///
    /// Returns `NotLogin` when the request carries no token or the token
    /// is not live.
    async fn check_login(&self, manager: &Manager) -> AuthResult<String> {
        let token = self.token().ok_or(AuthError::NotLogin)?;
        manager.get_login_id(&token).await
    }

    /// Returns `true` if the request's identity holds `permission`.
    async fn has_permission(&self, manager: &Manager, permission: &str) -> bool {
        match self.check_login(manager).await {
            Ok(login_id) => manager.has_permission(&login_id, permission).await,
            Err(_) => false,
        }
    }

    /// Returns `true` if the request's identity holds `role`.
    async fn has_role(&self, manager: &Manager, role: &str) -> bool {
        match self.check_login(manager).await {
            Ok(login_id) => manager.has_role(&login_id, role).await,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_storage_memory::MemoryStorage;
    use std::sync::Arc;

    /// Minimal stand-in for a framework request.
    struct StubGuard {
        token: Option<String>,
        last_error: Option<String>,
    }

    #[async_trait]
    impl RequestGuard for StubGuard {
        fn token(&self) -> Option<String> {
            self.token.clone()
        }

        fn write_error(&mut self, error: &AuthError) {
            self.last_error = Some(error.to_string());
        }
    }

    #[tokio::test]
    async fn test_default_checks_drive_the_manager() {
        let manager = Manager::builder(Arc::new(MemoryStorage::new())).build();
        let token = manager.login("u1", None).await.unwrap();
        manager
            .set_permissions("u1", vec!["doc:*".to_string()])
            .await
            .unwrap();
        manager.set_roles("u1", vec!["editor".to_string()]).await.unwrap();

        let guard = StubGuard {
            token: Some(token),
            last_error: None,
        };
        assert_eq!(guard.check_login(&manager).await.unwrap(), "u1");
        assert!(guard.has_permission(&manager, "doc:edit").await);
        assert!(!guard.has_permission(&manager, "admin:edit").await);
        assert!(guard.has_role(&manager, "editor").await);
        assert!(!guard.has_role(&manager, "admin").await);
    }

    #[tokio::test]
    async fn test_missing_token_is_not_login() {
        let manager = Manager::builder(Arc::new(MemoryStorage::new())).build();
        let mut guard = StubGuard {
            token: None,
            last_error: None,
        };

        let err = guard.check_login(&manager).await.unwrap_err();
        assert!(matches!(err, AuthError::NotLogin));
        assert!(!guard.has_permission(&manager, "doc:edit").await);

        guard.write_error(&err);
        assert_eq!(guard.last_error.as_deref(), Some("Not logged in"));
    }
}
