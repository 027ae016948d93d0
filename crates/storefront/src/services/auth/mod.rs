//! Authentication session.
//!
//! Credentials are checked by the backend; this module only validates the
//! form, keeps the resulting identity and persists it under the `user`
//! record so the next run starts logged in.

mod error;

pub use error::AuthError;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use tienda_core::Email;

use crate::backend::{Backend, Credentials, Registration};
use crate::models::{CurrentUser, SessionToken};
use crate::storage::{LocalStore, StorageError, keys};

/// The current identity plus the means to change it.
#[derive(Debug, Clone)]
pub struct AuthSession<B, S> {
    backend: B,
    store: S,
    user: Option<CurrentUser>,
}

impl<B: Backend, S: LocalStore> AuthSession<B, S> {
    /// Start a session, rehydrating the persisted identity if there is one.
    ///
    /// An unreadable record is discarded and the session starts logged out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store itself cannot be read.
    pub fn restore(backend: B, store: S) -> Result<Self, AuthError> {
        let user = match store.get_json::<CurrentUser>(keys::USER) {
            Ok(user) => user,
            Err(StorageError::Json { source, .. }) => {
                warn!(error = %source, "Discarding unreadable session record");
                store.remove(keys::USER)?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            backend,
            store,
            user,
        })
    }

    // =========================================================================
    // Login / Registration
    // =========================================================================

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingPassword` before
    /// any request is made, and `AuthError::LoginFailed` for any backend
    /// failure.
    #[instrument(skip(self, password))]
    pub async fn login(
        &mut self,
        email: &str,
        password: SecretString,
    ) -> Result<&CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        require_password(&password)?;

        let credentials = Credentials { email, password };
        let outcome = self
            .backend
            .login(&credentials)
            .await
            .map_err(AuthError::LoginFailed)?;

        let name = credentials.email.as_str().to_owned();
        info!(email = %credentials.email, has_token = outcome.token.is_some(), "logged in");
        self.set_user(CurrentUser {
            email: credentials.email,
            name,
            token: outcome.token,
        })
    }

    /// Create an account and log in as it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName`, `AuthError::InvalidEmail` or
    /// `AuthError::MissingPassword` before any request is made, and
    /// `AuthError::RegistrationFailed` carrying the backend's `detail` when
    /// the backend refuses.
    #[instrument(skip(self, password))]
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: SecretString,
    ) -> Result<&CurrentUser, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(email)?;
        require_password(&password)?;

        let registration = Registration {
            name: name.to_owned(),
            email,
            password,
        };
        self.backend
            .register(&registration)
            .await
            .map_err(|source| AuthError::RegistrationFailed {
                detail: source.detail().map(str::to_owned),
                source,
            })?;

        info!(email = %registration.email, "registered");
        self.set_user(CurrentUser {
            email: registration.email,
            name: registration.name,
            token: None,
        })
    }

    /// Forget the current identity and its persisted record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the record cannot be removed.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let Some(user) = self.user.take() {
            info!(email = %user.email, "logged out");
        }
        self.store.remove(keys::USER)?;
        Ok(())
    }

    fn set_user(&mut self, user: CurrentUser) -> Result<&CurrentUser, AuthError> {
        self.store.set_json(keys::USER, &user)?;
        Ok(self.user.insert(user))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The logged-in user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Whether someone is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The logged-in user, or `AuthError::NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when logged out.
    pub fn require_user(&self) -> Result<&CurrentUser, AuthError> {
        self.user.as_ref().ok_or(AuthError::NotAuthenticated)
    }

    /// Backend token of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when logged out and
    /// `AuthError::MissingToken` when the login response carried no token.
    pub fn token(&self) -> Result<&SessionToken, AuthError> {
        self.require_user()?
            .token
            .as_ref()
            .ok_or(AuthError::MissingToken)
    }

    /// The backend this session talks to.
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

fn require_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::StubBackend;
    use crate::storage::MemoryStore;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn stub_with_account() -> StubBackend {
        let stub = StubBackend::new();
        stub.add_account(&Email::parse("ana@example.com").unwrap(), "secreta");
        stub.add_account(&Email::parse("Ana@example.com").unwrap(), "secreta");
        stub
    }

    #[tokio::test]
    async fn test_login_persists_and_restores() {
        let store = MemoryStore::new();
        let mut session = AuthSession::restore(stub_with_account(), store.clone()).unwrap();
        assert!(!session.is_authenticated());

        let user = session.login("Ana@Example.COM", secret("secreta")).await.unwrap();
        assert_eq!(user.email.as_str(), "Ana@example.com");
        assert_eq!(user.name, "Ana@example.com");
        assert!(user.token.is_some());

        let restored = AuthSession::restore(stub_with_account(), store.clone()).unwrap();
        assert_eq!(restored.current_user(), session.current_user());

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(store.get(keys::USER).unwrap().is_none());

        let restored = AuthSession::restore(stub_with_account(), store).unwrap();
        assert!(!restored.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure_is_generic() {
        let mut session = AuthSession::restore(stub_with_account(), MemoryStore::new()).unwrap();
        let err = session
            .login("ana@example.com", secret("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginFailed(_)));
        assert_eq!(err.to_string(), "login failed");
        assert!(!session.is_authenticated());

        // Only the domain is case-insensitive.
        let err = session
            .login("ANA@example.com", secret("secreta"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginFailed(_)));
    }

    #[tokio::test]
    async fn test_login_server_error_is_generic() {
        let stub = stub_with_account();
        stub.set_failing(true);
        let mut session = AuthSession::restore(stub, MemoryStore::new()).unwrap();
        let err = session
            .login("ana@example.com", secret("secreta"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginFailed(_)));
    }

    #[tokio::test]
    async fn test_form_validated_before_request() {
        let stub = StubBackend::new();
        stub.set_failing(true);
        let mut session = AuthSession::restore(stub, MemoryStore::new()).unwrap();

        assert!(matches!(
            session.login("not-an-email", secret("x")).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            session.login("ana@example.com", secret("")).await,
            Err(AuthError::MissingPassword)
        ));
        assert!(matches!(
            session.register("  ", "ana@example.com", secret("x")).await,
            Err(AuthError::MissingName)
        ));
    }

    #[tokio::test]
    async fn test_register_sets_user_and_reports_detail() {
        let mut session = AuthSession::restore(StubBackend::new(), MemoryStore::new()).unwrap();
        let user = session
            .register("Ana Pérez", "ana@example.com", secret("secreta"))
            .await
            .unwrap();
        assert_eq!(user.name, "Ana Pérez");
        assert!(user.token.is_none());

        let err = session
            .register("Otra", "ana@example.com", secret("x"))
            .await
            .unwrap_err();
        match err {
            AuthError::RegistrationFailed { detail, .. } => {
                assert_eq!(detail.as_deref(), Some("Email ya registrado"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_require_user_and_token() {
        let stub = stub_with_account();
        let mut session = AuthSession::restore(stub.clone(), MemoryStore::new()).unwrap();
        assert!(matches!(
            session.require_user(),
            Err(AuthError::NotAuthenticated)
        ));
        assert!(matches!(session.token(), Err(AuthError::NotAuthenticated)));

        stub.withhold_tokens();
        session.login("ana@example.com", secret("secreta")).await.unwrap();
        assert!(session.require_user().is_ok());
        assert!(matches!(session.token(), Err(AuthError::MissingToken)));
    }

    #[test]
    fn test_corrupt_record_discarded() {
        let store = MemoryStore::new();
        store.set(keys::USER, "{\"email\": 42}").unwrap();
        let session = AuthSession::restore(StubBackend::new(), store.clone()).unwrap();
        assert!(!session.is_authenticated());
        assert!(store.get(keys::USER).unwrap().is_none());
    }
}
