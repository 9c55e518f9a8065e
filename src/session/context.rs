use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{AuditBackend, ForgotPasswordResponse, LoginRequest, RegisterFirmRequest};
use crate::errors::TaxopsError;
use crate::models::{Firm, MeResponse, Role, User};
use super::access::{denial_message, permits, Action};
use super::store::TokenStore;

pub const DEMO_TOKEN: &str = "demo-token";

/// One authenticated identity bound to one firm and one bearer credential.
#[derive(Clone)]
pub struct Session {
    pub user: User,
    pub firm: Firm,
    token: String,
    pub demo: bool,
}

impl Session {
    pub fn new(user: User, firm: Firm, token: impl Into<String>) -> Self {
        Self { user, firm, token: token.into(), demo: false }
    }

    pub fn from_me(me: &MeResponse, token: impl Into<String>) -> Self {
        Self::new(me.to_user(), me.firm.clone(), token)
    }

    /// Owner of a demo firm; never validated against the backend.
    pub fn demo() -> Self {
        let firm = Firm { id: "demo-firm".into(), name: "Demo CPA Firm".into() };
        let user = User {
            id: "demo-user".into(),
            name: "Demo User".into(),
            email: "demo@taxops.local".into(),
            roles: BTreeSet::from([Role::Owner]),
            firm_id: firm.id.clone(),
        };
        Self { user, firm, token: DEMO_TOKEN.into(), demo: true }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("firm", &self.firm)
            .field("token", &"[REDACTED]")
            .field("demo", &self.demo)
            .finish()
    }
}

/// The one process-wide mutable state: who is signed in and with which
/// token. Cheap to clone; every clone shares the same lock.
///
/// Lifecycle is `new` (empty) → `populate` (login, registration, bootstrap)
/// → `clear` (logout, or a 401 seen through [`SessionContext::observe`]).
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<RwLock<Option<Session>>>,
    store: Arc<dyn TokenStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { state: Arc::new(RwLock::new(None)), store }
    }

    pub async fn populate(&self, session: Session) {
        info!(user_id = %session.user.id, firm_id = %session.firm.id, demo = session.demo, "Session populated");
        *self.state.write().await = Some(session);
    }

    /// Drop the in-memory session. The persisted token is left alone.
    pub async fn clear(&self) {
        if self.state.write().await.take().is_some() {
            info!("Session cleared");
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Check the current user may perform `action`. Never touches the
    /// network.
    pub async fn authorize(&self, action: Action) -> Result<User, TaxopsError> {
        let guard = self.state.read().await;
        let session = guard
            .as_ref()
            .ok_or_else(|| TaxopsError::AuthRequired(format!("Sign in to {}", action)))?;
        if permits(&session.user, action) {
            Ok(session.user.clone())
        } else {
            Err(TaxopsError::Permission(denial_message(&session.user, action)))
        }
    }

    /// Feed every backend error through here with the token the request
    /// carried. A 401 for the current token clears the session and the
    /// persisted token; returns whether that happened. A 401 for a token
    /// that has since been replaced is ignored.
    pub async fn observe(&self, err: &TaxopsError, token_used: &str) -> bool {
        if !err.is_unauthorized() {
            return false;
        }
        {
            let mut state = self.state.write().await;
            match state.as_ref() {
                Some(session) if session.token == token_used => {}
                _ => {
                    debug!("Ignoring 401 for a superseded token");
                    return false;
                }
            }
            *state = None;
        }
        warn!(error_type = err.classify().error_type, "Credential rejected, signing out");
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to remove persisted token");
        }
        true
    }

    /// Restore a session from the persisted token. Any failure signs out
    /// and removes the stored token; the result is then `None`.
    pub async fn bootstrap(&self, backend: &dyn AuditBackend) -> Result<Option<User>, TaxopsError> {
        let stored = match self.store.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };
        let Some(token) = stored else {
            return Ok(None);
        };
        match self.establish(backend, &token, false).await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!(error = %e, "Failed to bootstrap session");
                self.logout().await?;
                Ok(None)
            }
        }
    }

    /// Adopt an externally supplied token (config or environment) without
    /// persisting it.
    pub async fn adopt_token(&self, backend: &dyn AuditBackend, token: &str) -> Result<User, TaxopsError> {
        match self.establish(backend, token, false).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.observe(&e, token).await;
                Err(e)
            }
        }
    }

    pub async fn enter_demo(&self) -> User {
        let session = Session::demo();
        let user = session.user.clone();
        self.populate(session).await;
        user
    }

    pub async fn login(
        &self,
        backend: &dyn AuditBackend,
        email: &str,
        password: &str,
        firm_id: Option<&str>,
    ) -> Result<User, TaxopsError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            firm_id: firm_id.map(str::to_string),
        };
        let token = backend.login(&request).await?;
        self.establish(backend, &token.access_token, true).await
    }

    pub async fn register_firm(
        &self,
        backend: &dyn AuditBackend,
        firm_name: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<User, TaxopsError> {
        let request = RegisterFirmRequest::new(firm_name, email, password, full_name.map(str::to_string));
        let token = backend.register_firm(&request).await?;
        self.establish(backend, &token.access_token, true).await
    }

    pub async fn forgot_password(
        &self,
        backend: &dyn AuditBackend,
        email: &str,
    ) -> Result<ForgotPasswordResponse, TaxopsError> {
        backend.forgot_password(email).await
    }

    pub async fn logout(&self) -> Result<(), TaxopsError> {
        self.clear().await;
        self.store.clear().await
    }

    async fn establish(
        &self,
        backend: &dyn AuditBackend,
        token: &str,
        persist: bool,
    ) -> Result<User, TaxopsError> {
        let me = backend.me(Some(token)).await?;
        let session = Session::from_me(&me, token);
        let user = session.user.clone();
        self.populate(session).await;
        if persist {
            self.store.save(token).await?;
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;

    fn ctx() -> SessionContext {
        SessionContext::new(Arc::new(MemoryTokenStore::new()))
    }

    #[tokio::test]
    async fn test_authorize_without_session() {
        let err = ctx().authorize(Action::ViewWorkspace).await.unwrap_err();
        assert!(matches!(err, TaxopsError::AuthRequired(_)));
    }

    #[tokio::test]
    async fn test_demo_session_is_owner() {
        let ctx = ctx();
        let user = ctx.enter_demo().await;
        assert!(user.roles.contains(&Role::Owner));
        assert_eq!(ctx.token().await.as_deref(), Some(DEMO_TOKEN));
        assert!(ctx.authorize(Action::RunModule).await.is_ok());
    }

    #[tokio::test]
    async fn test_observe_clears_only_on_401() {
        let store = Arc::new(MemoryTokenStore::with_token("persisted"));
        let ctx = SessionContext::new(store.clone());
        ctx.enter_demo().await;

        let forbidden = TaxopsError::Api { status: 403, message: "no".into() };
        assert!(!ctx.observe(&forbidden, DEMO_TOKEN).await);
        assert!(ctx.is_authenticated().await);

        let expired = TaxopsError::Api { status: 401, message: "expired".into() };
        assert!(ctx.observe(&expired, DEMO_TOKEN).await);
        assert!(!ctx.is_authenticated().await);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_late_401_for_replaced_token_keeps_session() {
        let store = Arc::new(MemoryTokenStore::with_token("fresh"));
        let ctx = SessionContext::new(store.clone());
        let demo = Session::demo();
        ctx.populate(Session::new(demo.user.clone(), demo.firm.clone(), "old")).await;
        ctx.populate(Session::new(demo.user, demo.firm, "fresh")).await;

        let expired = TaxopsError::Api { status: 401, message: "expired".into() };
        assert!(!ctx.observe(&expired, "old").await);
        assert_eq!(ctx.token().await.as_deref(), Some("fresh"));
        assert_eq!(store.load().await.unwrap().as_deref(), Some("fresh"));

        assert!(ctx.observe(&expired, "fresh").await);
        assert!(!ctx.is_authenticated().await);
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let rendered = format!("{:?}", Session::demo());
        assert!(!rendered.contains(DEMO_TOKEN));
    }
}
