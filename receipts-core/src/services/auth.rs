//! Auth service - sign-in state over the auth endpoints

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{LoginRedirect, Session, SessionState};
use crate::ports::AuthGateway;

pub struct AuthService {
    gateway: Arc<dyn AuthGateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self { gateway }
    }

    /// Where to send the user to sign in
    pub async fn login_url(&self) -> Result<LoginRedirect> {
        self.gateway.login_redirect_url().await
    }

    /// Exchange the code from the sign-in redirect
    pub async fn complete_login(&self, code: &str) -> Result<Session> {
        self.gateway.exchange_auth_code(code.trim()).await
    }

    /// Current sign-in state; a missing session is not an error here
    pub async fn session(&self) -> Result<SessionState> {
        match self.gateway.session_user().await {
            Ok(user) => Ok(SessionState::SignedIn { user }),
            Err(Error::Unauthenticated) => Ok(SessionState::SignedOut),
            Err(e) => Err(e),
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.gateway.logout().await
    }
}
