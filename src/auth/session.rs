//! Session access on top of `tower-sessions`.
//!
//! The cookie carries only the session ID. The authenticated [`SessionData`] and any
//! pending flash messages live in the store behind [`session_layer`].

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};
use time::Duration;
use tower_sessions::{cookie::SameSite, Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::state::AppState;

/// Key under which [`SessionData`] is stored.
pub const SESSION_DATA_KEY: &str = "session_data";
/// Key under which pending flash messages are stored.
pub const FLASH_KEY: &str = "flash";
/// Inactivity expiry for sessions that only carry flash messages.
pub const ANONYMOUS_TTL: Duration = Duration::minutes(10);

/// Authenticated payload bound to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    LoginError,
    RegistrationError,
}

/// One-shot message carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

/// Session middleware with the application's cookie attributes.
pub fn session_layer<Store: SessionStore + Clone>(
    store: Store,
    config: &SessionConfig,
) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(config.ttl_minutes)))
}

/// The current request's session.
#[derive(Clone)]
pub struct UserSession {
    session: Session,
    ttl: Duration,
}

#[async_trait]
impl FromRequestParts<AppState> for UserSession {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self::new(session, &state.config.session))
    }
}

impl UserSession {
    pub fn new(session: Session, config: &SessionConfig) -> Self {
        Self {
            session,
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub async fn authenticated_user_id(&self) -> anyhow::Result<Option<Uuid>> {
        let data: Option<SessionData> = self
            .session
            .get(SESSION_DATA_KEY)
            .await
            .context("load session data")?;
        Ok(data.map(|d| d.user_id))
    }

    /// Binds the session to `user_id`. A session ID the client already held is
    /// replaced, so it cannot be reused.
    pub async fn establish(&self, user_id: Uuid) -> anyhow::Result<()> {
        if self.session.id().is_some() {
            self.session.cycle_id().await.context("cycle session id")?;
        }
        self.session.set_expiry(Some(Expiry::OnInactivity(self.ttl)));
        self.session
            .insert(SESSION_DATA_KEY, SessionData { user_id })
            .await
            .context("store session data")?;
        info!(%user_id, "session established");
        Ok(())
    }

    /// Removes the session from the store and clears its data.
    pub async fn destroy(&self) -> anyhow::Result<()> {
        self.session.flush().await.context("flush session")?;
        debug!("session destroyed");
        Ok(())
    }

    /// Queues a flash message. A client without an authenticated session gets a
    /// short-lived one that only carries messages.
    pub async fn flash(&self, kind: FlashKind, message: impl Into<String>) -> anyhow::Result<()> {
        if self.authenticated_user_id().await?.is_none() {
            self.session.set_expiry(Some(Expiry::OnInactivity(ANONYMOUS_TTL)));
        }
        let mut pending: Vec<Flash> = self
            .session
            .get(FLASH_KEY)
            .await
            .context("load flash")?
            .unwrap_or_default();
        pending.push(Flash {
            kind,
            message: message.into(),
        });
        self.session
            .insert(FLASH_KEY, pending)
            .await
            .context("save flash")?;
        Ok(())
    }

    /// Drains pending flash messages of the given kinds so each is shown once.
    /// Messages of other kinds stay queued for the page that reads them.
    pub async fn take_flash(&self, kinds: &[FlashKind]) -> anyhow::Result<Vec<Flash>> {
        let pending: Vec<Flash> = self
            .session
            .get(FLASH_KEY)
            .await
            .context("load flash")?
            .unwrap_or_default();
        let (taken, kept): (Vec<Flash>, Vec<Flash>) =
            pending.into_iter().partition(|f| kinds.contains(&f.kind));
        if taken.is_empty() {
            return Ok(taken);
        }

        if !kept.is_empty() {
            self.session
                .insert(FLASH_KEY, kept)
                .await
                .context("save flash")?;
        } else if self.authenticated_user_id().await?.is_some() {
            self.session
                .remove_value(FLASH_KEY)
                .await
                .context("clear flash")?;
        } else {
            // Nothing left worth keeping.
            self.session.flush().await.context("drop anonymous session")?;
        }
        Ok(taken)
    }
}
