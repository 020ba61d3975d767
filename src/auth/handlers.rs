use axum::{
    extract::State,
    response::{Html, Redirect},
    routing::get,
    Form, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        extractors::LOGIN_PATH,
        services,
        session::{FlashKind, UserSession},
    },
    state::AppState,
    views,
};

pub const PROFILE_PATH: &str = "/profile";

const REGISTRATION_FAILED: &str = "An error occurred during registration. Please try again.";
const LOGIN_FAILED: &str = "An error occurred during login";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout))
}

/// Queues a flash message; a session store failure only costs the message.
pub(crate) async fn flash(session: &UserSession, kind: FlashKind, message: &str) {
    if let Err(e) = session.flash(kind, message).await {
        error!(error = %e, "failed to queue flash message");
    }
}

#[instrument(skip(session))]
pub async fn login_page(session: UserSession) -> Html<String> {
    let pending = session
        .take_flash(&[FlashKind::LoginError, FlashKind::RegistrationError])
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to read flash messages");
            Vec::new()
        });
    let first = |kind: FlashKind| {
        pending
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| f.message.as_str())
    };
    Html(views::login_register(
        first(FlashKind::LoginError),
        first(FlashKind::RegistrationError),
    ))
}

pub async fn register_page() -> Html<String> {
    Html(views::login_register(None, None))
}

#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: UserSession,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    let user = match services::register(state.users.as_ref(), form).await {
        Ok(user) => user,
        Err(e) => {
            let message = e.user_message().unwrap_or_else(|| {
                error!(error = %e, "registration failed");
                REGISTRATION_FAILED
            });
            flash(&session, FlashKind::RegistrationError, message).await;
            return Redirect::to(LOGIN_PATH);
        }
    };

    match session.establish(user.id).await {
        Ok(()) => {
            flash(
                &session,
                FlashKind::Success,
                "Registration successful! Welcome to your profile.",
            )
            .await;
            Redirect::to(PROFILE_PATH)
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "session establish failed after registration");
            flash(&session, FlashKind::RegistrationError, REGISTRATION_FAILED).await;
            Redirect::to(LOGIN_PATH)
        }
    }
}

#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: UserSession,
    Form(form): Form<LoginForm>,
) -> Redirect {
    let user = match services::login(state.users.as_ref(), form).await {
        Ok(user) => user,
        Err(e) => {
            let message = e.user_message().unwrap_or_else(|| {
                error!(error = %e, "login failed");
                LOGIN_FAILED
            });
            flash(&session, FlashKind::LoginError, message).await;
            return Redirect::to(LOGIN_PATH);
        }
    };

    match session.establish(user.id).await {
        Ok(()) => Redirect::to(PROFILE_PATH),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "session establish failed after login");
            flash(&session, FlashKind::LoginError, LOGIN_FAILED).await;
            Redirect::to(LOGIN_PATH)
        }
    }
}

/// Destroys the session. If the store cannot invalidate it, the client stays on the profile.
#[instrument(skip(session))]
pub async fn logout(session: UserSession) -> Redirect {
    match session.destroy().await {
        Ok(()) => Redirect::to(LOGIN_PATH),
        Err(e) => {
            error!(error = %e, "logout failed");
            Redirect::to(PROFILE_PATH)
        }
    }
}
