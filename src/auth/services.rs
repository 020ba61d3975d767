use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::{LoginForm, RegisterForm};
use crate::auth::password::{
    hash_password_blocking, verify_dummy_blocking, verify_password_blocking,
};
use crate::error::AppError;
use crate::storage::DEFAULT_PHOTO;
use crate::users::{NewUser, User, UserStore};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn required(value: &str, field: &'static str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(AppError::MissingField(field));
    }
    Ok(())
}

/// Creates an account with the default photo. Does not touch sessions.
pub async fn register(users: &dyn UserStore, mut form: RegisterForm) -> Result<User, AppError> {
    form.name = form.name.trim().to_string();
    form.username = form.username.trim().to_string();
    form.email = form.email.trim().to_lowercase();

    required(&form.name, "name")?;
    required(&form.email, "email")?;
    required(&form.username, "username")?;
    required(&form.password, "password")?;

    if !is_valid_email(&form.email) {
        warn!(email = %form.email, "invalid email");
        return Err(AppError::InvalidEmail);
    }

    if users
        .find_by_username_or_email(&form.username, &form.email)
        .await?
        .is_some()
    {
        warn!(username = %form.username, "username or email already registered");
        return Err(AppError::DuplicateCredential);
    }

    let password_hash = hash_password_blocking(form.password).await?;

    // The store enforces uniqueness again, so a racing registration still fails cleanly.
    let user = users
        .insert(NewUser {
            name: form.name,
            email: form.email,
            username: form.username,
            password_hash,
            profile_photo: DEFAULT_PHOTO.to_string(),
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials. Unknown username and wrong password yield the same error.
pub async fn login(users: &dyn UserStore, form: LoginForm) -> Result<User, AppError> {
    let username = form.username.trim();

    let Some(user) = users.find_by_username(username).await? else {
        verify_dummy_blocking(form.password).await?;
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(form.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::users::memory::MemoryUserStore;

    fn form(name: &str, email: &str, username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            name: name.into(),
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn alice() -> RegisterForm {
        form("Alice", "alice@example.com", "alice", "s3cret-pass")
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_assigns_default_photo_and_hashes_password() {
        let users = MemoryUserStore::new();
        let user = register(&users, alice()).await.unwrap();

        assert_eq!(user.profile_photo, DEFAULT_PHOTO);
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &user.password_hash).unwrap());
        assert_eq!(users.count().await, 1);
    }

    #[tokio::test]
    async fn register_normalizes_fields() {
        let users = MemoryUserStore::new();
        let user = register(&users, form(" Bob ", " Bob@Example.COM ", " bob ", "pw"))
            .await
            .unwrap();
        assert_eq!(user.name, "Bob");
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.username, "bob");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username_or_email() {
        let users = MemoryUserStore::new();
        register(&users, alice()).await.unwrap();

        let same_username = form("Other", "other@example.com", "alice", "pw");
        let same_email = form("Other", "ALICE@example.com", "other", "pw");
        for attempt in [same_username, same_email] {
            let err = register(&users, attempt).await.unwrap_err();
            assert!(matches!(err, AppError::DuplicateCredential));
        }
        assert_eq!(users.count().await, 1);
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_without_creating_user() {
        let users = MemoryUserStore::new();
        let err = register(&users, form("Alice", "alice@example.com", "  ", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField("username")));

        let err = register(&users, RegisterForm::default()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField("name")));

        let err = register(&users, form("A", "not-an-email", "a", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidEmail));
        assert_eq!(users.count().await, 0);
    }

    #[tokio::test]
    async fn login_accepts_correct_password() {
        let users = MemoryUserStore::new();
        let created = register(&users, alice()).await.unwrap();
        let user = login(
            &users,
            LoginForm {
                username: "alice".into(),
                password: "s3cret-pass".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.id, created.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let users = MemoryUserStore::new();
        register(&users, alice()).await.unwrap();

        let wrong_password = login(
            &users,
            LoginForm {
                username: "alice".into(),
                password: "guess".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown_user = login(
            &users,
            LoginForm {
                username: "mallory".into(),
                password: "s3cret-pass".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_user, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert_eq!(wrong_password.user_message(), unknown_user.user_message());
    }
}
