pub mod storage;
pub mod token;

pub use storage::{Session, TokenStorage};
pub use token::TokenPair;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::api::ApiClient;
use crate::models::{NewUser, User};

/// Exchange email and password for tokens, store them, and return the
/// account they belong to.
///
/// Used by both `birdspot login` and the auto-login after `register`.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<User> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        bail!("email and password are required");
    }
    let tokens = client.login(email, password).await.context("login failed")?;
    client
        .tokens()
        .set(&Session {
            email: email.to_string(),
            tokens,
        })
        .context("failed to save credentials")?;

    let profile = client
        .me()
        .await
        .context("logged in, but fetching the account failed")?;
    info!(username = %profile.user.username, "logged in");
    Ok(profile.user)
}

/// Create an account, then log straight into it.
pub async fn register(client: &ApiClient, new_user: &NewUser) -> Result<User> {
    new_user.validate()?;
    let created = client
        .register(new_user)
        .await
        .context("registration failed")?;
    info!(id = created.id, "account created");
    login(client, &new_user.email, &new_user.password).await
}

/// Drop the stored tokens. Returns whether a session existed.
pub fn logout(client: &ApiClient) -> Result<bool> {
    client
        .tokens()
        .clear()
        .context("failed to remove credentials")
}
