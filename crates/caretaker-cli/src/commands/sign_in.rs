use anyhow::{Context as _, Result};

use super::{Context, print_session};

pub async fn run(context: &Context, email: &str, password: &str) -> Result<()> {
    let _listener = context.auth.initialize().await?;
    let session = context
        .auth
        .sign_in(email, password)
        .await
        .with_context(|| format!("Sign-in failed for {}", email))?;
    print_session(&session)
}
