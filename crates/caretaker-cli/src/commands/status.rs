use anyhow::Result;

use super::{Context, print_session};

pub async fn run(context: &Context) -> Result<()> {
    let outcome = context.auth.reconcile().await;
    tracing::debug!("[status] Reconcile outcome: {:?}", outcome);
    print_session(&context.auth.session())
}
