use anyhow::Result;
use serde_json::json;

use super::{Context, session_json};
use crate::routes;

pub async fn run(context: &Context, path: &str) -> Result<()> {
    let request = routes::resolve(path);
    let decision = context.auth.gate().guard(&request).await;

    let output = json!({
        "path": request.full_path,
        "platform": context.auth.platform(),
        "requires_auth": request.meta.requires_auth,
        "decision": decision,
        "session": session_json(&context.auth.session()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
