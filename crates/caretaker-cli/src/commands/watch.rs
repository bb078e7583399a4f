//! Long-running mode: keeps the session in sync while the shell feeds
//! lifecycle signals through stdin, one per line.

use anyhow::Result;
use caretaker_core::auth::LifecycleSignal;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{Context, print_session};

enum Line {
    Signal(LifecycleSignal),
    SignOut,
    Status,
    Unknown,
}

fn parse_line(line: &str) -> Option<Line> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line {
        "visible" => Line::Signal(LifecycleSignal::VisibleAgain),
        "restore" => Line::Signal(LifecycleSignal::RestoredFromCache),
        "focus" => Line::Signal(LifecycleSignal::FocusGained),
        "sign-out" => Line::SignOut,
        "status" => Line::Status,
        _ => Line::Unknown,
    })
}

pub async fn run(context: &Context) -> Result<()> {
    let listener = context.auth.initialize().await?;
    let mut changes = context.auth.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_session(&context.auth.session())?;
    tracing::info!("[watch] Reading visible | restore | focus | sign-out | status from stdin");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[watch] Interrupted");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = changes.borrow_and_update().clone();
                if !session.is_loading() {
                    print_session(&session)?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_line(&line) {
                    None => {}
                    Some(Line::Signal(signal)) => {
                        context.lifecycle.emit(signal);
                    }
                    Some(Line::SignOut) => {
                        if let Err(err) = context.auth.sign_out().await {
                            tracing::warn!("[watch] Remote sign-out failed: {}", err);
                        }
                    }
                    Some(Line::Status) => print_session(&context.auth.session())?,
                    Some(Line::Unknown) => {
                        tracing::warn!("[watch] Unknown command: {}", line.trim());
                    }
                }
            }
        }
    }

    listener.unsubscribe().await;
    Ok(())
}
