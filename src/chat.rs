use crate::error::Result;
use crate::query_engine::QueryEngine;
use crate::session::{Role, Session};
use futures::StreamExt;
use tracing::{info, warn};

/// Runs one chat turn against `engine`.
///
/// The question is recorded before the model is queried and the retrieved
/// context becomes the session's current context. Every fragment is
/// handed to `on_fragment` as it arrives. The assistant message is recorded
/// whether or not generation completes: on failure it holds whatever text
/// arrived before the error, and the error is returned for the caller to
/// report.
pub async fn ask<F>(session: &mut Session, engine: &QueryEngine, prompt: &str, mut on_fragment: F) -> Result<String>
where
    F: FnMut(&str) -> Result<()>,
{
    session.push_message(Role::User, prompt);

    let mut full_response = String::new();
    let outcome = stream_response(session, engine, prompt, &mut full_response, &mut on_fragment).await;

    session.push_message(Role::Assistant, full_response.clone());
    match outcome {
        Ok(()) => {
            info!(source = engine.source(), chars = full_response.len(), "answer complete");
            Ok(full_response)
        }
        Err(e) => {
            warn!(source = engine.source(), received = full_response.len(), error = %e, "answer truncated");
            Err(e)
        }
    }
}

async fn stream_response<F>(
    session: &mut Session,
    engine: &QueryEngine,
    prompt: &str,
    full_response: &mut String,
    on_fragment: &mut F,
) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let context = engine.retrieve_context(prompt).await?;
    session.set_context(Some(context.clone()));

    let mut fragments = engine.answer(prompt, &context).await?;
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        full_response.push_str(&fragment);
        on_fragment(&fragment)?;
    }
    Ok(())
}
