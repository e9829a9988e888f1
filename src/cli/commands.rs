use tracing::info;

use crate::app::{AppContext, Result, TributaryError};
use crate::auth::Credentials;
use crate::domain::{extract_content_id, FeedSnapshot, FeedState};
use crate::listener::NotificationListener;
use crate::reconciler::Reconciler;

/// Sign in and run a full session: push subscription, reconciler, and a
/// printed snapshot on every published view, until Ctrl-C.
pub async fn watch(ctx: &AppContext, credentials: Credentials) -> Result<()> {
    let session = ctx.auth.sign_in(&credentials).await?;
    info!("signed in as {}", session.identity);

    let (reconciler, handle) = Reconciler::new(
        ctx.fetcher.clone(),
        ctx.enricher.clone(),
        session.clone(),
        ctx.config.retry_interval(),
    );
    let listener = NotificationListener::new(ctx.transport.clone(), handle.clone(), &session);

    let listener_task = tokio::spawn(listener.run());
    let reconciler_task = tokio::spawn(reconciler.run());

    // Initial load; from here on push signals drive refreshes.
    handle.request_refresh().await;

    let mut view = handle.view_changes();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
        }
    }

    handle.shutdown().await;
    listener_task.abort();

    // Surface a session-fatal error (expired credential) to the caller.
    if let Ok(result) = reconciler_task.await {
        result?;
    }
    Ok(())
}

/// Extract the content id from a URL and submit it. The share becomes
/// visible through the resulting push notification or the next refresh.
pub async fn share(ctx: &AppContext, credentials: Credentials, url: &str) -> Result<()> {
    let content_id = extract_content_id(url)
        .ok_or_else(|| TributaryError::Other(format!("no content id in URL: {}", url)))?;

    let session = ctx.auth.sign_in(&credentials).await?;
    ctx.fetcher.submit_share(&session, &content_id).await?;

    println!("Shared {}", content_id);
    Ok(())
}

/// One-shot: sign in, pull the feed, enrich it once, print it.
pub async fn pull(ctx: &AppContext, credentials: Credentials) -> Result<()> {
    let session = ctx.auth.sign_in(&credentials).await?;

    let mut feed = FeedState::new();
    let epoch = feed.apply_pull(ctx.fetcher.fetch_all(&session).await?);

    let unresolved = feed.unresolved_ids();
    if !unresolved.is_empty() {
        match ctx.enricher.lookup(&unresolved).await {
            Ok(metadata) => {
                feed.apply_metadata(epoch, metadata);
            }
            Err(e) => tracing::warn!("metadata lookup failed: {}", e),
        }
    }

    print_snapshot(&feed.snapshot());
    Ok(())
}

fn print_snapshot(snapshot: &FeedSnapshot) {
    if snapshot.entries.is_empty() {
        println!("(no shares yet)");
        return;
    }

    println!("--- feed (epoch {}) ---", snapshot.epoch);
    for entry in snapshot.entries.iter() {
        println!(
            "[{}] {} shared: {}",
            entry.record.sequence,
            entry.record.sharer_identity,
            entry.display_title()
        );
        let description = entry.display_description();
        if !description.is_empty() {
            println!("    {}", description);
        }
    }
}
