use pmojellyfin::{Card, Carousel, FeedAggregator, SessionManager};
use pmovault::FileVault;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn print_row(label: &str, cards: &[Card]) {
    println!("\n  {} ({} cards)", label, cards.len());
    for card in cards.iter().take(8) {
        let subtitle = card
            .subtitle
            .as_deref()
            .map(|subtitle| format!(" - {}", subtitle))
            .unwrap_or_default();
        let progress = card
            .progress_pct
            .map(|pct| format!(" [{:.0}%]", pct))
            .unwrap_or_default();
        println!("    {}{}{}", card.title, subtitle, progress);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Session ==========

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let vault = Arc::new(FileVault::open_default()?);
    let session = SessionManager::restore(vault).await;

    if session.is_authenticated() {
        info!(
            "🔑 Restored session for {} on {}",
            session.username().unwrap_or_default(),
            session.server().unwrap_or_default()
        );
    } else {
        // Fall back to whatever the last session left behind
        let server = env::var("PMOFLIX_SERVER")
            .ok()
            .or_else(|| session.server())
            .unwrap_or_else(|| "http://localhost:8096".to_string());
        let username = env::var("PMOFLIX_USERNAME")
            .ok()
            .or_else(|| session.username())
            .unwrap_or_default();
        let password = env::var("PMOFLIX_PASSWORD")
            .ok()
            .or_else(|| session.saved_password())
            .unwrap_or_default();

        info!("🔑 Signing in to {} as {}...", server, username);
        session.authenticate(&server, &username, &password).await?;
        info!("✅ Signed in");
    }

    // ========== PHASE 2 : Home feed ==========

    info!("📺 Loading home feed...");
    let client = session.client().expect("client after sign-in");
    let aggregator = FeedAggregator::new();

    let state = match aggregator.load_home_feed(&client).await {
        Ok(state) => state,
        Err(e) => {
            warn!("⚠️ Feed load failed: {}", e);
            aggregator.state()
        }
    };

    info!(
        "✅ Feed ready: {} resume / {} next up / {} featured",
        state.resume.len(),
        state.next_up.len(),
        state.featured.len()
    );

    print_row("Continue watching", &state.resume);
    print_row("Next up", &state.next_up);
    print_row("Featured", &state.featured);

    // ========== PHASE 3 : Featured banner ==========

    match state.initial_featured() {
        Some(card) => info!("🎬 Banner starts on: {}", card.title),
        None => {
            info!("Nothing to feature, exiting");
            return Ok(());
        }
    }

    let carousel = Carousel::new(state.featured.len());
    info!(
        "🎠 Rotating {} featured entries (Ctrl+C to stop)",
        carousel.len()
    );

    let mut shown = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let index = carousel.current_index();
                if index != shown {
                    shown = index;
                    if let Some(card) = index.and_then(|i| state.featured.get(i)) {
                        match card.subtitle.as_deref() {
                            Some(subtitle) => info!("🎬 Featured: {} ({})", card.title, subtitle),
                            None => info!("🎬 Featured: {}", card.title),
                        }
                    }
                }
            }
        }
    }

    info!("👋 Shutting down");
    Ok(())
}
