//! Example: Load and display the home feed
//!
//! Run with: cargo run -p pmojellyfin --example home_feed
//!
//! Needs a saved session; run the sign_in example first.

use pmojellyfin::{Card, Carousel, FeedAggregator, SessionManager};
use pmovault::FileVault;
use std::sync::Arc;
use std::time::Duration;

fn print_row(label: &str, cards: &[Card]) {
    println!("\n{} ({} cards):", label, cards.len());
    for card in cards {
        let subtitle = card
            .subtitle
            .as_deref()
            .map(|subtitle| format!(" - {}", subtitle))
            .unwrap_or_default();
        let progress = card
            .progress_pct
            .map(|pct| format!(" [{:.0}%]", pct))
            .unwrap_or_default();
        println!("  {}{}{}", card.title, subtitle, progress);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let vault = Arc::new(FileVault::open_default()?);
    let session = SessionManager::restore(vault).await;

    let Some(client) = session.client() else {
        println!("No saved session. Run the sign_in example first.");
        return Ok(());
    };
    println!(
        "Loading home feed from {}...",
        session.server().unwrap_or_default()
    );

    let aggregator = FeedAggregator::new();
    let state = aggregator.load_home_feed(&client).await?;

    print_row("Continue watching", &state.resume);
    print_row("Next up", &state.next_up);
    print_row("Featured", &state.featured);

    match state.initial_featured() {
        Some(card) => println!("\nBanner starts on: {}", card.title),
        None => {
            println!("\nNothing to feature");
            return Ok(());
        }
    }

    // Rotate the banner for a few seconds with a shortened period
    let carousel = Carousel::with_period(state.featured.len(), Duration::from_secs(3));
    println!("Rotating {} featured entries every 3s:", carousel.len());
    for _ in 0..4 {
        if let Some(index) = carousel.current_index() {
            if let Some(card) = state.featured.get(index) {
                println!("  showing [{}] {}", index, card.title);
            }
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    carousel.next();
    println!(
        "✓ Manual next -> entry {:?}, timer restarted",
        carousel.current_index()
    );

    Ok(())
}
