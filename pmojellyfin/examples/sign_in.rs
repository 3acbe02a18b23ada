//! Example: Sign in to a Jellyfin server and persist the session
//!
//! Run with: cargo run -p pmojellyfin --example sign_in -- <server> <username> <password>
//!
//! The session lands in the default vault (~/.pmoflix), so a later run of
//! the home_feed example can reuse it without signing in again.

use pmojellyfin::SessionManager;
use pmovault::FileVault;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "http://localhost:8096".to_string());
    let username = args.next().unwrap_or_default();
    let password = args.next().unwrap_or_default();

    let vault = Arc::new(FileVault::open_default()?);
    let session = SessionManager::restore(vault.clone()).await;

    if session.is_authenticated() {
        println!(
            "Already signed in as {} on {}",
            session.username().unwrap_or_default(),
            session.server().unwrap_or_default()
        );
        println!("Signing in again with the given credentials...\n");
    }

    println!("Signing in to {} as {}...", server, username);
    let auth = session.authenticate(&server, &username, &password).await?;

    println!("✓ Signed in");
    println!("  User id: {}", auth.user_id);
    if let Some(name) = &auth.user_name {
        println!("  Display name: {}", name);
    }
    println!("  Token: {}...", &auth.access_token[..auth.access_token.len().min(8)]);

    // A fresh manager on the same vault sees the session immediately
    let restored = SessionManager::restore(vault).await;
    println!(
        "\nRestore check: authenticated = {}",
        restored.is_authenticated()
    );

    Ok(())
}
