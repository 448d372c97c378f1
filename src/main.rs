//! # Vivimundo Bot
//!
//! A scheduled content bot for the Vivimundo blog. Each invocation picks
//! one topic, pulls a handful of recent news items for it from the Google
//! News RSS search feed, asks the Gemini API to write an original article
//! from them, and publishes the result to Blogger. Exactly one post per
//! successful run; an external scheduler provides the cadence.
//!
//! ## Pipeline
//!
//! 1. **Authenticate**: load/refresh the cached OAuth token for the
//!    publishing account (authorize interactively on first run)
//! 2. **Fetch**: news items for a random topic, with one topic-switch
//!    retry if the first yields nothing
//! 3. **Generate**: one article from the items via the Gemini API
//! 4. **Publish**: the article as a new Blogger post with topic labels
//!
//! Any stage failure ends the run with a non-zero exit; nothing is cleaned
//! up because nothing persistent is created apart from the token cache.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... BLOGGER_CREDENTIALS=... vivimundo_bot
//! ```

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod auth;
mod cli;
mod feed;
mod generate;
mod models;
mod publish;
mod utils;

use auth::{Authenticator, ClientSecrets, FileStore};
use cli::Cli;
use feed::{NewsFetcher, fetch_with_fallback};
use generate::ArticleGenerator;
use models::Topic;
use publish::BloggerClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(
        run_at = %Local::now().format("%d/%m/%Y %H:%M:%S"),
        blog_id = %args.blog_id,
        "vivimundo_bot starting up"
    );

    let secrets = match args.blogger_credentials.as_deref() {
        Some(raw) => match ClientSecrets::from_json(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                error!(error = %e, "BLOGGER_CREDENTIALS is not valid client secrets JSON");
                return Err(e);
            }
        },
        None => None,
    };

    // Authenticate before touching the feed or the generation API.
    let authenticator = Authenticator::new(FileStore::new(&args.token_cache), secrets);
    let credential = match authenticator.obtain().await {
        Ok(credential) => {
            info!("Authenticated with Blogger");
            credential
        }
        Err(e) => {
            error!(error = %e, "Blogger authentication failed");
            return Err(e);
        }
    };

    let mut rng = rand::rng();
    let first_topic = args.topic.unwrap_or_else(|| Topic::pick(&mut rng));
    info!(topic = %first_topic, "Topic chosen");

    let fetcher = NewsFetcher::new()?;
    let (topic, items) =
        fetch_with_fallback(&mut rng, first_topic, |t| fetcher.fetch(t, args.quantity)).await;
    if items.is_empty() {
        error!("No news items found for any topic; nothing to write about");
        return Err("no news items found".into());
    }
    info!(topic = %topic, count = items.len(), "News items ready");

    let generator = ArticleGenerator::new(args.gemini_api_key.clone());
    let article = match generator.generate(topic, &items).await {
        Ok(article) => article,
        Err(e) => {
            error!(error = %e, "Article generation failed");
            return Err(e);
        }
    };

    let publisher = BloggerClient::new(credential.access_token.clone());
    let post = match publisher
        .publish(&args.blog_id, &article, &topic.post_labels())
        .await
    {
        Ok(post) => post,
        Err(e) => {
            error!(error = %e, "Publishing failed");
            return Err(e);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        url = post.url.as_deref().unwrap_or("n/a"),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Run complete: one post published"
    );

    Ok(())
}
