//! Command-line interface definitions.
//!
//! All configuration comes in through flags or environment variables: the
//! generation API key and OAuth client secrets from the environment, the
//! blog identifier and token cache path as flags with defaults.

use crate::models::Topic;
use clap::Parser;

/// Command-line arguments for the Vivimundo content bot.
///
/// # Examples
///
/// ```sh
/// # Normal scheduled run (secrets come from the environment)
/// GEMINI_API_KEY=... BLOGGER_CREDENTIALS=... vivimundo_bot
///
/// # Force a topic for a manual run
/// vivimundo_bot --topic games
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Blogger blog id to publish into
    #[arg(long, default_value = "4602463746754711403")]
    pub blog_id: String,

    /// Maximum number of news items fed to the article generator
    #[arg(short, long, default_value_t = 3)]
    pub quantity: usize,

    /// Force a topic instead of picking one at random
    #[arg(short, long, value_enum)]
    pub topic: Option<Topic>,

    /// Path of the cached OAuth token blob
    #[arg(long, default_value = "token.bin")]
    pub token_cache: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// OAuth client secrets JSON for the Blogger account
    /// (Google "installed app" format)
    #[arg(long, env = "BLOGGER_CREDENTIALS", hide_env_values = true)]
    pub blogger_credentials: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["vivimundo_bot", "--gemini-api-key", "k"]);
        assert_eq!(cli.blog_id, "4602463746754711403");
        assert_eq!(cli.quantity, 3);
        assert_eq!(cli.token_cache, "token.bin");
        assert!(cli.topic.is_none());
        assert!(cli.blogger_credentials.is_none());
    }

    #[test]
    fn test_cli_topic_value_enum() {
        let cli = Cli::parse_from([
            "vivimundo_bot",
            "--gemini-api-key",
            "k",
            "--topic",
            "entertainment",
        ]);
        assert_eq!(cli.topic, Some(Topic::Entertainment));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "vivimundo_bot",
            "--gemini-api-key",
            "k",
            "-q",
            "5",
            "-t",
            "sports",
        ]);
        assert_eq!(cli.quantity, 5);
        assert_eq!(cli.topic, Some(Topic::Sports));
    }

    #[test]
    fn test_cli_requires_gemini_api_key() {
        // Without the flag or GEMINI_API_KEY in the environment, parsing
        // must fail before the bot does anything else.
        let result = Cli::try_parse_from(["vivimundo_bot"]);
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert!(result.is_err());
        }
    }
}
