//! Data models for the publishing pipeline.
//!
//! This module defines the core data structures passed between stages:
//! - [`Topic`]: the fixed set of blog categories driving both the news
//!   query and the post labels
//! - [`NewsItem`]: one record extracted from the news feed
//! - [`Article`]: the generated post before it is submitted to Blogger
//!
//! `NewsItem` and `Article` are ephemeral: they live for a single run and
//! are never persisted.

use clap::ValueEnum;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;

/// A blog category.
///
/// Each topic carries a fixed Google News search query and the label set
/// attached to posts published under it. The bot picks one topic uniformly
/// at random per run; selection takes the RNG as a parameter so tests can
/// seed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Topic {
    Sports,
    Games,
    Entertainment,
    Technology,
}

impl Topic {
    /// Every topic the blog covers, in a fixed order.
    pub const ALL: [Topic; 4] = [
        Topic::Sports,
        Topic::Games,
        Topic::Entertainment,
        Topic::Technology,
    ];

    /// Display name as it appears on the blog.
    pub fn name(self) -> &'static str {
        match self {
            Topic::Sports => "Esportes",
            Topic::Games => "Games",
            Topic::Entertainment => "Entretenimento",
            Topic::Technology => "Tecnologia",
        }
    }

    /// Fixed news-search query for this topic.
    ///
    /// The `+` separators and `OR` alternatives are part of the query
    /// syntax the news service expects and must pass through unencoded.
    pub fn query(self) -> &'static str {
        match self {
            Topic::Sports => "esportes+futebol+brasil OR basquete OR volei",
            Topic::Games => "games+jogos+videogame OR playstation OR xbox OR nintendo",
            Topic::Entertainment => "entretenimento+cinema+series OR filmes OR netflix",
            Topic::Technology => "tecnologia+tech OR smartphones OR inteligencia+artificial",
        }
    }

    /// Lowercase label used to tag published posts.
    pub fn label(self) -> &'static str {
        match self {
            Topic::Sports => "esportes",
            Topic::Games => "games",
            Topic::Entertainment => "entretenimento",
            Topic::Technology => "tecnologia",
        }
    }

    /// Full label set for a post under this topic.
    pub fn post_labels(self) -> Vec<String> {
        vec![
            self.label().to_string(),
            "vivimundo".to_string(),
            "notícias".to_string(),
        ]
    }

    /// Pick a topic uniformly at random.
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Topic {
        *Self::ALL.choose(rng).expect("topic set is non-empty")
    }

    /// Pick a topic uniformly at random, excluding `exclude`.
    ///
    /// Used for the single retry when the first topic yields no news.
    pub fn pick_other<R: Rng + ?Sized>(rng: &mut R, exclude: Topic) -> Topic {
        let others: Vec<Topic> = Self::ALL
            .iter()
            .copied()
            .filter(|t| *t != exclude)
            .collect();
        *others.choose(rng).expect("topic set has more than one member")
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One record extracted from the news feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsItem {
    /// Headline as published by the feed.
    pub title: String,
    /// Link to the original story.
    pub link: String,
    /// Plain-text snippet, already stripped of markup.
    pub summary: String,
}

/// A generated post, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Post title.
    pub title: String,
    /// Post body as HTML.
    pub body_html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::Sports.name(), "Esportes");
        assert_eq!(Topic::Games.name(), "Games");
        assert_eq!(Topic::Entertainment.name(), "Entretenimento");
        assert_eq!(Topic::Technology.name(), "Tecnologia");
    }

    #[test]
    fn test_topic_queries_are_fixed_and_nonempty() {
        for topic in Topic::ALL {
            assert!(!topic.query().is_empty());
        }
        assert!(Topic::Sports.query().contains("esportes"));
        assert!(Topic::Technology.query().contains("tecnologia"));
    }

    #[test]
    fn test_post_labels() {
        let labels = Topic::Games.post_labels();
        assert_eq!(labels, vec!["games", "vivimundo", "notícias"]);
    }

    #[test]
    fn test_pick_returns_member_of_set() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let topic = Topic::pick(&mut rng);
            assert!(Topic::ALL.contains(&topic));
        }
    }

    #[test]
    fn test_pick_other_never_returns_excluded() {
        let mut rng = StdRng::seed_from_u64(42);
        for topic in Topic::ALL {
            for _ in 0..20 {
                assert_ne!(Topic::pick_other(&mut rng, topic), topic);
            }
        }
    }

    #[test]
    fn test_topic_display_matches_name() {
        assert_eq!(Topic::Entertainment.to_string(), "Entretenimento");
    }
}
