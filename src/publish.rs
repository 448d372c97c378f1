//! Blogger post submission.
//!
//! One operation: create a post under the configured blog. No retry and no
//! idempotency check, so running the bot twice publishes twice.

use crate::models::Article;
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument};

const BLOGGER_ENDPOINT: &str = "https://www.googleapis.com/blogger/v3/blogs";
const POST_KIND: &str = "blogger#post";

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    kind: &'static str,
    title: &'a str,
    content: &'a str,
    labels: &'a [String],
}

/// The fields of the created post this bot cares about.
#[derive(Debug, Deserialize)]
pub struct PublishedPost {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Authenticated client for the Blogger v3 post-creation endpoint.
pub struct BloggerClient {
    client: reqwest::Client,
    access_token: String,
}

impl BloggerClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    /// Create one post under `blog_id`.
    ///
    /// Refuses empty titles or bodies locally; everything else is up to
    /// the service.
    #[instrument(level = "info", skip(self, article), fields(blog_id = %blog_id))]
    pub async fn publish(
        &self,
        blog_id: &str,
        article: &Article,
        labels: &[String],
    ) -> Result<PublishedPost, Box<dyn Error>> {
        if article.title.trim().is_empty() || article.body_html.trim().is_empty() {
            return Err("refusing to publish a post with an empty title or body".into());
        }

        let url = format!("{BLOGGER_ENDPOINT}/{blog_id}/posts/");
        let body = NewPost {
            kind: POST_KIND,
            title: &article.title,
            content: &article.body_html,
            labels,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(format!("post creation failed: HTTP {status} - {text}").into());
        }

        let post: PublishedPost = response.json().await?;
        info!(
            title = %truncate_for_log(&article.title, 50),
            url = post.url.as_deref().unwrap_or("n/a"),
            "Post published"
        );
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            title: "Título de teste".to_string(),
            body_html: "<p>corpo</p>".to_string(),
        }
    }

    #[test]
    fn test_new_post_serialization() {
        let labels = vec!["games".to_string(), "vivimundo".to_string()];
        let article = article();
        let post = NewPost {
            kind: POST_KIND,
            title: &article.title,
            content: &article.body_html,
            labels: &labels,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["kind"], "blogger#post");
        assert_eq!(json["title"], "Título de teste");
        assert_eq!(json["content"], "<p>corpo</p>");
        assert_eq!(json["labels"][1], "vivimundo");
    }

    #[test]
    fn test_published_post_deserialization() {
        let post: PublishedPost =
            serde_json::from_str(r#"{"id": "42", "url": "https://blog/p", "kind": "blogger#post"}"#)
                .unwrap();
        assert_eq!(post.id.as_deref(), Some("42"));
        assert_eq!(post.url.as_deref(), Some("https://blog/p"));
    }

    #[test]
    fn test_published_post_tolerates_missing_url() {
        let post: PublishedPost = serde_json::from_str("{}").unwrap();
        assert!(post.url.is_none());
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_title() {
        let client = BloggerClient::new("token".to_string());
        let bad = Article {
            title: "   ".to_string(),
            body_html: "<p>corpo</p>".to_string(),
        };
        let err = client.publish("1", &bad, &[]).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_body() {
        let client = BloggerClient::new("token".to_string());
        let bad = Article {
            title: "Título".to_string(),
            body_html: String::new(),
        };
        assert!(client.publish("1", &bad, &[]).await.is_err());
    }
}
