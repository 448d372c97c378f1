//! Article generation through the Gemini generative-language API.
//!
//! Builds one prompt from the topic and the fetched news items, issues a
//! single `generateContent` call, and parses the reply into an [`Article`].
//! The reply format is a contract with the model: a `TÍTULO:` line followed
//! by a `CONTEÚDO:` section. When the markers are missing, [`parse_reply`]
//! falls back to first-line-as-title.
//!
//! Any API failure is an error here; the orchestrator aborts the run
//! rather than publishing without an article.

use crate::models::{Article, NewsItem, Topic};
use crate::utils::{truncate_chars, truncate_for_log};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tracing::{info, instrument};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-pro";

/// Literal marker introducing the title line in the model's reply.
pub const TITLE_MARKER: &str = "TÍTULO:";
/// Literal marker introducing the article body in the model's reply.
pub const BODY_MARKER: &str = "CONTEÚDO:";

/// Character budget for each news summary embedded in the prompt.
const SUMMARY_BUDGET: usize = 200;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the generative-text API.
pub struct ArticleGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl ArticleGenerator {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Generate one article for `topic` from the fetched items.
    #[instrument(level = "info", skip(self, items), fields(topic = %topic, items = items.len()))]
    pub async fn generate(
        &self,
        topic: Topic,
        items: &[NewsItem],
    ) -> Result<Article, Box<dyn Error>> {
        let prompt = build_prompt(topic, items);
        let url = format!(
            "{GEMINI_ENDPOINT}/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(format!("generation API returned HTTP {status}: {body}").into());
        }

        let reply: GenerateResponse = response.json().await?;
        if let Some(api_error) = reply.error {
            return Err(format!("generation API error: {}", api_error.message).into());
        }
        let text = reply
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or("generation API returned no candidates")?;

        let article = parse_reply(text);
        info!(title = %truncate_for_log(&article.title, 50), "Article generated");
        Ok(article)
    }
}

/// Assemble the prompt: topic header, numbered news context, editorial
/// requirements, and the reply-format contract.
fn build_prompt(topic: Topic, items: &[NewsItem]) -> String {
    let mut context = format!("Tema: {}\n\nNotícias recentes:\n", topic.name());
    for (i, item) in items.iter().enumerate() {
        context.push_str(&format!("\n{}. {}\n", i + 1, item.title));
        if !item.summary.is_empty() {
            context.push_str(&format!(
                "   {}...\n",
                truncate_chars(&item.summary, SUMMARY_BUDGET)
            ));
        }
    }

    format!(
        r#"Você é um redator do blog "Vivimundo" (vivimund0.blogspot.com).

{context}

Escreva um artigo ORIGINAL e INFORMATIVO sobre este tema, usando as notícias acima como referência (mas NÃO copie texto delas).

REQUISITOS:
- Título chamativo e criativo
- Introdução envolvente
- 3-4 parágrafos de desenvolvimento
- Tom descontraído mas informativo
- Entre 400-600 palavras
- Use HTML básico: <h2>, <p>, <strong>, <em>
- NÃO mencione as fontes originais
- Seja original e criativo

Formato de resposta:
{TITLE_MARKER} [seu título aqui]
{BODY_MARKER}
[seu artigo em HTML aqui]"#
    )
}

/// Split the model's reply into title and body.
///
/// With both markers present the split happens exactly at them; otherwise
/// the first line (leading `#` stripped) becomes the title and the rest
/// the body.
pub fn parse_reply(text: &str) -> Article {
    if text.contains(TITLE_MARKER) {
        if let Some((head, body)) = text.split_once(BODY_MARKER) {
            return Article {
                title: head.replace(TITLE_MARKER, "").trim().to_string(),
                body_html: body.trim().to_string(),
            };
        }
    }

    let mut lines = text.lines();
    let title = lines
        .next()
        .unwrap_or("")
        .trim_matches('#')
        .trim()
        .to_string();
    let body_html = lines.collect::<Vec<_>>().join("\n");
    Article { title, body_html }
}
