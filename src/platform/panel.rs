//! Panels: templates of the ticket-open controls, owned by the dashboard.

use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, VecSkipError};
use serenity::async_trait;

use crate::error::{Error, Result};

/// Modals hold at most five text inputs.
pub const MAX_QUESTIONS: usize = 5;
/// The panel is fetched before the interaction is acknowledged, which Discord expects within 3 s.
const PANEL_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WelcomeEmbed {
    /// `#RRGGBB`
    pub color: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub title_img_url: Option<String>,
    pub large_img_url: Option<String>,
    pub small_img_url: Option<String>,
    pub footer_text: Option<String>,
    pub footer_img_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Question {
    pub id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Questions {
    pub ask_questions: bool,
    pub questions: Vec<Question>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Panel {
    #[serde_as(as = "DefaultOnError<Option<DisplayFromStr>>")]
    pub ticket_category: Option<u64>,
    #[serde_as(as = "VecSkipError<DisplayFromStr>")]
    pub mention_on_open: Vec<u64>,
    pub welcome_embed: Option<WelcomeEmbed>,
    pub questions: Option<Questions>,
}

impl Panel {
    /// Prompts to ask before opening a ticket, empty when the panel asks nothing.
    pub fn prompts(&self) -> Vec<String> {
        match &self.questions {
            Some(q) if q.ask_questions => q.questions
                .iter()
                .filter(|q| !q.prompt.is_empty())
                .map(|q| q.prompt.clone())
                .take(MAX_QUESTIONS)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
pub trait PanelSource: Send + Sync {
    /// `None` when the panel does not exist.
    async fn get_panel(&self, panel_id: &str) -> Result<Option<Panel>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PanelResponse {
    Wrapped { panel: Panel },
    Flat(Panel),
}

impl From<PanelResponse> for Panel {
    fn from(resp: PanelResponse) -> Self {
        match resp {
            PanelResponse::Wrapped { panel } | PanelResponse::Flat(panel) => panel,
        }
    }
}

/// Reads panels from the dashboard at `{base_url}/api/panels/{id}`.
pub struct HttpPanelSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPanelSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PANEL_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PanelSource for HttpPanelSource {
    async fn get_panel(&self, panel_id: &str) -> Result<Option<Panel>> {
        let resp = self.client
            .get(format!("{}/api/panels/{}", self.base_url, panel_id))
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::PanelStatus(resp.status().as_u16()));
        }
        let body = resp.bytes().await?;
        let panel: PanelResponse = serde_json::from_slice(&body)?;
        Ok(Some(panel.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_and_flat_bodies() {
        let wrapped: PanelResponse = serde_json::from_str(r#"{"panel": {"ticketCategory": "12", "mentionOnOpen": ["3", "x", "4"]}}"#).unwrap();
        let panel = Panel::from(wrapped);
        assert_eq!(panel.ticket_category, Some(12));
        assert_eq!(panel.mention_on_open, vec![3, 4]);

        let flat: PanelResponse = serde_json::from_str(r##"{"panelId": "abc", "ticketCategory": null, "welcomeEmbed": {"color": "#ff0000", "title": "Hi"}}"##).unwrap();
        let panel = Panel::from(flat);
        assert_eq!(panel.ticket_category, None);
        assert_eq!(panel.welcome_embed.unwrap().title.as_deref(), Some("Hi"));
    }

    #[test]
    fn prompts_only_when_asked() {
        let mut panel: Panel = serde_json::from_str(r#"{"questions": {"askQuestions": false, "questions": [{"id": "1", "prompt": "Why?"}]}}"#).unwrap();
        assert!(panel.prompts().is_empty());
        panel.questions.as_mut().unwrap().ask_questions = true;
        assert_eq!(panel.prompts(), vec!["Why?".to_string()]);
    }

    #[test]
    fn prompts_are_capped() {
        let questions = (0..8).map(|i| Question { id: i.to_string(), prompt: format!("Q{}", i) }).collect();
        let panel = Panel { questions: Some(Questions { ask_questions: true, questions }), ..Default::default() };
        assert_eq!(panel.prompts().len(), MAX_QUESTIONS);
    }
}
