// PromptDeck: Domain types shared by the store, the generator and the web API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
}

/// A category together with the live number of tools filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
    pub tool_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub is_premium: bool,
    /// User-authored prompt template; overrides the default prompt when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    /// The custom template, if one is set and not blank.
    pub fn template(&self) -> Option<&str> {
        self.custom_prompt
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Payload of the "create tool" flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: i64,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Generation input
// ---------------------------------------------------------------------------

/// Structured user input for one generation.
///
/// `text` is required; the rest are optional hints. Blank optional strings
/// are treated the same as missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

impl GenerationInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn title(&self) -> Option<&str> {
        non_blank(&self.title)
    }

    pub fn tone(&self) -> Option<&str> {
        non_blank(&self.tone)
    }

    pub fn length(&self) -> Option<&str> {
        non_blank(&self.length)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Run ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunStatus::Success),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }
}

/// One recorded generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: i64,
    pub tool_id: i64,
    /// Name of the tool at listing time; `None` if the tool row is gone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub input: GenerationInput,
    pub output_text: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRun {
    pub tool_id: i64,
    pub input: GenerationInput,
    pub output_text: String,
    pub status: RunStatus,
    pub error_message: Option<String>,
}
