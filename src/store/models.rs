//! Stored entity models
//!
//! Rust structs representing the five collections. All models serialize
//! camelCase because the stored JSON documents and the export document are
//! the crate's wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::BRANDING_KEY;

/// Company identity singleton, stored under the fixed key `"company"`.
///
/// The passcode fields are derived secrets: they are written only through
/// the passcode API and stripped from every export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    #[serde(default = "branding_key")]
    pub id: String,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub ein: Option<String>,
    pub address: Option<String>,
    /// Logo image as a data URI
    pub logo: Option<String>,
    /// Colors extracted from the logo, hex strings
    pub brand_colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode_set_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn branding_key() -> String {
    BRANDING_KEY.to_string()
}

impl Branding {
    /// Copy with the derived secrets removed, for export.
    pub fn redacted(&self) -> Self {
        Self {
            passcode_hash: None,
            passcode_set_at: None,
            ..self.clone()
        }
    }
}

/// The six question kinds consumers render.
///
/// This is a wire-format contract: an unrecognized persisted type string
/// deserializes as `Text` rather than failing the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionType {
    #[default]
    Text,
    Textarea,
    Checkbox,
    Radio,
    Select,
    Signature,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Radio => "radio",
            QuestionType::Select => "select",
            QuestionType::Signature => "signature",
        }
    }

    /// Parse a stored type string, falling back to `Text` for anything
    /// unrecognized.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "textarea" => QuestionType::Textarea,
            "checkbox" => QuestionType::Checkbox,
            "radio" => QuestionType::Radio,
            "select" => QuestionType::Select,
            "signature" => QuestionType::Signature,
            _ => QuestionType::Text,
        }
    }

    /// Whether the question carries an option list.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::Checkbox | QuestionType::Radio | QuestionType::Select
        )
    }

    /// Human-readable label for pickers and renderers.
    pub fn display_name(&self) -> &'static str {
        match self {
            QuestionType::Text => "Short Text",
            QuestionType::Textarea => "Long Text",
            QuestionType::Checkbox => "Checkboxes",
            QuestionType::Radio => "Multiple Choice",
            QuestionType::Select => "Dropdown",
            QuestionType::Signature => "Signature",
        }
    }
}

impl Serialize for QuestionType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(QuestionType::from_str_lossy(&s))
    }
}

/// A single question within a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    /// Present only for choice questions; at least two entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// A titled group of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A form template. The id is assigned by the store on first save and is
/// stable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Template {
    /// Total question count across all sections.
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// Answer to a single question. Checkbox answers are option lists,
/// everything else (including signatures, stored as data URIs) is a plain
/// string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Multi(Vec<String>),
}

/// A filled-out form. References its template by id; the reference is not
/// enforced and may dangle after template deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub template_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Append-only analytics event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Opaque staged payload awaiting a future sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupQueueItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// The portable export document — the crate's one true file format.
/// Branding secrets are always absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub branding: Option<Branding>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub analytics: Vec<AnalyticsEvent>,
    pub exported_at: DateTime<Utc>,
}

/// What an import actually applied.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub templates: usize,
    pub responses: usize,
    pub branding_applied: bool,
}
