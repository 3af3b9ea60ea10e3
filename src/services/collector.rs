//! Response collector service
//!
//! Maps a template's question list to a flat answer set, enforcing
//! required-field and type-specific completeness rules before handing the
//! response to the store. All violations are accumulated so a caller can
//! surface every missing field at once.

use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use crate::error::{AppError, Result};
use crate::store::{Answer, QuestionType, Response, Store, Template};

/// Raw field value as captured by the form surface.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text inputs, selects, radios, signature data URIs.
    Text(String),
    /// The set of checked option strings for a checkbox group.
    Checked(Vec<String>),
}

impl FieldValue {
    fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Checked(v) => v.first().cloned().unwrap_or_default(),
        }
    }

    fn as_selections(&self) -> Vec<String> {
        match self {
            FieldValue::Checked(v) => v.clone(),
            FieldValue::Text(s) if s.is_empty() => Vec::new(),
            FieldValue::Text(s) => vec![s.clone()],
        }
    }
}

/// Raw values keyed by question id.
pub type FieldValues = HashMap<String, FieldValue>;

/// Walk the template's questions and build the answers map, or report
/// every per-question violation.
pub fn collect_answers(
    template: &Template,
    values: &FieldValues,
) -> std::result::Result<BTreeMap<String, Answer>, Vec<String>> {
    let mut answers = BTreeMap::new();
    let mut violations = Vec::new();

    for section in &template.sections {
        for question in &section.questions {
            let value = values.get(&question.id);

            match question.question_type {
                QuestionType::Checkbox => {
                    let selections =
                        value.map(FieldValue::as_selections).unwrap_or_default();
                    if question.required && selections.is_empty() {
                        violations.push(format!("Please answer: {}", question.label));
                    }
                    answers.insert(question.id.clone(), Answer::Multi(selections));
                }
                QuestionType::Signature => {
                    let data_uri = value.map(FieldValue::as_text).unwrap_or_default();
                    if data_uri.is_empty() {
                        if question.required {
                            violations
                                .push(format!("Please provide signature: {}", question.label));
                        }
                        // An unsigned optional signature stays absent.
                    } else {
                        answers.insert(question.id.clone(), Answer::Text(data_uri));
                    }
                }
                _ => {
                    let text = value.map(FieldValue::as_text).unwrap_or_default();
                    if question.required && text.is_empty() {
                        violations.push(format!("Please answer: {}", question.label));
                    }
                    answers.insert(question.id.clone(), Answer::Text(text));
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(answers)
    } else {
        Err(violations)
    }
}

/// Collects raw field values into stored responses.
#[derive(Clone)]
pub struct ResponseCollector {
    store: Store,
}

impl ResponseCollector {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Validate and persist one submission. On violations the store is
    /// never called and the error carries every failure.
    pub async fn submit(
        &self,
        template: &Template,
        client_name: Option<String>,
        values: &FieldValues,
    ) -> Result<Response> {
        let template_id = template.id.ok_or_else(|| {
            AppError::Generic("cannot submit a response to an unsaved template".to_string())
        })?;

        let answers = collect_answers(template, values).map_err(AppError::Validation)?;

        let mut response = Response {
            id: None,
            template_id,
            client_name,
            answers,
            submitted_at: Some(chrono::Utc::now()),
        };

        let id = self.store.save_response(response.clone()).await?;
        response.id = Some(id);

        tracing::info!("Response {} submitted for template {}", id, template_id);

        self.store
            .log_event(
                "form_submitted",
                json!({
                    "templateId": template_id,
                    "clientName": response.client_name,
                }),
            )
            .await;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Question, Section};

    fn question(id: &str, question_type: QuestionType, required: bool) -> Question {
        Question {
            id: id.to_string(),
            question_type,
            label: format!("Question {id}"),
            required,
            options: question_type
                .is_choice()
                .then(|| vec!["Yes".to_string(), "No".to_string()]),
        }
    }

    fn template(questions: Vec<Question>) -> Template {
        Template {
            id: Some(1),
            name: "Survey".to_string(),
            sections: vec![Section {
                id: "s-1".to_string(),
                title: "A".to_string(),
                description: String::new(),
                questions,
            }],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_required_radio_without_selection_reports_one_violation() {
        let template = template(vec![question("q-1", QuestionType::Radio, true)]);

        let result = collect_answers(&template, &FieldValues::new());
        let violations = result.unwrap_err();

        assert_eq!(violations, vec!["Please answer: Question q-1".to_string()]);
    }

    #[test]
    fn test_all_violations_are_accumulated() {
        let template = template(vec![
            question("q-1", QuestionType::Text, true),
            question("q-2", QuestionType::Checkbox, true),
            question("q-3", QuestionType::Signature, true),
        ]);

        let violations = collect_answers(&template, &FieldValues::new()).unwrap_err();
        assert_eq!(violations.len(), 3);
        assert!(violations[2].starts_with("Please provide signature:"));
    }

    #[test]
    fn test_checkbox_answers_are_option_lists() {
        let template = template(vec![question("q-1", QuestionType::Checkbox, true)]);
        let values = FieldValues::from([(
            "q-1".to_string(),
            FieldValue::Checked(vec!["Yes".to_string(), "No".to_string()]),
        )]);

        let answers = collect_answers(&template, &values).unwrap();
        assert_eq!(
            answers["q-1"],
            Answer::Multi(vec!["Yes".to_string(), "No".to_string()])
        );
    }

    #[test]
    fn test_optional_unanswered_fields() {
        let template = template(vec![
            question("q-1", QuestionType::Text, false),
            question("q-2", QuestionType::Checkbox, false),
            question("q-3", QuestionType::Signature, false),
        ]);

        let answers = collect_answers(&template, &FieldValues::new()).unwrap();

        // Text and checkbox record their empty shapes; an unsigned
        // optional signature is simply absent.
        assert_eq!(answers["q-1"], Answer::Text(String::new()));
        assert_eq!(answers["q-2"], Answer::Multi(Vec::new()));
        assert!(!answers.contains_key("q-3"));
    }

    #[test]
    fn test_signature_stores_data_uri() {
        let template = template(vec![question("q-1", QuestionType::Signature, true)]);
        let values = FieldValues::from([(
            "q-1".to_string(),
            FieldValue::Text("data:image/png;base64,AAAA".to_string()),
        )]);

        let answers = collect_answers(&template, &values).unwrap();
        assert_eq!(
            answers["q-1"],
            Answer::Text("data:image/png;base64,AAAA".to_string())
        );
    }

    #[tokio::test]
    async fn test_submit_persists_and_logs() {
        let store = Store::open_in_memory().await.unwrap();
        let collector = ResponseCollector::new(store.clone());

        let template = template(vec![question("q-1", QuestionType::Text, true)]);
        let values = FieldValues::from([(
            "q-1".to_string(),
            FieldValue::Text("Ann".to_string()),
        )]);

        let response = collector
            .submit(&template, Some("Ann".to_string()), &values)
            .await
            .unwrap();

        assert!(response.id.is_some());
        assert!(response.submitted_at.is_some());

        let stored = store.get_response(response.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.client_name.as_deref(), Some("Ann"));

        let events = store.get_analytics_by_type("form_submitted").await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_never_touches_store_on_violations() {
        let store = Store::open_in_memory().await.unwrap();
        let collector = ResponseCollector::new(store.clone());

        let template = template(vec![question("q-1", QuestionType::Radio, true)]);
        let result = collector.submit(&template, None, &FieldValues::new()).await;

        match result {
            Err(AppError::Validation(violations)) => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("Question q-1"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        assert!(store.get_all_responses().await.unwrap().is_empty());
    }
}
