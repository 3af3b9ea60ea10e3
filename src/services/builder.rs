//! Template builder service
//!
//! Stateful editing session over one template's section/question tree.
//! Every mutator works on the in-memory tree only; nothing reaches the
//! store until an explicit, validated `save`.

use chrono::Utc;
use serde_json::json;

use crate::config::MIN_CHOICE_OPTIONS;
use crate::error::{AppError, Result};
use crate::ids::{IdAllocator, UuidAllocator};
use crate::store::{Question, QuestionType, Section, Store, Template};

/// Direction for section/question reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Partial update for a section.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Partial update for a question.
///
/// Changing the type to a choice kind seeds a default option pair when
/// none exist; changing away from a choice kind drops the options.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub label: Option<String>,
    pub required: Option<bool>,
    pub question_type: Option<QuestionType>,
}

/// In-memory editing session producing a well-formed template.
pub struct TemplateBuilder {
    template: Template,
    editing_id: Option<i64>,
    ids: Box<dyn IdAllocator>,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    pub fn new() -> Self {
        Self::with_allocator(Box::new(UuidAllocator))
    }

    pub fn with_allocator(ids: Box<dyn IdAllocator>) -> Self {
        let mut builder = Self {
            template: Template {
                id: None,
                name: String::new(),
                sections: Vec::new(),
                created_at: None,
                updated_at: None,
            },
            editing_id: None,
            ids,
        };
        builder.init_new();
        builder
    }

    /// Start a fresh template with one default section.
    pub fn init_new(&mut self) {
        self.template = Template {
            id: None,
            name: String::new(),
            sections: vec![Section {
                id: self.ids.allocate(),
                title: "Section 1".to_string(),
                description: String::new(),
                questions: Vec::new(),
            }],
            created_at: None,
            updated_at: None,
        };
        self.editing_id = None;
    }

    /// Adopt an existing template as the editing subject.
    /// Returns `false` (without touching the session) when it is missing.
    pub async fn load(&mut self, store: &Store, template_id: i64) -> Result<bool> {
        match store.get_template(template_id).await? {
            Some(template) => {
                self.template = template;
                self.editing_id = Some(template_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The template under edit.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Persisted id of the editing subject, once saved or loaded.
    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.template.name = name.into();
    }

    // ===== Section mutators =====

    pub fn add_section(&mut self) -> String {
        let number = self.template.sections.len() + 1;
        let id = self.ids.allocate();
        self.template.sections.push(Section {
            id: id.clone(),
            title: format!("Section {number}"),
            description: String::new(),
            questions: Vec::new(),
        });
        id
    }

    pub fn remove_section(&mut self, section_id: &str) {
        self.template.sections.retain(|s| s.id != section_id);
    }

    pub fn update_section(&mut self, section_id: &str, patch: SectionPatch) -> bool {
        let Some(section) = self.section_mut(section_id) else {
            return false;
        };
        if let Some(title) = patch.title {
            section.title = title;
        }
        if let Some(description) = patch.description {
            section.description = description;
        }
        true
    }

    /// Swap a section with its neighbor. Clamped: moving the first up or
    /// the last down is a no-op.
    pub fn move_section(&mut self, section_id: &str, direction: MoveDirection) {
        let Some(index) = self.template.sections.iter().position(|s| s.id == section_id) else {
            return;
        };

        match direction {
            MoveDirection::Up if index > 0 => {
                self.template.sections.swap(index, index - 1);
            }
            MoveDirection::Down if index + 1 < self.template.sections.len() => {
                self.template.sections.swap(index, index + 1);
            }
            _ => {}
        }
    }

    // ===== Question mutators =====

    /// Append a question of the given type, returning its id. Choice
    /// types are seeded with a default option pair.
    pub fn add_question(
        &mut self,
        section_id: &str,
        question_type: QuestionType,
    ) -> Option<String> {
        let id = self.ids.allocate();
        let section = self.section_mut(section_id)?;

        let options = question_type
            .is_choice()
            .then(|| vec!["Option 1".to_string(), "Option 2".to_string()]);

        section.questions.push(Question {
            id: id.clone(),
            question_type,
            label: "New Question".to_string(),
            required: false,
            options,
        });
        Some(id)
    }

    pub fn remove_question(&mut self, section_id: &str, question_id: &str) {
        if let Some(section) = self.section_mut(section_id) {
            section.questions.retain(|q| q.id != question_id);
        }
    }

    pub fn update_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        patch: QuestionPatch,
    ) -> bool {
        let Some(question) = self.question_mut(section_id, question_id) else {
            return false;
        };

        if let Some(label) = patch.label {
            question.label = label;
        }
        if let Some(required) = patch.required {
            question.required = required;
        }
        if let Some(question_type) = patch.question_type {
            question.question_type = question_type;
            if question_type.is_choice() {
                if question.options.is_none() {
                    question.options =
                        Some(vec!["Option 1".to_string(), "Option 2".to_string()]);
                }
            } else {
                question.options = None;
            }
        }
        true
    }

    /// Swap a question with its neighbor within a section. Clamped at
    /// both ends, same as `move_section`.
    pub fn move_question(
        &mut self,
        section_id: &str,
        question_id: &str,
        direction: MoveDirection,
    ) {
        let Some(section) = self.section_mut(section_id) else {
            return;
        };
        let Some(index) = section.questions.iter().position(|q| q.id == question_id) else {
            return;
        };

        match direction {
            MoveDirection::Up if index > 0 => {
                section.questions.swap(index, index - 1);
            }
            MoveDirection::Down if index + 1 < section.questions.len() => {
                section.questions.swap(index, index + 1);
            }
            _ => {}
        }
    }

    // ===== Option mutators =====

    pub fn add_option(&mut self, section_id: &str, question_id: &str) {
        if let Some(options) = self.options_mut(section_id, question_id) {
            let number = options.len() + 1;
            options.push(format!("Option {number}"));
        }
    }

    /// Remove one option. Refused (no-op) when it would leave the
    /// question below the minimum option count.
    pub fn remove_option(&mut self, section_id: &str, question_id: &str, index: usize) {
        if let Some(options) = self.options_mut(section_id, question_id) {
            if options.len() > MIN_CHOICE_OPTIONS && index < options.len() {
                options.remove(index);
            }
        }
    }

    pub fn update_option(
        &mut self,
        section_id: &str,
        question_id: &str,
        index: usize,
        value: impl Into<String>,
    ) {
        if let Some(options) = self.options_mut(section_id, question_id) {
            if let Some(slot) = options.get_mut(index) {
                *slot = value.into();
            }
        }
    }

    // ===== Validation and persistence =====

    /// Check the tree against the authoring rules. Returns every
    /// violation as a human-readable string; an empty list means the
    /// template is save-ready.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.template.name.trim().is_empty() {
            errors.push("Form name is required".to_string());
        }

        if self.template.sections.is_empty() {
            errors.push("At least one section is required".to_string());
        }

        for (section_index, section) in self.template.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                errors.push(format!("Section {} must have a title", section_index + 1));
            }

            if section.questions.is_empty() {
                errors.push(format!(
                    "Section \"{}\" must have at least one question",
                    section.title
                ));
            }

            for (question_index, question) in section.questions.iter().enumerate() {
                if question.label.trim().is_empty() {
                    errors.push(format!(
                        "Question {} in \"{}\" must have a label",
                        question_index + 1,
                        section.title
                    ));
                }

                if question.question_type.is_choice()
                    && question
                        .options
                        .as_ref()
                        .map_or(true, |o| o.len() < MIN_CHOICE_OPTIONS)
                {
                    errors.push(format!(
                        "Question \"{}\" must have at least {} options",
                        question.label, MIN_CHOICE_OPTIONS
                    ));
                }
            }
        }

        errors
    }

    /// Validate and persist. On violations the store is never called.
    /// After the first save the session adopts the assigned id and keeps
    /// its `createdAt`, so editing can continue and re-save updates in
    /// place without restamping the creation time.
    pub async fn save(&mut self, store: &Store) -> Result<i64> {
        let errors = self.validate();
        if !errors.is_empty() {
            tracing::debug!("Template validation failed: {:?}", errors);
            return Err(AppError::Validation(errors));
        }

        let now = Utc::now();
        self.template.created_at.get_or_insert(now);
        self.template.updated_at = Some(now);

        let mut template = self.template.clone();
        template.id = self.editing_id;

        let id = store.save_template(template).await?;
        self.editing_id = Some(id);
        self.template.id = Some(id);

        tracing::info!("Template saved: {}", id);

        store
            .log_event(
                "template_saved",
                json!({
                    "templateId": id,
                    "sectionCount": self.template.sections.len(),
                    "questionCount": self.template.question_count(),
                }),
            )
            .await;

        Ok(id)
    }

    /// Deep-copy a stored template under "<name> (Copy)" with fresh ids
    /// for every section and question, so the copy never aliases the
    /// original. Returns the new id, or `None` when the source is
    /// missing.
    pub async fn duplicate(&self, store: &Store, template_id: i64) -> Result<Option<i64>> {
        let Some(source) = store.get_template(template_id).await? else {
            return Ok(None);
        };

        let mut copy = source.clone();
        copy.id = None;
        copy.name = format!("{} (Copy)", source.name);
        for section in &mut copy.sections {
            section.id = self.ids.allocate();
            for question in &mut section.questions {
                question.id = self.ids.allocate();
            }
        }

        let new_id = store.save_template(copy).await?;
        tracing::info!("Template {} duplicated as {}", template_id, new_id);

        store
            .log_event(
                "template_duplicated",
                json!({"sourceId": template_id, "templateId": new_id}),
            )
            .await;

        Ok(Some(new_id))
    }

    // ===== Internal lookups =====

    fn section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.template.sections.iter_mut().find(|s| s.id == section_id)
    }

    fn question_mut(&mut self, section_id: &str, question_id: &str) -> Option<&mut Question> {
        self.section_mut(section_id)?
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
    }

    fn options_mut(&mut self, section_id: &str, question_id: &str) -> Option<&mut Vec<String>> {
        self.question_mut(section_id, question_id)?.options.as_mut()
    }
}
