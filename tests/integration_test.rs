//! Integration tests for formvault
//!
//! These tests verify end-to-end functionality including:
//! - Store lifecycle against a file-backed database
//! - Template authoring, response submission
//! - Export and import workflows

use formvault::{
    BackupEngine, Branding, FieldValue, FieldValues, QuestionType, ResponseCollector,
    SequentialAllocator, Store, TemplateBuilder,
};
use tempfile::TempDir;

/// Helper to create a file-backed test store
async fn create_test_store() -> (Store, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("formvault.db");

    let store = Store::open(&db_path).await.unwrap();

    (store, temp_dir)
}

fn test_builder() -> TemplateBuilder {
    TemplateBuilder::with_allocator(Box::new(SequentialAllocator::default()))
}

/// Author a small intake template and return its id.
async fn author_intake_template(store: &Store) -> i64 {
    let mut builder = test_builder();
    builder.set_name("Intake");

    let section_id = builder.template().sections[0].id.clone();
    builder.add_question(&section_id, QuestionType::Text);
    builder.add_question(&section_id, QuestionType::Radio);
    builder.add_question(&section_id, QuestionType::Signature);

    builder.save(store).await.unwrap()
}

#[tokio::test]
async fn test_author_submit_export_import_workflow() {
    let (store, _temp) = create_test_store().await;

    // Author
    let template_id = author_intake_template(&store).await;
    assert!(template_id >= 1);

    let template = store.get_template(template_id).await.unwrap().unwrap();
    let questions = &template.sections[0].questions;

    // Submit
    let collector = ResponseCollector::new(store.clone());
    let values = FieldValues::from([
        (questions[0].id.clone(), FieldValue::Text("Ann".to_string())),
        (questions[1].id.clone(), FieldValue::Text("Option 1".to_string())),
        (
            questions[2].id.clone(),
            FieldValue::Text("data:image/png;base64,AAAA".to_string()),
        ),
    ]);
    let response = collector
        .submit(&template, Some("Ann".to_string()), &values)
        .await
        .unwrap();
    assert!(response.id.is_some());

    // Export
    let engine = BackupEngine::new(store.clone());
    let bundle = engine.export_all().await.unwrap();
    assert!(bundle.bytes > 0);

    // Import into a fresh store
    let (fresh, _temp2) = create_test_store().await;
    let summary = BackupEngine::new(fresh.clone())
        .import_all(&bundle.json)
        .await
        .unwrap();
    assert_eq!(summary.templates, 1);
    assert_eq!(summary.responses, 1);

    let restored = fresh.get_template(template_id).await.unwrap().unwrap();
    assert_eq!(restored.name, "Intake");

    let responses = fresh.get_responses_by_template(template_id).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].client_name.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("formvault.db");

    {
        let store = Store::open(&db_path).await.unwrap();
        author_intake_template(&store).await;
        store.set_passcode("1234").await.unwrap();
    }

    let store = Store::open(&db_path).await.unwrap();

    let templates = store.get_all_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "Intake");
    assert!(store.verify_passcode("1234").await.unwrap());
}

#[tokio::test]
async fn test_missing_required_radio_blocks_submission() {
    let (store, _temp) = create_test_store().await;

    let mut builder = test_builder();
    builder.set_name("Consent");
    let section_id = builder.template().sections[0].id.clone();
    let question_id = builder.add_question(&section_id, QuestionType::Radio).unwrap();
    builder.update_question(
        &section_id,
        &question_id,
        formvault::QuestionPatch {
            label: Some("Do you agree?".to_string()),
            required: Some(true),
            ..formvault::QuestionPatch::default()
        },
    );
    let template_id = builder.save(&store).await.unwrap();

    let template = store.get_template(template_id).await.unwrap().unwrap();
    let collector = ResponseCollector::new(store.clone());

    let result = collector.submit(&template, None, &FieldValues::new()).await;
    match result {
        Err(formvault::AppError::Validation(violations)) => {
            assert_eq!(violations, vec!["Please answer: Do you agree?".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    assert!(store.get_all_responses().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_redaction_with_full_branding() {
    let (store, _temp) = create_test_store().await;

    store
        .save_branding(Branding {
            company_name: Some("Acme Landscaping".to_string()),
            email: Some("hello@acme.example".to_string()),
            phone: Some("555-0100".to_string()),
            logo: Some("data:image/png;base64,AAAA".to_string()),
            brand_colors: Some(vec!["#336699".to_string()]),
            ..Branding::default()
        })
        .await
        .unwrap();
    store.set_passcode("8642").await.unwrap();

    let bundle = BackupEngine::new(store.clone()).export_all().await.unwrap();

    assert!(bundle.json.contains("Acme Landscaping"));
    assert!(!bundle.json.contains("passcodeHash"));
    assert!(!bundle.json.contains("passcodeSetAt"));

    // Importing the redacted export must not disturb the passcode.
    BackupEngine::new(store.clone())
        .import_all(&bundle.json)
        .await
        .unwrap();
    assert!(store.verify_passcode("8642").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_then_edit_isolation() {
    let (store, _temp) = create_test_store().await;

    let source_id = author_intake_template(&store).await;

    let builder = test_builder();
    let copy_id = builder.duplicate(&store, source_id).await.unwrap().unwrap();

    let mut session = test_builder();
    assert!(session.load(&store, copy_id).await.unwrap());
    session.set_name("Intake (Edited)");
    let copy_section = session.template().sections[0].id.clone();
    session.add_question(&copy_section, QuestionType::Textarea);
    session.save(&store).await.unwrap();

    let source = store.get_template(source_id).await.unwrap().unwrap();
    let copy = store.get_template(copy_id).await.unwrap().unwrap();

    assert_eq!(source.name, "Intake");
    assert_eq!(source.question_count(), 3);
    assert_eq!(copy.name, "Intake (Edited)");
    assert_eq!(copy.question_count(), 4);
}
