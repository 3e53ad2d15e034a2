mod helpers;

use helpers::{page_record, record_at, test_history};
use ai_explainer::history::{ContextType, NewRecord};
use ai_explainer::ExplainerError;

#[test]
fn translate_then_summarize_scenario() {
    let (_blobs, history) = test_history();

    history
        .add(NewRecord::text("hi", "Hello back").with_prompt("Translate"))
        .unwrap();
    history
        .add(NewRecord::text("bye", "Goodbye").with_prompt("Summarize"))
        .unwrap();

    let all = history.list_all(None).unwrap();
    let texts: Vec<&str> = all.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["bye", "hi"]);

    let hits = history.search("hi", None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "hi");

    let translated = history.search("", Some("Translate")).unwrap();
    assert_eq!(translated.len(), 1);
    assert_eq!(translated[0].text, "hi");
}

#[test]
fn ids_increase_and_context_defaults_to_text() {
    let (_blobs, history) = test_history();

    let first = history
        .add(NewRecord {
            text: "a".into(),
            explanation: "b".into(),
            ..NewRecord::default()
        })
        .unwrap();
    let second = history.add(NewRecord::text("c", "d")).unwrap();
    assert!(second > first);

    let record = history.get(first).unwrap().unwrap();
    assert_eq!(record.context_type, ContextType::Text);
    assert!(!record.created_at_display.is_empty());
    assert!(record.created_at_epoch_millis > 0);
}

#[test]
fn list_orders_by_timestamp_then_id() {
    let (_blobs, history) = test_history();

    let old = history
        .add(record_at("old", "x", "Explain", "2024/03/01 09:00:00"))
        .unwrap();
    let tie_a = history
        .add(record_at("tie a", "x", "Explain", "2024/03/02 09:00:00"))
        .unwrap();
    let tie_b = history
        .add(record_at("tie b", "x", "Explain", "2024/03/02 09:00:00"))
        .unwrap();
    // Inserted last but dated earliest.
    let backdated = history
        .add(record_at("backdated", "x", "Explain", "2023/12/31 23:59:59"))
        .unwrap();

    let ids: Vec<i64> = history.list_all(None).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![tie_b, tie_a, old, backdated]);

    let top_two: Vec<i64> = history.list_all(Some(2)).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(top_two, vec![tie_b, tie_a]);
    assert!(history.list_all(Some(0)).unwrap().is_empty());
}

#[test]
fn display_timestamp_is_kept_verbatim() {
    let (_blobs, history) = test_history();
    let id = history
        .add(record_at("t", "e", "Explain", "2024/5/7 8:03:09"))
        .unwrap();
    let record = history.get(id).unwrap().unwrap();
    assert_eq!(record.created_at_display, "2024/5/7 8:03:09");

    let later = history
        .add(record_at("u", "e", "Explain", "2024/05/07 08:03:10"))
        .unwrap();
    let later = history.get(later).unwrap().unwrap();
    assert_eq!(later.created_at_epoch_millis - record.created_at_epoch_millis, 1000);
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let (_blobs, history) = test_history();
    history
        .add(page_record("# Rust ownership", "The Book", "https://doc.rust-lang.org/book"))
        .unwrap();
    history
        .add(record_at("Grüße", "A greeting", "Translate", "2024/01/01 10:00:00"))
        .unwrap();

    assert_eq!(history.search("the book", None).unwrap().len(), 1);
    assert_eq!(history.search("OWNERSHIP", None).unwrap().len(), 1);
    assert_eq!(history.search("GRÜSSE", None).unwrap().len(), 0);
    assert_eq!(history.search("GRÜ", None).unwrap().len(), 1);
    assert_eq!(history.search("translate", None).unwrap().len(), 1);
    assert_eq!(history.search("greeting", Some("Summarize")).unwrap().len(), 0);
}

#[test]
fn search_treats_wildcards_literally() {
    let (_blobs, history) = test_history();
    history.add(NewRecord::text("100% sure", "yes")).unwrap();
    history.add(NewRecord::text("snake_case", "naming")).unwrap();
    history.add(NewRecord::text("plain", "text")).unwrap();

    assert_eq!(history.search("%", None).unwrap().len(), 1);
    assert_eq!(history.search("_", None).unwrap().len(), 1);
}

#[test]
fn prompt_filter_is_exact() {
    let (_blobs, history) = test_history();
    history
        .add(NewRecord::text("a", "b").with_prompt("Translate"))
        .unwrap();
    history
        .add(NewRecord::text("c", "d").with_prompt("Translate to French"))
        .unwrap();

    assert_eq!(history.search("", Some("Translate")).unwrap().len(), 1);
    assert_eq!(history.search("", Some("translate")).unwrap().len(), 0);
    assert_eq!(history.search("", Some("")).unwrap().len(), 2);
}

#[test]
fn delete_removes_exactly_one_record() {
    let (_blobs, history) = test_history();
    let a = history.add(record_at("a", "1", "P", "2024/01/01 10:00:00")).unwrap();
    let b = history.add(record_at("b", "2", "P", "2024/01/02 10:00:00")).unwrap();
    let c = history.add(record_at("c", "3", "P", "2024/01/03 10:00:00")).unwrap();

    let before = history.list_all(None).unwrap();
    assert!(history.delete_by_id(b).unwrap());
    let after = history.list_all(None).unwrap();

    let expected: Vec<_> = before.into_iter().filter(|r| r.id != b).collect();
    assert_eq!(after, expected);
    assert_eq!(after.iter().map(|r| r.id).collect::<Vec<_>>(), vec![c, a]);
}

#[test]
fn delete_of_missing_id_is_a_no_op() {
    let (_blobs, history) = test_history();
    history.add(NewRecord::text("a", "b")).unwrap();
    let before = history.list_all(None).unwrap();

    assert!(!history.delete_by_id(999).unwrap());
    assert!(!history.delete_by_id(-1).unwrap());

    assert_eq!(history.list_all(None).unwrap(), before);
}

#[test]
fn clear_all_empties_records_and_prompt_names() {
    let (_blobs, history) = test_history();
    history.add(NewRecord::text("a", "b").with_prompt("Translate")).unwrap();
    history.add(NewRecord::text("c", "d").with_prompt("Summarize")).unwrap();
    assert_eq!(history.distinct_prompt_names().unwrap(), ["Summarize", "Translate"]);

    history.clear_all().unwrap();

    assert!(history.list_all(None).unwrap().is_empty());
    assert!(history.distinct_prompt_names().unwrap().is_empty());
    assert_eq!(history.count().unwrap(), 0);
}

#[test]
fn distinct_prompt_names_skip_missing_and_empty() {
    let (_blobs, history) = test_history();
    history.add(NewRecord::text("a", "b")).unwrap();
    history.add(NewRecord::text("a", "b").with_prompt("")).unwrap();
    history.add(NewRecord::text("a", "b").with_prompt("Explain")).unwrap();
    history.add(NewRecord::text("a", "b").with_prompt("Explain")).unwrap();
    assert_eq!(history.distinct_prompt_names().unwrap(), ["Explain"]);
}

#[test]
fn image_data_requires_image_context() {
    let (_blobs, history) = test_history();
    let err = history
        .add(NewRecord {
            text: "https://example.com/cat.png".into(),
            explanation: "a cat".into(),
            image_data: Some("data:image/png;base64,AAAA".into()),
            ..NewRecord::default()
        })
        .unwrap_err();
    assert!(matches!(err, ExplainerError::Validation(_)));
    assert_eq!(history.count().unwrap(), 0);

    history
        .add(NewRecord {
            text: "https://example.com/cat.png".into(),
            explanation: "a cat".into(),
            context_type: Some(ContextType::Image),
            image_data: Some("data:image/png;base64,AAAA".into()),
            ..NewRecord::default()
        })
        .unwrap();
    assert_eq!(history.count().unwrap(), 1);
}
