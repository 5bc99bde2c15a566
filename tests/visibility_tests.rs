//! Integration tests for email-based delivery visibility.
//!
//! Non-admin callers only see workflow headers plus the task rows whose
//! `emails` column matches one of their addresses on a word boundary.

use delivery_board::db::Database;
use delivery_board::types::TaskRow;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

/// Helper to build a task row with an assignment list.
fn task(key: i64, del_code: &str, step_id: i64, emails: Option<&str>) -> TaskRow {
    TaskRow {
        key,
        delivery_code: None,
        del_code: del_code.to_string(),
        step_id,
        task_details: None,
        frequency_timeline: None,
        client: None,
        short_description: None,
        planned_start: None,
        planned_delivery: None,
        responsibility: None,
        current_status: None,
        email: None,
        emails: emails.map(|e| e.to_string()),
        total_tasks: None,
        completed_tasks: None,
        planned_tasks: None,
        percent_complete: None,
        time_left: None,
        card_corner_status: None,
        created_at: None,
        updated_at: None,
    }
}

fn emails(list: &[&str]) -> Vec<String> {
    list.iter().map(|e| e.to_string()).collect()
}

#[test]
fn codes_resolve_from_matching_assignment_lists() {
    let db = setup_db();
    db.upsert_task(&task(1, "DC-1", 0, None)).unwrap();
    db.upsert_task(&task(2, "DC-1", 1, Some("alice@x.com, bob@x.com")))
        .unwrap();
    db.upsert_task(&task(3, "DC-2", 0, None)).unwrap();
    db.upsert_task(&task(4, "DC-2", 1, Some("carol@x.com"))).unwrap();

    let codes = db.delivery_codes_for_emails(&emails(&["alice@x.com"])).unwrap();
    assert_eq!(codes, vec!["DC-1"]);

    let codes = db
        .delivery_codes_for_emails(&emails(&["alice@x.com", "carol@x.com"]))
        .unwrap();
    assert_eq!(codes, vec!["DC-1", "DC-2"]);
}

#[test]
fn substring_address_does_not_leak_a_delivery() {
    let db = setup_db();
    db.upsert_task(&task(1, "DC-1", 1, Some("xalice@x.com"))).unwrap();

    // "alice@x.com" appears inside "xalice@x.com" but is not a member.
    let codes = db.delivery_codes_for_emails(&emails(&["alice@x.com"])).unwrap();
    assert!(codes.is_empty());
}

#[test]
fn matching_is_case_insensitive() {
    let db = setup_db();
    db.upsert_task(&task(1, "DC-1", 1, Some("Alice@X.com"))).unwrap();

    let codes = db.delivery_codes_for_emails(&emails(&["alice@x.com"])).unwrap();
    assert_eq!(codes, vec!["DC-1"]);
}

#[test]
fn assigned_rows_exclude_header_and_other_people() {
    let db = setup_db();
    db.upsert_task(&task(1, "DC-1", 0, Some("alice@x.com"))).unwrap();
    db.upsert_task(&task(2, "DC-1", 1, Some("alice@x.com"))).unwrap();
    db.upsert_task(&task(3, "DC-1", 2, Some("bob@x.com"))).unwrap();

    let rows = db
        .assigned_task_rows("DC-1", &emails(&["alice@x.com"]))
        .unwrap();
    let keys: Vec<i64> = rows.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![2]);
}

#[test]
fn assigned_rows_for_unlisted_address_are_empty() {
    let db = setup_db();
    db.upsert_task(&task(2, "DC-1", 1, Some("alice@x.com"))).unwrap();

    let rows = db.assigned_task_rows("DC-1", &emails(&["mallory@x.com"])).unwrap();
    assert!(rows.is_empty());

    let rows = db.assigned_task_rows("DC-1", &[]).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn headers_for_codes_respect_order_and_paging() {
    let db = setup_db();
    for (key, code) in [(1, "DC-C"), (2, "DC-A"), (3, "DC-B")] {
        db.upsert_task(&task(key, code, 0, None)).unwrap();
    }

    let codes = vec!["DC-A".to_string(), "DC-B".to_string(), "DC-C".to_string()];
    let rows = db.delivery_headers_for_codes(&codes, 10, 0).unwrap();
    let order: Vec<&str> = rows.iter().map(|r| r.del_code.as_str()).collect();
    assert_eq!(order, vec!["DC-A", "DC-B", "DC-C"]);

    let rows = db.delivery_headers_for_codes(&codes, 1, 1).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].del_code, "DC-B");

    let rows = db.delivery_headers_for_codes(&[], 10, 0).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn admin_headers_list_every_delivery_once() {
    let db = setup_db();
    db.upsert_task(&task(1, "DC-1", 0, None)).unwrap();
    db.upsert_task(&task(2, "DC-1", 1, Some("alice@x.com"))).unwrap();
    db.upsert_task(&task(3, "DC-2", 0, None)).unwrap();

    let rows = db.delivery_headers(100, 0).unwrap();
    let codes: Vec<&str> = rows.iter().map(|r| r.del_code.as_str()).collect();
    assert_eq!(codes, vec!["DC-1", "DC-2"]);
    assert!(rows.iter().all(|r| r.step_id == 0));
}

#[test]
fn detail_rows_come_back_header_first() {
    let db = setup_db();
    db.upsert_task(&task(5, "DC-1", 2, None)).unwrap();
    db.upsert_task(&task(6, "DC-1", 0, None)).unwrap();
    db.upsert_task(&task(7, "DC-1", 1, None)).unwrap();

    let rows = db.delivery_rows("DC-1").unwrap();
    let steps: Vec<i64> = rows.iter().map(|r| r.step_id).collect();
    assert_eq!(steps, vec![0, 1, 2]);
}
