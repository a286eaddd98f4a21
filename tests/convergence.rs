// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Scenario tests for rich text convergence between replicas.

use pocket_crdt::Error;
use pocket_crdt::config::Config;
use pocket_crdt::crdt::Crdt;
use pocket_crdt::crdt::op::TextAction;
use pocket_crdt::crdt::op::TextOp;
use pocket_crdt::crdt::peritext::PeritextDoc;
use pocket_crdt::crdt::primitives::ItemId;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Helpers
// =============================================================================

/// Route `RUST_LOG`-filtered output to the test harness. Safe to call often.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn doc(node: &str) -> PeritextDoc {
    init_tracing();
    return PeritextDoc::new(&Config::new(node));
}

fn deliver(target: &mut PeritextDoc, ops: &[TextOp]) {
    for op in ops {
        target.apply_remote_op(op);
    }
}

fn assert_converged(docs: &[&PeritextDoc]) {
    let first = docs[0];
    for other in &docs[1..] {
        assert_eq!(first.text(), other.text());
        assert_eq!(first.snapshot(), other.snapshot());
        assert_eq!(first.spans(), other.spans());
        assert_eq!(first.digest().unwrap(), other.digest().unwrap());
    }
}

// =============================================================================
// Insertion order
// =============================================================================

#[test]
fn concurrent_prefix_inserts_converge() {
    let mut a = doc("A");
    let mut b = doc("B");
    let from_a = a.insert(0, "Hello").unwrap();
    let from_b = b.insert(0, "Hi ").unwrap();

    a.apply_remote_op(&from_b);
    b.apply_remote_op(&from_a);

    // Both runs anchor at the root; ("B", 1) sorts before ("A", 1).
    assert_eq!(a.text(), "Hi Hello");
    assert_converged(&[&a, &b]);
}

#[test]
fn concurrent_inserts_at_same_offset_stay_contiguous() {
    let mut a = doc("alice");
    let mut b = doc("bob");
    let base = a.insert(0, "[]").unwrap();
    b.apply_remote_op(&base);

    let from_a = a.insert(1, "one").unwrap();
    let from_b = b.insert(1, "two").unwrap();
    a.apply_remote_op(&from_b);
    b.apply_remote_op(&from_a);

    assert_eq!(a.text(), "[twoone]");
    assert_converged(&[&a, &b]);
}

#[test]
fn three_replicas_any_order() {
    let mut a = doc("a");
    let mut b = doc("b");
    let mut c = doc("c");
    let base = a.insert(0, "base").unwrap();
    deliver(&mut b, &[base.clone()]);
    deliver(&mut c, &[base]);

    let oa = a.insert(4, "!").unwrap();
    let ob = b.insert(0, ">").unwrap();
    let oc = c.delete(1, 2).unwrap();
    let oc2 = c.insert(1, "O").unwrap();

    deliver(&mut a, &[oc2.clone(), ob.clone(), oc.clone()]);
    deliver(&mut b, &[oa.clone(), oc.clone(), oc2.clone()]);
    deliver(&mut c, &[ob, oa]);

    assert_eq!(a.text(), ">bOe!");
    assert_converged(&[&a, &b, &c]);
}

// =============================================================================
// Deletion
// =============================================================================

#[test]
fn concurrent_deletes_of_same_range_are_idempotent() {
    let mut a = doc("a");
    let mut b = doc("b");
    let base = a.insert(0, "abcdef").unwrap();
    b.apply_remote_op(&base);

    let da = a.delete(1, 3).unwrap();
    let db = b.delete(2, 3).unwrap();
    a.apply_remote_op(&db);
    b.apply_remote_op(&da);

    assert_eq!(a.text(), "af");
    assert_converged(&[&a, &b]);
}

#[test]
fn delete_relayed_ahead_of_its_insert_reaches_third_replica() {
    let mut a = doc("a");
    let mut b = doc("b");
    let mut c = doc("c");
    let insert = a.insert(0, "xy").unwrap();
    let delete = a.delete(0, 1).unwrap();

    // b hears the delete first; c only ever hears from b.
    deliver(&mut b, &[delete, insert]);
    deliver(&mut c, &b.operation_log());

    assert_eq!(c.text(), "y");
    assert_converged(&[&a, &b, &c]);
}

#[test]
fn insert_into_deleted_region_survives() {
    let mut a = doc("a");
    let mut b = doc("b");
    let base = a.insert(0, "abc").unwrap();
    b.apply_remote_op(&base);

    let del = a.delete(0, 3).unwrap();
    let ins = b.insert(2, "X").unwrap();
    a.apply_remote_op(&ins);
    b.apply_remote_op(&del);

    assert_eq!(a.text(), "X");
    assert_converged(&[&a, &b]);
}

// =============================================================================
// Formatting
// =============================================================================

#[test]
fn bold_survives_deleting_first_characters() {
    let mut d = doc("a");
    d.insert(0, "Hello");
    d.format(0, 5, "bold", None).unwrap();
    d.delete(0, 2);

    assert_eq!(d.text(), "llo");
    for pos in 0..3 {
        let kinds: Vec<&str> = d.marks_at(pos).iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["bold"]);
    }
}

#[test]
fn format_expands_with_interior_inserts_only() {
    let mut a = doc("a");
    let mut b = doc("b");
    let base = a.insert(0, "abcd").unwrap();
    b.apply_remote_op(&base);

    let fmt = a.format(1, 3, "italic", None).unwrap();
    let inside = b.insert(2, "X").unwrap();
    let after = b.insert(4, "Y").unwrap();
    a.apply_remote_op(&inside);
    a.apply_remote_op(&after);
    b.apply_remote_op(&fmt);

    assert_eq!(a.text(), "abXcYd");
    let spans = a.spans();
    let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "bXc", "Yd"]);
    assert_converged(&[&a, &b]);
}

#[test]
fn unformat_before_format_arrives() {
    let mut a = doc("a");
    let mut b = doc("b");
    let base = a.insert(0, "text").unwrap();
    let fmt = a.format(0, 4, "bold", None).unwrap();
    let TextAction::Format { mark } = &fmt.action else {
        panic!("expected format op");
    };
    let unfmt = a.unformat(&mark.id).unwrap();

    deliver(&mut b, &[base, unfmt, fmt.clone()]);
    assert!(b.marks().is_empty());
    assert_converged(&[&a, &b]);
}

#[test]
fn invalid_ranges_are_errors() {
    let mut d = doc("a");
    assert!(matches!(d.format(0, 1, "bold", None), Err(Error::InvalidRange { len: 0, .. })));
    d.insert(0, "ab");
    assert!(matches!(d.format(1, 0, "bold", None), Err(Error::InvalidRange { .. })));
    assert!(matches!(d.unformat(&ItemId::new("a", 99)), Err(Error::UnknownMark(_))));
}

// =============================================================================
// State merge and snapshots
// =============================================================================

#[test]
fn state_merge_matches_op_delivery() {
    let mut a = doc("a");
    let mut b = doc("b");
    let base = a.insert(0, "shared").unwrap();
    b.apply_remote_op(&base);
    a.insert(6, " text");
    b.format(0, 6, "bold", None).unwrap();
    b.delete(0, 1);

    let mut by_ops = PeritextDoc::from_snapshot(&Config::new("x"), a.snapshot());
    deliver(&mut by_ops, &b.operation_log());

    let mut by_state = PeritextDoc::from_snapshot(&Config::new("y"), a.snapshot());
    by_state.merge(&b);
    by_state.merge(&b);

    assert_eq!(by_ops.text(), "hared text");
    assert_converged(&[&by_ops, &by_state]);
}

#[test]
fn snapshot_json_restores_marks() {
    let mut a = doc("a");
    a.insert(0, "link");
    a.format(0, 4, "link", Some("https://example.com".to_string())).unwrap();

    let json = a.snapshot_json().unwrap();
    let restored = PeritextDoc::from_json(&Config::new("a"), &json).unwrap();
    assert_eq!(restored.spans(), a.spans());
    assert_eq!(restored.spans()[0].marks[0].value.as_deref(), Some("https://example.com"));
    assert!(PeritextDoc::from_json(&Config::new("a"), "{").is_err());
}
