// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Property-based convergence tests for rich text.
//!
//! Several replicas edit independently, occasionally syncing with each
//! other. At the end every operation any replica has seen is delivered to
//! every replica, shuffled and partly duplicated. All replicas, plus a fresh
//! one that only ever saw the shuffled stream, must end up identical.
//!
//! Replicas that only ever relay each other's logs must converge as well.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use pocket_crdt::config::Config;
use pocket_crdt::crdt::op::TextOp;
use pocket_crdt::crdt::peritext::PeritextDoc;

// =============================================================================
// Test helpers
// =============================================================================

const MAX_REPLICAS: usize = 4;

#[derive(Clone, Debug)]
enum Step {
    Insert { replica: usize, pos_pct: f64, text: String },
    Delete { replica: usize, pos_pct: f64, len: usize },
    Format { replica: usize, start_pct: f64, len_pct: f64, bold: bool },
    Unformat { replica: usize, pick: usize },
    Sync { from: usize, to: usize },
}

fn arbitrary_step() -> impl Strategy<Value = Step> {
    let replica = 0..MAX_REPLICAS;
    return prop_oneof![
        6 => (replica.clone(), 0.0..=1.0f64, "[a-z]{1,4}")
            .prop_map(|(replica, pos_pct, text)| Step::Insert { replica, pos_pct, text }),
        3 => (replica.clone(), 0.0..=1.0f64, 1usize..4)
            .prop_map(|(replica, pos_pct, len)| Step::Delete { replica, pos_pct, len }),
        2 => (replica.clone(), 0.0..=1.0f64, 0.0..=1.0f64, any::<bool>())
            .prop_map(|(replica, start_pct, len_pct, bold)| Step::Format { replica, start_pct, len_pct, bold }),
        1 => (replica.clone(), any::<usize>())
            .prop_map(|(replica, pick)| Step::Unformat { replica, pick }),
        2 => (replica.clone(), replica)
            .prop_map(|(from, to)| Step::Sync { from, to }),
    ];
}

fn replicas(count: usize) -> Vec<PeritextDoc> {
    return (0..count)
        .map(|i| PeritextDoc::new(&Config::new(format!("r{}", i)).with_max_log_size(100_000)))
        .collect();
}

fn scaled(pct: f64, len: usize) -> usize {
    return ((pct * len as f64) as usize).min(len);
}

fn apply_step(docs: &mut [PeritextDoc], step: &Step) {
    let count = docs.len();
    match step {
        Step::Insert { replica, pos_pct, text } => {
            let doc = &mut docs[replica % count];
            let pos = scaled(*pos_pct, doc.len());
            doc.insert(pos, text);
        }
        Step::Delete { replica, pos_pct, len } => {
            let doc = &mut docs[replica % count];
            let pos = scaled(*pos_pct, doc.len());
            doc.delete(pos, *len);
        }
        Step::Format { replica, start_pct, len_pct, bold } => {
            let doc = &mut docs[replica % count];
            let len = doc.len();
            if len == 0 {
                return;
            }
            let start = scaled(*start_pct, len - 1);
            let end = start + 1 + scaled(*len_pct, len - start - 1);
            let kind = if *bold { "bold" } else { "italic" };
            doc.format(start, end, kind, None).unwrap();
        }
        Step::Unformat { replica, pick } => {
            let doc = &mut docs[replica % count];
            let live: Vec<_> = doc.marks().iter().map(|m| m.id.clone()).collect();
            if live.is_empty() {
                return;
            }
            doc.unformat(&live[pick % live.len()]).unwrap();
        }
        Step::Sync { from, to } => {
            let (from, to) = (from % count, to % count);
            if from == to {
                return;
            }
            let ops = docs[from].operation_log();
            for op in &ops {
                docs[to].apply_remote_op(op);
            }
        }
    }
}

/// Every op any replica has logged, shuffled, with every fourth repeated.
fn shuffled_stream(docs: &[PeritextDoc], seed: u64) -> Vec<TextOp> {
    let mut ops: Vec<TextOp> = docs.iter().flat_map(|d| d.operation_log()).collect();
    let duplicates: Vec<TextOp> = ops.iter().step_by(4).cloned().collect();
    ops.extend(duplicates);
    let mut rng = StdRng::seed_from_u64(seed);
    ops.shuffle(&mut rng);
    return ops;
}

// =============================================================================
// Convergence properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn replicas_converge_under_shuffled_delivery(
        count in 2usize..=MAX_REPLICAS,
        steps in prop::collection::vec(arbitrary_step(), 1..40),
        seed in any::<u64>(),
    ) {
        let mut docs = replicas(count);
        for step in &steps {
            apply_step(&mut docs, step);
        }

        let stream = shuffled_stream(&docs, seed);
        for (i, doc) in docs.iter_mut().enumerate() {
            let mut ops = stream.clone();
            ops.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(i as u64 + 1)));
            for op in &ops {
                doc.apply_remote_op(op);
            }
        }
        let mut observer = PeritextDoc::new(&Config::new("observer"));
        for op in &stream {
            observer.apply_remote_op(op);
        }

        let expected = observer.snapshot();
        let text = observer.text();
        let spans = observer.spans();
        for doc in &docs {
            prop_assert_eq!(doc.text(), text.clone());
            prop_assert_eq!(doc.snapshot(), expected.clone());
            prop_assert_eq!(doc.spans(), spans.clone());
        }
    }

    #[test]
    fn replicas_converge_by_relaying_logs(
        count in 2usize..=MAX_REPLICAS,
        steps in prop::collection::vec(arbitrary_step(), 1..40),
    ) {
        let mut docs = replicas(count);
        for step in &steps {
            apply_step(&mut docs, step);
        }

        // Two passes around the ring: the first gathers everything at
        // replica 0, the second hands it on to everyone else.
        for _ in 0..2 {
            for from in 0..count {
                apply_step(&mut docs, &Step::Sync { from, to: (from + 1) % count });
            }
        }

        let expected = docs[0].snapshot();
        for doc in &docs[1..] {
            prop_assert_eq!(doc.text(), docs[0].text());
            prop_assert_eq!(doc.snapshot(), expected.clone());
            prop_assert_eq!(doc.spans(), docs[0].spans());
        }
    }

    #[test]
    fn redelivery_is_a_no_op(
        steps in prop::collection::vec(arbitrary_step(), 1..30),
    ) {
        let mut docs = replicas(2);
        for step in &steps {
            apply_step(&mut docs, step);
        }
        let ops = docs[0].operation_log();
        for op in &ops {
            docs[1].apply_remote_op(op);
        }
        let before = docs[1].snapshot();
        for op in &ops {
            prop_assert!(!docs[1].apply_remote_op(op));
        }
        prop_assert_eq!(docs[1].snapshot(), before);
    }

    #[test]
    fn spans_cover_visible_text(
        steps in prop::collection::vec(arbitrary_step(), 1..30),
    ) {
        let mut docs = replicas(1);
        for step in &steps {
            apply_step(&mut docs, step);
        }
        let doc = &docs[0];
        let joined: String = doc.spans().iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(joined, doc.text());
        prop_assert_eq!(doc.text().chars().count(), doc.len());
    }
}
