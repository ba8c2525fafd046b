// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Pairwise transformation of concurrent operations.
//!
//! `transform(a, b)` rebases `a`, which was written against the same document
//! as `b`, so that it can be applied after `b`. For the pairs this module
//! handles, the two application orders agree (TP1):
//!
//! ```text
//! apply(apply(S, b), transform(a, b)) == apply(apply(S, a), transform(b, a))
//! ```
//!
//! The rules work on half-open ranges. An insert that lands strictly inside a
//! concurrent delete is pinned to the delete's start, while the delete grows
//! to cover it. The two sides of that pair disagree on whether the inserted
//! text survives, so it is the one Insert/Delete case outside TP1.
//!
//! Ties between inserts at the same position are broken by comparing the
//! stamps' client (or user) ids as strings. The smaller id is treated as
//! having gone first. Equal ids never shift, so two inserts from the same
//! origin at the same position do not converge.

use super::op::apply;
use super::op::DocumentState;
use super::op::Op;
use super::op::Operation;
use super::primitives::text::char_len;

/// Rebase `a` so it applies after `b`.
///
/// Pairs with no rule (anything involving Set/Unset, or Retain/Format on
/// the right) come back unchanged.
pub fn transform(a: &Operation, b: &Operation) -> Operation {
    let op = match (&a.op, &b.op) {
        (Op::Insert { position, .. }, Op::Insert { position: other, content, .. }) => {
            let shifted = if position < other {
                *position
            } else if position > other {
                position.saturating_add(char_len(content))
            } else if b.stamp.priority() < a.stamp.priority() {
                position.saturating_add(char_len(content))
            } else {
                *position
            };
            moved(&a.op, shifted, None)
        }
        (Op::Insert { position, .. }, Op::Delete { position: start, length }) => {
            moved(&a.op, pin(*position, *start, *length), None)
        }
        (Op::Delete { position, length }, Op::Insert { position: at, content, .. })
        | (Op::Format { position, length, .. }, Op::Insert { position: at, content, .. }) => {
            let (position, length) = widen(*position, *length, *at, char_len(content));
            moved(&a.op, position, Some(length))
        }
        (Op::Delete { position, length }, Op::Delete { position: start, length: removed })
        | (Op::Format { position, length, .. }, Op::Delete { position: start, length: removed }) => {
            let (position, length) = clip(*position, *length, *start, *removed);
            moved(&a.op, position, Some(length))
        }
        _ => a.op.clone(),
    };
    return a.with_op(op);
}

/// Where an insertion point lands once `[start, start + length)` is gone.
fn pin(position: usize, start: usize, length: usize) -> usize {
    if position <= start {
        return position;
    }
    if position >= start.saturating_add(length) {
        return position - length;
    }
    return start;
}

/// Move a span to account for `inserted` chars arriving at `at`.
fn widen(position: usize, length: usize, at: usize, inserted: usize) -> (usize, usize) {
    if at <= position {
        return (position.saturating_add(inserted), length);
    }
    if at >= position.saturating_add(length) {
        return (position, length);
    }
    return (position, length.saturating_add(inserted));
}

/// Remove the part of a span already deleted by `[start, start + removed)`.
fn clip(position: usize, length: usize, start: usize, removed: usize) -> (usize, usize) {
    let end = position.saturating_add(length);
    let removed_end = start.saturating_add(removed);

    if end <= start {
        return (position, length);
    }
    if position >= removed_end {
        return (position - removed, length);
    }

    if position < start {
        if end <= removed_end {
            // Tail overlaps.
            return (position, start - position);
        }
        // Contains the removed range.
        return (position, length - removed);
    }
    if end <= removed_end {
        // Swallowed whole.
        return (start, 0);
    }
    // Head overlaps.
    return (start, end - removed_end);
}

/// Copy `op` with a new position, and a new length where it has one.
fn moved(op: &Op, position: usize, length: Option<usize>) -> Op {
    let mut next = op.clone();
    match &mut next {
        Op::Insert { position: p, .. } => *p = position,
        Op::Delete { position: p, length: l } | Op::Format { position: p, length: l, .. } => {
            *p = position;
            if let Some(length) = length {
                *l = length;
            }
        }
        Op::Retain { .. } | Op::Set { .. } | Op::Unset { .. } => {}
    }
    return next;
}

/// Rebase `operation` against every operation in `sequence`, in order.
///
/// This is the catch-up step: the result applies on top of the document
/// after the whole sequence.
pub fn transform_against_sequence<'a, I>(operation: &Operation, sequence: I) -> Operation
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut transformed = operation.clone();
    for op in sequence {
        transformed = transform(&transformed, op);
    }
    return transformed;
}

/// Rebase each operation of `sequence` against the single `operation`.
pub fn transform_sequence(sequence: &[Operation], operation: &Operation) -> Vec<Operation> {
    return sequence.iter().map(|op| transform(op, operation)).collect();
}

/// `T(T(c, a), T(b, c))`, the right-hand side of the TP2 identity.
///
/// Only meant for tests that spot-check TP2.
pub fn compose_transform(c: &Operation, a: &Operation, b: &Operation) -> Operation {
    let c_after_a = transform(c, a);
    let b_after_c = transform(b, c);
    return transform(&c_after_a, &b_after_c);
}

/// Check TP1 for `a` and `b` on `initial`. Any apply failure counts as
/// divergence.
pub fn verify_convergence(a: &Operation, b: &Operation, initial: &str) -> bool {
    let state = DocumentState::new(initial);
    let b_then_a = apply(b, &state).and_then(|s| apply(&transform(a, b), &s));
    let a_then_b = apply(a, &state).and_then(|s| apply(&transform(b, a), &s));
    return match (b_then_a, a_then_b) {
        (Ok(left), Ok(right)) => left.content == right.content,
        _ => false,
    };
}

/// A retain of `length`; does nothing to plain text.
pub fn identity(length: usize) -> Operation {
    return Operation::new(Op::Retain { length, attributes: None });
}

/// True when `operation` cannot change the document's content or formatting.
pub fn is_noop(operation: &Operation) -> bool {
    return match &operation.op {
        Op::Insert { content, .. } => content.is_empty(),
        Op::Delete { length, .. } | Op::Format { length, .. } => *length == 0,
        Op::Retain { .. } => true,
        Op::Set { .. } | Op::Unset { .. } => false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::op::delete;
    use crate::ot::op::format;
    use crate::ot::op::insert;
    use crate::ot::op::retain;
    use crate::ot::op::set;
    use crate::ot::op::Attributes;
    use serde_json::json;

    fn ins(position: usize, content: &str, client: &str) -> Operation {
        return insert(position, content).unwrap().with_client(client);
    }

    fn del(position: usize, length: usize) -> Operation {
        return delete(position, length).unwrap();
    }

    fn fmt(position: usize, length: usize) -> Operation {
        let mut attributes = Attributes::new();
        attributes.insert("bold".into(), json!(true));
        return format(position, length, attributes).unwrap();
    }

    fn span(op: &Operation) -> (usize, usize) {
        return match &op.op {
            Op::Delete { position, length } | Op::Format { position, length, .. } => (*position, *length),
            other => panic!("expected a span, got {other:?}"),
        };
    }

    fn at(op: &Operation) -> usize {
        return match &op.op {
            Op::Insert { position, .. } => *position,
            other => panic!("expected an insert, got {other:?}"),
        };
    }

    // =========================================================================
    // Insert vs Insert
    // =========================================================================

    #[test]
    fn insert_before_insert_is_unchanged() {
        assert_eq!(at(&transform(&ins(1, "a", "x"), &ins(3, "bb", "y"))), 1);
    }

    #[test]
    fn insert_after_insert_shifts() {
        assert_eq!(at(&transform(&ins(4, "a", "x"), &ins(3, "bb", "y"))), 6);
    }

    #[test]
    fn insert_tie_smaller_id_goes_first() {
        let alice = ins(1, "X", "alice");
        let bob = ins(1, "YY", "bob");
        assert_eq!(at(&transform(&alice, &bob)), 1);
        assert_eq!(at(&transform(&bob, &alice)), 2);
        assert!(verify_convergence(&alice, &bob, "abc"));
    }

    #[test]
    fn insert_tie_falls_back_to_user_id() {
        let a = insert(0, "a").unwrap().with_user("u2");
        let b = insert(0, "b").unwrap().with_user("u1");
        assert_eq!(at(&transform(&a, &b)), 1);
    }

    #[test]
    fn insert_tie_with_equal_ids_diverges() {
        let a = ins(0, "a", "same");
        let b = ins(0, "b", "same");
        assert!(!verify_convergence(&a, &b, ""));
    }

    // =========================================================================
    // Insert vs Delete
    // =========================================================================

    #[test]
    fn insert_against_delete() {
        assert_eq!(at(&transform(&ins(2, "a", "x"), &del(2, 3))), 2);
        assert_eq!(at(&transform(&ins(6, "a", "x"), &del(2, 3))), 3);
        assert_eq!(at(&transform(&ins(5, "a", "x"), &del(2, 3))), 2);
        // Inside the deleted span: pinned to its start.
        assert_eq!(at(&transform(&ins(3, "a", "x"), &del(2, 3))), 2);
    }

    #[test]
    fn delete_against_insert() {
        assert_eq!(span(&transform(&del(2, 3), &ins(1, "ab", "x"))), (4, 3));
        assert_eq!(span(&transform(&del(2, 3), &ins(2, "ab", "x"))), (4, 3));
        assert_eq!(span(&transform(&del(2, 3), &ins(5, "ab", "x"))), (2, 3));
        assert_eq!(span(&transform(&del(2, 3), &ins(3, "ab", "x"))), (2, 5));
    }

    #[test]
    fn insert_and_delete_converge_outside_the_span() {
        let text = "abcdefgh";
        for position in [0, 1, 2, 5, 6, 8] {
            let a = ins(position, "XY", "x");
            assert!(verify_convergence(&a, &del(2, 3), text), "insert at {position}");
            assert!(verify_convergence(&del(2, 3), &a, text), "insert at {position}");
        }
    }

    #[test]
    fn insert_inside_delete_does_not_converge() {
        let a = ins(3, "XY", "x");
        let b = del(2, 3);
        assert!(!verify_convergence(&a, &b, "abcdefgh"));
    }

    // =========================================================================
    // Delete vs Delete
    // =========================================================================

    #[test]
    fn delete_disjoint() {
        assert_eq!(span(&transform(&del(0, 2), &del(4, 2))), (0, 2));
        assert_eq!(span(&transform(&del(5, 2), &del(1, 3))), (2, 2));
    }

    #[test]
    fn delete_overlaps() {
        // Tail of a overlaps head of b.
        assert_eq!(span(&transform(&del(1, 4), &del(3, 4))), (1, 2));
        // a contains b.
        assert_eq!(span(&transform(&del(1, 6), &del(2, 2))), (1, 4));
        // b contains a.
        assert_eq!(span(&transform(&del(3, 2), &del(1, 6))), (1, 0));
        // Head of a overlaps tail of b.
        assert_eq!(span(&transform(&del(3, 4), &del(1, 4))), (1, 2));
    }

    #[test]
    fn delete_pairs_converge() {
        let text = "0123456789";
        for (p1, l1) in [(0, 3), (2, 4), (3, 1), (5, 5)] {
            for (p2, l2) in [(0, 10), (1, 2), (3, 4), (6, 2)] {
                assert!(verify_convergence(&del(p1, l1), &del(p2, l2), text), "{p1}+{l1} vs {p2}+{l2}");
            }
        }
    }

    #[test]
    fn swallowed_delete_is_noop() {
        let rebased = transform(&del(3, 2), &del(1, 6));
        assert!(is_noop(&rebased));
    }

    // =========================================================================
    // Format
    // =========================================================================

    #[test]
    fn format_follows_delete_rules() {
        assert_eq!(span(&transform(&fmt(2, 3), &ins(0, "ab", "x"))), (4, 3));
        assert_eq!(span(&transform(&fmt(2, 3), &ins(3, "ab", "x"))), (2, 5));
        assert_eq!(span(&transform(&fmt(2, 3), &del(0, 1))), (1, 3));
        assert_eq!(span(&transform(&fmt(2, 3), &del(3, 5))), (2, 1));
    }

    #[test]
    fn format_keeps_attributes() {
        let rebased = transform(&fmt(2, 3), &ins(0, "ab", "x"));
        assert!(matches!(&rebased.op, Op::Format { attributes, .. } if attributes.contains_key("bold")));
    }

    // =========================================================================
    // Passthrough
    // =========================================================================

    #[test]
    fn retain_and_structured_ops_pass_through() {
        let a = ins(2, "a", "x");
        assert_eq!(transform(&a, &retain(5).unwrap()), a);
        assert_eq!(transform(&del(1, 1), &retain(5).unwrap()), del(1, 1));
        let s = set(["k"], json!(1)).unwrap();
        assert_eq!(transform(&s, &a), s);
        assert_eq!(transform(&a, &s), a);
        assert_eq!(transform(&del(0, 1), &fmt(0, 1)), del(0, 1));
    }

    #[test]
    fn transform_keeps_stamp() {
        let a = ins(4, "a", "alice").with_timestamp(7);
        let rebased = transform(&a, &ins(0, "zz", "bob"));
        assert_eq!(rebased.stamp, a.stamp);
    }

    // =========================================================================
    // Sequences and helpers
    // =========================================================================

    #[test]
    fn transform_against_sequence_folds() {
        let op = ins(3, "!", "z");
        let sequence = vec![ins(0, "ab", "a"), del(0, 1), ins(10, "tail", "a")];
        let rebased = transform_against_sequence(&op, &sequence);
        assert_eq!(at(&rebased), 4);
        assert_eq!(transform_against_sequence(&op, &[]), op);
    }

    #[test]
    fn transform_sequence_maps() {
        let sequence = vec![ins(0, "a", "z"), del(4, 1)];
        let rebased = transform_sequence(&sequence, &ins(0, "zz", "y"));
        assert_eq!(at(&rebased[0]), 2);
        assert_eq!(span(&rebased[1]), (6, 1));
    }

    #[test]
    fn compose_transform_matches_direct_rebase_for_disjoint_ops() {
        let c = ins(8, "c", "c");
        let a = ins(0, "aa", "a");
        let b = del(4, 1);
        let direct = transform_against_sequence(&c, &[a.clone(), transform(&b, &a)]);
        assert_eq!(compose_transform(&c, &a, &b), direct);
    }

    #[test]
    fn identity_and_noop() {
        assert!(is_noop(&identity(3)));
        assert!(is_noop(&identity(0)));
        assert!(!is_noop(&ins(0, "a", "x")));
        assert!(!is_noop(&set(["k"], json!(1)).unwrap()));
        assert!(is_noop(&Operation::new(Op::Delete { position: 1, length: 0 })));
    }

    #[test]
    fn verify_convergence_rejects_unappliable() {
        assert!(!verify_convergence(&ins(9, "a", "x"), &del(0, 1), "abc"));
    }

    #[test]
    fn huge_spans_do_not_overflow() {
        assert_eq!(transform(&del(usize::MAX, 1), &ins(0, "z", "a")), del(usize::MAX, 1));
        assert_eq!(transform(&ins(usize::MAX, "x", "b"), &ins(0, "z", "a")), ins(usize::MAX, "x", "b"));
        assert_eq!(transform(&ins(usize::MAX, "x", "b"), &del(1, usize::MAX - 1)), ins(1, "x", "b"));
        assert_eq!(transform(&del(2, usize::MAX), &del(usize::MAX - 1, 5)), del(2, usize::MAX - 3));
        assert_eq!(transform(&del(1, usize::MAX), &ins(5, "zz", "a")), del(1, usize::MAX));
    }
}
