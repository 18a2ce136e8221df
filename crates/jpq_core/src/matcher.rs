//! Matcher that walks a JSON document guided by a compiled opcode tree

use std::cmp::Ordering;

use serde_json::Value;

use crate::opcode::{OpId, OpKind, Program, SLICE_START_UNSET, SLICE_STOP_UNSET};

/// Evaluate a compiled program against a document root
///
/// Returns references to every matched value, in document visitation order.
/// Matching never fails: type mismatches, out-of-range indices, and missing
/// keys simply contribute no matches.
pub fn evaluate<'a>(program: &Program, root: &'a Value) -> Vec<&'a Value> {
    let mut out = Vec::new();
    apply(program, program.head(), root, root, &mut out, false);
    out
}

/// Apply one opcode to the cursor, appending matches to `out`
///
/// `op == None` is the terminal rule: the cursor itself is a match. `deep`
/// means the previous opcode was the descendant axis, so after applying at
/// the cursor the same opcode is retried against every child.
fn apply<'a>(
    p: &Program,
    op: Option<OpId>,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let Some(id) = op else {
        out.push(cursor);
        return;
    };

    match p.op(id).kind {
        OpKind::Wildcard => apply_wildcard(p, id, root, cursor, out, deep),
        OpKind::Label | OpKind::String => apply_key(p, id, root, cursor, out, deep),
        OpKind::Number => apply_index(p, id, root, cursor, out, deep),
        OpKind::Slice => apply_slice(p, id, root, cursor, out, deep),
        OpKind::Union => apply_union(p, id, root, cursor, out, deep),
        OpKind::Deep => apply(p, p.op(id).sibling, root, cursor, out, true),
        // anything else in axis position is a filter predicate
        _ => apply_filter(p, id, root, cursor, out, deep),
    }
}

/// Retry `id` against every child of the cursor, still in deep mode
fn descend<'a>(p: &Program, id: OpId, root: &'a Value, cursor: &'a Value, out: &mut Vec<&'a Value>) {
    match cursor {
        Value::Array(arr) => {
            for child in arr {
                apply(p, Some(id), root, child, out, true);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                apply(p, Some(id), root, child, out, true);
            }
        }
        _ => {}
    }
}

fn apply_wildcard<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let next = p.op(id).sibling;

    match cursor {
        Value::Array(arr) => {
            for child in arr {
                apply(p, next, root, child, out, false);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                apply(p, next, root, child, out, false);
            }
        }
        _ => {}
    }

    if deep {
        descend(p, id, root, cursor, out);
    }
}

fn apply_key<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let op = p.op(id);
    select_key(p, op.text.as_deref(), op.sibling, root, cursor, out);

    if deep {
        descend(p, id, root, cursor, out);
    }
}

/// Key selection: a present key matches even when its value is null
fn select_key<'a>(
    p: &Program,
    name: Option<&str>,
    next: Option<OpId>,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
) {
    if let Value::Object(map) = cursor {
        if let Some(name) = name {
            if let Some(child) = map.get(name) {
                apply(p, next, root, child, out, false);
            }
        }
    }
}

fn apply_index<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let op = p.op(id);
    select_index(p, op.num, op.sibling, root, cursor, out);

    if deep {
        descend(p, id, root, cursor, out);
    }
}

/// Index selection: negative counts from the end, out of range is no match
fn select_index<'a>(
    p: &Program,
    num: i64,
    next: Option<OpId>,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
) {
    if let Value::Array(arr) = cursor {
        let mut idx = num;
        if idx < 0 {
            idx += arr.len() as i64;
        }
        if idx >= 0 && (idx as usize) < arr.len() {
            apply(p, next, root, &arr[idx as usize], out, false);
        }
    }
}

fn apply_slice<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let op = p.op(id);

    if let Value::Array(arr) = cursor {
        if let Some((start, stop, step)) = slice_bounds(p, id, arr.len()) {
            if (start >= 0 || stop >= 0)
                && ((start < stop && step > 0) || (start > stop && step < 0))
            {
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    // indices passing outside [0, len) are skipped, not clamped
                    if i >= 0 && (i as usize) < arr.len() {
                        apply(p, op.sibling, root, &arr[i as usize], out, false);
                    }
                    i += step;
                }
            }
        }
    }

    if deep {
        descend(p, id, root, cursor, out);
    }
}

/// Read the slice triple and resolve omitted parts against the array length
///
/// Step 0 means auto: forward when start <= stop, backward otherwise. An
/// omitted stop runs to the end (or past the front for backward slices); an
/// omitted start begins at whichever end the direction implies.
fn slice_bounds(p: &Program, id: OpId, len: usize) -> Option<(i64, i64, i64)> {
    let first = p.op(id).down?;
    let second = p.op(first).sibling?;
    let third = p.op(second).sibling?;

    let start_raw = p.op(first).num;
    let mut stop = p.op(second).num;
    let mut step = p.op(third).num;

    if step == 0 {
        step = if start_raw <= stop { 1 } else { -1 };
    }
    if stop == SLICE_STOP_UNSET {
        stop = if step > 0 { len as i64 } else { -1 };
    }
    let start = if start_raw == SLICE_START_UNSET {
        if step > 0 { 0 } else { len as i64 - 1 }
    } else {
        start_raw
    };

    Some((start, stop, step))
}

fn apply_union<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    let next = p.op(id).sibling;
    let mut member = p.op(id).down;

    // members run in declaration order; overlaps are kept, not de-duplicated
    while let Some(m) = member {
        let mop = p.op(m);
        match mop.kind {
            OpKind::Number => select_index(p, mop.num, next, root, cursor, out),
            OpKind::Label | OpKind::String => {
                select_key(p, mop.text.as_deref(), next, root, cursor, out);
            }
            _ => filter_children(p, m, next, root, cursor, out),
        }
        member = mop.sibling;
    }

    if deep {
        descend(p, id, root, cursor, out);
    }
}

fn apply_filter<'a>(
    p: &Program,
    id: OpId,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
    deep: bool,
) {
    filter_children(p, id, p.op(id).sibling, root, cursor, out);

    if deep {
        descend(p, id, root, cursor, out);
    }
}

/// Run a predicate over the cursor's children; matches continue on `next`
fn filter_children<'a>(
    p: &Program,
    pred: OpId,
    next: Option<OpId>,
    root: &'a Value,
    cursor: &'a Value,
    out: &mut Vec<&'a Value>,
) {
    match cursor {
        Value::Array(arr) => {
            for (idx, child) in arr.iter().enumerate() {
                if eval_predicate(p, pred, root, child, None, Some(idx as i64)) {
                    apply(p, next, root, child, out, false);
                }
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                if eval_predicate(p, pred, root, child, Some(key.as_str()), None) {
                    apply(p, next, root, child, out, false);
                }
            }
        }
        _ => {}
    }
}

/// Evaluate a filter predicate with `node` bound to `@`
///
/// `key`/`index` describe the node's position under the cursor being
/// filtered, for bare label and index predicates.
fn eval_predicate(
    p: &Program,
    id: OpId,
    root: &Value,
    node: &Value,
    key: Option<&str>,
    index: Option<i64>,
) -> bool {
    let op = p.op(id);

    match op.kind {
        OpKind::Wildcard => true,
        OpKind::Eq | OpKind::Ne | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge => {
            eval_comparison(p, id, root, node)
        }
        OpKind::Root => subpath_matches(p, op.down, root, root),
        OpKind::This => subpath_matches(p, op.down, root, node),
        OpKind::Not => match op.down {
            Some(inner) => !eval_predicate(p, inner, root, node, key, index),
            None => false,
        },
        OpKind::And => {
            let mut child = op.down;
            while let Some(c) = child {
                if !eval_predicate(p, c, root, node, key, index) {
                    return false;
                }
                child = p.op(c).sibling;
            }
            true
        }
        // expression unions behave as OR in predicate position
        OpKind::Or | OpKind::Union => {
            let mut child = op.down;
            while let Some(c) = child {
                if eval_predicate(p, c, root, node, key, index) {
                    return true;
                }
                child = p.op(c).sibling;
            }
            false
        }
        OpKind::Label | OpKind::String => key == op.text.as_deref(),
        OpKind::Number => index == Some(op.num),
        _ => false,
    }
}

/// Existence test: does the sub-path match at least one value?
fn subpath_matches(p: &Program, head: Option<OpId>, root: &Value, start: &Value) -> bool {
    let mut buf = Vec::new();
    apply(p, head, root, start, &mut buf, false);
    !buf.is_empty()
}

/// A filter operand resolved to a comparable tagged value
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand<'a> {
    Bool(bool),
    Int(i64),
    Str(&'a str),
    /// `*` on the right-hand side matches anything
    Any,
}

fn eval_comparison(p: &Program, id: OpId, root: &Value, node: &Value) -> bool {
    let op = p.op(id);
    let Some(left_id) = op.down else {
        return false;
    };
    let Some(right_id) = p.op(left_id).sibling else {
        return false;
    };

    let Some(left) = resolve_operand(p, left_id, root, node) else {
        return false;
    };
    let Some(right) = resolve_operand(p, right_id, root, node) else {
        return false;
    };

    if matches!(right, Operand::Any) {
        return true;
    }

    // differently tagged operands never compare
    let order = match (&left, &right) {
        (Operand::Bool(l), Operand::Bool(r)) => l.cmp(r),
        (Operand::Int(l), Operand::Int(r)) => l.cmp(r),
        (Operand::Str(l), Operand::Str(r)) => l.cmp(r),
        _ => return false,
    };

    match op.kind {
        OpKind::Eq => order == Ordering::Equal,
        OpKind::Ne => order != Ordering::Equal,
        OpKind::Lt => order == Ordering::Less,
        OpKind::Le => order != Ordering::Greater,
        OpKind::Gt => order == Ordering::Greater,
        OpKind::Ge => order != Ordering::Less,
        _ => false,
    }
}

/// Resolve an operand opcode against the current node
///
/// Sub-paths take their first non-null match; a sub-path with no match, or a
/// match that is not a bool, integer, or string, leaves the operand
/// unresolved and the enclosing comparison false.
fn resolve_operand<'a>(
    p: &'a Program,
    id: OpId,
    root: &'a Value,
    node: &'a Value,
) -> Option<Operand<'a>> {
    let op = p.op(id);

    match op.kind {
        OpKind::This => first_resolved(p, op.down, root, node),
        OpKind::Root => first_resolved(p, op.down, root, root),
        OpKind::Wildcard => Some(Operand::Any),
        OpKind::Bool => Some(Operand::Bool(op.num != 0)),
        OpKind::Number => Some(Operand::Int(op.num)),
        OpKind::String | OpKind::Label => op.text.as_deref().map(Operand::Str),
        _ => None,
    }
}

fn first_resolved<'a>(
    p: &Program,
    head: Option<OpId>,
    root: &'a Value,
    start: &'a Value,
) -> Option<Operand<'a>> {
    let mut buf = Vec::new();
    apply(p, head, root, start, &mut buf, false);
    buf.into_iter()
        .find(|v| !v.is_null())
        .and_then(value_to_operand)
}

fn value_to_operand(value: &Value) -> Option<Operand<'_>> {
    match value {
        Value::Bool(b) => Some(Operand::Bool(*b)),
        Value::Number(n) => n.as_i64().map(Operand::Int),
        Value::String(s) => Some(Operand::Str(s)),
        _ => None,
    }
}
