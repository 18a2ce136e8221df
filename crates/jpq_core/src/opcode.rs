//! Compiled opcode tree for JSONPath expressions
//!
//! The compiler lowers a query into a tree of [`Op`] nodes stored in a
//! contiguous [`Pool`] and addressed by 32-bit [`OpId`] handles. `down` points
//! at the head of a node's child list, `sibling` at the next node in that
//! list; path steps are chained through `sibling` as well. The pool is
//! immutable once compilation ends and is dropped as one unit.

/// `num` value of the first slice child when the start bound was omitted.
pub const SLICE_START_UNSET: i64 = i64::MIN;

/// `num` value of the second slice child when the stop bound was omitted.
pub const SLICE_STOP_UNSET: i64 = i64::MAX;

/// Opcode kinds (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Document root reference `$` (filter operand position)
    Root,
    /// Current node reference `@` (filter operand position)
    This,
    /// Descendant axis `..`; applies its `sibling` at every depth
    Deep,
    /// Wildcard `*` / `[*]`
    Wildcard,
    /// Bare identifier step: `.name`
    Label,
    /// Quoted key or string literal: `['name']`, `"lit"`
    String,
    /// Array index or integer literal
    Number,
    /// Array slice `[start:stop:step]`; three `Number` children
    Slice,
    /// Union `[a,b,…]`; children are the member selectors
    Union,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`; all children must hold
    And,
    /// `||`; any child may hold
    Or,
    /// `!`; negates its single child
    Not,
    /// `true` / `false` literal (`num` is 1 or 0)
    Bool,
}

/// Handle into the opcode pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpId(u32);

impl OpId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the compiled expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub kind: OpKind,
    /// Signed integer payload: index, slice component, boolean
    pub num: i64,
    /// String payload: label, key, or string literal
    pub text: Option<Box<str>>,
    /// First child
    pub down: Option<OpId>,
    /// Next sibling in the parent's child list (or next path step)
    pub sibling: Option<OpId>,
}

/// Arena holding every opcode of one compiled expression
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pool {
    ops: Vec<Op>,
}

impl Pool {
    // The expression length cap keeps the arena far below the u32 range.
    pub(crate) fn alloc(&mut self, kind: OpKind, num: i64, text: Option<Box<str>>) -> OpId {
        let id = OpId(self.ops.len() as u32);
        self.ops.push(Op {
            kind,
            num,
            text,
            down: None,
            sibling: None,
        });
        id
    }

    pub fn op(&self, id: OpId) -> &Op {
        &self.ops[id.index()]
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn set_sibling(&mut self, id: OpId, sibling: OpId) {
        self.ops[id.index()].sibling = Some(sibling);
    }

    /// Append `child` at the tail of `parent`'s child list.
    pub(crate) fn push_child(&mut self, parent: OpId, child: OpId) {
        match self.ops[parent.index()].down {
            None => self.ops[parent.index()].down = Some(child),
            Some(first) => {
                let mut tail = first;
                while let Some(next) = self.ops[tail.index()].sibling {
                    tail = next;
                }
                self.set_sibling(tail, child);
            }
        }
    }
}

/// A compiled path: the opcode pool plus the head of the step chain
///
/// The head is `None` for the bare root query `$`, which matches the document
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pool: Pool,
    head: Option<OpId>,
}

impl Program {
    pub(crate) fn new(pool: Pool, head: Option<OpId>) -> Self {
        Self { pool, head }
    }

    pub fn head(&self) -> Option<OpId> {
        self.head
    }

    pub fn op(&self, id: OpId) -> &Op {
        self.pool.op(id)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_links_nothing() {
        let mut pool = Pool::default();
        let id = pool.alloc(OpKind::Label, 0, Some("foo".into()));
        assert_eq!(pool.op(id).kind, OpKind::Label);
        assert_eq!(pool.op(id).text.as_deref(), Some("foo"));
        assert_eq!(pool.op(id).down, None);
        assert_eq!(pool.op(id).sibling, None);
    }

    #[test]
    fn test_push_child_builds_ordered_list() {
        let mut pool = Pool::default();
        let parent = pool.alloc(OpKind::Union, 0, None);
        let a = pool.alloc(OpKind::Number, 1, None);
        let b = pool.alloc(OpKind::Number, 2, None);
        let c = pool.alloc(OpKind::Number, 3, None);
        pool.push_child(parent, a);
        pool.push_child(parent, b);
        pool.push_child(parent, c);

        assert_eq!(pool.op(parent).down, Some(a));
        assert_eq!(pool.op(a).sibling, Some(b));
        assert_eq!(pool.op(b).sibling, Some(c));
        assert_eq!(pool.op(c).sibling, None);
    }

    #[test]
    fn test_empty_program_head() {
        let program = Program::new(Pool::default(), None);
        assert_eq!(program.head(), None);
        assert!(program.pool().is_empty());
    }
}
