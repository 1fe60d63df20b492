//! Owned constituent trees.
//!
//! The engine hands out a first-child/next-sibling structure of raw `CNode`
//! pointers. [`decode`] copies it into [`ConstituentNode`]s with an explicit
//! stack, so neither decoding nor dropping a tree recurses along sibling
//! chains, however wide the sentence. Formatting is iterative too; only
//! serialization follows the nesting, which [`MAX_CONSTITUENT_DEPTH`] bounds.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ffi::CNode;
use crate::handle::{ConstituentTree, copy_c_str};
use serde::ser::{Error as _, Serialize, SerializeStruct, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Upper bound on nodes decoded from one linkage.
pub const MAX_CONSTITUENT_NODES: usize = 1 << 16;

/// Upper bound on nesting, root counted as level 1. Decoding rejects deeper
/// trees and serialization refuses them.
pub const MAX_CONSTITUENT_DEPTH: usize = 512;

/// A phrase-structure node.
///
/// `child` is the first child; the remaining children hang off its `next`
/// chain. Leaves carry the word as their label. `start` and `end` are the
/// word-index span the engine reports for the node.
pub struct ConstituentNode {
    pub label: String,
    pub start: i32,
    pub end: i32,
    pub child: Option<Box<ConstituentNode>>,
    pub next: Option<Box<ConstituentNode>>,
}

impl ConstituentNode {
    pub fn new(label: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            child: None,
            next: None,
        }
    }

    /// Build an interior node from its children, linking them as siblings.
    pub fn with_children(
        label: impl Into<String>,
        start: i32,
        end: i32,
        children: Vec<ConstituentNode>,
    ) -> Self {
        let mut node = Self::new(label, start, end);
        let mut chain: Option<Box<ConstituentNode>> = None;
        for mut child in children.into_iter().rev() {
            child.next = chain.take();
            chain = Some(Box::new(child));
        }
        node.child = chain;
        node
    }

    pub fn is_leaf(&self) -> bool {
        self.child.is_none()
    }

    /// Direct children, in order.
    pub fn children(&self) -> Children<'_> {
        Children {
            next: self.child.as_deref(),
        }
    }

    /// This node and all descendants in pre-order. Siblings of `self` are
    /// not visited.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            root: Some(self),
            stack: Vec::new(),
        }
    }

    /// Labels in pre-order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.walk().map(|n| n.label.as_str())
    }

    /// Number of nodes in the subtree rooted here.
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    /// Words at the leaves, left to right.
    pub fn leaves(&self) -> impl Iterator<Item = &str> {
        self.walk().filter(|n| n.is_leaf()).map(|n| n.label.as_str())
    }

    /// Levels in the subtree rooted here; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// Iterator over a node's direct children.
pub struct Children<'a> {
    next: Option<&'a ConstituentNode>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a ConstituentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.as_deref();
        Some(node)
    }
}

/// Pre-order traversal of a subtree.
pub struct Walk<'a> {
    root: Option<&'a ConstituentNode>,
    stack: Vec<&'a ConstituentNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a ConstituentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = match self.root.take() {
            Some(root) => root,
            None => {
                let node = self.stack.pop()?;
                if let Some(next) = node.next.as_deref() {
                    self.stack.push(next);
                }
                node
            }
        };
        if let Some(child) = node.child.as_deref() {
            self.stack.push(child);
        }
        Some(node)
    }
}

impl Drop for ConstituentNode {
    fn drop(&mut self) {
        let mut stack: Vec<Box<ConstituentNode>> = Vec::new();
        stack.extend(self.child.take());
        stack.extend(self.next.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.child.take());
            stack.extend(node.next.take());
        }
    }
}

impl PartialEq for ConstituentNode {
    /// Same labels, spans and shape, compared node by node.
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.label != b.label || a.start != b.start || a.end != b.end {
                return false;
            }
            match (a.child.as_deref(), b.child.as_deref()) {
                (Some(x), Some(y)) => stack.push((x, y)),
                (None, None) => {}
                _ => return false,
            }
            match (a.next.as_deref(), b.next.as_deref()) {
                (Some(x), Some(y)) => stack.push((x, y)),
                (None, None) => {}
                _ => return false,
            }
        }
        true
    }
}

impl Eq for ConstituentNode {}

enum Token<'a> {
    Node(&'a ConstituentNode),
    Text(&'static str),
}

/// Write the subtree at `root` in bracketed form, `head` rendering each
/// node's own part. Leaves print just their head.
fn write_bracketed(
    f: &mut fmt::Formatter<'_>,
    root: &ConstituentNode,
    head: fn(&mut fmt::Formatter<'_>, &ConstituentNode) -> fmt::Result,
) -> fmt::Result {
    let mut stack = vec![Token::Node(root)];
    while let Some(token) = stack.pop() {
        let node = match token {
            Token::Text(text) => {
                f.write_str(text)?;
                continue;
            }
            Token::Node(node) => node,
        };
        if node.is_leaf() {
            head(f, node)?;
            continue;
        }
        f.write_str("(")?;
        head(f, node)?;
        stack.push(Token::Text(")"));
        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(Token::Node(child));
            stack.push(Token::Text(" "));
        }
    }
    Ok(())
}

/// Bracketed with quoted labels and spans: `("S"@0..3 "John"@0..0)`.
impl fmt::Debug for ConstituentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bracketed(f, self, |f, node| {
            write!(f, "{:?}@{}..{}", node.label, node.start, node.end)
        })
    }
}

/// Bracketed form: `(S (NP John) (VP ran))`. Leaves print bare.
impl fmt::Display for ConstituentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bracketed(f, self, |f, node| f.write_str(&node.label))
    }
}

/// Serializes a subtree whose depth has already been checked.
struct Checked<'a>(&'a ConstituentNode);

struct CheckedChildren<'a>(&'a ConstituentNode);

impl Serialize for Checked<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let mut s = serializer.serialize_struct("ConstituentNode", 4)?;
        s.serialize_field("label", &node.label)?;
        s.serialize_field("start", &node.start)?;
        s.serialize_field("end", &node.end)?;
        s.serialize_field("children", &CheckedChildren(node))?;
        s.end()
    }
}

impl Serialize for CheckedChildren<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.children().map(Checked))
    }
}

/// Serialized as nested `{label, start, end, children}` objects. Fails for
/// trees deeper than [`MAX_CONSTITUENT_DEPTH`].
impl Serialize for ConstituentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let depth = self.depth();
        if depth > MAX_CONSTITUENT_DEPTH {
            return Err(S::Error::custom(format!(
                "constituent tree is {depth} levels deep, limit is {MAX_CONSTITUENT_DEPTH}"
            )));
        }
        Checked(self).serialize(serializer)
    }
}

/// Copy an engine tree into owned nodes.
pub(crate) fn decode<E: Engine>(tree: &ConstituentTree<'_, E>) -> Result<ConstituentNode> {
    // SAFETY: the guard keeps the tree (and its linkage) alive for this call.
    unsafe { decode_raw(tree.root(), MAX_CONSTITUENT_NODES, MAX_CONSTITUENT_DEPTH) }
}

/// Where a decoded node attaches to its parent slot.
#[derive(Clone, Copy)]
enum Edge {
    Root,
    Child(usize),
    Next(usize),
}

struct Slot {
    label: String,
    start: i32,
    end: i32,
    child: Option<usize>,
    next: Option<usize>,
}

/// Decode the structure reachable from `root`.
///
/// Nodes are copied in pre-order into a flat list, so every child and
/// sibling lands at a higher index than the node pointing to it; the owned
/// tree is then assembled from the back.
///
/// # Safety
///
/// Every non-null pointer reachable from `root` must point to a readable
/// `CNode` with a NUL-terminated label, for the duration of the call.
pub(crate) unsafe fn decode_raw(
    root: *const CNode,
    max_nodes: usize,
    max_depth: usize,
) -> Result<ConstituentNode> {
    if root.is_null() {
        return Err(Error::contract("constituent tree root is null"));
    }

    let mut slots: Vec<Slot> = Vec::new();
    let mut seen: HashSet<*const CNode> = HashSet::new();
    let mut stack: Vec<(*const CNode, Edge, usize)> = vec![(root, Edge::Root, 1)];

    while let Some((ptr, edge, depth)) = stack.pop() {
        if !seen.insert(ptr) {
            return Err(Error::contract("constituent tree revisits a node"));
        }
        if slots.len() >= max_nodes {
            return Err(Error::contract(format!(
                "constituent tree exceeds {max_nodes} nodes"
            )));
        }
        if depth > max_depth {
            return Err(Error::contract(format!(
                "constituent tree exceeds {max_depth} levels"
            )));
        }
        // SAFETY: non-null (checked at push) and valid per the caller.
        let node = unsafe { &*ptr };
        let label = copy_c_str(node.label, "constituent node label")?;

        let index = slots.len();
        slots.push(Slot {
            label,
            start: node.start,
            end: node.end,
            child: None,
            next: None,
        });
        match edge {
            Edge::Root => {}
            Edge::Child(parent) => slots[parent].child = Some(index),
            Edge::Next(prev) => slots[prev].next = Some(index),
        }

        // Child is pushed last so it is decoded first.
        if !node.next.is_null() {
            stack.push((node.next, Edge::Next(index), depth));
        }
        if !node.child.is_null() {
            stack.push((node.child, Edge::Child(index), depth + 1));
        }
    }

    let mut built: Vec<Option<ConstituentNode>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);
    while let Some(slot) = slots.pop() {
        let index = slots.len();
        let mut node = ConstituentNode::new(slot.label, slot.start, slot.end);
        node.child = slot.child.and_then(|i| built[i].take()).map(Box::new);
        node.next = slot.next.and_then(|i| built[i].take()).map(Box::new);
        built[index] = Some(node);
    }

    built
        .first_mut()
        .and_then(Option::take)
        .ok_or_else(|| Error::contract("constituent tree is empty"))
}
