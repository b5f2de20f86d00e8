//! Infrastructure for representing content descriptions as operation graphs
//!
//! A [`Graph`] is an arena of [`Op`] nodes.  Nodes refer to their children by
//! [`Node`] handle, and the arena tracks the reverse edges so that a node can
//! be replaced everywhere at once (see [`Graph::replace`]), which is the core
//! primitive used by every optimization pass.
pub(crate) mod indexed;
mod op;
mod text;

use indexed::{define_index, IndexVec};
pub use op::{
    Child, DataType, InstanceAddKind, MaskRemoval, Op, OpKind, SwitchCase,
};

use crate::data::{ParamType, ParameterDesc};
use crate::Error;

use ordered_float::OrderedFloat;
use std::collections::HashSet;
use std::fmt::Write;
use std::hash::{Hash, Hasher};

define_index!(Node, "Handle to an operation in a [`Graph`]");

#[derive(Clone, Debug)]
struct Slot {
    op: Op,
    /// One entry per edge pointing at this node, so a parent that uses the
    /// same child twice appears twice.
    parents: Vec<Node>,
}

/// A `Graph` holds a DAG of operations with parent back-references
///
/// It should be used like an arena allocator: it grows over time, then frees
/// all of its contents when dropped.  Nodes which become unreachable from the
/// roots are freed by [`collect_garbage`](Graph::collect_garbage); their
/// handles are never reused.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: IndexVec<Option<Slot>, Node>,
    roots: Vec<Node>,
}

impl Graph {
    /// Builds a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of slots ever allocated (including freed ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Returns the number of nodes that have not been freed
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|(_, s)| s.is_some()).count()
    }

    /// Checks whether the node is valid and not freed
    pub fn is_live(&self, node: Node) -> bool {
        matches!(self.nodes.get(node), Some(Some(..)))
    }

    /// Looks up an operation by handle
    pub fn get_op(&self, node: Node) -> Option<&Op> {
        self.nodes.get(node).and_then(|s| s.as_ref()).map(|s| &s.op)
    }

    /// Looks up an operation by handle
    ///
    /// # Panics
    /// If the node is invalid or was freed
    pub fn op(&self, node: Node) -> &Op {
        match self.get_op(node) {
            Some(op) => op,
            None => panic!("node {} is not live", node.get()),
        }
    }

    fn slot_mut(&mut self, node: Node) -> &mut Slot {
        match self.nodes.get_mut(node) {
            Some(Some(s)) => s,
            _ => panic!("node {} is not live", node.get()),
        }
    }

    /// Returns the data type produced by a node
    pub fn data_type(&self, node: Node) -> DataType {
        self.op(node).data_type()
    }

    /// Returns one entry per edge pointing at this node
    pub fn parents(&self, node: Node) -> &[Node] {
        match self.nodes.get(node) {
            Some(Some(s)) => &s.parents,
            _ => &[],
        }
    }

    /// Returns the number of edges pointing at this node
    pub fn parent_count(&self, node: Node) -> usize {
        self.parents(node).len()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Roots

    /// Registers a root, returning its position in [`roots`](Self::roots)
    ///
    /// Roots and their descendants survive garbage collection.  The same node
    /// may be registered more than once (e.g. by two states sharing an output).
    pub fn add_root(&mut self, node: Node) -> usize {
        assert!(self.is_live(node), "root must be live");
        self.roots.push(node);
        self.roots.len() - 1
    }

    /// Returns the current roots
    ///
    /// Roots are rewritten by [`replace`](Self::replace), so callers should
    /// look them up again after optimization.
    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Checks whether the given node is a root
    pub fn is_root(&self, node: Node) -> bool {
        self.roots.contains(&node)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Construction

    /// Checks that every child of `op` is live and produces the right type
    pub fn check_op(&self, op: &Op) -> Result<(), Error> {
        let mut out = Ok(());
        op.for_each_typed_child(|expected, c| {
            let Some(c) = c else { return };
            if out.is_err() {
                return;
            }
            out = match self.get_op(c) {
                None => Err(Error::BadNode),
                Some(child) if child.data_type() != expected => {
                    Err(Error::WrongType {
                        expected,
                        actual: child.data_type(),
                    })
                }
                Some(..) => Ok(()),
            };
        });
        out
    }

    /// Asserts the kind / arity / child type contract of a live node
    ///
    /// # Panics
    /// If the contract is violated; this indicates a bug in a rewrite pass
    pub fn assert_op(&self, node: Node) {
        if let Err(e) = self.check_op(self.op(node)) {
            panic!("invalid node {}: {e}", node.get());
        }
    }

    /// Inserts a new operation, checking its children
    pub fn try_insert(&mut self, op: Op) -> Result<Node, Error> {
        self.check_op(&op)?;
        let children = op.children();
        let node = self.nodes.push(Some(Slot {
            op,
            parents: vec![],
        }));
        for c in children {
            self.slot_mut(c).parents.push(node);
        }
        Ok(node)
    }

    /// Inserts a new operation
    ///
    /// Nodes are not deduplicated on insertion; that's the job of
    /// [`optimize::cse`](crate::optimize::cse).
    ///
    /// # Panics
    /// If a child is invalid or has the wrong type
    pub fn insert(&mut self, op: Op) -> Node {
        match self.try_insert(op) {
            Ok(n) => n,
            Err(e) => panic!("invalid op: {e}"),
        }
    }

    /// Rewires every edge pointing at `old` (and every root reference) to
    /// point at `new` instead, leaving `old` unreferenced.
    ///
    /// This is O(number of parents of `old`).
    ///
    /// # Panics
    /// If the two nodes produce different data types
    pub fn replace(&mut self, old: Node, new: Node) {
        if old == new {
            return;
        }
        assert_eq!(
            self.data_type(old),
            self.data_type(new),
            "replacement must produce the same data type"
        );
        let parents = std::mem::take(&mut self.slot_mut(old).parents);
        let mut seen = HashSet::new();
        for p in parents {
            if !seen.insert(p) {
                continue;
            }
            let mut count = 0;
            self.slot_mut(p).op.for_each_child_mut(|c| {
                if *c == Some(old) {
                    *c = Some(new);
                    count += 1;
                }
            });
            let new_parents = &mut self.slot_mut(new).parents;
            new_parents.extend(std::iter::repeat(p).take(count));
        }
        self.replace_root(old, new);
    }

    /// Replaces a single child slot of `parent`, updating back-references
    ///
    /// Slots are numbered in [`Op::for_each_typed_child`] order, counting
    /// missing children.
    ///
    /// # Panics
    /// If the slot doesn't exist or `child` has the wrong type
    pub fn set_child(&mut self, parent: Node, slot: usize, child: Child) {
        let mut expected = None;
        let mut i = 0;
        self.op(parent).for_each_typed_child(|ty, c| {
            if i == slot {
                expected = Some((ty, c));
            }
            i += 1;
        });
        let Some((ty, prev)) = expected else {
            panic!("node {} has no child slot {slot}", parent.get());
        };
        if let Some(c) = child {
            assert_eq!(self.data_type(c), ty, "child has the wrong type");
            self.slot_mut(c).parents.push(parent);
        }
        if let Some(p) = prev {
            let parents = &mut self.slot_mut(p).parents;
            if let Some(j) = parents.iter().position(|n| *n == parent) {
                parents.swap_remove(j);
            }
        }
        let mut i = 0;
        self.slot_mut(parent).op.for_each_child_mut(|c| {
            if i == slot {
                *c = child;
            }
            i += 1;
        });
    }

    /// Replaces a root without touching any parent edges
    pub fn replace_root(&mut self, old: Node, new: Node) {
        for r in self.roots.iter_mut() {
            if *r == old {
                *r = new;
            }
        }
    }

    /// Frees a single unreferenced node, detaching it from its children
    ///
    /// # Panics
    /// If the node still has parents or is a root
    pub fn remove(&mut self, node: Node) {
        assert_eq!(self.parent_count(node), 0, "node is still referenced");
        assert!(!self.is_root(node), "cannot remove a root");
        self.detach(node);
        self.nodes[node] = None;
    }

    /// Frees every node that is not reachable from a root, returning the
    /// number of freed nodes
    ///
    /// Children are detached from each dead node before it is freed, and the
    /// whole process is iterative, so arbitrarily deep graphs are safe.
    pub fn collect_garbage(&mut self) -> usize {
        let reachable = self.reachable(&self.roots.clone());
        let dead = self
            .nodes
            .iter()
            .filter(|(n, s)| s.is_some() && !reachable.contains(n))
            .map(|(n, _)| n)
            .collect::<Vec<_>>();
        for &node in &dead {
            self.detach(node);
        }
        for &node in &dead {
            self.nodes[node] = None;
        }
        dead.len()
    }

    /// Removes `node`'s back-references from its children
    fn detach(&mut self, node: Node) {
        let children = self.op(node).children();
        for c in children {
            if let Some(Some(slot)) = self.nodes.get_mut(c) {
                if let Some(i) = slot.parents.iter().position(|p| *p == node) {
                    slot.parents.swap_remove(i);
                }
            }
        }
    }

    /// Returns the set of nodes reachable from the given nodes
    pub fn reachable(&self, from: &[Node]) -> HashSet<Node> {
        let mut seen = HashSet::new();
        let mut todo = from.to_vec();
        while let Some(node) = todo.pop() {
            if !seen.insert(node) {
                continue;
            }
            self.op(node).for_each_child(|c| todo.push(c));
        }
        seen
    }

    /// Returns every node reachable from the roots, children before parents
    ///
    /// The order is deterministic for a given graph.
    pub fn postorder(&self) -> Vec<Node> {
        self.postorder_from(&self.roots)
    }

    /// Returns every node reachable from `from`, children before parents
    pub fn postorder_from(&self, from: &[Node]) -> Vec<Node> {
        // Depth-first recursion on the heap, to protect against stack overflows
        enum Action {
            Down,
            Up,
        }
        let mut out = vec![];
        let mut seen = HashSet::new();
        let mut todo = from
            .iter()
            .rev()
            .map(|n| (Action::Down, *n))
            .collect::<Vec<_>>();
        while let Some((action, node)) = todo.pop() {
            match action {
                Action::Down => {
                    if !seen.insert(node) {
                        continue;
                    }
                    todo.push((Action::Up, node));
                    let children = self.op(node).children();
                    todo.extend(
                        children.into_iter().rev().map(|c| (Action::Down, c)),
                    );
                }
                Action::Up => out.push(node),
            }
        }
        out
    }

    ////////////////////////////////////////////////////////////////////////////
    // Structural equality

    /// Hashes a node's own fields and the identity of its children
    ///
    /// This is cheap and not recursive; two nodes for which
    /// [`is_equal`](Self::is_equal) is true always have the same hash.
    pub fn hash_node(&self, node: Node) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.op(node).hash(&mut h);
        h.finish()
    }

    /// Compares kind, own fields, then child identity
    ///
    /// This is deliberately shallow: children are compared by handle, so it is
    /// only a full structural comparison once children have been deduplicated.
    pub fn is_equal(&self, a: Node, b: Node) -> bool {
        a == b || self.op(a) == self.op(b)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Builders

    /// Builds a boolean constant
    pub fn bool_constant(&mut self, v: bool) -> Node {
        self.insert(Op::BoolConstant(v))
    }

    /// Builds an integer constant
    pub fn int_constant(&mut self, v: i32) -> Node {
        self.insert(Op::IntConstant(v))
    }

    /// Builds a scalar constant
    pub fn scalar_constant(&mut self, v: f32) -> Node {
        self.insert(Op::ScalarConstant(OrderedFloat(v)))
    }

    /// Builds a color constant
    pub fn color_constant(&mut self, v: [f32; 4]) -> Node {
        self.insert(Op::ColorConstant(v.map(OrderedFloat)))
    }

    /// Builds a string constant
    pub fn string_constant(&mut self, v: &str) -> Node {
        self.insert(Op::StringConstant(v.to_owned()))
    }

    /// Builds a parameter node, deriving the data type from the description
    pub fn parameter(&mut self, desc: ParameterDesc) -> Node {
        let ty = match desc.ty {
            ParamType::Bool => DataType::Bool,
            ParamType::Int => DataType::Int,
            ParamType::Float => DataType::Scalar,
            ParamType::Color => DataType::Color,
            ParamType::Projector => DataType::Projector,
            ParamType::Image => DataType::Image,
            ParamType::Mesh => DataType::Mesh,
            ParamType::String => DataType::String,
            ParamType::Matrix => DataType::Matrix,
        };
        self.insert(Op::Parameter { ty, desc })
    }

    /// Builds a boolean AND
    pub fn and(&mut self, a: Node, b: Node) -> Result<Node, Error> {
        self.try_insert(Op::BoolAnd {
            a: Some(a),
            b: Some(b),
        })
    }

    /// Builds a boolean OR
    pub fn or(&mut self, a: Node, b: Node) -> Result<Node, Error> {
        self.try_insert(Op::BoolOr {
            a: Some(a),
            b: Some(b),
        })
    }

    /// Builds a boolean NOT
    pub fn not(&mut self, a: Node) -> Result<Node, Error> {
        self.try_insert(Op::BoolNot { a: Some(a) })
    }

    /// Builds an `value == constant` comparison
    pub fn equal_int(&mut self, value: Node, constant: i32) -> Result<Node, Error> {
        self.try_insert(Op::IntEqualConst {
            value: Some(value),
            constant,
        })
    }

    /// Builds a conditional, taking its type from the branches
    ///
    /// At least one branch must be present.
    pub fn conditional(
        &mut self,
        condition: Node,
        yes: Option<Node>,
        no: Option<Node>,
    ) -> Result<Node, Error> {
        let ty = yes
            .or(no)
            .map(|n| self.get_op(n).map(Op::data_type).ok_or(Error::BadNode))
            .transpose()?
            .ok_or(Error::BadNode)?;
        self.try_insert(Op::Conditional {
            ty,
            condition: Some(condition),
            yes,
            no,
        })
    }

    /// Builds a switch over an integer variable, taking its type from the
    /// branches
    ///
    /// At least one branch (case or default) must be present.
    pub fn switch(
        &mut self,
        variable: Node,
        cases: &[(i32, Node)],
        default: Option<Node>,
    ) -> Result<Node, Error> {
        let ty = cases
            .first()
            .map(|c| c.1)
            .or(default)
            .map(|n| self.get_op(n).map(Op::data_type).ok_or(Error::BadNode))
            .transpose()?
            .ok_or(Error::BadNode)?;
        self.try_insert(Op::Switch {
            ty,
            variable: Some(variable),
            default,
            cases: cases
                .iter()
                .map(|&(condition, b)| SwitchCase {
                    condition,
                    branch: Some(b),
                })
                .collect(),
        })
    }

    ////////////////////////////////////////////////////////////////////////////

    /// Converts every live node into a GraphViz drawing
    pub fn dot(&self) -> String {
        let mut out = "digraph mygraph{\n".to_owned();
        for (node, slot) in self.nodes.iter() {
            let Some(slot) = slot else { continue };
            out += &self.dot_node(node);
            out += &slot.op.dot_edges(node);
        }
        out += "}\n";
        out
    }

    /// Converts the given node into a GraphViz node
    pub fn dot_node(&self, i: Node) -> String {
        let mut out = format!(r#"n{} [label = ""#, i.get());
        let op = self.op(i);
        let kind: &'static str = op.kind().into();
        match op {
            Op::BoolConstant(v) => write!(out, "{v}"),
            Op::IntConstant(v) => write!(out, "{v}"),
            Op::ScalarConstant(v) => write!(out, "{v}"),
            Op::StringConstant(v) => write!(out, "'{v}'"),
            Op::Parameter { desc, .. } => write!(out, "{}", desc.name),
            Op::IntEqualConst { constant, .. } => write!(out, "== {constant}"),
            _ => write!(out, "{kind}"),
        }
        .unwrap();
        write!(
            out,
            r#"" color="{0}1" shape="{1}" fontcolor="{0}4"]"#,
            op.dot_node_color(),
            op.dot_node_shape()
        )
        .unwrap();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insert_checks_types() {
        let mut g = Graph::new();
        let i = g.int_constant(3);
        let b = g.bool_constant(true);
        assert!(g.and(b, b).is_ok());
        assert!(matches!(
            g.and(b, i),
            Err(Error::WrongType {
                expected: DataType::Bool,
                actual: DataType::Int
            })
        ));
    }

    #[test]
    fn test_parents() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let b = g.bool_constant(false);
        let and = g.and(a, a).unwrap();
        let or = g.or(a, b).unwrap();
        assert_eq!(g.parent_count(a), 3);
        assert_eq!(g.parents(b), &[or]);
        assert_eq!(g.parent_count(and), 0);
    }

    #[test]
    fn test_replace() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let b = g.bool_constant(false);
        let not = g.not(a).unwrap();
        let and = g.and(not, a).unwrap();
        g.add_root(and);

        g.replace(a, b);
        assert_eq!(g.parent_count(a), 0);
        assert_eq!(g.parent_count(b), 2);
        assert_eq!(g.op(not), &Op::BoolNot { a: Some(b) });
        assert_eq!(
            g.op(and),
            &Op::BoolAnd {
                a: Some(not),
                b: Some(b)
            }
        );

        g.replace(and, b);
        assert_eq!(g.roots(), &[b]);
    }

    #[test]
    fn test_set_child() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let b = g.bool_constant(false);
        let and = g.and(a, a).unwrap();
        g.set_child(and, 1, Some(b));
        assert_eq!(g.parent_count(a), 1);
        assert_eq!(g.parents(b), &[and]);
        assert_eq!(
            g.op(and),
            &Op::BoolAnd {
                a: Some(a),
                b: Some(b)
            }
        );
        g.set_child(and, 0, None);
        assert_eq!(g.parent_count(a), 0);
    }

    #[test]
    fn test_remove() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let n = g.not(a).unwrap();
        g.remove(n);
        assert!(!g.is_live(n));
        assert_eq!(g.parent_count(a), 0);
    }

    #[test]
    fn test_collect_garbage() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let b = g.bool_constant(false);
        let not = g.not(a).unwrap();
        let and = g.and(not, b).unwrap();
        g.add_root(and);
        assert_eq!(g.collect_garbage(), 0);

        g.replace(and, b);
        assert_eq!(g.collect_garbage(), 3);
        assert!(g.is_live(b));
        assert!(!g.is_live(a));
        assert!(!g.is_live(not));
        assert_eq!(g.parent_count(b), 0);
        assert_eq!(g.live_count(), 1);
    }

    #[test]
    fn test_deep_chain_is_iterative() {
        let mut g = Graph::new();
        let mut n = g.bool_constant(true);
        for _ in 0..100_000 {
            n = g.not(n).unwrap();
        }
        g.add_root(n);
        assert_eq!(g.postorder().len(), 100_001);
        let b = g.bool_constant(false);
        g.replace(n, b);
        assert_eq!(g.collect_garbage(), 100_001);
    }

    #[test]
    fn test_hash_eq_contract() {
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_bool("p", false));
        let a = g.not(p).unwrap();
        let b = g.not(p).unwrap();
        let c = g.bool_constant(true);
        assert!(g.is_equal(a, b));
        assert_eq!(g.hash_node(a), g.hash_node(b));
        assert!(!g.is_equal(a, c));

        // Equality is shallow: same structure with distinct children differs
        let q = g.parameter(ParameterDesc::new_bool("p", false));
        let d = g.not(q).unwrap();
        assert!(!g.is_equal(a, d));
    }

    #[test]
    fn test_postorder() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let b = g.bool_constant(false);
        let and = g.and(a, b).unwrap();
        let not = g.not(and).unwrap();
        g.add_root(not);
        assert_eq!(g.postorder(), vec![a, b, and, not]);
    }

    #[test]
    fn test_dot() {
        let mut g = Graph::new();
        let a = g.bool_constant(true);
        let n = g.not(a).unwrap();
        g.add_root(n);
        let s = g.dot();
        assert!(s.starts_with("digraph"));
        assert!(s.contains("n1 -> n0"));
    }
}
