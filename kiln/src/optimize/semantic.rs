//! Local semantic simplification rules
//!
//! Each rule looks at a single node (and its immediate children) and either
//! leaves it alone or returns a replacement: an existing descendant, or a new,
//! strictly simpler node.  Rules never modify an existing node in place.
use super::evaluate::{evaluate_bool, BoolValue};
use super::PassContext;
use crate::data::ArithmeticOp;
use crate::graph::{Child, DataType, Graph, Node, Op, SwitchCase};

use std::collections::HashSet;

/// Applies [`simplify_node`] to every node reachable from the roots
///
/// Returns the number of replaced nodes.
pub fn simplify(graph: &mut Graph, ctx: &PassContext) -> usize {
    let mut count = 0;
    for node in graph.postorder() {
        // Skip nodes orphaned by an earlier replacement in this pass
        if graph.parent_count(node) == 0 && !graph.is_root(node) {
            continue;
        }
        if let Some(new) = simplify_node(graph, node, ctx) {
            if new != node {
                log::trace!(
                    "semantic: {:?} -> {:?}",
                    graph.op(node).kind(),
                    graph.op(new).kind()
                );
                graph.replace(node, new);
                count += 1;
            }
        }
    }
    if count > 0 {
        log::debug!("semantic pass {} replaced {count} nodes", ctx.pass);
    }
    count
}

fn bool_const(graph: &Graph, c: Child) -> Option<bool> {
    match graph.op(c?) {
        Op::BoolConstant(b) => Some(*b),
        _ => None,
    }
}

fn int_const(graph: &Graph, c: Child) -> Option<i32> {
    match graph.op(c?) {
        Op::IntConstant(i) => Some(*i),
        _ => None,
    }
}

fn scalar_const(graph: &Graph, c: Child) -> Option<f32> {
    match graph.op(c?) {
        Op::ScalarConstant(f) => Some(f.0),
        _ => None,
    }
}

/// Returns a replacement for the given node, or `None` if no rule applies
pub fn simplify_node(
    graph: &mut Graph,
    node: Node,
    ctx: &PassContext,
) -> Option<Node> {
    match graph.op(node).clone() {
        Op::BoolAnd { a, b } => simplify_logic(graph, a, b, true),
        Op::BoolOr { a, b } => simplify_logic(graph, a, b, false),
        Op::BoolNot { a } => {
            let a = a?;
            match graph.op(a) {
                Op::BoolConstant(v) => {
                    let v = !*v;
                    Some(graph.bool_constant(v))
                }
                Op::BoolNot { a: Some(inner) } => Some(*inner),
                _ => None,
            }
        }
        Op::IntEqualConst { value, constant } => {
            let v = int_const(graph, value)?;
            Some(graph.bool_constant(v == constant))
        }
        Op::Arithmetic { ty, op, a, b } => {
            simplify_arithmetic(graph, ty, op, a, b)
        }
        Op::Conditional {
            ty,
            condition,
            yes,
            no,
        } => simplify_conditional(graph, ty, condition, yes, no),
        Op::Switch {
            ty,
            variable,
            default,
            cases,
        } => simplify_switch(graph, node, ty, variable, default, &cases, ctx),

        Op::ImagePixelFormat { source, format } => match graph.op(source?) {
            Op::ImagePixelFormat { source: inner, .. } => {
                let inner = *inner;
                Some(graph.insert(Op::ImagePixelFormat {
                    source: inner,
                    format,
                }))
            }
            Op::ImageConstant(img) if img.format() == format => source,
            _ => None,
        },
        Op::ImageResize { source, size } => match graph.op(source?) {
            Op::ImageResize { source: inner, .. } => {
                let inner = *inner;
                Some(graph.insert(Op::ImageResize {
                    source: inner,
                    size,
                }))
            }
            Op::ImageConstant(img) if img.size() == size => source,
            _ => None,
        },
        Op::MeshMerge { base, added, .. } => match (base, added) {
            (Some(..), None) => base,
            (None, Some(..)) => added,
            _ => None,
        },
        Op::LayoutMerge { base, added } => match (base, added) {
            (Some(..), None) => base,
            (None, Some(..)) => added,
            _ => None,
        },
        Op::MeshAddTags { source, tags } if tags.is_empty() => source,
        _ => None,
    }
}

/// Simplifies `AND` (if `is_and`) or `OR`
fn simplify_logic(
    graph: &mut Graph,
    a: Child,
    b: Child,
    is_and: bool,
) -> Option<Node> {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        (Some(x), None) | (None, Some(x)) => return Some(x),
        (None, None) => return None,
    };
    // The neutral element for AND is `true`; the absorbing element is `false`
    let neutral = is_and;
    for (x, y) in [(a, b), (b, a)] {
        if let Some(v) = bool_const(graph, Some(x)) {
            return Some(if v == neutral { y } else { x });
        }
    }
    if a == b {
        return Some(a);
    }
    for (x, y) in [(a, b), (b, a)] {
        let nested = match graph.op(y) {
            Op::BoolAnd { a: Some(p), b: Some(q) } if is_and => Some((*p, *q)),
            Op::BoolOr { a: Some(p), b: Some(q) } if !is_and => Some((*p, *q)),
            _ => None,
        };
        if let Some((p, q)) = nested {
            if p == x || q == x {
                return Some(y);
            }
        }
        // x AND NOT(x) is false; x OR NOT(x) is true
        if matches!(graph.op(y), Op::BoolNot { a: Some(n) } if *n == x) {
            return Some(graph.bool_constant(!is_and));
        }
    }
    None
}

fn simplify_arithmetic(
    graph: &mut Graph,
    ty: DataType,
    op: ArithmeticOp,
    a: Child,
    b: Child,
) -> Option<Node> {
    match ty {
        DataType::Int => {
            let (ca, cb) = (int_const(graph, a), int_const(graph, b));
            if let (Some(x), Some(y)) = (ca, cb) {
                return op.apply_int(x, y).map(|v| graph.int_constant(v));
            }
            match (op, ca, cb) {
                (ArithmeticOp::Add, Some(0), _)
                | (ArithmeticOp::Mul, Some(1), _) => b,
                (ArithmeticOp::Add | ArithmeticOp::Sub, _, Some(0))
                | (ArithmeticOp::Mul | ArithmeticOp::Div, _, Some(1)) => a,
                _ => None,
            }
        }
        DataType::Scalar => {
            let (ca, cb) = (scalar_const(graph, a), scalar_const(graph, b));
            if let (Some(x), Some(y)) = (ca, cb) {
                let v = op.apply(x, y);
                return v.is_finite().then(|| graph.scalar_constant(v));
            }
            match (op, ca, cb) {
                (ArithmeticOp::Add, Some(x), _) if x == 0.0 => b,
                (ArithmeticOp::Mul, Some(x), _) if x == 1.0 => b,
                (ArithmeticOp::Add | ArithmeticOp::Sub, _, Some(y))
                    if y == 0.0 =>
                {
                    a
                }
                (ArithmeticOp::Mul | ArithmeticOp::Div, _, Some(y))
                    if y == 1.0 =>
                {
                    a
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn simplify_conditional(
    graph: &mut Graph,
    ty: DataType,
    condition: Child,
    yes: Child,
    no: Child,
) -> Option<Node> {
    let Some(condition) = condition else {
        return no;
    };
    if let Some(v) = bool_const(graph, Some(condition)) {
        return if v { yes } else { no };
    }
    if yes.is_some() && yes == no {
        return yes;
    }

    // Shortcut nested conditionals whose condition is decided by ours
    let mut changed = false;
    let mut branches = [yes, no];
    for (branch, fact) in branches.iter_mut().zip([true, false]) {
        let Some(b) = *branch else { continue };
        let Op::Conditional {
            condition: Some(inner),
            yes: inner_yes,
            no: inner_no,
            ..
        } = graph.op(b)
        else {
            continue;
        };
        let (inner, inner_yes, inner_no) = (*inner, *inner_yes, *inner_no);
        let taken = match evaluate_bool(graph, inner, &[(condition, fact)]) {
            BoolValue::True => inner_yes,
            BoolValue::False => inner_no,
            BoolValue::Unknown => continue,
        };
        if taken.is_some() {
            *branch = taken;
            changed = true;
        }
    }
    changed.then(|| {
        graph.insert(Op::Conditional {
            ty,
            condition: Some(condition),
            yes: branches[0],
            no: branches[1],
        })
    })
}

/// Returns the branch taken by a switch for the given value
fn switch_branch(cases: &[SwitchCase], default: Child, value: i32) -> Child {
    cases
        .iter()
        .find(|c| c.condition == value)
        .map(|c| c.branch)
        .unwrap_or(default)
}

fn simplify_switch(
    graph: &mut Graph,
    node: Node,
    ty: DataType,
    variable: Child,
    default: Child,
    cases: &[SwitchCase],
    ctx: &PassContext,
) -> Option<Node> {
    let Some(variable) = variable else {
        return default;
    };
    if let Some(v) = int_const(graph, Some(variable)) {
        return switch_branch(cases, default, v);
    }
    if cases.is_empty() {
        return default;
    }
    if default.is_some() && cases.iter().all(|c| c.branch == default) {
        return default;
    }

    // Enumerable domain: every possible value routes to the same branch
    if let Op::Parameter { desc, .. } = graph.op(variable) {
        let mut values = desc.possible_values.iter().map(|v| v.value);
        if let Some(first) = values.next() {
            let target = switch_branch(cases, default, first);
            if target.is_some()
                && values.all(|v| switch_branch(cases, default, v) == target)
            {
                return target;
            }
        }
    }

    // Rebuild without duplicate case values (first wins) and without cases
    // that route to the default anyway
    let mut seen = HashSet::new();
    let trimmed = cases
        .iter()
        .filter(|c| seen.insert(c.condition))
        .filter(|c| c.branch != default)
        .copied()
        .collect::<Vec<_>>();
    if trimmed.len() != cases.len() {
        return Some(graph.insert(Op::Switch {
            ty,
            variable: Some(variable),
            default,
            cases: trimmed,
        }));
    }

    // The variable is shared after the first round of deduplication, so the
    // upward walk can rely on handle identity
    if ctx.pass > 0 {
        let forced = forced_switch_value(graph, node, variable)?;
        return switch_branch(cases, default, forced);
    }
    None
}

/// Walks upwards from `node`, checking whether every path from a root passes
/// through a case branch of a switch on `variable` forcing the same value
///
/// Returns that value, or `None` if any path is unforced (reaches a root, or
/// enters through a default branch or a non-switch slot) or if two paths force
/// different values.
pub fn forced_switch_value(
    graph: &Graph,
    node: Node,
    variable: Node,
) -> Option<i32> {
    let mut forced = None;
    let mut seen = HashSet::new();
    let mut todo = vec![node];
    while let Some(n) = todo.pop() {
        if !seen.insert(n) {
            continue;
        }
        if graph.is_root(n) || graph.parent_count(n) == 0 {
            return None;
        }
        let mut parents = graph.parents(n).to_vec();
        parents.sort();
        parents.dedup();
        for p in parents {
            let Op::Switch {
                variable: Some(v),
                default,
                cases,
                ..
            } = graph.op(p)
            else {
                todo.push(p);
                continue;
            };
            if *v != variable {
                todo.push(p);
                continue;
            }
            if *default == Some(n) || *v == n {
                return None;
            }
            let mut values = cases
                .iter()
                .filter(|c| c.branch == Some(n))
                .map(|c| c.condition);
            let value = values.next()?;
            if values.any(|v| v != value) {
                return None;
            }
            match forced {
                None => forced = Some(value),
                Some(f) if f != value => return None,
                Some(..) => (),
            }
        }
    }
    forced
}
