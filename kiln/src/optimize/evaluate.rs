//! Three-valued evaluation of boolean subgraphs under assumed facts
use crate::graph::{Graph, Node, Op};
use std::collections::HashMap;

/// Result of [`evaluate_bool`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoolValue {
    /// The expression is always true under the given facts
    True,
    /// The expression is always false under the given facts
    False,
    /// The expression depends on something that isn't known
    Unknown,
}

impl From<bool> for BoolValue {
    fn from(b: bool) -> Self {
        if b {
            BoolValue::True
        } else {
            BoolValue::False
        }
    }
}

impl std::ops::Not for BoolValue {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            BoolValue::True => BoolValue::False,
            BoolValue::False => BoolValue::True,
            BoolValue::Unknown => BoolValue::Unknown,
        }
    }
}

/// Evaluates a boolean node, assuming each `(node, value)` fact holds
///
/// Facts are expanded before evaluation: `NOT(x) = v` implies `x = !v`,
/// `AND(a, b) = true` implies both operands are true, and `OR(a, b) = false`
/// implies both are false.  A fact `x == k` also decides every other
/// comparison of `x` against a constant.
///
/// `AND` and `OR` short-circuit: once the first operand decides the result,
/// the second is never visited.  Results are memoized for the duration of the
/// call, and evaluation uses an explicit stack.
pub fn evaluate_bool(
    graph: &Graph,
    node: Node,
    facts: &[(Node, bool)],
) -> BoolValue {
    let facts = expand_facts(graph, facts);

    // Integer comparisons which are known to hold, keyed by compared node
    let mut known_ints = HashMap::new();
    for (&n, &v) in &facts {
        if let (
            Op::IntEqualConst {
                value: Some(value),
                constant,
            },
            true,
        ) = (graph.op(n), v)
        {
            known_ints.insert(*value, *constant);
        }
    }

    let mut memo: HashMap<Node, BoolValue> = HashMap::new();
    let mut todo = vec![node];
    while let Some(&n) = todo.last() {
        if memo.contains_key(&n) {
            todo.pop();
            continue;
        }
        if let Some(&v) = facts.get(&n) {
            memo.insert(n, v.into());
            todo.pop();
            continue;
        }
        match step(graph, n, &memo, &known_ints) {
            Ok(v) => {
                memo.insert(n, v);
                todo.pop();
            }
            Err(child) => todo.push(child),
        }
    }
    memo[&node]
}

/// Evaluates a single node, or returns a child that must be evaluated first
fn step(
    graph: &Graph,
    n: Node,
    memo: &HashMap<Node, BoolValue>,
    known_ints: &HashMap<Node, i32>,
) -> Result<BoolValue, Node> {
    let get = |c: Option<Node>, missing: BoolValue| match c {
        None => Ok(missing),
        Some(c) => memo.get(&c).copied().ok_or(c),
    };
    let out = match graph.op(n) {
        Op::BoolConstant(b) => (*b).into(),
        Op::BoolNot { a } => !get(*a, BoolValue::Unknown)?,
        Op::BoolAnd { a, b } => match get(*a, BoolValue::True)? {
            BoolValue::False => BoolValue::False,
            va => match (va, get(*b, BoolValue::True)?) {
                (_, BoolValue::False) => BoolValue::False,
                (BoolValue::True, BoolValue::True) => BoolValue::True,
                _ => BoolValue::Unknown,
            },
        },
        Op::BoolOr { a, b } => match get(*a, BoolValue::False)? {
            BoolValue::True => BoolValue::True,
            va => match (va, get(*b, BoolValue::False)?) {
                (_, BoolValue::True) => BoolValue::True,
                (BoolValue::False, BoolValue::False) => BoolValue::False,
                _ => BoolValue::Unknown,
            },
        },
        Op::IntEqualConst {
            value: Some(value),
            constant,
        } => match graph.op(*value) {
            Op::IntConstant(i) => (i == constant).into(),
            _ => match known_ints.get(value) {
                Some(k) => (k == constant).into(),
                None => BoolValue::Unknown,
            },
        },
        _ => BoolValue::Unknown,
    };
    Ok(out)
}

fn expand_facts(graph: &Graph, facts: &[(Node, bool)]) -> HashMap<Node, bool> {
    let mut out = HashMap::new();
    let mut todo = facts.to_vec();
    while let Some((n, v)) = todo.pop() {
        if out.insert(n, v).is_some() {
            continue;
        }
        match (graph.op(n), v) {
            (Op::BoolNot { a: Some(a) }, v) => todo.push((*a, !v)),
            (Op::BoolAnd { a, b }, true) | (Op::BoolOr { a, b }, false) => {
                todo.extend(a.iter().chain(b.iter()).map(|c| (*c, v)));
            }
            _ => (),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::ParameterDesc;

    #[test]
    fn test_constants() {
        let mut g = Graph::new();
        let t = g.bool_constant(true);
        let f = g.bool_constant(false);
        let and = g.and(t, f).unwrap();
        let or = g.or(t, f).unwrap();
        let not = g.not(and).unwrap();
        assert_eq!(evaluate_bool(&g, and, &[]), BoolValue::False);
        assert_eq!(evaluate_bool(&g, or, &[]), BoolValue::True);
        assert_eq!(evaluate_bool(&g, not, &[]), BoolValue::True);
    }

    #[test]
    fn test_facts() {
        let mut g = Graph::new();
        let a = g.parameter(ParameterDesc::new_bool("a", false));
        let b = g.parameter(ParameterDesc::new_bool("b", false));
        let and = g.and(a, b).unwrap();
        let or = g.or(a, b).unwrap();
        let not_a = g.not(a).unwrap();

        assert_eq!(evaluate_bool(&g, and, &[]), BoolValue::Unknown);
        assert_eq!(evaluate_bool(&g, and, &[(a, false)]), BoolValue::False);
        assert_eq!(evaluate_bool(&g, or, &[(a, true)]), BoolValue::True);
        assert_eq!(evaluate_bool(&g, or, &[(b, false)]), BoolValue::Unknown);
        assert_eq!(evaluate_bool(&g, a, &[(not_a, true)]), BoolValue::False);
        assert_eq!(evaluate_bool(&g, b, &[(and, true)]), BoolValue::True);
    }

    #[test]
    fn test_int_facts() {
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[(0, "a"), (1, "b")]));
        let eq0 = g.equal_int(p, 0).unwrap();
        let eq1 = g.equal_int(p, 1).unwrap();
        assert_eq!(evaluate_bool(&g, eq1, &[]), BoolValue::Unknown);
        assert_eq!(evaluate_bool(&g, eq1, &[(eq0, true)]), BoolValue::False);
        assert_eq!(evaluate_bool(&g, eq0, &[(eq0, true)]), BoolValue::True);
    }

    #[test]
    fn test_short_circuit_deep() {
        // A deep right operand is never visited once the left one decides
        let mut g = Graph::new();
        let f = g.bool_constant(false);
        let mut deep = g.parameter(ParameterDesc::new_bool("x", false));
        for _ in 0..50_000 {
            deep = g.not(deep).unwrap();
        }
        let and = g.and(f, deep).unwrap();
        assert_eq!(evaluate_bool(&g, and, &[]), BoolValue::False);
        assert_eq!(evaluate_bool(&g, deep, &[]), BoolValue::Unknown);
    }
}
