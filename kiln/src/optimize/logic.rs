//! Conversion of conditional chains into switches
use crate::graph::{Child, Graph, Node, Op, SwitchCase};
use std::collections::HashSet;

/// Minimum number of distinct cases for a chain to become a switch
pub const MIN_SWITCH_CASES: usize = 3;

/// A chain of `if v == k { .. } else { .. }` nodes on the same variable
#[derive(Debug)]
struct Chain {
    variable: Node,
    cases: Vec<SwitchCase>,
    default: Child,
    /// Every conditional in the chain, outermost first
    links: Vec<Node>,
}

/// Collects the conditional chain starting at `node`
///
/// Cases are in chain order; if the same constant is tested twice, the first
/// test wins (the later one is unreachable).
fn collect_chain(graph: &Graph, node: Node) -> Option<Chain> {
    let mut variable = None;
    let mut cases: Vec<SwitchCase> = vec![];
    let mut links = vec![];
    let mut cur = Some(node);
    while let Some(n) = cur {
        let Op::Conditional {
            condition: Some(c),
            yes,
            no,
            ..
        } = graph.op(n)
        else {
            break;
        };
        let Op::IntEqualConst {
            value: Some(v),
            constant,
        } = graph.op(*c)
        else {
            break;
        };
        match variable {
            None => variable = Some(*v),
            Some(prev) if prev != *v => break,
            Some(..) => (),
        }
        if cases.iter().all(|c| c.condition != *constant) {
            cases.push(SwitchCase {
                condition: *constant,
                branch: *yes,
            });
        }
        links.push(n);
        cur = *no;
    }
    Some(Chain {
        variable: variable?,
        cases,
        default: cur,
        links,
    })
}

/// Rewrites chains of at least [`MIN_SWITCH_CASES`] equality conditionals into
/// switches, returning the number of rewritten chains
///
/// Nodes are visited parents-first, so the outermost conditional of a chain
/// is converted and the rest of the chain is skipped.
pub fn convert(graph: &mut Graph) -> usize {
    let mut absorbed = HashSet::new();
    let mut count = 0;
    for node in graph.postorder().into_iter().rev() {
        if absorbed.contains(&node) {
            continue;
        }
        if graph.parent_count(node) == 0 && !graph.is_root(node) {
            continue;
        }
        let Op::Conditional { ty, .. } = graph.op(node) else {
            continue;
        };
        let ty = *ty;
        let Some(chain) = collect_chain(graph, node) else {
            continue;
        };
        if chain.cases.len() < MIN_SWITCH_CASES {
            continue;
        }
        log::trace!(
            "converting chain of {} conditionals into a switch",
            chain.links.len()
        );
        absorbed.extend(chain.links.iter().copied());
        let switch = graph.insert(Op::Switch {
            ty,
            variable: Some(chain.variable),
            default: chain.default,
            cases: chain.cases,
        });
        graph.replace(node, switch);
        count += 1;
    }
    if count > 0 {
        log::debug!("converted {count} conditional chains into switches");
    }
    count
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::ParameterDesc;
    use crate::graph::DataType;

    /// Builds `if p == k0 { b0 } else if p == k1 { b1 } ... else { d }`
    fn chain(g: &mut Graph, p: Node, cases: &[(i32, Node)], d: Node) -> Node {
        let mut next = d;
        for &(k, b) in cases.iter().rev() {
            let eq = g.equal_int(p, k).unwrap();
            next = g.conditional(eq, Some(b), Some(next)).unwrap();
        }
        next
    }

    #[test]
    fn test_three_cases() {
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[]));
        let x = g.int_constant(10);
        let y = g.int_constant(20);
        let z = g.int_constant(30);
        let d = g.int_constant(0);
        let root = chain(&mut g, p, &[(1, x), (2, y), (3, z)], d);
        g.add_root(root);

        assert_eq!(convert(&mut g), 1);
        let root = g.roots()[0];
        assert_eq!(
            g.op(root),
            &Op::Switch {
                ty: DataType::Int,
                variable: Some(p),
                default: Some(d),
                cases: vec![
                    SwitchCase {
                        condition: 1,
                        branch: Some(x)
                    },
                    SwitchCase {
                        condition: 2,
                        branch: Some(y)
                    },
                    SwitchCase {
                        condition: 3,
                        branch: Some(z)
                    },
                ]
            }
        );
    }

    #[test]
    fn test_two_cases() {
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[]));
        let x = g.int_constant(10);
        let y = g.int_constant(20);
        let d = g.int_constant(0);
        let root = chain(&mut g, p, &[(1, x), (2, y)], d);
        g.add_root(root);
        assert_eq!(convert(&mut g), 0);
        assert_eq!(g.roots()[0], root);
    }

    #[test]
    fn test_repeated_constant() {
        // The second test of `p == 1` is unreachable and doesn't count
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[]));
        let x = g.int_constant(10);
        let y = g.int_constant(20);
        let z = g.int_constant(30);
        let d = g.int_constant(0);
        let root = chain(&mut g, p, &[(1, x), (2, y), (1, z)], d);
        g.add_root(root);
        assert_eq!(convert(&mut g), 0);

        let root = chain(&mut g, p, &[(1, x), (2, y), (1, z), (4, z)], d);
        g.add_root(root);
        assert_eq!(convert(&mut g), 1);
        let Op::Switch { cases, .. } = g.op(g.roots()[1]) else {
            panic!()
        };
        let values = cases.iter().map(|c| c.condition).collect::<Vec<_>>();
        assert_eq!(values, [1, 2, 4]);
        assert_eq!(cases[0].branch, Some(x));
    }

    #[test]
    fn test_mixed_variables() {
        // The chain stops at the first comparison on a different variable,
        // which becomes the default
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[]));
        let q = g.parameter(ParameterDesc::new_int("q", &[]));
        let x = g.int_constant(10);
        let d = g.int_constant(0);
        let tail = chain(&mut g, q, &[(5, x)], d);
        let root = chain(&mut g, p, &[(1, x), (2, x), (3, d)], tail);
        g.add_root(root);
        assert_eq!(convert(&mut g), 1);
        let Op::Switch {
            variable, default, ..
        } = g.op(g.roots()[0])
        else {
            panic!()
        };
        assert_eq!(*variable, Some(p));
        assert_eq!(*default, Some(tail));
    }

    #[test]
    fn test_missing_default() {
        let mut g = Graph::new();
        let p = g.parameter(ParameterDesc::new_int("p", &[]));
        let x = g.int_constant(10);
        let mut next = None;
        for k in [3, 2, 1] {
            let eq = g.equal_int(p, k).unwrap();
            next = Some(g.conditional(eq, Some(x), next).unwrap());
        }
        g.add_root(next.unwrap());
        assert_eq!(convert(&mut g), 1);
        let Op::Switch { default, cases, .. } = g.op(g.roots()[0]) else {
            panic!()
        };
        assert_eq!(*default, None);
        assert_eq!(cases.len(), 3);
    }
}
