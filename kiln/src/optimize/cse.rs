//! Common subexpression elimination
use crate::graph::{Graph, Node, Op};
use std::collections::HashMap;

/// Merges structurally identical nodes reachable from the graph's roots
///
/// Nodes are visited children-first, so by the time a node is hashed its
/// children have already been canonicalized and shallow equality (own fields
/// plus child identity) is sufficient.  Returns the number of merged nodes;
/// merged nodes are left unreferenced for garbage collection.
pub fn dedup(graph: &mut Graph) -> usize {
    let mut seen: HashMap<Op, Node> = HashMap::new();
    let mut count = 0;
    for node in graph.postorder() {
        // The op may have been rewritten by an earlier merge of its children
        let op = graph.op(node).clone();
        match seen.get(&op) {
            Some(&prev) if prev != node => {
                graph.replace(node, prev);
                count += 1;
            }
            Some(..) => (),
            None => {
                seen.insert(op, node);
            }
        }
    }
    if count > 0 {
        log::debug!("cse merged {count} nodes");
    }
    count
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::ParameterDesc;

    #[test]
    fn test_dedup_bottom_up() {
        let mut g = Graph::new();
        let p1 = g.parameter(ParameterDesc::new_bool("p", false));
        let p2 = g.parameter(ParameterDesc::new_bool("p", false));
        let n1 = g.not(p1).unwrap();
        let n2 = g.not(p2).unwrap();
        let and = g.and(n1, n2).unwrap();
        g.add_root(and);

        // `n1` and `n2` only become equal once `p2` has been merged into `p1`
        assert!(!g.is_equal(n1, n2));
        assert_eq!(dedup(&mut g), 2);
        assert_eq!(
            g.op(and),
            &Op::BoolAnd {
                a: Some(n1),
                b: Some(n1)
            }
        );
        assert_eq!(g.collect_garbage(), 2);
        assert_eq!(dedup(&mut g), 0);
    }

    #[test]
    fn test_distinct_constants_survive() {
        let mut g = Graph::new();
        let a = g.int_constant(1);
        let b = g.int_constant(2);
        let c = g.int_constant(1);
        let d = g.scalar_constant(1.0);
        let s = g.switch(a, &[(0, b), (1, c)], None).unwrap();
        g.add_root(s);
        g.add_root(d);
        assert_eq!(dedup(&mut g), 1);
        assert_eq!(g.parent_count(c), 0);
        assert_eq!(g.parent_count(a), 2);
    }
}
