//! Graph rewriting passes
//!
//! The [`Optimizer`] repeatedly applies common subexpression elimination,
//! [semantic simplification](semantic), [sinking](sink), and
//! [logic-to-switch conversion](logic) until a full iteration leaves the graph
//! untouched, then frees unreachable nodes.
//!
//! ```
//! use kiln::{graph::Graph, optimize::Optimizer};
//!
//! let txt = "
//! _0 param-bool b false
//! _1 bool true
//! _2 and _1 _0
//! ";
//! let (mut g, _root) = Graph::from_text(txt.as_bytes())?;
//! Optimizer::default().run(&mut g);
//! assert_eq!(g.live_count(), 1);
//! # Ok::<(), kiln::Error>(())
//! ```
pub mod cse;
pub mod evaluate;
pub mod logic;
pub mod semantic;
pub mod sink;

use crate::graph::Graph;

/// Options controlling the optimizer
#[derive(Copy, Clone, Debug)]
pub struct OptimizerOptions {
    /// Upper bound on the number of full iterations
    pub max_passes: usize,
    /// Run the sink pass
    pub enable_sink: bool,
    /// Run the logic-to-switch pass
    pub enable_logic: bool,
    /// Run the semantic pass
    pub enable_semantic: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            max_passes: 32,
            enable_sink: true,
            enable_logic: true,
            enable_semantic: true,
        }
    }
}

/// Per-iteration information available to individual rules
#[derive(Copy, Clone, Debug, Default)]
pub struct PassContext {
    /// Zero-based index of the current iteration
    pub pass: usize,
}

/// Summary of an optimizer run
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct OptimizerStats {
    /// Number of full iterations performed
    pub passes: usize,
    /// Total number of rewrites across all passes
    pub rewrites: usize,
    /// Number of nodes freed by garbage collection
    pub freed: usize,
    /// Whether the graph reached a fixpoint (rather than the pass limit)
    pub converged: bool,
}

/// Fixpoint driver for the rewriting passes
#[derive(Clone, Debug, Default)]
pub struct Optimizer {
    options: OptimizerOptions,
}

impl Optimizer {
    /// Builds a new optimizer with the given options
    pub fn new(options: OptimizerOptions) -> Self {
        Self { options }
    }

    /// Returns the options used by this optimizer
    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Optimizes the graph in place
    ///
    /// Only nodes reachable from [`Graph::roots`] are considered, and every
    /// other node is freed.  Roots are rewritten when the node they refer to
    /// is replaced.
    pub fn run(&self, graph: &mut Graph) -> OptimizerStats {
        let mut stats = OptimizerStats::default();
        if graph.roots().is_empty() {
            log::warn!("optimizing a graph without roots");
        }
        for pass in 0..self.options.max_passes {
            let ctx = PassContext { pass };
            let mut changes = cse::dedup(graph);
            if self.options.enable_semantic {
                changes += semantic::simplify(graph, &ctx);
            }
            if self.options.enable_sink {
                changes += sink::Sinker::new().run(graph);
            }
            if self.options.enable_logic {
                changes += logic::convert(graph);
            }
            stats.freed += graph.collect_garbage();
            stats.passes += 1;
            stats.rewrites += changes;
            if changes == 0 {
                stats.converged = true;
                break;
            }
        }
        if !stats.converged {
            log::warn!(
                "optimizer stopped after {} passes without converging",
                stats.passes
            );
        }
        log::debug!(
            "optimized graph to {} nodes in {} passes",
            graph.live_count(),
            stats.passes
        );
        stats
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ConstantResource, Image, ImageFormat, ParameterDesc};
    use crate::graph::{DataType, Node, Op, SwitchCase};
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_fixpoint() {
        let mut g = Graph::new();
        let a = g.parameter(ParameterDesc::new_bool("a", false));
        let b = g.parameter(ParameterDesc::new_bool("b", false));
        let b2 = g.parameter(ParameterDesc::new_bool("b", false));
        let t = g.bool_constant(true);
        let inner = g.and(a, b).unwrap();
        let x = g.and(t, inner).unwrap();
        let inner2 = g.and(a, b2).unwrap();
        let y = g.and(a, inner2).unwrap();
        let root = g.or(x, y).unwrap();
        g.add_root(root);

        let stats = Optimizer::default().run(&mut g);
        assert!(stats.converged);
        assert_eq!(g.live_count(), 3);
        let root = g.roots()[0];
        assert!(matches!(g.op(root), Op::BoolAnd { .. }));
    }

    #[test]
    fn test_switch_conversion_end_to_end() {
        let txt = "
            p param-int p
            x int 10
            y int 20
            z int 30
            d int 0
            e1 eq p 1
            e2 eq p 2
            e3 eq p 3
            c3 if e3 z d
            c2 if e2 y c3
            c1 if e1 x c2
        ";
        let (mut g, _) = Graph::from_text(txt.as_bytes()).unwrap();
        Optimizer::default().run(&mut g);
        let root = g.roots()[0];
        let Op::Switch {
            ty: DataType::Int,
            cases,
            default: Some(d),
            ..
        } = g.op(root)
        else {
            panic!("expected a switch, got {:?}", g.op(root));
        };
        assert_eq!(g.op(*d), &Op::IntConstant(0));
        let values = cases
            .iter()
            .map(|SwitchCase { condition, branch }| {
                (*condition, g.op(branch.unwrap()).clone())
            })
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            [
                (1, Op::IntConstant(10)),
                (2, Op::IntConstant(20)),
                (3, Op::IntConstant(30))
            ]
        );
        // Only the switch, its variable, and four constants survive
        assert_eq!(g.live_count(), 6);
    }

    #[test]
    fn test_merged_branches() {
        // Both branches are equal constants, so the conditional collapses
        // before anything is sunk through it
        let mut g = Graph::new();
        let c = g.parameter(ParameterDesc::new_bool("c", false));
        let img = Image::new(4, 4, 1, ImageFormat::Rgba8);
        let a = g.insert(Op::ImageConstant(ConstantResource::new(img.clone())));
        let b = g.insert(Op::ImageConstant(ConstantResource::new(img)));
        let cond = g.conditional(c, Some(a), Some(b)).unwrap();
        let fmt = g.insert(Op::ImagePixelFormat {
            source: Some(cond),
            format: ImageFormat::L8,
        });
        g.add_root(fmt);
        let stats = Optimizer::default().run(&mut g);
        assert!(stats.converged);
        let root = g.roots()[0];
        assert!(matches!(
            g.op(root),
            Op::ImagePixelFormat { source: Some(s), .. }
                if matches!(g.op(*s), Op::ImageConstant(..))
        ));
        assert_eq!(g.live_count(), 2);
    }

    #[test]
    fn test_terminates_on_random_graphs() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let mut g = Graph::new();
            let mut bools = vec![
                g.bool_constant(true),
                g.bool_constant(false),
                g.parameter(ParameterDesc::new_bool("a", false)),
                g.parameter(ParameterDesc::new_bool("b", true)),
            ];
            let p = g.parameter(ParameterDesc::new_int("p", &[]));
            let mut ints = vec![p, g.int_constant(1), g.int_constant(2)];
            for _ in 0..200 {
                let pick = |v: &Vec<Node>, rng: &mut rand::rngs::StdRng| {
                    v[rng.gen_range(0..v.len())]
                };
                match rng.gen_range(0..6) {
                    0 => {
                        let (a, b) = (pick(&bools, &mut rng), pick(&bools, &mut rng));
                        bools.push(g.and(a, b).unwrap());
                    }
                    1 => {
                        let (a, b) = (pick(&bools, &mut rng), pick(&bools, &mut rng));
                        bools.push(g.or(a, b).unwrap());
                    }
                    2 => {
                        let a = pick(&bools, &mut rng);
                        bools.push(g.not(a).unwrap());
                    }
                    3 => {
                        let k = rng.gen_range(0..4);
                        bools.push(g.equal_int(p, k).unwrap());
                    }
                    4 => {
                        let c = pick(&bools, &mut rng);
                        let (a, b) = (pick(&ints, &mut rng), pick(&ints, &mut rng));
                        ints.push(g.conditional(c, Some(a), Some(b)).unwrap());
                    }
                    _ => {
                        let d = pick(&ints, &mut rng);
                        let cases = (0..rng.gen_range(0..4))
                            .map(|k| (k, pick(&ints, &mut rng)))
                            .collect::<Vec<_>>();
                        ints.push(g.switch(p, &cases, Some(d)).unwrap());
                    }
                }
            }
            g.add_root(*bools.last().unwrap());
            g.add_root(*ints.last().unwrap());
            let stats = Optimizer::default().run(&mut g);
            assert!(stats.converged, "did not converge: {stats:?}");
            for root in g.roots().to_vec() {
                for n in g.postorder_from(&[root]) {
                    g.assert_op(n);
                }
            }
        }
    }
}
