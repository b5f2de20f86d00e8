//! Sinking of operations through structural combinators
//!
//! `PixelFormat(Conditional(c, a, b))` becomes
//! `Conditional(c, PixelFormat(a), PixelFormat(b))`, and likewise for switches
//! and for passthrough mesh operations.  The combinator-independent work is
//! then branch-local, where later passes and CSE can deal with it.
use crate::graph::{Child, Graph, Node, Op, OpKind, SwitchCase};
use std::collections::HashMap;

/// Returns the combinator kinds that operations of the given kind may be sunk
/// through, or an empty slice if the kind is never sunk
pub fn sink_targets(kind: OpKind) -> &'static [OpKind] {
    use OpKind as K;
    match kind {
        K::ImagePixelFormat | K::ImageMipmap | K::ImageResize => {
            &[K::Conditional, K::Switch]
        }
        K::MeshFormat => &[
            K::Conditional,
            K::Switch,
            K::MeshAddTags,
            K::MeshApplyLayout,
        ],
        K::MeshExtractLayoutBlocks => &[
            K::Conditional,
            K::Switch,
            K::MeshAddTags,
            K::MeshSetSkeleton,
            K::MeshApplyPose,
        ],
        K::LayoutRemoveBlocks | K::LayoutPack => &[K::Conditional, K::Switch],
        _ => &[],
    }
}

/// Sink state for a single pass
///
/// Rewritten nodes are memoized by `(node, sinking root)`: the same shared
/// subnode is rewritten differently for different sinking roots, but only once
/// per root, so diamond-shaped sharing doesn't blow up.
#[derive(Default)]
pub struct Sinker {
    memo: HashMap<(Node, Node), Node>,
}

impl Sinker {
    /// Builds a new sinker with an empty memo
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a sinking pass over every node reachable from the roots
    ///
    /// Returns the number of sunk operations.
    pub fn run(&mut self, graph: &mut Graph) -> usize {
        let mut count = 0;
        for node in graph.postorder() {
            if graph.parent_count(node) == 0 && !graph.is_root(node) {
                continue;
            }
            if let Some(new) = self.sink(graph, node) {
                graph.replace(node, new);
                count += 1;
            }
        }
        if count > 0 {
            log::debug!("sink pass rewrote {count} nodes");
        }
        count
    }

    /// Sinks a single node, returning its replacement
    ///
    /// Returns `None` if the node's kind is never sunk, or if its source is
    /// not a combinator on the node's allow-list.
    pub fn sink(&mut self, graph: &mut Graph, root: Node) -> Option<Node> {
        let op = graph.op(root);
        let targets = sink_targets(op.kind());
        let source = op.source()??;
        if !targets.contains(&graph.op(source).kind()) {
            return None;
        }

        // Depth-first recursion on the heap, to protect against stack overflows
        enum Action {
            Down,
            Up,
        }
        let mut todo = vec![(Action::Down, source)];
        while let Some((action, node)) = todo.pop() {
            if self.memo.contains_key(&(node, root)) {
                continue;
            }
            let op = graph.op(node);
            let is_combinator = targets.contains(&op.kind());
            match action {
                Action::Down if is_combinator => {
                    todo.push((Action::Up, node));
                    for b in sink_slots(op) {
                        todo.push((Action::Down, b));
                    }
                }
                Action::Down => {
                    let new = graph.insert(graph.op(root).with_source(Some(node)));
                    self.memo.insert((node, root), new);
                }
                Action::Up => {
                    let mut new_op = op.clone();
                    let memo = &self.memo;
                    let map = |c: &mut Child| {
                        if let Some(n) = c {
                            *c = Some(memo[&(*n, root)]);
                        }
                    };
                    for_each_sink_slot_mut(&mut new_op, map);
                    let new = graph.insert(new_op);
                    self.memo.insert((node, root), new);
                }
            }
        }
        Some(self.memo[&(source, root)])
    }
}

/// Returns the present children of a combinator that operations sink into
fn sink_slots(op: &Op) -> Vec<Node> {
    let mut out = vec![];
    let mut op = op.clone();
    for_each_sink_slot_mut(&mut op, |c| out.extend(*c));
    out
}

/// Visits the slots of a combinator that operations sink into
///
/// # Panics
/// If the operation is not a combinator
fn for_each_sink_slot_mut<F: FnMut(&mut Child)>(op: &mut Op, mut f: F) {
    match op {
        Op::Conditional { yes, no, .. } => {
            f(yes);
            f(no);
        }
        Op::Switch { default, cases, .. } => {
            f(default);
            cases
                .iter_mut()
                .for_each(|SwitchCase { branch, .. }| f(branch));
        }
        Op::MeshAddTags { source, .. }
        | Op::MeshSetSkeleton { source, .. }
        | Op::MeshApplyLayout { mesh: source, .. }
        | Op::MeshApplyPose { base: source, .. } => f(source),
        op => panic!("{:?} is not a combinator", op.kind()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ConstantResource, Image, ImageFormat, ParameterDesc};
    use crate::graph::DataType;

    fn image(g: &mut Graph, size: u16) -> Node {
        g.insert(Op::ImageConstant(ConstantResource::new(Image::new(
            size,
            size,
            1,
            ImageFormat::Rgba8,
        ))))
    }

    #[test]
    fn test_sink_conditional() {
        let mut g = Graph::new();
        let c = g.parameter(ParameterDesc::new_bool("c", false));
        let a = image(&mut g, 4);
        let b = image(&mut g, 8);
        let cond = g.conditional(c, Some(a), Some(b)).unwrap();
        let fmt = g.insert(Op::ImagePixelFormat {
            source: Some(cond),
            format: ImageFormat::L8,
        });
        g.add_root(fmt);

        assert_eq!(Sinker::new().run(&mut g), 1);
        let root = g.roots()[0];
        let Op::Conditional {
            ty: DataType::Image,
            condition,
            yes: Some(yes),
            no: Some(no),
        } = g.op(root).clone()
        else {
            panic!("expected a conditional, got {:?}", g.op(root));
        };
        assert_eq!(condition, Some(c));
        assert_eq!(
            g.op(yes),
            &Op::ImagePixelFormat {
                source: Some(a),
                format: ImageFormat::L8
            }
        );
        assert_eq!(
            g.op(no),
            &Op::ImagePixelFormat {
                source: Some(b),
                format: ImageFormat::L8
            }
        );
    }

    #[test]
    fn test_sink_shared_branch() {
        // Both switch cases share a nested conditional, which is only
        // rewritten once
        let mut g = Graph::new();
        let c = g.parameter(ParameterDesc::new_bool("c", false));
        let v = g.parameter(ParameterDesc::new_int("v", &[]));
        let a = image(&mut g, 4);
        let b = image(&mut g, 8);
        let cond = g.conditional(c, Some(a), Some(b)).unwrap();
        let s = g.switch(v, &[(0, cond), (1, cond)], Some(a)).unwrap();
        let mip = g.insert(Op::ImageMipmap {
            source: Some(s),
            levels: 0,
            only_tail: false,
        });
        g.add_root(mip);
        let before = g.len();
        assert_eq!(Sinker::new().run(&mut g), 1);
        // One new switch, one new conditional, two new mipmaps
        assert_eq!(g.len() - before, 4);
        let root = g.roots()[0];
        let Op::Switch { cases, default, .. } = g.op(root) else {
            panic!()
        };
        assert_eq!(cases[0].branch, cases[1].branch);
        assert!(matches!(
            g.op(default.unwrap()),
            Op::ImageMipmap { source, .. } if *source == Some(a)
        ));
    }

    #[test]
    fn test_allow_list() {
        // Images are never sunk through mesh passthroughs, and kinds without
        // an allow-list are left alone
        let mut g = Graph::new();
        let a = image(&mut g, 4);
        let layer = g.insert(Op::ImageDisplace {
            source: Some(a),
            displacement_map: None,
        });
        g.add_root(layer);
        assert_eq!(Sinker::new().run(&mut g), 0);
        assert!(sink_targets(OpKind::ImageDisplace).is_empty());
        assert!(sink_targets(OpKind::MeshFormat).contains(&OpKind::MeshAddTags));
        assert!(!sink_targets(OpKind::ImageResize)
            .contains(&OpKind::MeshAddTags));
    }

    #[test]
    fn test_sink_mesh_passthrough() {
        use crate::data::Mesh;
        let mut g = Graph::new();
        let m = g.insert(Op::MeshConstant(ConstantResource::new(Mesh::default())));
        let tags = g.insert(Op::MeshAddTags {
            source: Some(m),
            tags: vec!["Wheel".to_owned()],
        });
        let fmt = g.insert(Op::MeshFormat {
            source: Some(tags),
            format_source: None,
            flags: 1,
        });
        g.add_root(fmt);
        assert_eq!(Sinker::new().run(&mut g), 1);
        let root = g.roots()[0];
        let Op::MeshAddTags {
            source: Some(inner),
            tags,
        } = g.op(root)
        else {
            panic!()
        };
        assert_eq!(tags, &["Wheel"]);
        assert_eq!(g.op(*inner).kind(), OpKind::MeshFormat);
    }
}
