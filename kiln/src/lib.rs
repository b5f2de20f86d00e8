//! Kiln is a compiler from parametric content graphs to linked bytecode
//! programs.
//!
//! A **content graph** describes how to build meshes, images and instances
//! from constants and user-facing parameters: it is a DAG of operations such
//! as "layer this color onto that image" or "if the parameter is set, use this
//! mesh, otherwise use that one".  Kiln optimizes the graph, then links it
//! into a compact [`Program`](crate::program::Program) which a runtime
//! evaluator can execute.
//!
//! # Graph construction
//! Graphs are built within a [`Graph`](crate::graph::Graph), which serves as
//! an arena-style allocator for [`Op`](crate::graph::Op) nodes:
//! ```
//! use kiln::{data::ParameterDesc, graph::Graph};
//!
//! let mut g = Graph::new();
//! let p = g.parameter(ParameterDesc::new_int("size", &[(0, "S"), (1, "L")]));
//! let small = g.int_constant(8);
//! let large = g.int_constant(64);
//! let size = g.switch(p, &[(1, large)], Some(small))?;
//! # Ok::<(), kiln::Error>(())
//! ```
//!
//! Graphs can also be loaded from a simple line-based text format, using
//! [`Graph::from_text`](crate::graph::Graph::from_text).
//!
//! # Optimization
//! The [`Optimizer`](crate::optimize::Optimizer) rewrites the graph in place
//! until it reaches a fixpoint: common subexpressions are merged, boolean and
//! arithmetic expressions are simplified, operations are pushed through
//! conditionals and switches, and chains of equality tests on the same
//! variable become switches.
//!
//! # Linking
//! The [`Linker`](crate::link::Linker) walks the optimized graph
//! children-first and appends one instruction per node to a program.  Large
//! constants (image mips and mesh content slices) are moved into
//! **roms**, which the runtime loads and unloads on demand; see
//! [`program::rom`].
//!
//! The whole pipeline is wrapped by [`Compiler`](crate::compile::Compiler):
//! ```
//! use kiln::{compile::Compiler, graph::Graph};
//!
//! let txt = "
//! color color 1 0 0 1
//! img plain-color color 256 256 Rgba8 1
//! inst instance-image img diffuse
//! ";
//! let (g, root) = Graph::from_text(txt.as_bytes())?;
//! let out = Compiler::default().compile_single(g, root)?;
//! println!("{}", out.program.disassemble());
//! # Ok::<(), kiln::Error>(())
//! ```
#![warn(missing_docs)]

pub mod bytecode;
pub mod compile;
pub mod data;
pub mod graph;
pub mod link;
pub mod optimize;
pub mod program;

mod error;
pub use error::Error;
