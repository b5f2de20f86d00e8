//! Compilation driver
//!
//! [`Compiler::compile`] takes ownership of a [`Graph`] and a list of named
//! states, optimizes the graph, links every state root into a single
//! [`Program`], and annotates each state with its runtime-parameter
//! dependencies.
use crate::bytecode::{args::ParameterArgs, Address};
use crate::graph::{DataType, Graph, Node, Op};
use crate::link::{Linker, LinkerOptions};
use crate::optimize::{Optimizer, OptimizerOptions, OptimizerStats};
use crate::program::{rom::RomPayload, Program, State};
use crate::Error;

use std::collections::{BTreeSet, HashMap, HashSet};

/// Maximum number of runtime parameters per state
pub const MAX_RUNTIME_PARAMS: usize = u64::BITS as usize;

/// Options for the whole compilation pipeline
#[derive(Copy, Clone, Debug, Default)]
pub struct CompilerOptions {
    /// Optimizer options
    pub optimizer: OptimizerOptions,
    /// Linker options
    pub linker: LinkerOptions,
}

/// Description of a state to compile
#[derive(Clone, Debug)]
pub struct StateDesc {
    /// Unique state name
    pub name: String,
    /// Root of the state's graph
    pub root: Node,
    /// Names of parameters that may change while the state is active
    pub runtime_params: Vec<String>,
}

impl StateDesc {
    /// Builds a state without runtime parameters
    pub fn new(name: &str, root: Node) -> Self {
        Self {
            name: name.to_owned(),
            root,
            runtime_params: vec![],
        }
    }

    /// Adds runtime parameters by name
    pub fn with_runtime_params(mut self, names: &[&str]) -> Self {
        self.runtime_params
            .extend(names.iter().map(|n| (*n).to_owned()));
        self
    }
}

/// Output of the compiler
#[derive(Debug)]
pub struct CompiledModel {
    /// Linked program
    pub program: Program,
    /// Payloads of the program's streamable roms, in rom index order
    pub roms: Vec<RomPayload>,
    /// Optimizer statistics
    pub stats: OptimizerStats,
}

/// Compiler from graphs to programs
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Builds a compiler with the given options
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Returns the compiler options
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Returns the compiler options mutably
    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.options
    }

    /// Compiles a graph with a single state named `"default"`
    pub fn compile_single(
        &self,
        graph: Graph,
        root: Node,
    ) -> Result<CompiledModel, Error> {
        self.compile(graph, &[StateDesc::new("default", root)])
    }

    /// Compiles a graph into a program with one entry point per state
    ///
    /// ```
    /// use kiln::{compile::{Compiler, StateDesc}, graph::Graph};
    ///
    /// let txt = "
    /// p param-bool p false
    /// t bool true
    /// a and p t
    /// ";
    /// let (g, root) = Graph::from_text(txt.as_bytes())?;
    /// let out = Compiler::default().compile(
    ///     g,
    ///     &[StateDesc::new("main", root).with_runtime_params(&["p"])],
    /// )?;
    /// // The null instruction and the parameter
    /// assert_eq!(out.program.op_count(), 2);
    /// assert_eq!(out.program.state("main").unwrap().runtime_params, [0]);
    /// # Ok::<(), kiln::Error>(())
    /// ```
    pub fn compile(
        &self,
        mut graph: Graph,
        states: &[StateDesc],
    ) -> Result<CompiledModel, Error> {
        if states.is_empty() {
            return Err(Error::EmptyGraph);
        }
        let mut names = HashSet::new();
        for s in states {
            if !names.insert(s.name.as_str()) {
                return Err(Error::DuplicateState(s.name.clone()));
            }
            if !graph.is_live(s.root) {
                return Err(Error::BadNode);
            }
            if s.runtime_params.len() > MAX_RUNTIME_PARAMS {
                return Err(Error::TooManyRuntimeParameters(
                    s.name.clone(),
                    s.runtime_params.len(),
                ));
            }
        }

        // Runtime parameters are checked against the graph before it is
        // optimized, since optimization may legitimately remove them
        let roots = states.iter().map(|s| s.root).collect::<Vec<_>>();
        let known = graph
            .postorder_from(&roots)
            .into_iter()
            .filter_map(|n| match graph.op(n) {
                Op::Parameter { desc, .. } => Some(desc.name.clone()),
                _ => None,
            })
            .collect::<HashSet<_>>();
        for s in states {
            if let Some(p) = s.runtime_params.iter().find(|p| !known.contains(*p))
            {
                return Err(Error::UnknownParameter(p.clone()));
            }
        }

        let root_indices = roots
            .iter()
            .map(|r| graph.add_root(*r))
            .collect::<Vec<_>>();
        let stats = Optimizer::new(self.options.optimizer).run(&mut graph);

        let mut program = Program::new();
        let mut linker = Linker::new(self.options.linker);
        for (desc, i) in states.iter().zip(root_indices) {
            let root = graph.roots()[i];
            let addr = linker.link(&graph, &mut program, root);
            let state = build_state(&graph, &linker, &mut program, desc, root, addr);
            log::info!(
                "state {:?}: {} runtime parameters, {} dynamic resources, \
                 {} cached",
                state.name,
                state.runtime_params.len(),
                state.dynamic_resources.len(),
                state.update_cache.len()
            );
            program.push_state(state);
        }
        let roms = linker.finish();
        log::info!(
            "compiled {} states into {} instructions and {} roms",
            states.len(),
            program.op_count(),
            roms.len()
        );
        Ok(CompiledModel {
            program,
            roms,
            stats,
        })
    }
}

fn linked(linker: &Linker, node: Node) -> Address {
    let Some(a) = linker.address(node) else {
        panic!("node {} was not linked", node.get());
    };
    a
}

/// Checks whether results of this type are worth caching or tracking
fn is_resource(ty: DataType) -> bool {
    matches!(ty, DataType::Image | DataType::Mesh)
}

/// Computes runtime-parameter dependencies for an already-linked state root
fn build_state(
    graph: &Graph,
    linker: &Linker,
    program: &mut Program,
    desc: &StateDesc,
    root: Node,
    addr: Address,
) -> State {
    let mut runtime_params = vec![];
    let mut bits = HashMap::new();
    for name in &desc.runtime_params {
        if bits.contains_key(name.as_str()) {
            continue;
        }
        match program.find_parameter(name) {
            Some(i) => {
                bits.insert(name.as_str(), 1u64 << runtime_params.len());
                runtime_params.push(i);
            }
            None => log::info!(
                "runtime parameter {name} of state {:?} was optimized out",
                desc.name
            ),
        }
    }

    // Masks are computed children-first, so every child's mask is ready by
    // the time its parents are visited
    let order = graph.postorder_from(&[root]);
    let mut masks: HashMap<Node, u64> = HashMap::new();
    let mut relevant = BTreeSet::new();
    for &n in &order {
        let op = graph.op(n);
        let mut mask = 0;
        if let Op::Parameter { desc: p, .. } = op {
            mask |= bits.get(p.name.as_str()).copied().unwrap_or(0);
            relevant.insert(
                program.op_args::<ParameterArgs>(linked(linker, n)).variable,
            );
        }
        op.for_each_child(|c| mask |= masks[&c]);
        masks.insert(n, mask);
    }

    let mut dynamic_resources = vec![];
    let mut update_cache = vec![];
    for &n in &order {
        let op = graph.op(n);
        if let Op::InstanceAdd { value: Some(v), .. } = op {
            if is_resource(graph.data_type(*v)) && masks[v] != 0 {
                dynamic_resources.push((linked(linker, *v), masks[v]));
            }
        }
        if masks[&n] != 0 {
            op.for_each_child(|c| {
                if masks[&c] == 0
                    && is_resource(graph.data_type(c))
                    && !graph.op(c).is_constant()
                {
                    update_cache.push(linked(linker, c));
                }
            });
        }
    }
    dynamic_resources.sort();
    dynamic_resources.dedup();
    update_cache.sort();
    update_cache.dedup();

    State {
        name: desc.name.clone(),
        root: addr,
        runtime_params,
        update_cache,
        dynamic_resources,
        relevant_params: program.add_parameter_list(relevant.into_iter().collect()),
    }
}
