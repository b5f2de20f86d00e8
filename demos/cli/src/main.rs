use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use kiln::{
    compile::{Compiler, CompilerOptions, StateDesc},
    graph::{Graph, Node},
    link::LinkerOptions,
    optimize::OptimizerOptions,
    program::Program,
};

/// Content graph compiler
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Input file, in the text graph format
    #[clap(short, long)]
    input: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Compiles the graph and prints a listing of the program
    Disasm {
        #[clap(flatten)]
        settings: CompileSettings,
    },
    /// Compiles the graph and prints statistics about the program
    Stats {
        #[clap(flatten)]
        settings: CompileSettings,
    },
    /// Compiles the graph and writes the serialized program
    Build {
        #[clap(flatten)]
        settings: CompileSettings,

        /// Name of the program file to write
        #[clap(short, long)]
        out: PathBuf,
    },
    /// Prints the optimized graph in GraphViz format
    Dot {
        /// Skip optimization
        #[clap(long)]
        raw: bool,
    },
}

#[derive(Parser)]
struct CompileSettings {
    /// Name of the compiled state
    #[clap(short, long, default_value = "default")]
    state: String,

    /// Parameters that may change at runtime (repeatable)
    #[clap(short = 'r', long = "runtime")]
    runtime_params: Vec<String>,

    /// Maximum number of optimizer passes
    #[clap(long, default_value_t = 32)]
    max_passes: usize,

    /// Disable the sink pass
    #[clap(long)]
    no_sink: bool,

    /// Disable logic-to-switch conversion
    #[clap(long)]
    no_logic: bool,

    /// Minimum size (in bytes) of streamed image mips and mesh slices
    #[clap(long, default_value_t = 4096)]
    min_rom_size: usize,

    /// Verify that the serialized program loads back identically
    #[clap(long)]
    check: bool,
}

impl CompileSettings {
    fn options(&self) -> CompilerOptions {
        CompilerOptions {
            optimizer: OptimizerOptions {
                max_passes: self.max_passes,
                enable_sink: !self.no_sink,
                enable_logic: !self.no_logic,
                ..Default::default()
            },
            linker: LinkerOptions {
                min_rom_size: self.min_rom_size,
                ..Default::default()
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

fn compile(
    graph: Graph,
    root: Node,
    settings: &CompileSettings,
) -> Result<Program> {
    let start = Instant::now();
    let runtime = settings
        .runtime_params
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>();
    let state =
        StateDesc::new(&settings.state, root).with_runtime_params(&runtime);
    let out = Compiler::new(settings.options()).compile(graph, &[state])?;
    info!(
        "Compiled in {:?} ({} optimizer passes, {} rewrites)",
        start.elapsed(),
        out.stats.passes,
        out.stats.rewrites
    );
    if !out.stats.converged {
        log::warn!("optimizer did not converge");
    }
    if settings.check {
        let mut buf = vec![];
        out.program.serialise(&mut buf)?;
        let back = Program::unserialise(buf.as_slice())?;
        if back != out.program {
            bail!("program does not survive a serialization round trip");
        }
        info!("Checked serialization ({} bytes)", buf.len());
    }
    Ok(out.program)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let now = Instant::now();
    let args = Args::parse();
    let file = std::fs::File::open(&args.input)?;
    let (mut graph, root) = Graph::from_text(std::io::BufReader::new(file))?;
    info!(
        "Loaded {} nodes in {:?}",
        graph.live_count(),
        now.elapsed()
    );

    match args.cmd {
        Command::Disasm { settings } => {
            let program = compile(graph, root, &settings)?;
            print!("{}", program.disassemble());
        }
        Command::Stats { settings } => {
            let program = compile(graph, root, &settings)?;
            print!("{}", program.stats());
        }
        Command::Build { settings, out } => {
            let program = compile(graph, root, &settings)?;
            let file = std::fs::File::create(&out)?;
            let mut w = std::io::BufWriter::new(file);
            program.serialise(&mut w)?;
            w.flush()?;
            info!("Wrote {:?}", out);
        }
        Command::Dot { raw } => {
            if !raw {
                let stats = kiln::optimize::Optimizer::default().run(&mut graph);
                info!("Optimized in {} passes", stats.passes);
            }
            print!("{}", graph.dot());
        }
    }
    Ok(())
}
