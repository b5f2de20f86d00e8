//! Module containing the universal error type
use thiserror::Error;

/// Universal error type for `kiln`
///
/// Only recoverable conditions are represented here.  Broken invariants inside
/// the optimizer or linker (e.g. a child of the wrong data type, or reading
/// the wrong argument record at an address) are bugs and will panic instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Node is not present in this `Graph`
    #[error("node is not present in this `Graph`")]
    BadNode,

    /// Node produces the wrong type of data
    #[error("expected a node of type {expected:?}, found {actual:?}")]
    WrongType {
        /// Type required by the consumer
        expected: crate::graph::DataType,
        /// Type produced by the node
        actual: crate::graph::DataType,
    },

    /// `Graph` has no roots to compile
    #[error("`Graph` has no roots")]
    EmptyGraph,

    /// Runtime parameter name does not match any linked parameter
    #[error("unknown parameter {0}")]
    UnknownParameter(String),

    /// Two states share the same name
    #[error("duplicate state name {0}")]
    DuplicateState(String),

    /// Rom index is out of range for this program
    #[error("rom index ({0}) exceeds rom count ({1})")]
    BadRomIndex(usize, usize),

    /// Rom payload has the wrong resource type
    #[error("rom {0} holds a different resource type")]
    WrongRomType(usize),

    /// Rom source has no payload for the given index
    #[error("rom {0} is not available from this source")]
    MissingRom(usize),

    /// A state uses more runtime parameters than fit in a dependency mask
    #[error("state {0} has {1} runtime parameters (at most 64 are allowed)")]
    TooManyRuntimeParameters(String, usize),

    /// Unknown opcode {0}
    #[error("unknown opcode {0}")]
    UnknownOpcode(String),

    /// Unknown node label {0}
    #[error("unknown node {0}")]
    UnknownNode(String),

    /// Argument could not be parsed
    #[error("bad argument '{0}' on line {1}")]
    BadArgument(String, usize),

    /// Missing argument
    #[error("missing argument on line {0}")]
    MissingArgument(usize),

    /// Empty file
    #[error("empty file")]
    EmptyFile,

    /// Archive does not start with the expected magic number
    #[error("bad archive header")]
    BadHeader,

    /// Archive was written by an incompatible version
    #[error("unsupported archive version {0} (expected {1})")]
    BadVersion(u32, u32),

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Archive encoding error; see inner code for details
    #[error("archive error: {0}")]
    ArchiveError(#[from] bincode::Error),
}
