pub use std::{
    sync::Arc,
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    cmp::Ordering,
    fmt,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use rayon::prelude::*;
pub use indexmap::IndexMap;
pub use clap::Parser;
pub use tracing::{debug, info, trace, warn};

pub use crate::{
    TypeDesc, ScalarKind, IntWidth, Field, LayoutResult,
    Diagnostic, DiagnosticKind,
    abi::*,
    sizes::{Sizes, Measure, align},
};

/// The unit for measuring memory. Every size, alignment, offset and
/// array length goes through this type, and every arithmetic operation
/// on it is checked: a struct too big to describe is an error, not a
/// wrapped-around small number.
pub type ByteSize = u64;

/// Raised while picking the machine we're computing layouts for.
/// Always fatal, always reported before anything gets analyzed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown target profile `{0}`")]
    UnknownProfile(String),
    #[error("word size must be a positive power of two, got {0}")]
    BadWordSize(ByteSize),
    #[error("maximum alignment must be a positive power of two, got {0}")]
    BadMaxAlign(ByteSize),
}

/// Raised by the layout calculator and everything built on top of it.
/// An error concerns a single record; the others are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("unresolved type `{0}`")]
    Unresolved(String),
    #[error("expected a struct type, found {0}")]
    NotAStruct(&'static str),
    #[error("layout does not fit in {} bits", ByteSize::BITS)]
    Overflow,
}

/// Raised by a [`RecordSource`] when it cannot even produce records:
/// unreadable files, broken syntax.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot read {}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{pos}: syntax error: {message}")]
    Syntax {
        pos:        SourcePos,
        message:    String,
    },
    #[error("{}: no Go files found", .0.display())]
    Empty(PathBuf),
}

/// Where something was found in the source. Opaque to the core; only
/// the driver turns it into text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePos {
    pub path:   Arc<Path>,
    pub line:   u32,
    pub column: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// A struct type found by a front end, ready to be analyzed.
#[derive(Debug, Clone)]
pub struct Record<P> {
    /// Always a [`TypeDesc::Struct`] when produced by a well-behaved
    /// source; [`crate::algo::analyze_record`] checks anyway.
    pub descriptor: TypeDesc,
    pub position:   P,
    /// The declared name, if the struct literal is the right-hand side
    /// of a type declaration.
    pub name:       Option<String>,
}

/// Defines the interface for discovering struct types.
///
/// We ship [`crate::gosrc::GoSource`], which reads Go declarations.
/// Other front ends only need to implement this trait.
pub trait RecordSource {
    type Pos;

    /// Either every struct type the source knows about, or a reason why
    /// none could be produced. Field types the source could not resolve
    /// must come back as [`TypeDesc::Unresolved`], not be left out.
    fn records(&self, sizes: &Sizes) -> Result<Vec<Record<Self::Pos>>, SourceError>;
}

/// Per-record outcome of a batch run, in the order records came in.
pub type Outcome<P> = Result<Vec<Diagnostic<P>>, (P, LayoutError)>;
