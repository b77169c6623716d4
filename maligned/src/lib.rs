//! Welcome to `maligned`!
//!
//! `maligned` looks at struct type definitions and tells you when the
//! order in which their fields were declared wastes memory: either
//! padding that a different order would get rid of, or a longer
//! pointer-bearing prefix than the garbage collector needs to scan.
//!
//! The moving parts, leaves first:
//!
//! 1. [`AbiParams`]: word size and maximum alignment of a target machine.
//! 2. [`Sizes`]: the layout calculator. Size, alignment and pointer bytes
//!    of any [`TypeDesc`].
//! 3. [`algo::optimal_order`]: permutes a struct's fields into the best
//!    order we know of and lays it out again with the same [`Sizes`].
//! 4. [`analyze::compare_layouts`]: turns the two layouts into
//!    [`Diagnostic`]s.
//!
//! Finding struct definitions is somebody else's job. We ship one front
//! end, [`gosrc::GoSource`], but anything implementing [`RecordSource`]
//! will do.

mod record;
mod sizes;

pub mod abi;
pub mod algo;
pub mod analyze;
pub mod gosrc;
pub mod helpe;

pub use crate::helpe::*;

/// Our fundamental unit of interest: a fully resolved type, as handed
/// to us by whoever parsed and type-checked the source.
///
/// The set of kinds is closed. Every layout function matches on all of
/// them, so a new kind cannot slip through with a made-up size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Fixed-width scalars. Their size never depends on the machine.
    Scalar(ScalarKind),
    /// A string header: data pointer plus length.
    Str,
    /// A fixed-length array. A zero length is legal.
    Array {
        elem:   Box<TypeDesc>,
        len:    ByteSize,
    },
    /// A slice header: pointer, length, capacity.
    Slice,
    /// Anything that is a single machine word holding a reference:
    /// raw pointers, channels, maps, functions.
    Pointer,
    /// Type word plus data word.
    Interface,
    /// Fields in declaration order.
    Struct(Vec<Field>),
    /// The front end could not resolve this type. Carries whatever it
    /// could say about it. Layout code fails closed on it.
    Unresolved(String),
}

/// Scalar kinds and their widths. Platform-sized integers (`int`,
/// `uint`, `uintptr`) are mapped to an explicit width by the front end,
/// which knows the target word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float32,
    Float64,
    Complex64,
    Complex128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// One struct field.
///
/// `source_index` is the position of the field in its declaration. It
/// plays no part in layout, but it is what makes the solver's output
/// reproducible when two fields tie on every other criterion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name:           String,
    pub ty:             TypeDesc,
    pub source_index:   usize,
}

/// Footprint of a value: total bytes, and how many bytes from its start
/// a precise scanner has to look at for references.
///
/// `pointer_bytes <= size` holds for every well-formed [`TypeDesc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayoutResult {
    pub size:           ByteSize,
    pub pointer_bytes:  ByteSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// The struct would be smaller in another order.
    Size,
    /// The struct's pointer-bearing prefix would be different (normally
    /// shorter) in another order.
    PointerBytes,
}

/// What we found wrong with one struct. `P` is whatever the caller uses
/// to say *where* the struct is; we never look inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic<P> {
    pub position:   P,
    pub kind:       DiagnosticKind,
    pub actual:     LayoutResult,
    pub optimal:    LayoutResult,
    /// Field names in the order the solver settled on.
    pub suggested:  Vec<String>,
}

impl<P> Diagnostic<P> {
    /// The pair of numbers this diagnostic is about: sizes for
    /// [`DiagnosticKind::Size`], pointer bytes otherwise.
    pub fn compared(&self) -> (ByteSize, ByteSize) {
        match self.kind {
            DiagnosticKind::Size            => (self.actual.size, self.optimal.size),
            DiagnosticKind::PointerBytes    => (self.actual.pointer_bytes, self.optimal.pointer_bytes),
        }
    }
}
