use crate::helpe::*;

impl ScalarKind {
    /// Widths are fixed. `int` and friends have already been mapped to
    /// one of these by the front end.
    #[inline(always)]
    pub fn size(&self) -> ByteSize {
        match self {
            ScalarKind::Bool                => 1,
            ScalarKind::Int(w)
            | ScalarKind::Uint(w)           => w.bytes(),
            ScalarKind::Float32             => 4,
            ScalarKind::Float64
            | ScalarKind::Complex64         => 8,
            ScalarKind::Complex128          => 16,
        }
    }
}

impl IntWidth {
    #[inline(always)]
    pub fn bytes(&self) -> ByteSize {
        match self {
            IntWidth::W8    => 1,
            IntWidth::W16   => 2,
            IntWidth::W32   => 4,
            IntWidth::W64   => 8,
        }
    }

    /// The width of a machine word, for platform-sized integers.
    pub fn of_word(abi: &AbiParams) -> Self {
        match abi.word_size() {
            1       => IntWidth::W8,
            2       => IntWidth::W16,
            4       => IntWidth::W32,
            _       => IntWidth::W64,
        }
    }
}

impl TypeDesc {
    pub const BOOL: TypeDesc = TypeDesc::Scalar(ScalarKind::Bool);
    pub const INT8: TypeDesc = TypeDesc::Scalar(ScalarKind::Int(IntWidth::W8));
    pub const INT16: TypeDesc = TypeDesc::Scalar(ScalarKind::Int(IntWidth::W16));
    pub const INT32: TypeDesc = TypeDesc::Scalar(ScalarKind::Int(IntWidth::W32));
    pub const INT64: TypeDesc = TypeDesc::Scalar(ScalarKind::Int(IntWidth::W64));

    pub fn array(elem: TypeDesc, len: ByteSize) -> Self {
        TypeDesc::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Builds a struct out of `(name, type)` pairs, numbering the fields
    /// in the order they come.
    pub fn structure<N, I>(fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, TypeDesc)>,
    {
        TypeDesc::Struct(fields
            .into_iter()
            .enumerate()
            .map(|(source_index, (name, ty))| Field {
                name: name.into(),
                ty,
                source_index,
            })
            .collect())
    }

    /// The fields, if this is a struct.
    pub fn fields(&self) -> Option<&[Field]> {
        if let TypeDesc::Struct(fields) = self {
            Some(fields)
        } else {
            None
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDesc::Scalar(_)         => "scalar",
            TypeDesc::Str               => "string",
            TypeDesc::Array { .. }      => "array",
            TypeDesc::Slice             => "slice",
            TypeDesc::Pointer           => "pointer",
            TypeDesc::Interface         => "interface",
            TypeDesc::Struct(_)         => "struct",
            TypeDesc::Unresolved(_)     => "unresolved type",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Bool        => f.write_str("bool"),
            ScalarKind::Int(w)      => write!(f, "int{}", w.bytes() * 8),
            ScalarKind::Uint(w)     => write!(f, "uint{}", w.bytes() * 8),
            ScalarKind::Float32     => f.write_str("float32"),
            ScalarKind::Float64     => f.write_str("float64"),
            ScalarKind::Complex64   => f.write_str("complex64"),
            ScalarKind::Complex128  => f.write_str("complex128"),
        }
    }
}

// Mostly for logs. Reference kinds print as their shape, since that is
// all we kept of them.
impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Scalar(k)         => write!(f, "{k}"),
            TypeDesc::Str               => f.write_str("string"),
            TypeDesc::Array { elem, len } => write!(f, "[{len}]{elem}"),
            TypeDesc::Slice             => f.write_str("[]_"),
            TypeDesc::Pointer           => f.write_str("*_"),
            TypeDesc::Interface         => f.write_str("interface{}"),
            TypeDesc::Struct(fields)    => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 { f.write_str("; ")?; }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                f.write_str("}")
            },
            TypeDesc::Unresolved(name)  => write!(f, "?{name}"),
        }
    }
}
