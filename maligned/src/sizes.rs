use crate::helpe::*;

/// The layout calculator. One per target machine; cheap to copy.
///
/// With `track_pointers` off, every type reports zero pointer bytes, and
/// the solver falls back to ordering by size and alignment alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizes {
    pub abi:            AbiParams,
    pub track_pointers: bool,
}

/// Everything we know about a type's footprint, computed in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measure {
    pub size:           ByteSize,
    pub align:          ByteSize,
    pub pointer_bytes:  ByteSize,
}

impl Measure {
    #[inline(always)]
    pub fn result(&self) -> LayoutResult {
        LayoutResult {
            size:           self.size,
            pointer_bytes:  self.pointer_bytes,
        }
    }
}

/// Returns the smallest multiple of `a` that is at least `x`.
#[inline(always)]
pub fn align(x: ByteSize, a: ByteSize) -> Result<ByteSize, LayoutError> {
    debug_assert!(a > 0, "Zero alignment requested");
    x.checked_next_multiple_of(a).ok_or(LayoutError::Overflow)
}

#[inline(always)]
fn mul(x: ByteSize, y: ByteSize) -> Result<ByteSize, LayoutError> {
    x.checked_mul(y).ok_or(LayoutError::Overflow)
}

#[inline(always)]
fn add(x: ByteSize, y: ByteSize) -> Result<ByteSize, LayoutError> {
    x.checked_add(y).ok_or(LayoutError::Overflow)
}

impl Sizes {
    pub fn new(abi: AbiParams) -> Self {
        Self {
            abi,
            track_pointers: true,
        }
    }

    /// A calculator that never reports pointer bytes.
    pub fn sizes_only(abi: AbiParams) -> Self {
        Self {
            abi,
            track_pointers: false,
        }
    }

    pub fn align_of(&self, t: &TypeDesc) -> Result<ByteSize, LayoutError> {
        Ok(self.measure(t)?.align)
    }

    pub fn size_of(&self, t: &TypeDesc) -> Result<ByteSize, LayoutError> {
        Ok(self.measure(t)?.size)
    }

    /// Length of the prefix of `t` that may hold references.
    pub fn pointer_bytes_of(&self, t: &TypeDesc) -> Result<ByteSize, LayoutError> {
        Ok(self.measure(t)?.pointer_bytes)
    }

    pub fn layout_of(&self, t: &TypeDesc) -> Result<LayoutResult, LayoutError> {
        Ok(self.measure(t)?.result())
    }

    /// Size, alignment and pointer bytes of `t`.
    ///
    /// Alignment of arrays and structs comes from their elements and
    /// fields. Everything else is aligned to its own size, clamped to
    /// `[1, max_align]`.
    pub fn measure(&self, t: &TypeDesc) -> Result<Measure, LayoutError> {
        let word = self.abi.word_size();
        let (size, pointer_bytes) = match t {
            TypeDesc::Scalar(k)     => (k.size(), 0),
            // Only the data pointer is scanned, not the length.
            TypeDesc::Str           => (mul(word, 2)?, word),
            TypeDesc::Slice         => (mul(word, 3)?, word),
            TypeDesc::Pointer       => (word, word),
            TypeDesc::Interface     => (mul(word, 2)?, mul(word, 2)?),
            TypeDesc::Array { elem, len } => {
                return self.measure_array(elem, *len);
            },
            TypeDesc::Struct(fields) => {
                return self.measure_fields(fields.iter().map(|f| &f.ty));
            },
            TypeDesc::Unresolved(name) => {
                return Err(LayoutError::Unresolved(name.clone()));
            },
        };

        Ok(Measure {
            size,
            align:          size.clamp(1, self.abi.max_align()),
            pointer_bytes:  if self.track_pointers { pointer_bytes } else { 0 },
        })
    }

    fn measure_array(&self, elem: &TypeDesc, len: ByteSize) -> Result<Measure, LayoutError> {
        // The element is measured even for empty arrays: an array of
        // something unresolved is unresolved regardless of its length.
        let e = self.measure(elem)?;
        if len == 0 {
            return Ok(Measure {
                size:           0,
                align:          e.align,
                pointer_bytes:  0,
            });
        }
        // The last element contributes its raw size, not its stride.
        let stride = align(e.size, e.align)?;
        let last = mul(stride, len - 1)?;
        let size = add(last, e.size)?;
        // Scanning stops at the last element's own pointer prefix.
        let pointer_bytes = if e.pointer_bytes == 0 {
            0
        } else {
            add(last, e.pointer_bytes)?
        };

        Ok(Measure {
            size,
            align: e.align,
            pointer_bytes,
        })
    }

    /// Lays out `fields` in the order given.
    ///
    /// A zero-size trailing field after a non-empty prefix is bumped to
    /// one byte, so that a pointer to it can never point past the end of
    /// the struct into whatever comes next.
    pub fn measure_fields<'a, I>(&self, fields: I) -> Result<Measure, LayoutError>
    where I: IntoIterator<Item = &'a TypeDesc> {
        let mut fields = fields.into_iter().peekable();
        let mut offset = 0;
        let mut max_align = 1;
        let mut pointer_end = 0;
        while let Some(ty) = fields.next() {
            let m = self.measure(ty)?;
            let mut sz = m.size;
            if fields.peek().is_none() && sz == 0 && offset != 0 {
                sz = 1;
            }
            let start = align(offset, m.align)?;
            if m.pointer_bytes != 0 {
                pointer_end = add(start, m.pointer_bytes)?;
            }
            offset = add(start, sz)?;
            max_align = max_align.max(m.align);
        }

        Ok(Measure {
            size:           align(offset, max_align)?,
            align:          max_align,
            pointer_bytes:  pointer_end,
        })
    }
}
