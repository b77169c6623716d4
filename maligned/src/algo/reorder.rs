use crate::helpe::*;

/// A field measured once, up front, so that sorting does not keep
/// walking its type.
struct Ranked<'a> {
    field:  &'a Field,
    m:      Measure,
}

/// The solver's answer: a permutation of the input fields, and the
/// layout the calculator gives it.
#[derive(Debug, Clone)]
pub struct Reordering<'a> {
    pub fields: Vec<&'a Field>,
    pub layout: LayoutResult,
}

impl Reordering<'_> {
    pub fn names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Finds a field order with the smallest footprint we know how to get,
/// then lays it out with the very same calculator that measured the
/// declared order, so that the two are directly comparable.
///
/// Input order is irrelevant, except that it breaks ties: fields equal
/// on every criterion keep their declaration order.
pub fn optimal_order<'a>(
    fields: &'a [Field],
    sizes:  &Sizes,
) -> Result<Reordering<'a>, LayoutError> {
    let ranked = fields
        .iter()
        .map(|field| Ok(Ranked { field, m: sizes.measure(&field.ty)? }))
        .collect::<Result<Vec<_>, LayoutError>>()?;

    let ordered: Vec<&Field> = ranked
        .into_iter()
        .sorted_by(precedence)
        .map(|r| r.field)
        .collect();
    let layout = sizes
        .measure_fields(ordered.iter().map(|f| &f.ty))?
        .result();
    trace!(
        order = %ordered.iter().map(|f| f.name.as_str()).join(", "),
        size = layout.size,
        pointer_bytes = layout.pointer_bytes,
        "Fields reordered."
    );

    Ok(Reordering {
        fields: ordered,
        layout,
    })
}

/// `Less` means `a` goes first. Each rule only breaks the ties left by
/// the ones before it, so this is a total order.
fn precedence(a: &Ranked, b: &Ranked) -> Ordering {
    let (i, j) = (&a.m, &b.m);
    // Zero-size objects go before everything else.
    (i.size != 0).cmp(&(j.size != 0))
        // Then more tightly aligned before less tightly aligned.
        .then(j.align.cmp(&i.align))
        // Pointerful before pointer-free.
        .then((i.pointer_bytes == 0).cmp(&(j.pointer_bytes == 0)))
        // Among pointerful ones, the field with the longest non-pointer
        // tail ends the pointerful section.
        .then_with(|| {
            if i.pointer_bytes != 0 {
                (i.size - i.pointer_bytes).cmp(&(j.size - j.pointer_bytes))
            } else {
                Ordering::Equal
            }
        })
        // Bigger first.
        .then(j.size.cmp(&i.size))
        .then(a.field.source_index.cmp(&b.field.source_index))
}
