pub mod reorder;

pub use reorder::{optimal_order, Reordering};

use crate::{
    helpe::*,
    analyze::compare_layouts,
};

/// Checks one struct type for a wasteful field order.
///
/// `descriptor` must be a [`TypeDesc::Struct`]. `position` is handed back
/// untouched inside every diagnostic. Nothing here keeps state between
/// calls, so any number of these can run at once.
///
/// Returns the diagnostics (possibly none), or the reason the struct
/// could not be measured at all. In the latter case nothing about it is
/// guessed.
pub fn analyze_record<P: Clone>(
    descriptor: &TypeDesc,
    position:   P,
    sizes:      &Sizes,
) -> Result<Vec<Diagnostic<P>>, LayoutError> {
    let Some(fields) = descriptor.fields() else {
        return Err(LayoutError::NotAStruct(descriptor.kind_name()));
    };
    let actual = sizes.layout_of(descriptor)?;
    let optimal = optimal_order(fields, sizes)?;
    debug!(
        fields = fields.len(),
        size = actual.size,
        optimal_size = optimal.layout.size,
        pointer_bytes = actual.pointer_bytes,
        optimal_pointer_bytes = optimal.layout.pointer_bytes,
        "Struct analyzed."
    );

    Ok(compare_layouts(actual, optimal.layout, position, &optimal.names()))
}

/// Runs [`analyze_record`] over every record, in parallel.
///
/// The result has one entry per record, in input order. A record that
/// fails does not affect the others.
pub fn analyze_all<P>(
    records:    &[Record<P>],
    sizes:      &Sizes,
) -> Vec<Outcome<P>>
where P: Clone + Send + Sync {
    records
        .par_iter()
        .map(|r| {
            analyze_record(&r.descriptor, r.position.clone(), sizes)
                .map_err(|e| {
                    warn!(name = r.name.as_deref().unwrap_or("<anonymous>"), error = %e, "Struct skipped.");
                    (r.position.clone(), e)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_struct_is_rejected() {
        let s = Sizes::new(AbiParams::default());
        assert_eq!(
            analyze_record(&TypeDesc::Pointer, (), &s),
            Err(LayoutError::NotAStruct("pointer"))
        );
    }

    #[test]
    fn batch_isolates_failures() {
        let s = Sizes::new(AbiParams::default());
        let records = vec![
            Record {
                descriptor: TypeDesc::structure([
                    ("a", TypeDesc::BOOL),
                    ("b", TypeDesc::INT64),
                    ("c", TypeDesc::BOOL),
                ]),
                position:   1,
                name:       Some("Padded".into()),
            },
            Record {
                descriptor: TypeDesc::structure([("t", TypeDesc::Unresolved("time.Time".into()))]),
                position:   2,
                name:       None,
            },
            Record {
                descriptor: TypeDesc::structure([("a", TypeDesc::INT64)]),
                position:   3,
                name:       None,
            },
        ];
        let out = analyze_all(&records, &s);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().len(), 1);
        assert_eq!(out[1], Err((2, LayoutError::Unresolved("time.Time".into()))));
        assert_eq!(out[2], Ok(vec![]));
    }
}
