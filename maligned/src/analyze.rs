use crate::helpe::*;

/// Compares the declared layout against the solver's and says what, if
/// anything, is worth reporting.
///
/// Sizes and pointer bytes are judged independently: a struct can get a
/// size diagnostic, a pointer diagnostic, both (size first), or none.
/// Reporting is up to the caller.
pub fn compare_layouts<P: Clone>(
    actual:     LayoutResult,
    optimal:    LayoutResult,
    position:   P,
    suggested:  &[String],
) -> Vec<Diagnostic<P>> {
    let mut res = vec![];
    let mut emit = |kind| {
        res.push(Diagnostic {
            position:   position.clone(),
            kind,
            actual,
            optimal,
            suggested:  suggested.to_vec(),
        });
    };
    if actual.size != optimal.size {
        emit(DiagnosticKind::Size);
    }
    if actual.pointer_bytes != optimal.pointer_bytes {
        emit(DiagnosticKind::PointerBytes);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lr(size: ByteSize, pointer_bytes: ByteSize) -> LayoutResult {
        LayoutResult { size, pointer_bytes }
    }

    fn kinds(d: &[Diagnostic<u32>]) -> Vec<DiagnosticKind> {
        d.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn equal_layouts_are_quiet() {
        assert!(compare_layouts(lr(16, 8), lr(16, 8), 0u32, &[]).is_empty());
    }

    #[test]
    fn each_difference_is_reported_on_its_own() {
        assert_eq!(kinds(&compare_layouts(lr(24, 0), lr(16, 0), 1u32, &[])), vec![DiagnosticKind::Size]);
        assert_eq!(kinds(&compare_layouts(lr(24, 24), lr(24, 16), 2u32, &[])), vec![DiagnosticKind::PointerBytes]);
        assert_eq!(
            kinds(&compare_layouts(lr(32, 32), lr(24, 16), 3u32, &[])),
            vec![DiagnosticKind::Size, DiagnosticKind::PointerBytes]
        );
    }

    #[test]
    fn diagnostics_carry_everything_a_reporter_needs() {
        let names = vec!["b".to_string(), "a".to_string()];
        let d = compare_layouts(lr(24, 24), lr(24, 16), "x.go:3:6", &names);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].position, "x.go:3:6");
        assert_eq!(d[0].compared(), (24, 16));
        assert_eq!(d[0].suggested, names);
    }
}
