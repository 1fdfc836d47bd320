//! Artifact naming convention engine.
//!
//! The backend writes artifacts as `{prefix}_{Variant}_{counter}_.{ext}`
//! where `prefix` is the item identifier and `counter` is a zero-padded
//! number it increments on every save. These helpers recover the logical
//! variant from such a filename and produce the canonical output name.

/// Characters accepted between the item identifier and the rest of a
/// backend filename.
pub const VARIANT_SEPARATORS: &[char] = &['_', '-', '.', ' '];

/// Whether a backend file stem belongs to `item_id`.
///
/// The stem must equal the identifier or continue with one of the
/// [`VARIANT_SEPARATORS`], so `item2_Textured` never matches `item`.
pub fn matches_item_prefix(file_stem: &str, item_id: &str) -> bool {
    match file_stem.strip_prefix(item_id) {
        Some("") => true,
        Some(rest) => rest.starts_with(VARIANT_SEPARATORS),
        None => false,
    }
}

/// Strip the backend's counter decorations off the end of a name.
///
/// Trailing underscores go first, then digit runs together with the
/// underscores before them, until the name no longer ends in a digit.
///
/// ```
/// use meshgen_core::naming::strip_numeric_decorations;
///
/// assert_eq!(strip_numeric_decorations("_Textured_00002_"), "_Textured");
/// assert_eq!(strip_numeric_decorations("_00001_"), "");
/// ```
pub fn strip_numeric_decorations(name: &str) -> &str {
    let mut base = name.trim_end_matches('_');
    while base.ends_with(|c: char| c.is_ascii_digit()) {
        base = base
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .trim_end_matches('_');
    }
    base
}

/// Recover the logical variant of a backend file stem.
///
/// Returns `None` when the stem does not belong to `item_id`. Only the
/// part after the identifier is normalized, so identifiers ending in
/// digits (`scan01`) survive intact. An empty remainder maps to `primary`.
///
/// ```
/// use meshgen_core::naming::logical_variant;
///
/// assert_eq!(logical_variant("item_WhiteMesh_00001_", "item", "Textured"), Some("WhiteMesh"));
/// assert_eq!(logical_variant("item_00003_", "item", "Textured"), Some("Textured"));
/// assert_eq!(logical_variant("other_Refined_00001_", "item", "Textured"), None);
/// ```
pub fn logical_variant<'a>(file_stem: &'a str, item_id: &str, primary: &'a str) -> Option<&'a str> {
    if !matches_item_prefix(file_stem, item_id) {
        return None;
    }
    let rest = &file_stem[item_id.len()..];
    let variant = strip_numeric_decorations(rest).trim_start_matches(VARIANT_SEPARATORS);
    Some(if variant.is_empty() { primary } else { variant })
}

/// Canonical output filename for one harvested variant.
///
/// Convention: `{id}.{ext}` for the primary variant, `{id}_{variant}.{ext}`
/// for everything else.
pub fn output_file_name(item_id: &str, variant: &str, primary: &str, extension: &str) -> String {
    if variant == primary {
        format!("{item_id}.{extension}")
    } else {
        format!("{item_id}_{variant}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "Textured";

    #[test]
    fn prefix_exact_match() {
        assert!(matches_item_prefix("item", "item"));
    }

    #[test]
    fn prefix_followed_by_separator() {
        assert!(matches_item_prefix("item_Textured_00001_", "item"));
        assert!(matches_item_prefix("item-final", "item"));
        assert!(matches_item_prefix("item.v1", "item"));
    }

    #[test]
    fn prefix_without_separator_rejected() {
        assert!(!matches_item_prefix("item2_Textured_00001_", "item"));
        assert!(!matches_item_prefix("itemWhiteMesh_00001_", "item"));
    }

    #[test]
    fn prefix_unrelated_rejected() {
        assert!(!matches_item_prefix("other_Textured_00001_", "item"));
        assert!(!matches_item_prefix("ite", "item"));
    }

    #[test]
    fn strip_counter_and_trailing_underscore() {
        assert_eq!(strip_numeric_decorations("item_Textured_00002_"), "item_Textured");
    }

    #[test]
    fn strip_without_decorations_is_identity() {
        assert_eq!(strip_numeric_decorations("item_Refined"), "item_Refined");
    }

    #[test]
    fn strip_repeated_counters() {
        assert_eq!(strip_numeric_decorations("_Refined_00001_00002_"), "_Refined");
    }

    #[test]
    fn strip_eats_digits_glued_to_a_word() {
        // Heuristic limitation: a variant ending in digits loses them.
        assert_eq!(strip_numeric_decorations("_v2_00001_"), "_v");
    }

    #[test]
    fn strip_empty() {
        assert_eq!(strip_numeric_decorations(""), "");
        assert_eq!(strip_numeric_decorations("___"), "");
    }

    #[test]
    fn variant_named() {
        assert_eq!(logical_variant("item_Textured_00002_", "item", PRIMARY), Some("Textured"));
        assert_eq!(logical_variant("item_WhiteMesh_00001_", "item", PRIMARY), Some("WhiteMesh"));
        assert_eq!(logical_variant("item_Refined_00001_", "item", PRIMARY), Some("Refined"));
    }

    #[test]
    fn variant_bare_counter_is_primary() {
        assert_eq!(logical_variant("item_00001_", "item", PRIMARY), Some(PRIMARY));
        assert_eq!(logical_variant("item", "item", PRIMARY), Some(PRIMARY));
    }

    #[test]
    fn variant_keeps_digits_in_identifier() {
        assert_eq!(logical_variant("scan01_00004_", "scan01", PRIMARY), Some(PRIMARY));
        assert_eq!(
            logical_variant("scan01_WhiteMesh_00004_", "scan01", PRIMARY),
            Some("WhiteMesh")
        );
    }

    #[test]
    fn variant_other_item_is_none() {
        assert_eq!(logical_variant("item2_Textured_00001_", "item", PRIMARY), None);
    }

    #[test]
    fn output_name_primary() {
        assert_eq!(output_file_name("item", "Textured", PRIMARY, "glb"), "item.glb");
    }

    #[test]
    fn output_name_secondary() {
        assert_eq!(
            output_file_name("item", "WhiteMesh", PRIMARY, "glb"),
            "item_WhiteMesh.glb"
        );
    }
}
