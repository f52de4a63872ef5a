//! Output file naming.

const FALLBACK_STEM: &str = "empty";

/// Strip the last extension from a display name.
///
/// Only a trailing `.ext` with a non-empty extension and no path separator
/// is removed, so `take.01.flac` becomes `take.01` and `dir.v2/track` is left
/// alone. A name that is nothing but an extension falls back to `empty`.
pub fn file_stem(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    };
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// File name the exported mesh is delivered under.
pub fn stl_file_name(stem: &str) -> String {
    format!("{}.stl", stem)
}
