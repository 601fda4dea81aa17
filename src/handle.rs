//! Derives platform login handles from display names.
//!
//! The convention on the test instance is `firstname + first letter of
//! lastname`, lowercased, with diacritics folded to ASCII and anything
//! outside `[a-z0-9_-]` dropped. Names that do not split into at least a
//! first and last part cannot be resolved to a handle.

use std::collections::HashMap;

/// Derive a login handle from a display name.
///
/// `aliases` maps lowercased display names to fixed handles for accounts
/// that do not follow the convention. Returns `None` when no handle can be
/// derived.
pub fn derive_handle(display_name: &str, aliases: &HashMap<String, String>) -> Option<String> {
    if let Some(alias) = aliases.get(&display_name.to_lowercase()) {
        return Some(alias.clone());
    }

    let mut parts = display_name.split_whitespace();
    let first = parts.next()?;
    let last = parts.next()?;
    let initial = last.chars().next()?;

    let handle: String = first
        .chars()
        .chain(std::iter::once(initial))
        .map(fold_char)
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if handle.is_empty() {
        None
    } else {
        Some(handle)
    }
}

/// Fold common Latin diacritics to their ASCII base letter. Characters with
/// no mapping pass through unchanged and are filtered later if unsafe.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        other => other,
    }
}
