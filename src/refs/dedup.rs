use compact_str::CompactString;
use indexmap::IndexMap;

use super::types::{ObjectKind, ObjectReference};

/// Merge references that share a name (case-insensitive) and sort the result.
///
/// Within a group the first kind other than [`ObjectKind::Unknown`] wins; the
/// name keeps the casing of its first occurrence. Output is ordered by name
/// with ordinal case-insensitive comparison.
pub fn deduplicate(refs: Vec<ObjectReference>) -> Vec<ObjectReference> {
    let mut groups: IndexMap<CompactString, ObjectReference> = IndexMap::new();
    for reference in refs {
        let key = CompactString::from(reference.name.to_lowercase());
        match groups.get_mut(&key) {
            Some(existing) => {
                if existing.kind == ObjectKind::Unknown && reference.kind != ObjectKind::Unknown {
                    existing.kind = reference.kind;
                }
            }
            None => {
                groups.insert(key, reference);
            }
        }
    }

    let mut result: Vec<ObjectReference> = groups.into_values().collect();
    result.sort_by_cached_key(|r| r.name.to_uppercase());
    result
}
