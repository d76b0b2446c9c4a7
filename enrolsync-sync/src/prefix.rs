//! Which groups the sync is allowed to manage.

use enrolsync_core::GroupPrefixes;

/// Whether `group_name` is managed under `prefixes`.
///
/// No prefixes means every group is managed, including an absent name.
/// Otherwise the name must start with one of the prefixes, ignoring case.
pub fn matches(group_name: Option<&str>, prefixes: &GroupPrefixes) -> bool {
    if prefixes.is_empty() {
        return true;
    }
    let Some(name) = group_name else {
        return false;
    };
    let name = name.to_lowercase();
    prefixes
        .iter()
        .any(|prefix| name.starts_with(&prefix.to_lowercase()))
}
