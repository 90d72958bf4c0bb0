use std::collections::HashSet;

/// First free name for `base` given the names already in use.
///
/// Returns `base` when it is free, otherwise `base-N` for the smallest
/// `N >= 1` not in `taken`. A trailing `-<digits>` on `base` is not parsed,
/// so `feature-1` resolves to `feature-1-1`.
pub fn next_available_name<I, S>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let taken: HashSet<String> = taken
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();

    if !taken.contains(base) {
        return base.to_string();
    }

    // At most taken.len() candidates can collide, so this terminates.
    (1..)
        .map(|n: u64| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
