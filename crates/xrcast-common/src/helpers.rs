//! Common helper functions for xrcast.

/// Read a comma or semicolon separated list from the environment.
///
/// Returns `None` when the variable is unset or holds no usable entries.
pub fn env_list(name: &str) -> Option<Vec<String>> {
    let value = std::env::var(name).ok()?;
    let items = split_list(&value);
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
