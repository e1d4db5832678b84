/// Derives a URL slug from a post title.
///
/// Lowercases, turns spaces into `-` and drops everything outside `[a-z0-9-]`.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split(' ')
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
