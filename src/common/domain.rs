/// Strip a single trailing root dot from a DNS name.
pub fn strip_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Reverse the dot-separated labels of `path`.
/// `c479.ce1.ce15.gb` → `gb.ce15.ce1.c479`.
pub fn reverse_labels(path: &str) -> String {
    path.split('.').rev().collect::<Vec<_>>().join(".")
}
