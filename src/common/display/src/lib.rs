//! Display and visualization utilities for Sluice.
//!
//! Provides tree formatting for DAG explain output.

mod tree;

pub use tree::{DisplayTree, TreeNode};

/// Format a sequence of items as a brace-delimited set, e.g. `{c0, c3}`.
pub fn format_set<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let parts: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    format!("{{{}}}", parts.join(", "))
}

/// Indent a multi-line string.
pub fn indent(s: &str, prefix: &str) -> String {
    s.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_set() {
        assert_eq!(format_set(["c0", "c3"]), "{c0, c3}");
        assert_eq!(format_set(Vec::<u32>::new()), "{}");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\nb", "  "), "  a\n  b");
    }
}
