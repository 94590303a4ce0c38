//! Tree display utilities for explaining DAGs.

use std::fmt;

/// A node in a display tree.
pub trait TreeNode {
    /// Get the display name of this node.
    fn name(&self) -> String;

    /// Get child nodes.
    fn children(&self) -> Vec<&dyn TreeNode>;

    /// Inline details shown after the name, in parentheses.
    fn details(&self) -> Option<String> {
        None
    }

    /// Extra lines printed beneath the node, aligned with its children.
    fn annotations(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<'a> {
    root: &'a dyn TreeNode,
}

impl<'a> DisplayTree<'a> {
    /// Create a new display tree.
    pub fn new(root: &'a dyn TreeNode) -> Self {
        Self { root }
    }

    fn fmt_label(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode) -> fmt::Result {
        write!(f, "{}", node.name())?;
        if let Some(details) = node.details() {
            write!(f, " ({details})")?;
        }
        writeln!(f)
    }

    fn fmt_body(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode, prefix: &str) -> fmt::Result {
        let children = node.children();
        let bar = if children.is_empty() { "   " } else { "│  " };
        for line in node.annotations() {
            writeln!(f, "{prefix}{bar}{line}")?;
        }

        for (i, child) in children.iter().enumerate() {
            let is_last = i + 1 == children.len();
            let connector = if is_last { "└─ " } else { "├─ " };
            write!(f, "{prefix}{connector}")?;
            Self::fmt_label(f, *child)?;
            let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });
            Self::fmt_body(f, *child, &child_prefix)?;
        }

        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_label(f, self.root)?;
        Self::fmt_body(f, self.root, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        name: String,
        notes: Vec<String>,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn leaf(name: &str) -> Self {
            Self {
                name: name.to_string(),
                notes: vec![],
                children: vec![],
            }
        }
    }

    impl TreeNode for TestNode {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn children(&self) -> Vec<&dyn TreeNode> {
            self.children.iter().map(|c| c as &dyn TreeNode).collect()
        }

        fn annotations(&self) -> Vec<String> {
            self.notes.clone()
        }
    }

    #[test]
    fn test_display_tree() {
        let tree = TestNode {
            name: "filter_1".to_string(),
            notes: vec!["reads: {c0}".to_string()],
            children: vec![TestNode::leaf("range_0"), TestNode::leaf("range_2")],
        };

        let output = DisplayTree::new(&tree).to_string();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec!["filter_1", "│  reads: {c0}", "├─ range_0", "└─ range_2"]
        );
    }

    #[test]
    fn test_nested_prefixes() {
        let tree = TestNode {
            name: "a".to_string(),
            notes: vec![],
            children: vec![TestNode {
                name: "b".to_string(),
                notes: vec!["note".to_string()],
                children: vec![TestNode::leaf("c")],
            }],
        };

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(output, "a\n└─ b\n   │  note\n   └─ c\n");
    }
}
