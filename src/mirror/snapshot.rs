/// One node of a fetched subtree. Children are owned by value and kept in
/// the order the store listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    name: String,
    path_prefix: String,
    children: Vec<TreeNode>,
    data: Option<Vec<u8>>,
}

impl TreeNode {
    /// The anchor of a traversal: empty name, no payload, and `root_path`
    /// as prefix so that its remote path is `root_path` itself.
    pub fn root(root_path: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            path_prefix: root_path.into(),
            children: Vec::new(),
            data: None,
        }
    }

    pub fn new(
        name: impl Into<String>,
        path_prefix: impl Into<String>,
        data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            path_prefix: path_prefix.into(),
            children: Vec::new(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn remote_path(&self) -> String {
        join_path(&self.path_prefix, &self.name)
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn push_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    /// Number of nodes below this one, excluding itself.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}

/// The result of one fetch pass, consumed by a single persist pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    root: TreeNode,
}

impl TreeSnapshot {
    pub fn new(root: TreeNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        self.root.descendant_count()
    }
}

/// Joins a remote path and a child name with exactly one separator. An
/// empty name yields the prefix unchanged.
pub fn join_path(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        prefix.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

/// Strips trailing separators from a user-supplied root path, keeping `/`.
pub fn normalize_root_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}
