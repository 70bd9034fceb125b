//! Command tree model and the reference tree document

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// Location of a command: names from the program down to the command
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandPath(Vec<String>);

impl CommandPath {
    /// Split an invocation such as `hammer org create` on whitespace
    pub fn parse(invocation: &str) -> Self {
        Self(invocation.split_whitespace().map(str::to_string).collect())
    }

    pub fn root(program: &str) -> Self {
        Self(vec![program.to_string()])
    }

    pub fn child(&self, name: &str) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(name.to_string());
        Self(tokens)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Tokens below the program name
    pub fn below_program(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn is_root(&self) -> bool {
        self.0.len() <= 1
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// One command with its own options and child commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandNode {
    pub name: String,
    pub options: BTreeSet<String>,
    pub subcommands: Vec<CommandNode>,
}

impl CommandNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn subcommand(&self, name: &str) -> Option<&CommandNode> {
        self.subcommands.iter().find(|c| c.name == name)
    }

    pub fn subcommand_names(&self) -> BTreeSet<String> {
        self.subcommands.iter().map(|c| c.name.clone()).collect()
    }

    /// Find the node at `path`. The first token names the program and
    /// always resolves to this node.
    pub fn find(&self, path: &CommandPath) -> Option<&CommandNode> {
        let mut node = self;
        for part in path.below_program() {
            node = node.subcommand(part)?;
        }
        Some(node)
    }

    /// Get or create the node at `path`, creating missing parents
    pub fn ensure(&mut self, path: &CommandPath) -> &mut CommandNode {
        let mut node = self;
        for part in path.below_program() {
            let index = match node.subcommands.iter().position(|c| &c.name == part) {
                Some(index) => index,
                None => {
                    node.subcommands.push(CommandNode::new(part));
                    node.subcommands.len() - 1
                }
            };
            node = &mut node.subcommands[index];
        }
        node
    }

    /// Number of nodes in this subtree, including this one
    pub fn count_nodes(&self) -> usize {
        1 + self.subcommands.iter().map(CommandNode::count_nodes).sum::<usize>()
    }
}

/// On-disk shape of a command
#[derive(Debug, Serialize, Deserialize)]
struct CommandDocument {
    name: String,
    #[serde(default)]
    options: Vec<NamedEntry>,
    #[serde(default)]
    subcommands: Vec<CommandDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedEntry {
    name: String,
}

impl CommandDocument {
    fn into_node(self, parent: &str) -> Result<CommandNode, String> {
        let path = if parent.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", parent, self.name)
        };

        let mut node = CommandNode::new(&self.name);
        node.options = self.options.into_iter().map(|o| o.name).collect();

        for child in self.subcommands {
            let child = child.into_node(&path)?;
            if node.subcommand(&child.name).is_some() {
                return Err(format!("duplicate subcommand '{}' under '{}'", child.name, path));
            }
            node.subcommands.push(child);
        }
        Ok(node)
    }

    fn from_node(node: &CommandNode) -> Self {
        Self {
            name: node.name.clone(),
            options: node
                .options
                .iter()
                .map(|name| NamedEntry { name: name.clone() })
                .collect(),
            subcommands: node.subcommands.iter().map(Self::from_node).collect(),
        }
    }
}

/// Expected command tree plus the fingerprint of the file it came from
#[derive(Debug, Clone)]
pub struct ReferenceTree {
    pub root: CommandNode,
    pub fingerprint: String,
}

impl ReferenceTree {
    /// Load a reference tree from a JSON file
    pub fn load(path: &Path) -> E2eResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| E2eError::ReferenceLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let root = parse_reference(&bytes).map_err(|reason| E2eError::ReferenceLoad {
            path: path.display().to_string(),
            reason,
        })?;

        Ok(Self {
            root,
            fingerprint: fingerprint(&bytes),
        })
    }
}

/// Parse a reference document into a tree
pub fn parse_reference(bytes: &[u8]) -> Result<CommandNode, String> {
    let document: CommandDocument = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    document.into_node("")
}

/// Render a tree in the reference document format
pub fn to_reference_json(root: &CommandNode) -> E2eResult<String> {
    Ok(serde_json::to_string_pretty(&CommandDocument::from_node(root))?)
}

/// SHA-256 of a reference document, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = r#"{
        "name": "hammer",
        "options": [{"name": "verbose", "help": "Be verbose"}],
        "subcommands": [
            {
                "name": "org",
                "options": [{"name": "search"}],
                "subcommands": [
                    {"name": "create", "options": [{"name": "name"}], "subcommands": []}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_reference() {
        let root = parse_reference(REFERENCE.as_bytes()).unwrap();
        assert_eq!(root.name, "hammer");
        assert!(root.options.contains("verbose"));
        assert_eq!(root.count_nodes(), 3);

        let create = root.find(&CommandPath::parse("hammer org create")).unwrap();
        assert!(create.options.contains("name"));
    }

    #[test]
    fn test_find_root_and_missing() {
        let root = parse_reference(REFERENCE.as_bytes()).unwrap();
        assert_eq!(root.find(&CommandPath::parse("hammer")).unwrap().name, "hammer");
        assert!(root.find(&CommandPath::parse("hammer org delete")).is_none());
        assert!(root.find(&CommandPath::parse("hammer host")).is_none());
    }

    #[test]
    fn test_malformed_reference_is_rejected() {
        assert!(parse_reference(b"{\"options\": []}").is_err());
        assert!(parse_reference(b"not json").is_err());
    }

    #[test]
    fn test_duplicate_siblings_are_rejected() {
        let doc = r#"{"name": "hammer", "subcommands": [{"name": "org"}, {"name": "org"}]}"#;
        let err = parse_reference(doc.as_bytes()).unwrap_err();
        assert!(err.contains("duplicate subcommand 'org' under 'hammer'"));
    }

    #[test]
    fn test_reference_json_reloads_to_same_tree() {
        let root = parse_reference(REFERENCE.as_bytes()).unwrap();
        let json = to_reference_json(&root).unwrap();
        assert_eq!(parse_reference(json.as_bytes()).unwrap(), root);
    }

    #[test]
    fn test_ensure_creates_parents() {
        let mut root = CommandNode::new("hammer");
        root.ensure(&CommandPath::parse("hammer host interface create"))
            .options
            .insert("name".to_string());

        let node = root.find(&CommandPath::parse("hammer host interface create")).unwrap();
        assert!(node.options.contains("name"));
        assert_eq!(root.count_nodes(), 4);
    }

    #[test]
    fn test_command_path_display() {
        let path = CommandPath::parse("  hammer   org  create ");
        assert_eq!(path.to_string(), "hammer org create");
        assert_eq!(path.below_program(), ["org", "create"]);
        assert!(CommandPath::root("hammer").is_root());
    }
}
