//! Parsing of successful compiler output.
//!
//! One invocation emits a single combined JSON document carrying
//! every requested artifact kind (bytecode, interface descriptor,
//! abstract-syntax tree, source maps) keyed by compiled-unit name.
//! This module decodes that document into owned, immutable
//! [`Contract`] values, and carries the legacy syntax-tree walk used
//! by the optional abstract-contract filter.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::config::OutputProtocol;
use crate::error::{Error, Result};
use crate::resolve;

/// Combined-output document as the compiler emits it.
#[derive(Debug, Deserialize)]
pub(crate) struct CombinedDocument {
    #[serde(default)]
    contracts: BTreeMap<String, RawContract>,

    #[serde(default)]
    sources: BTreeMap<String, RawSource>,

    #[serde(rename = "sourceList", default)]
    source_list: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawContract {
    #[serde(default)]
    bin: String,

    /// Interface descriptor, embedded as a JSON string.
    abi: Option<String>,

    ast: Option<Value>,

    srcmap: Option<String>,

    #[serde(rename = "srcmap-runtime")]
    srcmap_runtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "AST")]
    ast: Option<Value>,
}

impl CombinedDocument {
    /// The syntax tree of a body compiled from standard input.
    pub(crate) fn stdin_ast(&self) -> Option<&Value> {
        self.sources
            .get("<stdin>")
            .and_then(|source| source.ast.as_ref())
    }
}

/// Deployment-time and runtime-time source maps for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    /// Map for the deployment bytecode.
    pub deploy: String,

    /// Map for the runtime bytecode.
    pub runtime: String,
}

/// A compiled contract produced by one invocation.
///
/// Immutable value-like result; nothing mutates it after parsing.
#[derive(Debug, Clone)]
pub struct Contract {
    /// Display name, with any source-file qualifier stripped.
    pub name: String,

    /// Hex-encoded bytecode.
    pub bytecode: String,

    /// Interface descriptor entries decoded from the embedded
    /// document.
    pub abi: Vec<Value>,

    /// Abstract-syntax data, when the build requested it.
    pub ast: Option<Value>,

    /// Source maps, when the build requested them.
    pub source_map: Option<SourceMap>,

    /// Source file paths the map indices refer to, rooted at the
    /// project for downstream source-map resolution.
    pub source_list: Option<Vec<String>>,
}

/// The contracts produced by one successful invocation.
#[derive(Debug, Clone, Default)]
pub struct CompilationResult {
    /// Compiled contracts, ordered by combined-output key.
    pub contracts: Vec<Contract>,

    /// Non-fatal stderr text seen alongside a zero exit.
    pub warnings: Option<String>,
}

/// Decode stdout into the combined document per the configured
/// framing convention.
pub(crate) fn decode_document(stdout: &str, protocol: OutputProtocol) -> Result<CombinedDocument> {
    let payload = match protocol {
        OutputProtocol::CombinedJson => stdout.trim().to_string(),
        OutputProtocol::Delimited => extract_delimited(stdout),
    };
    serde_json::from_str(&payload).map_err(|err| {
        tracing::debug!("combined-output decode failed: {err}");
        Error::OutputParse(err.to_string())
    })
}

/// Drop the `=======` banner lines older releases wrap around the
/// payload and keep the JSON segment.
fn extract_delimited(stdout: &str) -> String {
    stdout
        .lines()
        .filter(|line| !line.trim_start().starts_with("======="))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn a decoded document into owned contracts.
///
/// With `filter_abstract` set, contracts the legacy syntax tree
/// marks abstract are dropped before conversion.
pub(crate) fn parse_contracts(
    document: CombinedDocument,
    root: &Path,
    filter_abstract: bool,
) -> Result<Vec<Contract>> {
    let keep = filter_abstract.then(|| concrete_names(&document.sources));

    let source_list = document
        .source_list
        .map(|paths| paths.iter().map(|path| root_join(root, path)).collect::<Vec<_>>());

    let mut contracts = Vec::new();
    for (key, raw) in document.contracts {
        let name = display_name(&key);
        if let Some(keep) = &keep {
            if !keep.iter().any(|concrete| concrete == name) {
                continue;
            }
        }

        let abi = match &raw.abi {
            Some(text) => {
                serde_json::from_str(text).map_err(|err| Error::AbiParse(err.to_string()))?
            }
            None => Vec::new(),
        };

        let source_map = match (raw.srcmap, raw.srcmap_runtime) {
            (Some(deploy), Some(runtime)) => Some(SourceMap { deploy, runtime }),
            _ => None,
        };

        contracts.push(Contract {
            name: name.to_string(),
            bytecode: raw.bin,
            abi,
            ast: raw.ast,
            source_map,
            source_list: source_list.clone(),
        });
    }
    Ok(contracts)
}

/// Strip a source-file qualifier (`src/Foo.sol:Foo`) from a
/// combined-output key.
fn display_name(key: &str) -> &str {
    match key.rsplit_once(':') {
        Some((_, name)) => name,
        None => key,
    }
}

/// Rewrite a document-relative path to an absolute-looking form
/// under the project root.
fn root_join(root: &Path, path: &str) -> String {
    let normalized = resolve::normalize_path(path);
    root.join(normalized.trim_start_matches('/'))
        .display()
        .to_string()
}

fn concrete_names(sources: &BTreeMap<String, RawSource>) -> Vec<String> {
    let mut names = Vec::new();
    for source in sources.values() {
        if let Some(ast) = &source.ast {
            names.extend(SyntaxTree::from_value(ast).concrete_contracts());
        }
    }
    names
}

/// One node of the legacy abstract-syntax tree.
#[derive(Debug, Clone)]
pub struct AstNode {
    /// Node tag (`Contract`, `Identifier`, ...).
    pub tag: String,

    /// Attribute map attached to the node.
    pub attributes: BTreeMap<String, Value>,

    /// Arena indices of the node's children.
    pub children: Vec<usize>,
}

impl AstNode {
    fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Owned, indexed rendition of the legacy abstract-syntax output.
///
/// Nodes live in an arena and link to children by index, so
/// traversals never borrow into the JSON document.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<AstNode>,
}

impl SyntaxTree {
    /// Build a tree from the compiler's syntax-tree JSON.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::default();
        tree.add(value);
        tree
    }

    fn add(&mut self, value: &Value) -> usize {
        let tag = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let attributes = value
            .get("attributes")
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let index = self.nodes.len();
        self.nodes.push(AstNode {
            tag,
            attributes,
            children: Vec::new(),
        });

        if let Some(children) = value.get("children").and_then(Value::as_array) {
            for child in children {
                let child_index = self.add(child);
                self.nodes[index].children.push(child_index);
            }
        }
        index
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `index`, when present.
    pub fn node(&self, index: usize) -> Option<&AstNode> {
        self.nodes.get(index)
    }

    /// Root node, when the tree is non-empty.
    pub fn root(&self) -> Option<&AstNode> {
        self.nodes.first()
    }

    /// Names of contracts not marked abstract, in document order.
    pub fn concrete_contracts(&self) -> Vec<String> {
        let mut names = Vec::new();
        if !self.nodes.is_empty() {
            self.collect_concrete(0, &mut names);
        }
        names
    }

    fn collect_concrete(&self, index: usize, names: &mut Vec<String>) {
        let node = &self.nodes[index];
        for &child in &node.children {
            self.collect_concrete(child, names);
        }
        if node.tag == "Contract" && !self.is_abstract(index) {
            if let Some(name) = node.attribute_str("name") {
                names.push(name.to_string());
            }
        }
    }

    /// A contract is abstract when its node says so directly, or
    /// when a child marks it: an `Identifier` valued `abstract` on
    /// older compilers, a `UserDefinedTypeName` named `abstract` on
    /// newer ones.
    fn is_abstract(&self, index: usize) -> bool {
        let node = &self.nodes[index];
        if node.attribute_str("name") == Some("abstract") {
            return true;
        }
        node.children.iter().any(|&child| {
            let child = &self.nodes[child];
            match child.tag.as_str() {
                "Identifier" => child.attribute_str("value") == Some("abstract"),
                "UserDefinedTypeName" => child.attribute_str("name") == Some("abstract"),
                _ => false,
            }
        })
    }
}
