//! Hierarchical key/value configuration tree consumed by the catalog model.
//!
//! A [`ConfigNode`] carries an optional scalar value and an ordered list of
//! keyed children. Documents enter the tree through `serde`: maps become keyed
//! children, sequences become anonymous children, and scalars become the node
//! value.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigTreeError
// ---------------------------------------------------------------------------

/// Errors returned when converting between documents and config trees.
#[derive(Debug, Error)]
pub enum ConfigTreeError {
    /// The document text is not valid RON.
    #[error("failed to parse config document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The tree could not be written as RON.
    #[error("failed to serialize config tree: {0}")]
    Serialize(#[from] ron::Error),
}

// ---------------------------------------------------------------------------
// ConfigNode
// ---------------------------------------------------------------------------

/// One node of a configuration tree.
///
/// Children keep their document order. Several children may share a key;
/// list items have an empty key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigNode {
    key: String,
    value: Option<String>,
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Creates an empty node with the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            children: Vec::new(),
        }
    }

    /// Creates a scalar node.
    pub fn with_value(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: Some(value.to_string()),
            children: Vec::new(),
        }
    }

    /// Parses a RON document into a tree. The returned root has an empty key.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigTreeError> {
        Ok(ron::from_str(text)?)
    }

    /// Writes the tree as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigTreeError> {
        let pretty = ron::ser::PrettyConfig::new();
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The node's own scalar value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    /// Iterates the direct children carrying `key`.
    pub fn children_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ConfigNode> {
        self.children.iter().filter(move |c| c.key == key)
    }

    /// First direct child carrying `key`.
    pub fn child(&self, key: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.key == key)
    }

    /// Children of the first child carrying `key`, or an empty slice.
    pub fn child_list(&self, key: &str) -> &[ConfigNode] {
        self.child(key).map(|c| c.children()).unwrap_or(&[])
    }

    /// Scalar value of the first child carrying `key`.
    pub fn child_value(&self, key: &str) -> Option<&str> {
        self.child(key).and_then(ConfigNode::value)
    }

    /// Parses the value of child `key`.
    ///
    /// Returns `None` when the child is missing or its value does not parse,
    /// so callers can keep their defaults.
    pub fn get<T: FromStr>(&self, key: &str) -> Option<T> {
        self.child_value(key).and_then(|v| v.trim().parse().ok())
    }

    /// Sets child `key` to a scalar, replacing an existing child with that key.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.set_child(ConfigNode::with_value(key, value));
    }

    /// Like [`ConfigNode::set`], but writes nothing for `None`.
    pub fn set_opt<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    /// Inserts `node`, replacing the first child with the same key.
    pub fn set_child(&mut self, node: ConfigNode) {
        match self.children.iter_mut().find(|c| c.key == node.key) {
            Some(existing) => *existing = node,
            None => self.children.push(node),
        }
    }

    /// Appends `node` after the existing children.
    pub fn add(&mut self, node: ConfigNode) {
        self.children.push(node);
    }

    /// Appends `node` under `key`, replacing whatever key it had.
    pub fn add_as(&mut self, key: &str, mut node: ConfigNode) {
        node.key = key.to_string();
        self.children.push(node);
    }

    /// A node is empty when it has neither a value nor children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn scalar(value: impl ToString) -> Self {
        Self::with_value(String::new(), value)
    }
}

// ---------------------------------------------------------------------------
// serde
// ---------------------------------------------------------------------------

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.children.is_empty() {
            return match &self.value {
                Some(value) => serializer.serialize_str(value),
                None => serializer.serialize_unit(),
            };
        }

        if self.children.iter().all(|c| c.key.is_empty()) {
            let mut seq = serializer.serialize_seq(Some(self.children.len()))?;
            for child in &self.children {
                seq.serialize_element(child)?;
            }
            return seq.end();
        }

        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for child in &self.children {
            map.serialize_entry(&child.key, child)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = ConfigNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, a list, or a map of config values")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigNode, E> {
        Ok(ConfigNode::scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<ConfigNode, E> {
        Ok(ConfigNode::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<ConfigNode, E> {
        Ok(ConfigNode::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigNode, D::Error> {
        ConfigNode::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigNode, A::Error> {
        let mut node = ConfigNode::default();
        while let Some(item) = seq.next_element::<ConfigNode>()? {
            node.children.push(item);
        }
        Ok(node)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConfigNode, A::Error> {
        let mut node = ConfigNode::default();
        while let Some((key, mut child)) = map.next_entry::<String, ConfigNode>()? {
            child.key = key;
            node.children.push(child);
        }
        Ok(node)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
