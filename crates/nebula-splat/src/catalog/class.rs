//! Splat classes: named groups of primitive layers selected by expression.

use crate::config_tree::ConfigNode;

/// Pairs a primitive with the expression the renderer evaluates to decide
/// whether the layer applies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatClassLayer {
    pub primitive_name: Option<String>,
    pub expression: Option<String>,
}

impl SplatClassLayer {
    /// The expression comes from an `expression` child, or from the node's
    /// own value when the layer is written as a bare scalar.
    pub fn from_config(conf: &ConfigNode) -> Self {
        Self {
            primitive_name: conf.child_value("primitive").map(str::to_string),
            expression: conf
                .child_value("expression")
                .or_else(|| conf.value())
                .map(str::to_string),
        }
    }
}

/// A named set of layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatClass {
    pub name: String,
    pub layers: Vec<SplatClassLayer>,
}

impl SplatClass {
    pub fn from_config(conf: &ConfigNode) -> Self {
        Self {
            name: conf.child_value("name").unwrap_or_default().to_string(),
            layers: conf
                .child_list("layers")
                .iter()
                .map(SplatClassLayer::from_config)
                .collect(),
        }
    }

    /// Not implemented yet: always returns an empty node.
    pub fn to_config(&self) -> ConfigNode {
        ConfigNode::default()
    }
}
