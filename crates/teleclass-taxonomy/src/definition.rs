//! Building a taxonomy from a nested definition.
//!
//! Top-level items hang off an implicit root. The root is only a
//! construction device: it is never inserted as a node, so a class may be
//! called "root" without clashing with it.

use teleclass_types::TaxonomyNode;

use crate::error::TaxonomyError;
use crate::graph::{GraphBuilder, Taxonomy};

impl Taxonomy {
    /// Build from nested definition items.
    ///
    /// Each item is a bare leaf name, a `{name, description?, children?}`
    /// object, or a single-key `{"<name>": [children...]}` object. A name
    /// that appears more than once refers to the same node.
    ///
    /// Roots are the nodes without parents. A name listed at the top level
    /// that is also some node's child therefore has that parent and is not
    /// a root; its top-level listing only declares it.
    pub fn from_definition(items: &[TaxonomyNode]) -> Result<Self, TaxonomyError> {
        let mut builder = GraphBuilder::default();
        let mut top_level = Vec::new();
        add_items(&mut builder, None, items, &mut top_level)?;

        if builder.len() < 1 {
            return Err(TaxonomyError::TooFewNodes);
        }
        let taxonomy = Taxonomy::from_builder(builder)?;
        if top_level.is_empty() {
            return Err(TaxonomyError::NoTopLevelNodes);
        }
        Ok(taxonomy)
    }
}

fn add_items(
    builder: &mut GraphBuilder,
    parent: Option<usize>,
    items: &[TaxonomyNode],
    top_level: &mut Vec<usize>,
) -> Result<(), TaxonomyError> {
    for item in items {
        let (name, description, children) = match item {
            TaxonomyNode::Leaf(name) => (name.as_str(), None, &[][..]),
            TaxonomyNode::Described {
                name,
                description,
                children,
            } => (name.as_str(), Some(description.as_str()), children.as_slice()),
            TaxonomyNode::Keyed(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((name, children)), None) => {
                        (name.as_str(), Some(""), children.as_slice())
                    }
                    _ => {
                        return Err(TaxonomyError::InvalidDefinition(format!(
                            "keyed node must have exactly one key, got {}",
                            map.len()
                        )))
                    }
                }
            }
        };

        if name.trim().is_empty() {
            return Err(TaxonomyError::InvalidDefinition(
                "node name must not be empty".to_string(),
            ));
        }

        let node = builder.add_node(name);
        if let Some(description) = description {
            builder.set_description(node, description);
        }
        match parent {
            Some(p) => builder.add_edge(p, node),
            None => {
                if !top_level.contains(&node) {
                    top_level.push(node);
                }
            }
        }

        add_items(builder, Some(node), children, top_level)?;
    }
    Ok(())
}
