use std::collections::BTreeMap;

use crate::error::{DtbError, SchemaError};
use crate::parser;

/// Handle to a node in the tree arena.
///
/// Identity is positional: ids are assigned in structure-block order and
/// nodes never move once the tree is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// A raw property: a name from the strings block and an opaque payload
/// borrowed from the blob. Typed views live in [`crate::prop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property<'a> {
    pub name: &'a str,
    pub value: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawNode<'a> {
    pub(crate) name: &'a str,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) props: Vec<Property<'a>>,
}

/// A parsed flattened device tree, zero-copy over the input buffer.
///
/// The arena is immutable after parsing. Parent/child/phandle relations
/// are stored as [`NodeId`] indices, so cross-references (which may be
/// cyclic) never create ownership cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fdt<'a> {
    pub(crate) nodes: Vec<RawNode<'a>>,
    pub(crate) phandles: BTreeMap<u32, NodeId>,
}

impl<'a> Fdt<'a> {
    /// Parse a device tree blob.
    pub fn parse(data: &'a [u8]) -> Result<Fdt<'a>, DtbError> {
        parser::parse(data)
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node name. The root node has an empty name.
    pub fn name(&self, id: NodeId) -> &'a str {
        self.nodes[id.0].name
    }

    /// Parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child nodes in structure-block order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    /// Properties in structure-block order.
    pub fn properties(&self, id: NodeId) -> &[Property<'a>] {
        &self.nodes[id.0].props
    }

    /// Slash-separated path from the root, for diagnostics.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(n) = cur {
            parts.push(self.nodes[n.0].name);
            cur = self.nodes[n.0].parent;
        }
        parts.reverse();
        if parts.len() == 1 {
            "/".into()
        } else {
            parts.join("/")
        }
    }

    /// Look up a property by name, `None` if absent.
    pub fn prop(&self, id: NodeId, name: &str) -> Option<&Property<'a>> {
        self.nodes[id.0].props.iter().find(|p| p.name == name)
    }

    /// Whether a node carries a property, regardless of its payload.
    pub fn has_prop(&self, id: NodeId, name: &str) -> bool {
        self.prop(id, name).is_some()
    }

    /// Decode a u32 property, falling back to `default` when absent.
    /// A present property with the wrong size is still a schema mismatch.
    pub fn prop_u32_or(&self, id: NodeId, name: &str, default: u32) -> Result<u32, SchemaError> {
        match self.prop(id, name) {
            Some(p) => p.as_u32(),
            None => Ok(default),
        }
    }

    /// Direct subnode by name, `None` if absent.
    pub fn subnode(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id).find(|&c| self.name(c) == name)
    }

    /// All nodes whose `compatible` string list contains `compat`,
    /// in structure-block order.
    pub fn find_compatible(&self, compat: &str) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| {
                self.prop(id, "compatible")
                    .map(|p| p.value.split(|&b| b == 0).any(|s| s == compat.as_bytes()))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Resolve a phandle token to the node declaring it as its identity.
    ///
    /// The index is built in a second pass after parsing, so forward
    /// references resolve like any other. A missing entry means the
    /// token is dangling; callers must surface that, not default it.
    pub fn node_by_phandle(&self, token: u32) -> Option<NodeId> {
        self.phandles.get(&token).copied()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::BlobBuilder;

    #[test]
    fn paths_and_parents() {
        let blob = BlobBuilder::new()
            .begin_node("")
            .begin_node("soc")
            .begin_node("serial@101f0000")
            .end_node()
            .end_node()
            .end_node()
            .build();

        let fdt = crate::Fdt::parse(&blob).unwrap();
        let soc = fdt.subnode(fdt.root(), "soc").unwrap();
        let serial = fdt.subnode(soc, "serial@101f0000").unwrap();

        assert_eq!(fdt.path(fdt.root()), "/");
        assert_eq!(fdt.path(serial), "/soc/serial@101f0000");
        assert_eq!(fdt.parent(serial), Some(soc));
        assert_eq!(fdt.parent(fdt.root()), None);
    }

    #[test]
    fn compatible_lookup_matches_string_list_entries() {
        let blob = BlobBuilder::new()
            .begin_node("")
            .begin_node("mdp")
            .prop_str_list("compatible", &["qcom,mdss_mdp", "qcom,sde-kms"])
            .end_node()
            .begin_node("other")
            .prop_str_list("compatible", &["acme,widget"])
            .end_node()
            .end_node()
            .build();

        let fdt = crate::Fdt::parse(&blob).unwrap();
        for (compat, hits) in [("qcom,mdss_mdp", 1), ("qcom,sde-kms", 1), ("qcom,mdp", 0)] {
            assert_eq!(fdt.find_compatible(compat).len(), hits, "{compat}");
        }
    }

    #[test]
    fn phandle_resolution_is_two_phase() {
        // The consumer node appears before the node declaring the handle.
        let blob = BlobBuilder::new()
            .begin_node("")
            .begin_node("consumer")
            .prop_u32("some-ref", 7)
            .end_node()
            .begin_node("supplier")
            .prop_u32("phandle", 7)
            .end_node()
            .end_node()
            .build();

        let fdt = crate::Fdt::parse(&blob).unwrap();
        let supplier = fdt.subnode(fdt.root(), "supplier").unwrap();
        assert_eq!(fdt.node_by_phandle(7), Some(supplier));
        assert_eq!(fdt.node_by_phandle(8), None);
    }
}
