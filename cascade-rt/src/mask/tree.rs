//! Mask trees and the operations defined on them.

// Layer 1: Standard library imports
use std::collections::BTreeMap;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
// (none)

/// A nested mask over `dataset → entity-group → … → attribute` paths.
///
/// In JSON a mask node is either `null` ("this node in full", a leaf) or an
/// object mapping child names to mask nodes. An empty object selects
/// nothing.
///
/// # Example
///
/// ```rust
/// use cascade_rt::mask::MaskTree;
///
/// let mask: MaskTree = serde_json::from_str(r#"{"roads": {"road_segments": null}}"#).unwrap();
/// assert!(mask.has_leaf());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaskTree {
    /// JSON `null`: the whole subtree at this node.
    Full,
    /// An object node: named children, each carrying its own mask.
    Branches(BTreeMap<String, MaskTree>),
}

impl MaskTree {
    /// Build a branch node from `(name, child)` pairs.
    pub fn from_pairs<K: Into<String>, I: IntoIterator<Item = (K, MaskTree)>>(pairs: I) -> Self {
        MaskTree::Branches(
            pairs
                .into_iter()
                .map(|(key, child)| (key.into(), child))
                .collect(),
        )
    }

    /// Whether at least one leaf path exists below this node.
    ///
    /// `Full` is itself a leaf; a branch has a leaf iff any child does, so
    /// empty objects (at any depth) select nothing.
    pub fn has_leaf(&self) -> bool {
        match self {
            MaskTree::Full => true,
            MaskTree::Branches(children) => children.values().any(MaskTree::has_leaf),
        }
    }
}

/// The publish/subscribe mask pair a model declares at registration.
///
/// `None` means "no constraint" and behaves as [`MaskTree::Full`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMask {
    #[serde(rename = "pub", default)]
    pub publish: Option<MaskTree>,
    #[serde(rename = "sub", default)]
    pub subscribe: Option<MaskTree>,
}

fn overlap(left: &MaskTree, right: &MaskTree) -> bool {
    match (left, right) {
        (MaskTree::Full, other) | (other, MaskTree::Full) => other.has_leaf(),
        (MaskTree::Branches(left), MaskTree::Branches(right)) => left
            .iter()
            .any(|(key, sub_left)| right.get(key).is_some_and(|sub_right| overlap(sub_left, sub_right))),
    }
}

/// Whether a publish mask and a subscribe mask share at least one leaf
/// path. `None` masks are unconstrained and match any non-empty mask.
pub fn masks_overlap(publish: Option<&MaskTree>, subscribe: Option<&MaskTree>) -> bool {
    let publish = publish.unwrap_or(&MaskTree::Full);
    let subscribe = subscribe.unwrap_or(&MaskTree::Full);
    overlap(publish, subscribe)
}

/// Parse a raw JSON value into a mask tree, rejecting any shape that is not
/// a nested object-or-null structure.
pub fn parse_mask(value: &Value) -> Result<MaskTree, serde_json::Error> {
    serde_json::from_value(value.clone())
}

/// Filter a nested update dictionary down to the leaves selected by `mask`.
///
/// `Full` keeps the whole subtree. A branch node retains only the keys it
/// names, each filtered recursively. Scalars reached while the mask still
/// has depth are kept as-is (the mask is a prefix selection).
pub fn filter_value(data: &Value, mask: &MaskTree) -> Value {
    match (data, mask) {
        (data, MaskTree::Full) => data.clone(),
        (Value::Object(entries), MaskTree::Branches(children)) => {
            let filtered = entries
                .iter()
                .filter_map(|(key, value)| {
                    children
                        .get(key)
                        .map(|child| (key.clone(), filter_value(value, child)))
                })
                .collect();
            Value::Object(filtered)
        }
        (data, MaskTree::Branches(_)) => data.clone(),
    }
}
