use std::collections::VecDeque;

use log::{debug, trace};

use crate::tools::freq_count::ByteFrequencyTable;

/// A node of the code tree. Internal nodes own both children outright.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum HuffmanNode {
    Leaf {
        byte: u8,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<HuffmanNode>,
        right: Box<HuffmanNode>,
    },
}

impl HuffmanNode {
    pub fn weight(&self) -> u64 {
        match self {
            HuffmanNode::Leaf { weight, .. } | HuffmanNode::Internal { weight, .. } => *weight,
        }
    }

    /// Distance from this node to its deepest leaf.
    pub fn depth(&self) -> usize {
        match self {
            HuffmanNode::Leaf { .. } => 0,
            HuffmanNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A finished code tree plus the order its leaves were sorted in. The code table section of
/// the archive is written in that order.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    pub root: HuffmanNode,
    /// Byte values by ascending weight (ties by ascending byte value).
    pub leaf_order: Vec<u8>,
}

impl HuffmanTree {
    /// Number of distinct byte values carrying a code.
    pub fn letter_count(&self) -> usize {
        self.leaf_order.len()
    }
}

/// Take the lighter of the two queue fronts. On equal weights the internal node wins.
fn take_lightest(
    leaves: &mut VecDeque<HuffmanNode>,
    internal: &mut VecDeque<HuffmanNode>,
) -> Option<HuffmanNode> {
    match (leaves.front(), internal.front()) {
        (Some(leaf), Some(node)) if leaf.weight() < node.weight() => leaves.pop_front(),
        (Some(_), None) => leaves.pop_front(),
        _ => internal.pop_front(),
    }
}

/// Build the code tree from a frequency table with the two-queue merge. Returns None when the
/// table is empty.
///
/// Leaves are sorted once. Every merged node is at least as heavy as the one merged before it,
/// so appending to the back of the internal queue keeps that queue sorted as well, and the two
/// lightest nodes are always at the queue fronts.
pub fn build_tree(freqs: &ByteFrequencyTable) -> Option<HuffmanTree> {
    let mut sorted: Vec<HuffmanNode> = freqs
        .present()
        .map(|(byte, weight)| HuffmanNode::Leaf { byte, weight })
        .collect();
    // Stable, so equal weights stay in byte order
    sorted.sort_by_key(HuffmanNode::weight);

    let leaf_order: Vec<u8> = sorted
        .iter()
        .filter_map(|node| match node {
            HuffmanNode::Leaf { byte, .. } => Some(*byte),
            HuffmanNode::Internal { .. } => None,
        })
        .collect();
    let letter_count = leaf_order.len();
    debug!("Building code tree for {} symbols", letter_count);

    if letter_count <= 1 {
        // Nothing to merge: either no tree at all, or a lone leaf that gets the 1 bit code.
        return sorted.pop().map(|root| HuffmanTree { root, leaf_order });
    }

    let mut leaves: VecDeque<HuffmanNode> = sorted.into();
    let mut internal: VecDeque<HuffmanNode> = VecDeque::with_capacity(letter_count - 1);

    for _ in 1..letter_count {
        let (Some(left), Some(right)) = (
            take_lightest(&mut leaves, &mut internal),
            take_lightest(&mut leaves, &mut internal),
        ) else {
            break;
        };
        trace!("Merging weights {} and {}", left.weight(), right.weight());
        internal.push_back(HuffmanNode::Internal {
            weight: left.weight() + right.weight(),
            left: Box::new(left),
            right: Box::new(right),
        });
    }

    let root = internal.pop_front()?;
    debug!("Code tree weight {}, depth {}", root.weight(), root.depth());
    Some(HuffmanTree { root, leaf_order })
}
