//! Certificate chain reconstruction.
//!
//! Turns an unordered bag of certificates into a forest of issuer → subject
//! trees, linking certificates purely by subject/issuer name hashes. Nothing
//! here checks signatures, validity periods or trust; the forest only reflects
//! which of the supplied certificates names which other one as its issuer.
//!
//! Construction uses an arena keyed by subject hash. A node can be created as
//! an unresolved placeholder when a certificate names an issuer that has not
//! been scanned yet; it is resolved in place once that issuer shows up. The
//! parent links needed to classify roots live in a side map that is dropped
//! before the forest is returned, so the output type has no parent field.
//!
//! Cyclic issuer references (A issued by B, B issued by A) are not detected.
//! Every member of such a cycle has a resolved parent, so none of them becomes
//! a root and none is reachable from one.

use std::collections::HashMap;
use std::fmt;

use crate::domain::crypto::{CertificateLike, ChainEntry, NameHash};

/// A resolved certificate and the certificates it issued.
pub struct ChainNode<'a, E: ChainEntry> {
    entry: &'a E,
    cert: &'a E::Cert,
    subject: NameHash,
    children: Vec<ChainNode<'a, E>>,
}

impl<'a, E: ChainEntry> ChainNode<'a, E> {
    /// The input record this node was resolved from.
    #[must_use]
    pub fn entry(&self) -> &'a E {
        self.entry
    }

    #[must_use]
    pub fn certificate(&self) -> &'a E::Cert {
        self.cert
    }

    #[must_use]
    pub fn subject_hash(&self) -> NameHash {
        self.subject
    }

    /// Issued certificates, in the order they were scanned.
    #[must_use]
    pub fn children(&self) -> &[ChainNode<'a, E>] {
        &self.children
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ChainNode::subtree_size)
            .sum::<usize>()
    }
}

impl<E: ChainEntry> fmt::Debug for ChainNode<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainNode")
            .field("subject", &self.subject)
            .field("children", &self.children)
            .finish()
    }
}

struct ArenaNode<'a, E: ChainEntry> {
    subject: NameHash,
    resolved: Option<(&'a E, &'a E::Cert)>,
    children: Vec<usize>,
}

struct Arena<'a, E: ChainEntry> {
    nodes: Vec<ArenaNode<'a, E>>,
    by_subject: HashMap<NameHash, usize>,
}

impl<'a, E: ChainEntry> Arena<'a, E> {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            by_subject: HashMap::new(),
        }
    }

    /// Index of the node for `subject`, creating a placeholder if needed.
    fn node_for(&mut self, subject: NameHash) -> usize {
        if let Some(&idx) = self.by_subject.get(&subject) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            subject,
            resolved: None,
            children: Vec::new(),
        });
        self.by_subject.insert(subject, idx);
        idx
    }

    fn is_resolved(&self, idx: usize) -> bool {
        self.nodes[idx].resolved.is_some()
    }

    fn materialize(&self, idx: usize) -> Option<ChainNode<'a, E>> {
        let node = &self.nodes[idx];
        let (entry, cert) = node.resolved?;
        Some(ChainNode {
            entry,
            cert,
            subject: node.subject,
            children: node
                .children
                .iter()
                .filter_map(|&child| self.materialize(child))
                .collect(),
        })
    }
}

/// Rebuild issuer/subject trees from an unordered list of entries.
///
/// Entries without a certificate are skipped. When two certificates share a
/// subject hash the first one wins and later ones are ignored entirely.
/// Roots are returned in the order their certificates were first resolved.
pub fn build_chain_forest<E: ChainEntry>(entries: &[E]) -> Vec<ChainNode<'_, E>> {
    let mut arena = Arena::new();
    // Transient parent links, only used to classify roots below.
    let mut parents: HashMap<usize, usize> = HashMap::new();
    let mut resolution_order = Vec::new();

    for entry in entries {
        let Some(cert) = entry.certificate() else {
            continue;
        };
        let me = arena.node_for(cert.subject_hash());
        if arena.is_resolved(me) {
            log::debug!(
                "ignoring duplicate certificate for subject {:?}",
                cert.subject_hash()
            );
            continue;
        }
        arena.nodes[me].resolved = Some((entry, cert));
        resolution_order.push(me);

        if !cert.is_self_signed() {
            let parent = arena.node_for(cert.issuer_hash());
            arena.nodes[parent].children.push(me);
            parents.insert(me, parent);
        }
    }

    let roots: Vec<usize> = resolution_order
        .into_iter()
        .filter(|idx| match parents.get(idx) {
            Some(&parent) => !arena.is_resolved(parent),
            None => true,
        })
        .collect();
    drop(parents);

    roots
        .into_iter()
        .filter_map(|idx| arena.materialize(idx))
        .collect()
}
