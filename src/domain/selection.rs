//! Certificate selection over a reconstructed chain forest.
//!
//! Each root is flattened in pre-order and the result reversed, which gives
//! leaf-first order for a linear chain. A root with several children (cross
//! signed intermediates, sibling leaves) is flattened the same way and does
//! not get a topological leaf-first order; `Leaf` then picks whatever ends up
//! first.

use crate::domain::chain::{build_chain_forest, ChainNode};
use crate::domain::crypto::{CertificateLike, ChainEntry};
use crate::domain::types::CertSelectMode;

fn pre_order<'a, E: ChainEntry>(node: &ChainNode<'a, E>, out: &mut Vec<&'a E>) {
    out.push(node.entry());
    for child in node.children() {
        pre_order(child, out);
    }
}

/// Flatten one root into its reversed pre-order sequence.
#[must_use]
pub fn flatten_chain<'a, E: ChainEntry>(root: &ChainNode<'a, E>) -> Vec<&'a E> {
    let mut out = Vec::with_capacity(root.subtree_size());
    pre_order(root, &mut out);
    out.reverse();
    out
}

/// Apply `mode` to every root of the forest and concatenate in root order.
#[must_use]
pub fn select_from_forest<'a, E: ChainEntry>(
    roots: &[ChainNode<'a, E>],
    mode: CertSelectMode,
) -> Vec<&'a E> {
    roots
        .iter()
        .flat_map(|root| {
            let chain = flatten_chain(root);
            match mode {
                CertSelectMode::Leaf => chain.into_iter().take(1).collect::<Vec<_>>(),
                CertSelectMode::NoRoot => chain
                    .into_iter()
                    .filter(|e| e.certificate().is_some_and(|c| !c.is_self_signed()))
                    .collect(),
                CertSelectMode::All => chain,
            }
        })
        .collect()
}

/// Reconstruct chains from `entries` and select certificates with `mode`.
#[must_use]
pub fn select_certificates<E: ChainEntry>(entries: &[E], mode: CertSelectMode) -> Vec<&E> {
    let forest = build_chain_forest(entries);
    let selected = select_from_forest(&forest, mode);
    log::debug!(
        "certificate selection ({mode}): {} input, {} chain(s), {} selected",
        entries.len(),
        forest.len(),
        selected.len()
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::tests::{FakeBag, FakeCert, A, A2, B, B2, C, D};
    use std::collections::HashSet;

    fn subjects(list: &[&FakeCert]) -> Vec<&'static str> {
        list.iter().map(|c| c.subject).collect()
    }

    #[test]
    fn test_leaf_mode_picks_leaf() {
        let out = select_certificates(&[B, C, D, A], CertSelectMode::Leaf);
        assert_eq!(subjects(&out), ["d"]);
    }

    #[test]
    fn test_no_root_mode_drops_self_signed() {
        let out = select_certificates(&[B, C, D, A], CertSelectMode::NoRoot);
        assert_eq!(subjects(&out), ["d", "c", "b"]);

        // without the root present the chain is rooted at an intermediate
        let out = select_certificates(&[C, B, D], CertSelectMode::NoRoot);
        assert_eq!(subjects(&out), ["d", "c", "b"]);
    }

    #[test]
    fn test_all_mode_is_leaf_to_root() {
        let out = select_certificates(&[B, C, D, A], CertSelectMode::All);
        assert_eq!(subjects(&out), ["d", "c", "b", "a"]);
    }

    #[test]
    fn test_any_input_order_gives_same_chain_order() {
        for order in [[A, B, C, D], [D, C, B, A], [C, A, D, B], [B, D, A, C]] {
            assert_eq!(
                subjects(&select_certificates(&order, CertSelectMode::All)),
                ["d", "c", "b", "a"]
            );
            assert_eq!(
                subjects(&select_certificates(&order, CertSelectMode::NoRoot)),
                ["d", "c", "b"]
            );
            assert_eq!(
                subjects(&select_certificates(&order, CertSelectMode::Leaf)),
                ["d"]
            );
        }
    }

    #[test]
    fn test_leaf_mode_yields_one_per_chain() {
        let out = select_certificates(&[A, C, A2, B, D, B2], CertSelectMode::Leaf);
        assert_eq!(subjects(&out), ["d", "B"]);

        let x = FakeCert::new("x", "x");
        let y = FakeCert::new("y", "y");
        let input = [x, y];
        let out = select_certificates(&input, CertSelectMode::Leaf);
        assert_eq!(subjects(&out), ["x", "y"]);
    }

    #[test]
    fn test_no_root_length_is_all_minus_self_signed() {
        let input = [A, C, A2, B, D, B2];
        let all = select_certificates(&input, CertSelectMode::All);
        let no_root = select_certificates(&input, CertSelectMode::NoRoot);
        let self_signed = input.iter().filter(|c| c.is_self_signed()).count();
        assert_eq!(no_root.len(), all.len() - self_signed);
        assert!(no_root.iter().all(|c| !c.is_self_signed()));
    }

    #[test]
    fn test_modes_are_nested_subsets() {
        let c2 = FakeCert::new("c2", "b");
        let orphan = FakeCert::new("o", "missing");
        let input = [A, C, A2, c2, B, orphan, D, B2];
        let set = |mode| -> HashSet<&'static str> {
            select_certificates(&input, mode)
                .into_iter()
                .map(|c| c.subject)
                .collect()
        };
        let leaf = set(CertSelectMode::Leaf);
        let no_root = set(CertSelectMode::NoRoot);
        let all = set(CertSelectMode::All);
        assert!(leaf.is_subset(&no_root));
        assert!(no_root.is_subset(&all));
        assert_eq!(all.len(), input.len());
    }

    #[test]
    fn test_branching_chain_uses_reversed_pre_order() {
        let c1 = FakeCert::new("c1", "b");
        let c2 = FakeCert::new("c2", "b");
        // pre-order: a, b, c1, c2 -> reversed: c2, c1, b, a
        let input = [A, B, c1, c2];
        let out = select_certificates(&input, CertSelectMode::All);
        assert_eq!(subjects(&out), ["c2", "c1", "b", "a"]);
        let out = select_certificates(&input, CertSelectMode::Leaf);
        assert_eq!(subjects(&out), ["c2"]);
    }

    #[test]
    fn test_bags_select_the_wrappers() {
        let input = [FakeBag(Some(B)), FakeBag(None), FakeBag(Some(A))];
        let out = select_certificates(&input, CertSelectMode::All);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].0.map(|c| c.subject), Some("b"));
        assert_eq!(out[1].0.map(|c| c.subject), Some("a"));
    }

    #[test]
    fn test_empty_input_selects_nothing() {
        let out = select_certificates::<FakeCert>(&[], CertSelectMode::All);
        assert!(out.is_empty());
    }
}
