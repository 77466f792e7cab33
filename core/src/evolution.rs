//! Evolution chain extraction

use crate::models::{ChainLink, EvolutionChain};

/// Flatten an evolution chain into species names, depth-first pre-order:
/// each node before its children, each child subtree in full before the
/// next sibling.
pub fn extract_evolutions(chain: &EvolutionChain) -> Vec<String> {
    let mut evolutions = Vec::new();
    traverse(&chain.chain, &mut evolutions);
    evolutions
}

fn traverse(link: &ChainLink, evolutions: &mut Vec<String>) {
    evolutions.push(link.species.name.clone());
    for next in &link.evolves_to {
        traverse(next, evolutions);
    }
}
