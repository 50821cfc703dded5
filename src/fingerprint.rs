//! Hashed atom-pair fingerprints.
//!
//! Every pair of heavy atoms in the same connected component contributes one
//! bit: the two atom invariants and the shortest-path distance between them are
//! packed into a pair code, hashed, and folded into [`FINGERPRINT_SIZE`] bits.
//! The hash is fixed (FNV-1a) so a fingerprint means the same thing across
//! processes and builds, which the serialized models depend on.

use crate::{Element, FeatureExtractionError, Molecule};
use petgraph::algo::dijkstra;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::*;

/// Name of the one fingerprint family this crate computes.
pub const FINGERPRINT_KIND: &str = "atompair";

/// Number of bits in every fingerprint.
pub const FINGERPRINT_SIZE: usize = 2048;

const MAX_DEGREE: usize = 7;
const MAX_PI_ELECTRONS: usize = 3;
const MAX_DISTANCE: u32 = 30;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A fixed-length fingerprint, one `0.0`/`1.0` feature per bit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FingerprintVector(Vec<f32>);

impl FingerprintVector {
    fn zeros() -> Self {
        Self(vec![0.0; FINGERPRINT_SIZE])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Indices of the bits that are set, in increasing order.
    pub fn on_bits(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &value)| value != 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().filter(|&&value| value != 0.0).count()
    }

    /// Tanimoto similarity between two fingerprints; two empty fingerprints are identical.
    pub fn tanimoto(&self, other: &Self) -> f64 {
        let (mut both, mut either) = (0usize, 0usize);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            let (a, b) = (*a != 0.0, *b != 0.0);
            if a && b {
                both += 1;
            }
            if a || b {
                either += 1;
            }
        }
        if either == 0 {
            1.0
        } else {
            both as f64 / either as f64
        }
    }
}

impl From<Vec<f32>> for FingerprintVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Packs (atomic number, heavy degree, pi electrons) into 13 bits.
fn atom_code(molecule: &Molecule, node: NodeIndex) -> u64 {
    let atom = molecule.graph()[node];
    let degree = molecule.heavy_degree(node).min(MAX_DEGREE) as u64;
    let pi = molecule.pi_electrons(node).min(MAX_PI_ELECTRONS) as u64;
    atom.element.atomic_number() as u64 | (degree << 8) | (pi << 11)
}

fn pair_code(code_a: u64, code_b: u64, distance: u32) -> u64 {
    let (low, high) = if code_a <= code_b {
        (code_a, code_b)
    } else {
        (code_b, code_a)
    };
    let distance = distance.min(MAX_DISTANCE) as u64;
    low | (distance << 13) | (high << 18)
}

fn fnv1a(value: u64) -> u64 {
    value.to_le_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ *byte as u64).wrapping_mul(FNV_PRIME)
    })
}

/// Compute the atom-pair fingerprint of an already parsed molecule.
///
/// A molecule with fewer than two heavy atoms has no pairs and yields an
/// all-zero fingerprint; that is a valid result, not a failure.
pub fn atom_pair_fingerprint(molecule: &Molecule) -> FingerprintVector {
    let graph = molecule.graph();
    let heavy: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&n| graph[n].element != Element::H)
        .collect();
    let codes: Vec<u64> = heavy.iter().map(|&n| atom_code(molecule, n)).collect();

    let mut fingerprint = FingerprintVector::zeros();
    for (i, &start) in heavy.iter().enumerate() {
        let distances = dijkstra(graph, start, None, |_| 1u32);
        for (j, &end) in heavy.iter().enumerate().skip(i + 1) {
            // Atoms in different components never pair.
            let Some(&distance) = distances.get(&end) else {
                continue;
            };
            let bit = (fnv1a(pair_code(codes[i], codes[j], distance)) % FINGERPRINT_SIZE as u64) as usize;
            fingerprint.0[bit] = 1.0;
        }
    }
    fingerprint
}

/// Parse `smiles` and compute its fingerprint.
///
/// Parsing failures come back as a [`FeatureExtractionError`] so a caller can
/// tell a rejected molecule apart from a valid one whose fingerprint is empty.
pub fn fingerprint_smiles(smiles: &str) -> Result<FingerprintVector, FeatureExtractionError> {
    let molecule = Molecule::from_smiles(smiles).map_err(|source| {
        FeatureExtractionError::InvalidSmiles {
            smiles: smiles.to_owned(),
            source,
        }
    })?;
    let fingerprint = atom_pair_fingerprint(&molecule);
    debug!(
        "Fingerprinted {smiles}: {} of {} bits set",
        fingerprint.count_ones(),
        fingerprint.len()
    );
    Ok(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        for smiles in ["CCO", "c1ccccc1", "CN1C=NC2=C1C(=O)N(C(=O)N2C)C"] {
            let first = fingerprint_smiles(smiles).unwrap();
            let second = fingerprint_smiles(smiles).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.len(), FINGERPRINT_SIZE);
        }
    }

    #[test]
    fn test_fingerprint_ignores_atom_order() {
        // The same molecule written two ways has the same pairs.
        let a = fingerprint_smiles("OCC").unwrap();
        let b = fingerprint_smiles("CCO").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tanimoto(&b), 1.0);
    }

    #[test]
    fn test_fingerprint_bit_counts() {
        // Ethanol has three heavy-atom pairs, all distinct.
        let ethanol = fingerprint_smiles("CCO").unwrap();
        assert_eq!(ethanol.count_ones(), 3);

        // Benzene's 15 pairs collapse to three distances between identical atoms.
        let benzene = fingerprint_smiles("c1ccccc1").unwrap();
        assert_eq!(benzene.count_ones(), 3);
    }

    #[test]
    fn test_single_atom_is_zero_not_error() {
        let methane = fingerprint_smiles("C").unwrap();
        assert_eq!(methane.count_ones(), 0);
        assert_eq!(methane.len(), FINGERPRINT_SIZE);

        let error = fingerprint_smiles("invalid_garbage").unwrap_err();
        assert!(matches!(error, FeatureExtractionError::InvalidSmiles { .. }));
    }

    #[test]
    fn test_crowded_atom_is_capped() {
        let fingerprint = fingerprint_smiles(&format!("C{}", "(#C)".repeat(130))).unwrap();
        // The hub pairs with each identical neighbour, and the neighbours with each other.
        assert_eq!(fingerprint.on_bits(), vec![692, 812]);
    }

    #[test]
    fn test_disconnected_components_do_not_pair() {
        let salt = fingerprint_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(salt.count_ones(), 0);
    }

    #[test]
    fn test_different_molecules_differ() {
        let ethanol = fingerprint_smiles("CCO").unwrap();
        let benzene = fingerprint_smiles("c1ccccc1").unwrap();
        assert_ne!(ethanol, benzene);
        assert!(ethanol.tanimoto(&benzene) < 1.0);
        assert_eq!(ethanol.on_bits().len(), ethanol.count_ones());
    }
}
