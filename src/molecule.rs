use crate::{parse_smiles, Bond, Element, MoleculeGraph, SmilesError};
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// A parsed molecule together with the SMILES string it came from.
#[derive(Clone)]
pub struct Molecule {
    smiles: String,
    graph: MoleculeGraph,
}

impl Molecule {
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        let graph = parse_smiles(smiles)?;
        Ok(Self {
            smiles: smiles.to_owned(),
            graph,
        })
    }

    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.graph
    }

    /// Number of non-hydrogen atoms.
    pub fn heavy_atom_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|atom| atom.element != Element::H)
            .count()
    }

    /// Number of heavy-atom neighbours of `node`.
    pub fn heavy_degree(&self, node: NodeIndex) -> usize {
        self.graph
            .neighbors(node)
            .filter(|&n| self.graph[n].element != Element::H)
            .count()
    }

    /// Pi electrons on `node`, counted from its multiple and aromatic bonds.
    pub fn pi_electrons(&self, node: NodeIndex) -> usize {
        self.graph
            .edges(node)
            .map(|edge| edge.weight().pi_electrons() as usize)
            .sum()
    }

    /// Hydrogens on `node`: the bracket count if one was written, otherwise
    /// whatever fills the smallest default valence that fits.
    pub fn hydrogen_count(&self, node: NodeIndex) -> u8 {
        let atom = self.graph[node];
        if let Some(explicit) = atom.explicit_hydrogens {
            return explicit;
        }

        let mut used: usize = self
            .graph
            .edges(node)
            .map(|edge| edge.weight().valence_contribution() as usize)
            .sum();
        // An aromatic atom spends one more electron on the ring.
        if atom.aromatic {
            used += 1;
        }
        atom.element
            .default_valences()
            .iter()
            .map(|&valence| valence as usize)
            .find(|&valence| valence >= used)
            .map(|valence| (valence - used) as u8)
            .unwrap_or(0)
    }

    /// Molecular formula in Hill order: C, then H, then the rest alphabetically.
    /// Without carbon, every element (hydrogen included) is alphabetical.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for node in self.graph.node_indices() {
            let atom = self.graph[node];
            *counts.entry(atom.element.symbol()).or_default() += 1;
            let hydrogens = self.hydrogen_count(node) as usize;
            if hydrogens > 0 {
                *counts.entry(Element::H.symbol()).or_default() += hydrogens;
            }
        }

        let mut ordered: Vec<(&str, usize)> = Vec::new();
        if let Some(carbon) = counts.remove("C") {
            ordered.push(("C", carbon));
            if let Some(hydrogen) = counts.remove("H") {
                ordered.push(("H", hydrogen));
            }
        }
        ordered.extend(counts);

        let mut formula = String::new();
        for (symbol, count) in ordered {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        }
        let charge: i32 = self.graph.node_weights().map(|atom| atom.charge as i32).sum();
        match charge {
            0 => {}
            1 => formula.push('+'),
            -1 => formula.push('-'),
            c if c > 0 => formula.push_str(&format!("+{c}")),
            c => formula.push_str(&format!("{c}")),
        }
        formula
    }

    /// Whether any bond in the molecule is aromatic.
    pub fn is_aromatic(&self) -> bool {
        self.graph
            .edge_references()
            .any(|edge| *edge.weight() == Bond::Aromatic)
    }
}

impl Debug for Molecule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Molecule({})", self.smiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula() {
        assert_eq!(Molecule::from_smiles("CCO").unwrap().formula(), "C2H6O");
        assert_eq!(Molecule::from_smiles("c1ccccc1").unwrap().formula(), "C6H6");
        assert_eq!(Molecule::from_smiles("c1ccncc1").unwrap().formula(), "C5H5N");
        assert_eq!(Molecule::from_smiles("c1cc[nH]c1").unwrap().formula(), "C4H5N");
        assert_eq!(Molecule::from_smiles("CC(=O)O").unwrap().formula(), "C2H4O2");
        assert_eq!(Molecule::from_smiles("CC(=O)[O-]").unwrap().formula(), "C2H3O2-");
        assert_eq!(Molecule::from_smiles("O").unwrap().formula(), "H2O");
        assert_eq!(Molecule::from_smiles("[Na+].[Cl-]").unwrap().formula(), "ClNa");
        assert_eq!(
            Molecule::from_smiles("CN1C=NC2=C1C(=O)N(C(=O)N2C)C").unwrap().formula(),
            "C8H10N4O2"
        );
    }

    #[test]
    fn test_atom_invariants() {
        let molecule = Molecule::from_smiles("C=CC#N").unwrap();
        let nodes: Vec<NodeIndex> = molecule.graph().node_indices().collect();
        assert_eq!(molecule.pi_electrons(nodes[0]), 1);
        assert_eq!(molecule.pi_electrons(nodes[2]), 2);
        assert_eq!(molecule.heavy_degree(nodes[1]), 2);
        assert_eq!(molecule.hydrogen_count(nodes[0]), 2);
        assert_eq!(molecule.hydrogen_count(nodes[3]), 0);
        assert_eq!(molecule.heavy_atom_count(), 4);
    }

    #[test]
    fn test_crowded_atoms_do_not_overflow() {
        let crowded = Molecule::from_smiles(&format!("C{}", "(C)".repeat(300))).unwrap();
        assert_eq!(crowded.formula(), "C301H900");
        let hub = crowded.graph().node_indices().next().unwrap();
        assert_eq!(crowded.hydrogen_count(hub), 0);
        assert_eq!(crowded.heavy_degree(hub), 300);

        let triples = Molecule::from_smiles(&format!("C{}", "(#C)".repeat(130))).unwrap();
        let hub = triples.graph().node_indices().next().unwrap();
        assert_eq!(triples.pi_electrons(hub), 260);
    }

    #[test]
    fn test_explicit_hydrogen_atoms() {
        let molecule = Molecule::from_smiles("[H]C([H])([H])[H]").unwrap();
        assert_eq!(molecule.heavy_atom_count(), 1);
        assert_eq!(molecule.formula(), "CH4");
        assert!(!molecule.is_aromatic());
        assert!(Molecule::from_smiles("c1ccccc1").unwrap().is_aromatic());
    }
}
