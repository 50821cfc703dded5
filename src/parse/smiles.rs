use crate::{Atom, Bond, Element, MoleculeGraph};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_opt, map_res, opt, recognize},
    sequence::{pair, preceded, tuple},
    IResult,
};
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Unknown atom symbol '{0}' at position {1}")]
    UnknownAtom(String, usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Malformed bracket atom '[{0}]' at position {1}")]
    MalformedBracketAtom(String, usize),
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Empty branch '()' at position {0}")]
    EmptyBranch(usize),
    #[error("{0} branch(es) opened with '(' are never closed")]
    UnclosedBranch(usize),
    #[error("Bond '{0}' at position {1} without a current atom")]
    BondNoCurrentAtom(char, usize),
    #[error("Bond '{0}' at position {1} is not followed by an atom")]
    DanglingBond(char, usize),
    #[error("Ring closure '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u8, usize),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingLabel(usize),
    #[error("Ring closure {0} at position {1} bonds an atom to itself")]
    RingSelfBond(u8, usize),
    #[error("Ring closure {0} at position {1} duplicates an existing bond")]
    RingDuplicateBond(u8, usize),
    #[error("Ring closure {0} at position {1} has conflicting bond symbols")]
    RingBondConflict(u8, usize),
    #[error("Ring {0} opened at position {1} is never closed")]
    UnclosedRing(u8, usize),
}

/// Parses a SMILES string into a MoleculeGraph.
///
/// Stereochemistry (`@`, `/`, `\`) is accepted and dropped; the graph only keeps
/// atoms, charges, hydrogens and bond orders.
///
/// # Arguments
///
/// * `smiles` - The SMILES string to parse.
///
/// # Returns
///
/// * `Result<MoleculeGraph, SmilesError>` - The parsed molecular graph, or the first
///   syntax error found.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let graph = SmilesParser::new(smiles).parse()?;
    trace!(
        "Parsed {smiles} into {} atoms and {} bonds",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// A bond symbol waiting for the next atom or ring closure.
#[derive(Debug, Clone, Copy)]
struct PendingBond {
    bond: Bond,
    symbol: char,
    position: usize,
}

/// The atom that opened a ring, along with the bond written at the opening.
#[derive(Debug, Clone, Copy)]
struct RingOpening {
    atom: NodeIndex,
    bond: Option<PendingBond>,
    position: usize,
}

struct SmilesParser<'a> {
    smiles: &'a str,
    chars: Vec<char>,
    graph: MoleculeGraph,
    current_atom: Option<NodeIndex>,
    pending_bond: Option<PendingBond>,
    branch_stack: Vec<Option<NodeIndex>>,
    ring_map: BTreeMap<u8, RingOpening>,
}

impl<'a> SmilesParser<'a> {
    fn new(smiles: &'a str) -> Self {
        Self {
            smiles,
            chars: smiles.chars().collect(),
            graph: MoleculeGraph::new_undirected(),
            current_atom: None,
            pending_bond: None,
            branch_stack: Vec::new(),
            ring_map: BTreeMap::new(),
        }
    }

    fn parse(mut self) -> Result<MoleculeGraph, SmilesError> {
        if self.smiles.is_empty() {
            return Err(SmilesError::Empty);
        }

        let mut i = 0;
        while i < self.chars.len() {
            let c = self.chars[i];
            match c {
                '(' => {
                    if self.current_atom.is_none() {
                        return Err(SmilesError::BranchNoCurrentAtom(i));
                    }
                    self.check_no_pending_bond()?;
                    if self.chars.get(i + 1) == Some(&')') {
                        return Err(SmilesError::EmptyBranch(i));
                    }
                    self.branch_stack.push(self.current_atom);
                    i += 1;
                }
                ')' => {
                    self.check_no_pending_bond()?;
                    match self.branch_stack.pop() {
                        Some(atom) => self.current_atom = atom,
                        None => return Err(SmilesError::BranchEndNoStart(i)),
                    }
                    i += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.current_atom.is_none() {
                        return Err(SmilesError::BondNoCurrentAtom(c, i));
                    }
                    self.check_no_pending_bond()?;
                    let bond = match c {
                        '=' => Bond::Double,
                        '#' => Bond::Triple,
                        '$' => Bond::Quadruple,
                        ':' => Bond::Aromatic,
                        // Directional bonds only carry stereo information.
                        _ => Bond::Single,
                    };
                    self.pending_bond = Some(PendingBond {
                        bond,
                        symbol: c,
                        position: i,
                    });
                    i += 1;
                }
                '%' => {
                    let digits: String = self.chars.iter().skip(i + 1).take(2).collect();
                    if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                        return Err(SmilesError::IncompleteRingLabel(i));
                    }
                    let label = digits
                        .parse::<u8>()
                        .map_err(|_| SmilesError::IncompleteRingLabel(i))?;
                    self.ring_closure(label, i)?;
                    i += 3;
                }
                '0'..='9' => {
                    let label = c as u8 - b'0';
                    self.ring_closure(label, i)?;
                    i += 1;
                }
                '[' => {
                    let end = self.chars[i..]
                        .iter()
                        .position(|&x| x == ']')
                        .map(|offset| i + offset)
                        .ok_or(SmilesError::UnclosedBracket(i))?;
                    let content: String = self.chars[i + 1..end].iter().collect();
                    let atom = parse_bracket_atom(&content)
                        .map_err(|_| SmilesError::MalformedBracketAtom(content.clone(), i))?;
                    self.add_atom(atom);
                    i = end + 1;
                }
                '.' => {
                    // A new disconnected component starts here.
                    self.check_no_pending_bond()?;
                    self.current_atom = None;
                    i += 1;
                }
                c if c.is_ascii_alphabetic() => {
                    // Two-letter organic subset atoms are Cl and Br.
                    let two: String = self.chars.iter().skip(i).take(2).collect();
                    let (symbol, width) = if two == "Cl" || two == "Br" {
                        (two, 2)
                    } else {
                        (c.to_string(), 1)
                    };
                    let (element, aromatic) = Element::from_organic_subset(&symbol)
                        .ok_or_else(|| SmilesError::UnknownAtom(symbol.clone(), i))?;
                    self.add_atom(Atom::organic(element, aromatic));
                    i += width;
                }
                _ => return Err(SmilesError::UnexpectedCharacter(c, i)),
            }
        }

        if let Some(pending) = self.pending_bond {
            return Err(SmilesError::DanglingBond(pending.symbol, pending.position));
        }
        if !self.branch_stack.is_empty() {
            return Err(SmilesError::UnclosedBranch(self.branch_stack.len()));
        }
        if let Some((&label, opening)) = self.ring_map.iter().next() {
            return Err(SmilesError::UnclosedRing(label, opening.position));
        }
        if self.graph.node_count() == 0 {
            return Err(SmilesError::Empty);
        }
        Ok(self.graph)
    }

    fn check_no_pending_bond(&self) -> Result<(), SmilesError> {
        match self.pending_bond {
            Some(pending) => Err(SmilesError::DanglingBond(pending.symbol, pending.position)),
            None => Ok(()),
        }
    }

    /// Pick the bond between two atoms: an explicit symbol wins, otherwise two
    /// aromatic atoms share an aromatic bond and anything else is single.
    fn bond_between(&self, a: NodeIndex, b: NodeIndex, explicit: Option<PendingBond>) -> Bond {
        match explicit {
            Some(pending) => pending.bond,
            None if self.graph[a].is_aromatic() && self.graph[b].is_aromatic() => Bond::Aromatic,
            None => Bond::Single,
        }
    }

    fn add_atom(&mut self, atom: Atom) {
        let new_atom = self.graph.add_node(atom);
        if let Some(prev_atom) = self.current_atom {
            let bond = self.bond_between(prev_atom, new_atom, self.pending_bond);
            self.graph.add_edge(prev_atom, new_atom, bond);
        }
        self.pending_bond = None;
        self.current_atom = Some(new_atom);
    }

    fn ring_closure(&mut self, label: u8, position: usize) -> Result<(), SmilesError> {
        let current = self
            .current_atom
            .ok_or(SmilesError::RingClosureNoCurrentAtom(label, position))?;

        match self.ring_map.remove(&label) {
            Some(opening) => {
                if opening.atom == current {
                    return Err(SmilesError::RingSelfBond(label, position));
                }
                if self.graph.find_edge(opening.atom, current).is_some() {
                    return Err(SmilesError::RingDuplicateBond(label, position));
                }
                let explicit = match (opening.bond, self.pending_bond) {
                    (Some(a), Some(b)) if a.bond != b.bond => {
                        return Err(SmilesError::RingBondConflict(label, position))
                    }
                    (a, b) => b.or(a),
                };
                let bond = self.bond_between(opening.atom, current, explicit);
                self.graph.add_edge(opening.atom, current, bond);
            }
            None => {
                self.ring_map.insert(
                    label,
                    RingOpening {
                        atom: current,
                        bond: self.pending_bond,
                        position,
                    },
                );
            }
        }
        self.pending_bond = None;
        Ok(())
    }
}

/// Parse the inside of a bracket atom: `isotope? symbol chirality? hcount? charge? class?`.
fn parse_bracket_atom(content: &str) -> Result<Atom, nom::Err<nom::error::Error<&str>>> {
    let (_, atom) = all_consuming(bracket_atom)(content)?;
    Ok(atom)
}

fn bracket_atom(input: &str) -> IResult<&str, Atom> {
    map(
        tuple((
            opt(map_res(digit1, str::parse::<u16>)),
            bracket_symbol,
            opt(chirality),
            hydrogen_count,
            charge,
            opt(preceded(char(':'), digit1)),
        )),
        |(isotope, (element, aromatic), _, hydrogens, charge, _)| Atom {
            element,
            aromatic,
            charge,
            isotope,
            explicit_hydrogens: Some(hydrogens),
        },
    )(input)
}

fn bracket_symbol(input: &str) -> IResult<&str, (Element, bool)> {
    alt((
        // Two-letter aromatic symbols such as `se` and `as`.
        map_opt(
            take_while_m_n(2, 2, |c: char| c.is_ascii_lowercase()),
            |s: &str| Element::from_aromatic_symbol(s).map(|e| (e, true)),
        ),
        map_opt(
            recognize(pair(
                satisfy(|c| c.is_ascii_uppercase()),
                satisfy(|c| c.is_ascii_lowercase()),
            )),
            |s: &str| Element::from_symbol(s).map(|e| (e, false)),
        ),
        map_opt(
            take_while_m_n(1, 1, |c: char| c.is_ascii_alphabetic()),
            |s: &str| {
                if s.chars().all(|c| c.is_ascii_uppercase()) {
                    Element::from_symbol(s).map(|e| (e, false))
                } else {
                    Element::from_aromatic_symbol(s).map(|e| (e, true))
                }
            },
        ),
    ))(input)
}

fn chirality(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        char('@'),
        opt(alt((
            recognize(char('@')),
            recognize(pair(
                alt((tag("TH"), tag("AL"), tag("SP"), tag("TB"), tag("OH"))),
                digit1,
            )),
        ))),
    ))(input)
}

fn hydrogen_count(input: &str) -> IResult<&str, u8> {
    map(
        opt(preceded(char('H'), opt(map_res(digit1, str::parse::<u8>)))),
        |count| match count {
            Some(n) => n.unwrap_or(1),
            None => 0,
        },
    )(input)
}

fn charge(input: &str) -> IResult<&str, i8> {
    map(
        opt(alt((
            map(
                pair(one_of("+-"), map_res(digit1, str::parse::<i8>)),
                |(sign, n)| if sign == '-' { -n } else { n },
            ),
            map(tag("++"), |_| 2),
            map(tag("--"), |_| -2),
            map(char('+'), |_| 1),
            map(char('-'), |_| -1),
        ))),
        |charge| charge.unwrap_or(0),
    )(input)
}
