use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The chemical elements the SMILES parser understands.
///
/// The organic subset (B, C, N, O, P, S and the halogens) may be written
/// without brackets; everything else has to appear inside `[...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    H,
    He,
    Li,
    Be,
    B,
    C,
    N,
    O,
    F,
    Ne,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    Ar,
    K,
    Ca,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ga,
    Ge,
    As,
    Se,
    Br,
    Kr,
    Ag,
    Sn,
    Sb,
    Te,
    I,
    Xe,
    Pt,
    Au,
    Hg,
    Pb,
    Bi,
}

use Element::*;

lazy_static! {
    /// Symbol lookup for every known element, keyed by its capitalized symbol.
    static ref SYMBOLS: BTreeMap<&'static str, Element> = {
        let all = [
            H, He, Li, Be, B, C, N, O, F, Ne, Na, Mg, Al, Si, P, S, Cl, Ar, K, Ca, Mn, Fe, Co,
            Ni, Cu, Zn, Ga, Ge, As, Se, Br, Kr, Ag, Sn, Sb, Te, I, Xe, Pt, Au, Hg, Pb, Bi,
        ];
        all.into_iter().map(|e| (e.symbol(), e)).collect()
    };
}

impl Element {
    /// Look up an element by its symbol, e.g. `"Cl"`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS.get(symbol).copied()
    }

    /// Look up an organic subset atom as written outside of brackets.
    ///
    /// Returns the element and whether it was written in aromatic (lowercase) form.
    pub fn from_organic_subset(symbol: &str) -> Option<(Self, bool)> {
        Some(match symbol {
            "B" => (B, false),
            "C" => (C, false),
            "N" => (N, false),
            "O" => (O, false),
            "P" => (P, false),
            "S" => (S, false),
            "F" => (F, false),
            "Cl" => (Cl, false),
            "Br" => (Br, false),
            "I" => (I, false),
            "b" => (B, true),
            "c" => (C, true),
            "n" => (N, true),
            "o" => (O, true),
            "p" => (P, true),
            "s" => (S, true),
            _ => return None,
        })
    }

    /// Look up an aromatic symbol that is only legal inside brackets (`[se]`, `[as]`)
    /// or in the organic subset.
    pub fn from_aromatic_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "se" => Some(Se),
            "as" => Some(As),
            "te" => Some(Te),
            _ => match Self::from_organic_subset(symbol) {
                Some((element, true)) => Some(element),
                _ => None,
            },
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            H => "H",
            He => "He",
            Li => "Li",
            Be => "Be",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Ne => "Ne",
            Na => "Na",
            Mg => "Mg",
            Al => "Al",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            Ar => "Ar",
            K => "K",
            Ca => "Ca",
            Mn => "Mn",
            Fe => "Fe",
            Co => "Co",
            Ni => "Ni",
            Cu => "Cu",
            Zn => "Zn",
            Ga => "Ga",
            Ge => "Ge",
            As => "As",
            Se => "Se",
            Br => "Br",
            Kr => "Kr",
            Ag => "Ag",
            Sn => "Sn",
            Sb => "Sb",
            Te => "Te",
            I => "I",
            Xe => "Xe",
            Pt => "Pt",
            Au => "Au",
            Hg => "Hg",
            Pb => "Pb",
            Bi => "Bi",
        }
    }

    pub fn atomic_number(&self) -> u8 {
        match self {
            H => 1,
            He => 2,
            Li => 3,
            Be => 4,
            B => 5,
            C => 6,
            N => 7,
            O => 8,
            F => 9,
            Ne => 10,
            Na => 11,
            Mg => 12,
            Al => 13,
            Si => 14,
            P => 15,
            S => 16,
            Cl => 17,
            Ar => 18,
            K => 19,
            Ca => 20,
            Mn => 25,
            Fe => 26,
            Co => 27,
            Ni => 28,
            Cu => 29,
            Zn => 30,
            Ga => 31,
            Ge => 32,
            As => 33,
            Se => 34,
            Br => 35,
            Kr => 36,
            Ag => 47,
            Sn => 50,
            Sb => 51,
            Te => 52,
            I => 53,
            Xe => 54,
            Pt => 78,
            Au => 79,
            Hg => 80,
            Pb => 82,
            Bi => 83,
        }
    }

    /// Default valences used to fill in implicit hydrogens on organic subset atoms.
    /// Elements outside the organic subset have none.
    pub fn default_valences(&self) -> &'static [u8] {
        match self {
            B => &[3],
            C => &[4],
            N => &[3, 5],
            O => &[2],
            P => &[3, 5],
            S => &[2, 4, 6],
            F | Cl | Br | I => &[1],
            _ => &[],
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

/// An atom in a parsed molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Hydrogens written inside brackets, e.g. the `3` in `[CH3+]`.
    /// `None` for organic subset atoms, whose hydrogens are implicit.
    pub explicit_hydrogens: Option<u8>,
}

impl Atom {
    /// An organic subset atom with implicit hydrogens.
    pub fn organic(element: Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            charge: 0,
            isotope: None,
            explicit_hydrogens: None,
        }
    }

    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }
}

impl From<Element> for Atom {
    fn from(element: Element) -> Self {
        Atom::organic(element, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl Bond {
    /// Bond order as used for valence bookkeeping; aromatic bonds count as one
    /// and the aromatic atom itself contributes the extra electron.
    pub fn valence_contribution(&self) -> u8 {
        match self {
            Bond::Single | Bond::Aromatic => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
            Bond::Quadruple => 4,
        }
    }

    /// Pi electrons this bond contributes to each of its two atoms.
    pub fn pi_electrons(&self) -> u8 {
        match self {
            Bond::Single => 0,
            Bond::Aromatic => 1,
            Bond::Double => 1,
            Bond::Triple => 2,
            Bond::Quadruple => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(Element::from_symbol("Cl"), Some(Cl));
        assert_eq!(Element::from_symbol("Fe"), Some(Fe));
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_symbol("cl"), None);
        for symbol in ["H", "C", "Br", "Se", "Bi"] {
            let element = Element::from_symbol(symbol).unwrap();
            assert_eq!(element.symbol(), symbol);
        }
    }

    #[test]
    fn test_organic_subset() {
        assert_eq!(Element::from_organic_subset("c"), Some((C, true)));
        assert_eq!(Element::from_organic_subset("Br"), Some((Br, false)));
        // Iron must be bracketed.
        assert_eq!(Element::from_organic_subset("Fe"), None);
        assert_eq!(Element::from_organic_subset("i"), None);
        assert_eq!(Element::from_aromatic_symbol("se"), Some(Se));
    }

    #[test]
    fn test_atomic_numbers() {
        assert_eq!(C.atomic_number(), 6);
        assert_eq!(Cl.atomic_number(), 17);
        assert_eq!(I.atomic_number(), 53);
    }
}
