use crate::error::FragmentResult;
use itertools::Itertools;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

mod smiles;

const ELEMENTS: [&str; 54] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe",
];

/// Atomic number of an element symbol.
pub(crate) fn atomic_number(symbol: &str) -> Option<u8> {
    ELEMENTS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as u8 + 1)
}

/// Element symbol of an atomic number.
pub fn element_symbol(atomic_number: u8) -> &'static str {
    ELEMENTS
        .get((atomic_number as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("*")
}

/// Default valences of the elements in the SMILES organic subset.
pub(crate) fn default_valences(atomic_number: u8) -> &'static [u8] {
    match atomic_number {
        5 => &[3],
        6 => &[4],
        7 | 15 => &[3, 5],
        8 => &[2],
        16 => &[2, 4, 6],
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    fn valence(self) -> u8 {
        match self {
            Self::Single | Self::Aromatic => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

/// A heavy atom. Hydrogens are stored as a count on the atom they are bonded to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    pub atomic_number: u8,
    pub aromatic: bool,
    pub hydrogens: u8,
    pub charge: i8,
}

impl Atom {
    pub fn symbol(&self) -> &'static str {
        element_symbol(self.atomic_number)
    }
}

/// Hydrogen-suppressed molecular graph with perceived ring membership.
///
/// Atoms are addressed by their index in input order, which for a molecule
/// read from SMILES is the order in which the atoms appear in the string.
#[derive(Clone, Debug)]
pub struct Molecule {
    graph: UnGraph<Atom, BondOrder>,
    ring_atoms: Vec<bool>,
    ring_bonds: Vec<bool>,
}

impl Molecule {
    pub fn new(graph: UnGraph<Atom, BondOrder>) -> Self {
        let ring_bonds: Vec<bool> = graph
            .edge_indices()
            .map(|e| is_ring_bond(&graph, e))
            .collect();
        let mut ring_atoms = vec![false; graph.node_count()];
        for e in graph.edge_indices().filter(|e| ring_bonds[e.index()]) {
            if let Some((a, b)) = graph.edge_endpoints(e) {
                ring_atoms[a.index()] = true;
                ring_atoms[b.index()] = true;
            }
        }
        Self {
            graph,
            ring_atoms,
            ring_bonds,
        }
    }

    pub fn from_smiles(smiles: &str) -> FragmentResult<Self> {
        smiles::parse(smiles).map(Self::new)
    }

    pub fn graph(&self) -> &UnGraph<Atom, BondOrder> {
        &self.graph
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atom(&self, index: usize) -> &Atom {
        &self.graph[NodeIndex::new(index)]
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(index))
            .map(|n| n.index())
    }

    /// All bonds as pairs of atom indices.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize, BondOrder)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    pub fn bond(&self, a: usize, b: usize) -> Option<BondOrder> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| self.graph[e])
    }

    pub fn is_ring_bond(&self, a: usize, b: usize) -> bool {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map_or(false, |e| self.ring_bonds[e.index()])
    }

    pub fn in_ring(&self, index: usize) -> bool {
        self.ring_atoms[index]
    }

    /// Number of explicit (heavy atom) neighbors.
    pub fn degree(&self, index: usize) -> u8 {
        let degree = self.graph.edges(NodeIndex::new(index)).count();
        u8::try_from(degree).unwrap_or(u8::MAX)
    }

    /// Number of connections including implicit hydrogens.
    pub fn total_connectivity(&self, index: usize) -> u8 {
        self.degree(index)
            .saturating_add(self.atom(index).hydrogens)
    }

    /// Total bond order including implicit hydrogens.
    pub fn valence(&self, index: usize) -> u8 {
        explicit_valence(&self.graph, NodeIndex::new(index))
            .saturating_add(self.atom(index).hydrogens)
    }

    /// Molecular formula in Hill notation.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in self.graph.node_weights() {
            *counts.entry(atom.symbol()).or_insert(0) += 1;
            if atom.hydrogens > 0 {
                *counts.entry("H").or_insert(0) += atom.hydrogens as usize;
            }
        }
        let carbon = counts.remove("C");
        let hydrogen = carbon.and_then(|_| counts.remove("H"));
        carbon
            .map(|n| ("C", n))
            .into_iter()
            .chain(hydrogen.map(|n| ("H", n)))
            .chain(counts)
            .map(|(s, n)| if n == 1 { s.to_string() } else { format!("{s}{n}") })
            .join("")
    }
}

/// Sum of bond orders to heavy atoms, with one extra electron for aromatic
/// atoms that share a double bond with the ring system.
pub(crate) fn explicit_valence(graph: &UnGraph<Atom, BondOrder>, node: NodeIndex) -> u8 {
    let atom = &graph[node];
    let bonds: Vec<BondOrder> = graph.edges(node).map(|e| *e.weight()).collect();
    let valence = bonds
        .iter()
        .fold(0u8, |v, b| v.saturating_add(b.valence()));
    let aromatic_bonds = bonds.iter().filter(|&&b| b == BondOrder::Aromatic).count();
    let pi = match atom.atomic_number {
        5 | 6 => atom.aromatic && aromatic_bonds > 0,
        7 | 15 => atom.aromatic && bonds.len() == 2 && atom.charge == 0,
        _ => false,
    };
    valence.saturating_add(pi as u8)
}

/// A bond is part of a ring iff its endpoints stay connected without it.
fn is_ring_bond(graph: &UnGraph<Atom, BondOrder>, edge: EdgeIndex) -> bool {
    let Some((source, target)) = graph.edge_endpoints(edge) else {
        return false;
    };
    let mut visited = vec![false; graph.node_count()];
    let mut stack = vec![source];
    visited[source.index()] = true;
    while let Some(node) = stack.pop() {
        for e in graph.edges(node).filter(|e| e.id() != edge) {
            let next = if e.source() == node {
                e.target()
            } else {
                e.source()
            };
            if next == target {
                return true;
            }
            if !visited[next.index()] {
                visited[next.index()] = true;
                stack.push(next);
            }
        }
    }
    false
}
