use super::{atomic_number, default_valences, explicit_valence, Atom, BondOrder};
use crate::error::{FragmentError, FragmentResult};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::BTreeMap;

/// Parses a SMILES string into a hydrogen-suppressed graph.
pub(super) fn parse(smiles: &str) -> FragmentResult<UnGraph<Atom, BondOrder>> {
    SmilesParser::new(smiles.as_bytes()).parse()
}

struct SmilesParser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<Atom>,
    /// Atoms written without brackets receive implicit hydrogens.
    organic: Vec<bool>,
    bonds: Vec<(usize, usize, Option<BondOrder>)>,
    branches: Vec<usize>,
    prev: Option<usize>,
    pending_bond: Option<BondOrder>,
    ring_closures: BTreeMap<u16, (usize, Option<BondOrder>, usize)>,
}

impl<'a> SmilesParser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            atoms: Vec::new(),
            organic: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev: None,
            pending_bond: None,
            ring_closures: BTreeMap::new(),
        }
    }

    fn error(&self, pos: usize, msg: impl Into<String>) -> FragmentError {
        FragmentError::smiles(self.input, pos, msg)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse(mut self) -> FragmentResult<UnGraph<Atom, BondOrder>> {
        if self.input.is_empty() {
            return Err(self.error(0, "empty input"));
        }
        while let Some(ch) = self.peek() {
            match ch {
                b'(' => {
                    let prev = self
                        .prev
                        .ok_or_else(|| self.error(self.pos, "branch without preceding atom"))?;
                    self.branches.push(prev);
                    self.pos += 1;
                }
                b')' => {
                    if self.pos > 0 && self.input[self.pos - 1] == b'(' {
                        return Err(self.error(self.pos, "empty branch"));
                    }
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "bond without following atom"));
                    }
                    self.prev = Some(
                        self.branches
                            .pop()
                            .ok_or_else(|| self.error(self.pos, "unmatched ')'"))?,
                    );
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b':' | b'/' | b'\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "consecutive bond symbols"));
                    }
                    self.pending_bond = Some(match ch {
                        b'=' => BondOrder::Double,
                        b'#' => BondOrder::Triple,
                        b':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                b'.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "bond without following atom"));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'%' | b'0'..=b'9' => self.parse_ring_closure()?,
                b'[' => self.parse_bracket_atom()?,
                _ => self.parse_organic_atom()?,
            }
        }
        if let Some(&start) = self.branches.last() {
            return Err(self.error(self.input.len(), format!("unclosed branch at atom {start}")));
        }
        if let Some((digit, &(_, _, pos))) = self.ring_closures.iter().next() {
            return Err(self.error(pos, format!("unclosed ring {digit}")));
        }
        if self.pending_bond.is_some() {
            return Err(self.error(self.input.len(), "bond without following atom"));
        }
        Ok(self.build())
    }

    fn add_atom(&mut self, atom: Atom, organic: bool) {
        let index = self.atoms.len();
        self.atoms.push(atom);
        self.organic.push(organic);
        if let Some(prev) = self.prev {
            self.bonds.push((prev, index, self.pending_bond.take()));
        }
        self.pending_bond = None;
        self.prev = Some(index);
    }

    fn parse_organic_atom(&mut self) -> FragmentResult<()> {
        let start = self.pos;
        let ch = self.input[self.pos];
        let next = self.input.get(self.pos + 1).copied();
        let (atomic_number, aromatic, len) = match (ch, next) {
            (b'B', Some(b'r')) => (35, false, 2),
            (b'C', Some(b'l')) => (17, false, 2),
            (b'B', _) => (5, false, 1),
            (b'C', _) => (6, false, 1),
            (b'N', _) => (7, false, 1),
            (b'O', _) => (8, false, 1),
            (b'P', _) => (15, false, 1),
            (b'S', _) => (16, false, 1),
            (b'F', _) => (9, false, 1),
            (b'I', _) => (53, false, 1),
            (b'b', _) => (5, true, 1),
            (b'c', _) => (6, true, 1),
            (b'n', _) => (7, true, 1),
            (b'o', _) => (8, true, 1),
            (b'p', _) => (15, true, 1),
            (b's', _) => (16, true, 1),
            _ => {
                return Err(self.error(
                    start,
                    format!("unexpected character '{}'", ch as char),
                ))
            }
        };
        self.pos += len;
        self.add_atom(
            Atom {
                atomic_number,
                aromatic,
                hydrogens: 0,
                charge: 0,
            },
            true,
        );
        Ok(())
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        (self.pos > start).then(|| {
            self.input[start..self.pos]
                .iter()
                .fold(0u32, |n, &d| n.saturating_mul(10).saturating_add((d - b'0') as u32))
        })
    }

    fn parse_bracket_atom(&mut self) -> FragmentResult<()> {
        let start = self.pos;
        self.pos += 1;

        // isotopes do not change the graph
        self.parse_number();

        let (atomic_number, aromatic) = self.parse_element(start)?;

        while self.peek() == Some(b'@') {
            self.pos += 1;
        }

        let mut hydrogens = 0;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            hydrogens = u8::try_from(self.parse_number().unwrap_or(1))
                .map_err(|_| self.error(start, "hydrogen count out of range"))?;
        }

        let mut charge: i8 = 0;
        while let Some(sign @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            charge = i8::try_from(self.parse_number().unwrap_or(1))
                .ok()
                .and_then(|m| match sign {
                    b'+' => charge.checked_add(m),
                    _ => charge.checked_sub(m),
                })
                .ok_or_else(|| self.error(start, "charge out of range"))?;
        }

        if self.peek() == Some(b':') {
            self.pos += 1;
            self.parse_number()
                .ok_or_else(|| self.error(self.pos, "missing atom class"))?;
        }

        if self.peek() != Some(b']') {
            return Err(self.error(start, "unclosed bracket atom"));
        }
        self.pos += 1;

        self.add_atom(
            Atom {
                atomic_number,
                aromatic,
                hydrogens,
                charge,
            },
            false,
        );
        Ok(())
    }

    fn parse_element(&mut self, start: usize) -> FragmentResult<(u8, bool)> {
        let first = self
            .peek()
            .ok_or_else(|| self.error(start, "unclosed bracket atom"))?;
        if first.is_ascii_lowercase() {
            let symbol = match (first, self.input.get(self.pos + 1).copied()) {
                (b's', Some(b'e')) => "Se",
                (b'a', Some(b's')) => "As",
                (b'b', _) => "B",
                (b'c', _) => "C",
                (b'n', _) => "N",
                (b'o', _) => "O",
                (b'p', _) => "P",
                (b's', _) => "S",
                _ => return Err(self.error(self.pos, "unknown aromatic element")),
            };
            self.pos += symbol.len();
            return Ok((atomic_number(symbol).unwrap_or(0), true));
        }
        if !first.is_ascii_uppercase() {
            return Err(self.error(self.pos, format!("unexpected character '{}'", first as char)));
        }
        if let Some(&second) = self.input.get(self.pos + 1) {
            if second.is_ascii_lowercase() {
                let symbol = [first, second];
                if let Some(n) = std::str::from_utf8(&symbol).ok().and_then(atomic_number) {
                    self.pos += 2;
                    return Ok((n, false));
                }
            }
        }
        let symbol = [first];
        let n = std::str::from_utf8(&symbol)
            .ok()
            .and_then(atomic_number)
            .ok_or_else(|| self.error(self.pos, format!("unknown element '{}'", first as char)))?;
        self.pos += 1;
        Ok((n, false))
    }

    fn parse_ring_closure(&mut self) -> FragmentResult<()> {
        let start = self.pos;
        let digit = if self.input[self.pos] == b'%' {
            let digits = self.input.get(self.pos + 1..self.pos + 3);
            match digits {
                Some(&[a, b]) if a.is_ascii_digit() && b.is_ascii_digit() => {
                    self.pos += 3;
                    (a - b'0') as u16 * 10 + (b - b'0') as u16
                }
                _ => return Err(self.error(start, "expected two digits after '%'")),
            }
        } else {
            self.pos += 1;
            (self.input[start] - b'0') as u16
        };
        let current = self
            .prev
            .ok_or_else(|| self.error(start, "ring closure without preceding atom"))?;
        let bond = self.pending_bond.take();
        match self.ring_closures.remove(&digit) {
            Some((open, open_bond, _)) => {
                if open == current
                    || self
                        .bonds
                        .iter()
                        .any(|&(a, b, _)| (a, b) == (open, current) || (b, a) == (open, current))
                {
                    return Err(self.error(start, format!("invalid ring closure {digit}")));
                }
                self.bonds.push((open, current, bond.or(open_bond)));
            }
            None => {
                self.ring_closures.insert(digit, (current, bond, start));
            }
        }
        Ok(())
    }

    fn build(self) -> UnGraph<Atom, BondOrder> {
        let mut graph = UnGraph::with_capacity(self.atoms.len(), self.bonds.len());
        let nodes: Vec<NodeIndex> = self
            .atoms
            .iter()
            .cloned()
            .map(|a| graph.add_node(a))
            .collect();
        for (a, b, order) in self.bonds {
            let order = order.unwrap_or_else(|| {
                if graph[nodes[a]].aromatic && graph[nodes[b]].aromatic {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                }
            });
            graph.add_edge(nodes[a], nodes[b], order);
        }
        for (&node, _) in nodes.iter().zip(&self.organic).filter(|&(_, &o)| o) {
            let valence = explicit_valence(&graph, node);
            let atom = &mut graph[node];
            atom.hydrogens = default_valences(atom.atomic_number)
                .iter()
                .find(|&&v| v >= valence)
                .map_or(0, |&v| v - valence);
        }
        graph
    }
}

#[cfg(test)]
mod test {
    use crate::{FragmentError, Molecule};

    #[test]
    fn test_branches_and_rings() {
        let molecule = Molecule::from_smiles("CCCc1cccc(C)c1C").unwrap();
        assert_eq!(molecule.atom_count(), 11);
        assert_eq!(molecule.bond_count(), 11);
        assert!(molecule.bond(3, 9).is_some());
        assert!(molecule.bond(7, 8).is_some());
        assert!(molecule.bond(9, 10).is_some());
        let hydrogens: Vec<_> = (0..11).map(|i| molecule.atom(i).hydrogens).collect();
        assert_eq!(hydrogens, [3, 2, 2, 0, 1, 1, 1, 0, 3, 0, 3]);
    }

    #[test]
    fn test_bracket_atoms() {
        let molecule = Molecule::from_smiles("[13CH3][NH3+].[O-]C(=O)c1cc[nH]c1").unwrap();
        assert_eq!(molecule.atom(0).atomic_number, 6);
        assert_eq!(molecule.atom(0).hydrogens, 3);
        assert_eq!(molecule.atom(1).charge, 1);
        assert_eq!(molecule.atom(1).hydrogens, 3);
        assert_eq!(molecule.atom(2).charge, -1);
        assert_eq!(molecule.atom(2).hydrogens, 0);
        assert_eq!(molecule.atom(5).hydrogens, 0);
        assert!(molecule.atom(8).aromatic);
        assert_eq!(molecule.atom(8).hydrogens, 1);
        assert!(molecule.bond(1, 2).is_none());
    }

    #[test]
    fn test_two_letter_elements() {
        let molecule = Molecule::from_smiles("ClCCBr").unwrap();
        assert_eq!(molecule.atom(0).atomic_number, 17);
        assert_eq!(molecule.atom(3).atomic_number, 35);
        assert_eq!(molecule.atom(1).hydrogens, 2);
    }

    #[test]
    fn test_ring_closure_bond_order() {
        let molecule = Molecule::from_smiles("C=1CCCCC1").unwrap();
        assert_eq!(molecule.bond(0, 5), Some(crate::BondOrder::Double));
        let molecule = Molecule::from_smiles("C1CC%10CC1C%10").unwrap();
        assert!(molecule.bond(2, 5).is_some());
    }

    #[test]
    fn test_errors() {
        for smiles in ["", "C(C", "CC)", "C1CC", "C[C", "CX", "C=", "[Qq]", "C11", "C()C"] {
            assert!(
                matches!(
                    Molecule::from_smiles(smiles),
                    Err(FragmentError::Smiles { .. })
                ),
                "{smiles}"
            );
        }
    }

    #[test]
    fn test_bracket_atom_ranges() {
        for smiles in ["[C-128]", "[C+100+100]", "[CH300]", "[C+128]", "[CH256]"] {
            assert!(
                matches!(
                    Molecule::from_smiles(smiles),
                    Err(FragmentError::Smiles { .. })
                ),
                "{smiles}"
            );
        }
        assert_eq!(Molecule::from_smiles("[C-127]").unwrap().atom(0).charge, -127);
        assert_eq!(Molecule::from_smiles("[N+2-]").unwrap().atom(0).charge, 1);

        let molecule = Molecule::from_smiles("[CH255]C").unwrap();
        assert_eq!(molecule.atom(0).hydrogens, 255);
        assert_eq!(molecule.total_connectivity(0), u8::MAX);
        assert_eq!(molecule.valence(0), u8::MAX);
    }
}
