//! A subset of SMARTS sufficient for group-contribution fragmentation.
//!
//! Supported atom primitives are element symbols (upper case for aliphatic,
//! lower case for aromatic atoms), `#n`, `a`, `A`, `*`, `D`, `X`, `H`, `h`,
//! `v`, `R`/`R0` and charges. Atom expressions are combined with `!`, `&`,
//! `,` and `;` using the usual SMARTS precedence. Bonds support `-`, `=`,
//! `#`, `:`, `~`, `@` and negation.
use crate::error::{FragmentError, FragmentResult};
use crate::molecule::{atomic_number, BondOrder, Molecule};
use std::collections::BTreeMap;

mod matcher;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtomPrimitive {
    AtomicNumber(u8),
    Aromatic,
    Aliphatic,
    Any,
    Degree(u8),
    Connectivity(u8),
    Hydrogens(u8),
    Valence(u8),
    Ring(bool),
    Charge(i8),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtomExpr {
    Primitive(AtomPrimitive),
    Not(Box<AtomExpr>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BondPrimitive {
    Single,
    Double,
    Triple,
    Aromatic,
    Ring,
    Any,
    /// Bond between two atoms written without a bond symbol: single or aromatic.
    Implicit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BondExpr {
    Primitive(BondPrimitive),
    Not(Box<BondExpr>),
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
}

impl AtomExpr {
    pub fn matches(&self, molecule: &Molecule, index: usize) -> bool {
        match self {
            Self::Primitive(p) => p.matches(molecule, index),
            Self::Not(e) => !e.matches(molecule, index),
            Self::And(es) => es.iter().all(|e| e.matches(molecule, index)),
            Self::Or(es) => es.iter().any(|e| e.matches(molecule, index)),
        }
    }
}

impl AtomPrimitive {
    fn matches(&self, molecule: &Molecule, index: usize) -> bool {
        let atom = molecule.atom(index);
        match *self {
            Self::AtomicNumber(n) => atom.atomic_number == n,
            Self::Aromatic => atom.aromatic,
            Self::Aliphatic => !atom.aromatic,
            Self::Any => true,
            Self::Degree(n) => molecule.degree(index) == n,
            Self::Connectivity(n) => molecule.total_connectivity(index) == n,
            Self::Hydrogens(n) => atom.hydrogens == n,
            Self::Valence(n) => molecule.valence(index) == n,
            Self::Ring(r) => molecule.in_ring(index) == r,
            Self::Charge(c) => atom.charge == c,
        }
    }
}

impl BondExpr {
    pub fn matches(&self, molecule: &Molecule, a: usize, b: usize) -> bool {
        match self {
            Self::Primitive(p) => p.matches(molecule, a, b),
            Self::Not(e) => !e.matches(molecule, a, b),
            Self::And(es) => es.iter().all(|e| e.matches(molecule, a, b)),
            Self::Or(es) => es.iter().any(|e| e.matches(molecule, a, b)),
        }
    }
}

impl BondPrimitive {
    fn matches(self, molecule: &Molecule, a: usize, b: usize) -> bool {
        let Some(order) = molecule.bond(a, b) else {
            return false;
        };
        match self {
            Self::Single => order == BondOrder::Single,
            Self::Double => order == BondOrder::Double,
            Self::Triple => order == BondOrder::Triple,
            Self::Aromatic => order == BondOrder::Aromatic,
            Self::Ring => molecule.is_ring_bond(a, b),
            Self::Any => true,
            Self::Implicit => matches!(order, BondOrder::Single | BondOrder::Aromatic),
        }
    }
}

/// A compiled SMARTS pattern.
#[derive(Clone, Debug)]
pub struct SmartsPattern {
    smarts: String,
    atoms: Vec<AtomExpr>,
    bonds: Vec<(usize, usize, BondExpr)>,
    /// Neighbors of each pattern atom as `(atom, bond)` pairs.
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Depth-first visiting order and the already visited neighbor of each atom.
    order: Vec<(usize, Option<usize>)>,
}

impl SmartsPattern {
    pub fn parse(smarts: &str) -> FragmentResult<Self> {
        let (atoms, bonds) = SmartsParser::new(smarts.as_bytes()).parse()?;
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (k, &(a, b, _)) in bonds.iter().enumerate() {
            adjacency[a].push((b, k));
            adjacency[b].push((a, k));
        }

        let mut order = Vec::with_capacity(atoms.len());
        let mut visited = vec![false; atoms.len()];
        for root in 0..atoms.len() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack = vec![(root, None)];
            while let Some((atom, parent)) = stack.pop() {
                order.push((atom, parent));
                for &(next, _) in adjacency[atom].iter().rev() {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, Some(atom)));
                    }
                }
            }
        }

        Ok(Self {
            smarts: smarts.to_string(),
            atoms,
            bonds,
            adjacency,
            order,
        })
    }

    pub fn smarts(&self) -> &str {
        &self.smarts
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }
}

impl PartialEq for SmartsPattern {
    fn eq(&self, other: &Self) -> bool {
        self.atoms == other.atoms && self.bonds == other.bonds
    }
}

type ParsedPattern = (Vec<AtomExpr>, Vec<(usize, usize, BondExpr)>);

struct SmartsParser<'a> {
    input: &'a [u8],
    pos: usize,
    atoms: Vec<AtomExpr>,
    bonds: Vec<(usize, usize, BondExpr)>,
    branches: Vec<usize>,
    prev: Option<usize>,
    pending_bond: Option<BondExpr>,
    ring_closures: BTreeMap<u16, (usize, Option<BondExpr>, usize)>,
}

impl<'a> SmartsParser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev: None,
            pending_bond: None,
            ring_closures: BTreeMap::new(),
        }
    }

    fn error(&self, pos: usize, msg: impl Into<String>) -> FragmentError {
        FragmentError::smarts(self.input, pos, msg)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&self) -> FragmentResult<u8> {
        self.peek()
            .ok_or_else(|| self.error(self.pos, "unexpected end of pattern"))
    }

    fn parse(mut self) -> FragmentResult<ParsedPattern> {
        if self.input.is_empty() {
            return Err(self.error(0, "empty pattern"));
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
                b'.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "bond without following atom"));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'!' | b'/' | b'\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(self.pos, "consecutive bond expressions"));
                    }
                    self.pending_bond = Some(self.parse_bond_low_and()?);
                }
                b'%' | b'0'..=b'9' => self.parse_ring_closure()?,
                b'[' => {
                    let start = self.pos;
                    self.pos += 1;
                    let expr = self.parse_atom_low_and()?;
                    if self.peek() != Some(b']') {
                        return Err(self.error(start, "unclosed bracket atom"));
                    }
                    self.pos += 1;
                    self.add_atom(expr);
                }
                _ => {
                    let expr = self.parse_unbracketed_atom()?;
                    self.add_atom(expr);
                }
            }
        }
        if !self.branches.is_empty() {
            return Err(self.error(self.input.len(), "unclosed branch"));
        }
        if let Some((digit, &(_, _, pos))) = self.ring_closures.iter().next() {
            return Err(self.error(pos, format!("unclosed ring {digit}")));
        }
        if self.pending_bond.is_some() {
            return Err(self.error(self.input.len(), "bond without following atom"));
        }
        Ok((self.atoms, self.bonds))
    }

    fn add_atom(&mut self, expr: AtomExpr) {
        let index = self.atoms.len();
        self.atoms.push(expr);
        if let Some(prev) = self.prev {
            let bond = self
                .pending_bond
                .take()
                .unwrap_or(BondExpr::Primitive(BondPrimitive::Implicit));
            self.bonds.push((prev, index, bond));
        }
        self.pending_bond = None;
        self.prev = Some(index);
    }

    fn parse_ring_closure(&mut self) -> FragmentResult<()> {
        let start = self.pos;
        let digit = if self.input[self.pos] == b'%' {
            match self.input.get(self.pos + 1..self.pos + 3) {
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
                if open == current {
                    return Err(self.error(start, format!("invalid ring closure {digit}")));
                }
                let bond = bond
                    .or(open_bond)
                    .unwrap_or(BondExpr::Primitive(BondPrimitive::Implicit));
                self.bonds.push((open, current, bond));
            }
            None => {
                self.ring_closures.insert(digit, (current, bond, start));
            }
        }
        Ok(())
    }

    fn parse_unbracketed_atom(&mut self) -> FragmentResult<AtomExpr> {
        let start = self.pos;
        let ch = self.input[self.pos];
        let next = self.input.get(self.pos + 1).copied();
        let (expr, len) = match (ch, next) {
            (b'*', _) => (AtomExpr::Primitive(AtomPrimitive::Any), 1),
            (b'a', _) => (AtomExpr::Primitive(AtomPrimitive::Aromatic), 1),
            (b'A', _) => (AtomExpr::Primitive(AtomPrimitive::Aliphatic), 1),
            (b'B', Some(b'r')) => (element(35, false), 2),
            (b'C', Some(b'l')) => (element(17, false), 2),
            (b'B' | b'C' | b'N' | b'O' | b'P' | b'S' | b'F' | b'I', _) => {
                let n = atomic_number(&(ch as char).to_string());
                (element(n.unwrap_or(0), false), 1)
            }
            (b'b' | b'c' | b'n' | b'o' | b'p' | b's', _) => {
                let n = atomic_number(&(ch.to_ascii_uppercase() as char).to_string());
                (element(n.unwrap_or(0), true), 1)
            }
            _ => {
                return Err(self.error(start, format!("unexpected character '{}'", ch as char)))
            }
        };
        self.pos += len;
        Ok(expr)
    }

    // Atom expressions, lowest to highest precedence: ';', ',', '&' or
    // juxtaposition, '!'.

    fn parse_atom_low_and(&mut self) -> FragmentResult<AtomExpr> {
        let mut terms = vec![self.parse_atom_or()?];
        while self.peek() == Some(b';') {
            self.pos += 1;
            terms.push(self.parse_atom_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_atom_or(&mut self) -> FragmentResult<AtomExpr> {
        let mut terms = vec![self.parse_atom_high_and()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            terms.push(self.parse_atom_high_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    fn parse_atom_high_and(&mut self) -> FragmentResult<AtomExpr> {
        let mut terms = vec![self.parse_atom_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.pos += 1;
                    terms.push(self.parse_atom_not()?);
                }
                Some(b']' | b',' | b';') | None => break,
                Some(_) => terms.push(self.parse_atom_not()?),
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_atom_not(&mut self) -> FragmentResult<AtomExpr> {
        if self.peek() == Some(b'!') {
            self.pos += 1;
            Ok(AtomExpr::Not(Box::new(self.parse_atom_not()?)))
        } else {
            self.parse_atom_primitive()
        }
    }

    fn parse_count(&mut self, default: u8) -> FragmentResult<u8> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Ok(default);
        }
        self.input[start..self.pos]
            .iter()
            .try_fold(0u8, |n, &d| n.checked_mul(10)?.checked_add(d - b'0'))
            .ok_or_else(|| self.error(start, "number out of range"))
    }

    /// Two-letter element symbol starting at the current position, if any.
    fn two_letter_element(&self) -> Option<u8> {
        let symbol = self.input.get(self.pos..self.pos + 2)?;
        if !symbol[1].is_ascii_lowercase() {
            return None;
        }
        std::str::from_utf8(symbol).ok().and_then(atomic_number)
    }

    fn parse_atom_primitive(&mut self) -> FragmentResult<AtomExpr> {
        use AtomPrimitive::*;
        let start = self.pos;
        let ch = self.expect()?;

        if ch.is_ascii_uppercase() {
            if let Some(n) = self.two_letter_element() {
                self.pos += 2;
                return Ok(element(n, false));
            }
        }

        self.pos += 1;
        let primitive = match ch {
            b'*' => Any,
            b'a' => Aromatic,
            b'A' => Aliphatic,
            b'#' => {
                if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.error(start, "expected atomic number after '#'"));
                }
                AtomicNumber(self.parse_count(0)?)
            }
            b'D' => Degree(self.parse_count(1)?),
            b'X' => Connectivity(self.parse_count(1)?),
            b'H' | b'h' => Hydrogens(self.parse_count(1)?),
            b'v' => Valence(self.parse_count(1)?),
            b'R' => match self.parse_count(1)? {
                0 => Ring(false),
                1 if self.input[self.pos - 1] == b'R' => Ring(true),
                _ => return Err(self.error(start, "ring count queries are not supported")),
            },
            b'+' | b'-' => {
                let magnitude = i8::try_from(self.parse_count(1)?)
                    .map_err(|_| self.error(start, "charge out of range"))?;
                Charge(if ch == b'+' { magnitude } else { -magnitude })
            }
            b'@' => {
                // stereo queries are not evaluated
                while self.peek() == Some(b'@') {
                    self.pos += 1;
                }
                Any
            }
            b'b' | b'c' | b'n' | b'o' | b'p' | b's' => {
                let n = atomic_number(&(ch.to_ascii_uppercase() as char).to_string());
                return Ok(element(n.unwrap_or(0), true));
            }
            c if c.is_ascii_uppercase() => {
                let n = atomic_number(&(c as char).to_string())
                    .ok_or_else(|| self.error(start, format!("unknown element '{}'", c as char)))?;
                return Ok(element(n, false));
            }
            c => {
                return Err(self.error(start, format!("unexpected character '{}'", c as char)))
            }
        };
        Ok(AtomExpr::Primitive(primitive))
    }

    fn parse_bond_low_and(&mut self) -> FragmentResult<BondExpr> {
        let mut terms = vec![self.parse_bond_or()?];
        while self.peek() == Some(b';') {
            self.pos += 1;
            terms.push(self.parse_bond_or()?);
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn parse_bond_or(&mut self) -> FragmentResult<BondExpr> {
        let mut terms = vec![self.parse_bond_high_and()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            terms.push(self.parse_bond_high_and()?);
        }
        Ok(collapse(terms, BondExpr::Or))
    }

    fn parse_bond_high_and(&mut self) -> FragmentResult<BondExpr> {
        let mut terms = vec![self.parse_bond_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.pos += 1;
                    terms.push(self.parse_bond_not()?);
                }
                Some(b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'!' | b'/' | b'\\') => {
                    terms.push(self.parse_bond_not()?)
                }
                _ => break,
            }
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn parse_bond_not(&mut self) -> FragmentResult<BondExpr> {
        if self.peek() == Some(b'!') {
            self.pos += 1;
            return Ok(BondExpr::Not(Box::new(self.parse_bond_not()?)));
        }
        let primitive = match self.expect()? {
            b'-' | b'/' | b'\\' => BondPrimitive::Single,
            b'=' => BondPrimitive::Double,
            b'#' => BondPrimitive::Triple,
            b':' => BondPrimitive::Aromatic,
            b'~' => BondPrimitive::Any,
            b'@' => BondPrimitive::Ring,
            c => {
                return Err(self.error(self.pos, format!("unexpected character '{}'", c as char)))
            }
        };
        self.pos += 1;
        Ok(BondExpr::Primitive(primitive))
    }
}

fn element(atomic_number: u8, aromatic: bool) -> AtomExpr {
    AtomExpr::And(vec![
        AtomExpr::Primitive(AtomPrimitive::AtomicNumber(atomic_number)),
        AtomExpr::Primitive(if aromatic {
            AtomPrimitive::Aromatic
        } else {
            AtomPrimitive::Aliphatic
        }),
    ])
}

fn collapse<E>(mut terms: Vec<E>, combine: fn(Vec<E>) -> E) -> E {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bracket_expressions() {
        let pattern = SmartsPattern::parse("[CX4;H3]").unwrap();
        assert_eq!(pattern.atom_count(), 1);
        assert_eq!(
            pattern.atoms[0],
            AtomExpr::And(vec![
                AtomExpr::And(vec![
                    element(6, false),
                    AtomExpr::Primitive(AtomPrimitive::Connectivity(4))
                ]),
                AtomExpr::Primitive(AtomPrimitive::Hydrogens(3)),
            ])
        );

        let pattern = SmartsPattern::parse("[CX4;H2;!R][OX2;H0]").unwrap();
        assert_eq!(pattern.atom_count(), 2);
        assert_eq!(pattern.bond_count(), 1);
        assert_eq!(
            pattern.bonds[0].2,
            BondExpr::Primitive(BondPrimitive::Implicit)
        );
    }

    #[test]
    fn test_parse_branches_and_bonds() {
        let pattern = SmartsPattern::parse("[CX4;H3][CX3;H0](=O)[OX2;H0]").unwrap();
        assert_eq!(pattern.atom_count(), 4);
        assert_eq!(pattern.bonds[1], (1, 2, BondExpr::Primitive(BondPrimitive::Double)));
        assert_eq!(pattern.bonds[2].0, 1);
        assert_eq!(pattern.bonds[2].1, 3);

        let pattern = SmartsPattern::parse("C-!@C").unwrap();
        assert_eq!(
            pattern.bonds[0].2,
            BondExpr::And(vec![
                BondExpr::Primitive(BondPrimitive::Single),
                BondExpr::Not(Box::new(BondExpr::Primitive(BondPrimitive::Ring))),
            ])
        );
    }

    #[test]
    fn test_or_precedence() {
        let pattern = SmartsPattern::parse("[N,O;H1]").unwrap();
        assert_eq!(
            pattern.atoms[0],
            AtomExpr::And(vec![
                AtomExpr::Or(vec![element(7, false), element(8, false)]),
                AtomExpr::Primitive(AtomPrimitive::Hydrogens(1)),
            ])
        );
    }

    #[test]
    fn test_two_letter_elements() {
        let pattern = SmartsPattern::parse("[Cl][Br]Cl").unwrap();
        assert_eq!(pattern.atoms[0], element(17, false));
        assert_eq!(pattern.atoms[1], element(35, false));
        assert_eq!(pattern.atoms[2], element(17, false));
        let pattern = SmartsPattern::parse("[CH2]").unwrap();
        assert_eq!(
            pattern.atoms[0],
            AtomExpr::And(vec![
                element(6, false),
                AtomExpr::Primitive(AtomPrimitive::Hydrogens(2))
            ])
        );
    }

    #[test]
    fn test_errors() {
        for smarts in [
            "", "[C", "C(", "C)", "C1C", "[#]", "C=", "[Q]", "[CR2]", "[C;]", "C()C", "[#300]",
            "[C+255]", "[C-128]", "[CH256]",
        ] {
            assert!(
                matches!(SmartsPattern::parse(smarts), Err(FragmentError::Smarts { .. })),
                "{smarts}"
            );
        }
    }
}
