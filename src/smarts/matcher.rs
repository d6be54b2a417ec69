use super::SmartsPattern;
use crate::molecule::Molecule;
use std::collections::HashSet;

impl SmartsPattern {
    /// All matches of the pattern in the molecule.
    ///
    /// Each match maps pattern atom `i` to molecule atom `match[i]`. Matches
    /// covering the same set of atoms are reported once, the first mapping
    /// found is kept.
    pub fn substruct_matches(&self, molecule: &Molecule) -> Vec<Vec<usize>> {
        let mut matcher = Matcher::new(self, molecule);
        matcher.extend(0);
        matcher.matches
    }

    pub fn has_substruct_match(&self, molecule: &Molecule) -> bool {
        !self.substruct_matches(molecule).is_empty()
    }
}

struct Matcher<'a> {
    pattern: &'a SmartsPattern,
    molecule: &'a Molecule,
    mapping: Vec<Option<usize>>,
    used: Vec<bool>,
    seen: HashSet<Vec<usize>>,
    matches: Vec<Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(pattern: &'a SmartsPattern, molecule: &'a Molecule) -> Self {
        Self {
            pattern,
            molecule,
            mapping: vec![None; pattern.atom_count()],
            used: vec![false; molecule.atom_count()],
            seen: HashSet::new(),
            matches: Vec::new(),
        }
    }

    fn extend(&mut self, depth: usize) {
        if depth == self.pattern.order.len() {
            let mapping: Vec<usize> = self.mapping.iter().flatten().copied().collect();
            let mut key = mapping.clone();
            key.sort_unstable();
            if self.seen.insert(key) {
                self.matches.push(mapping);
            }
            return;
        }

        let (atom, parent) = self.pattern.order[depth];
        let mut candidates: Vec<usize> = match parent.and_then(|p| self.mapping[p]) {
            Some(t) => self.molecule.neighbors(t).collect(),
            None => (0..self.molecule.atom_count()).collect(),
        };
        candidates.sort_unstable();

        for target in candidates {
            if self.used[target] || !self.feasible(atom, target) {
                continue;
            }
            self.mapping[atom] = Some(target);
            self.used[target] = true;
            self.extend(depth + 1);
            self.used[target] = false;
            self.mapping[atom] = None;
        }
    }

    /// Atom expression matches and every bond to an already mapped pattern
    /// neighbor exists in the molecule and matches its bond expression.
    fn feasible(&self, atom: usize, target: usize) -> bool {
        if !self.pattern.atoms[atom].matches(self.molecule, target) {
            return false;
        }
        self.pattern.adjacency[atom].iter().all(|&(other, bond)| {
            self.mapping[other].map_or(true, |t| {
                self.pattern.bonds[bond].2.matches(self.molecule, target, t)
            })
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{Molecule, SmartsPattern};

    fn matches(smarts: &str, smiles: &str) -> Vec<Vec<usize>> {
        SmartsPattern::parse(smarts)
            .unwrap()
            .substruct_matches(&Molecule::from_smiles(smiles).unwrap())
    }

    #[test]
    fn test_single_atom_queries() {
        assert_eq!(matches("[CX4;H3]", "CCCC"), vec![vec![0], vec![3]]);
        assert_eq!(matches("[CX4;H2]", "CCCC"), vec![vec![1], vec![2]]);
        assert_eq!(matches("[cX3;H1]", "Cc1ccccc1").len(), 5);
        assert_eq!(matches("[cX3;H0]", "Cc1ccccc1"), vec![vec![1]]);
        assert_eq!(matches("[OX2;H2]", "O"), vec![vec![0]]);
        assert!(matches("[OX2;H1]", "O").is_empty());
    }

    #[test]
    fn test_unique_matches() {
        // both orientations of the ethane bond cover the same atoms
        assert_eq!(matches("[CX4][CX4]", "CC"), vec![vec![0, 1]]);
        assert_eq!(matches("[CX4;H3][CX3;H0]=O", "CC(C)=O"), vec![vec![0, 1, 3], vec![2, 1, 3]]);
    }

    #[test]
    fn test_bond_queries() {
        assert!(matches("C=C", "CCC").is_empty());
        assert_eq!(matches("C=C", "C=CC").len(), 1);
        assert_eq!(matches("c:c", "c1ccccc1").len(), 6);
        assert!(matches("C-C", "c1ccccc1").is_empty());
        assert_eq!(matches("[c][CX4;H3]", "Cc1ccccc1"), vec![vec![1, 0]]);
        assert_eq!(matches("C~O", "CC=O"), vec![vec![1, 2]]);
    }

    #[test]
    fn test_ring_queries() {
        assert_eq!(matches("[CX4;H2;R][OX2;H0;R]", "C1CCOC1"), vec![vec![2, 3], vec![4, 3]]);
        assert!(matches("[CX4;H2;!R][OX2;H0]", "C1CCOC1").is_empty());
        assert_eq!(matches("[CX4;H2;!R][OX2;H0]", "CCOCC").len(), 2);
        assert_eq!(matches("C@C", "C1CC1CC").len(), 3);
        assert_eq!(matches("C!@C", "C1CC1CC").len(), 2);
    }

    #[test]
    fn test_disconnected_pattern() {
        assert_eq!(matches("[OX2;H1].[OX2;H1]", "OCCO"), vec![vec![0, 3]]);
    }

    #[test]
    fn test_has_substruct_match() {
        let pattern = SmartsPattern::parse("[c][OX2;H1]").unwrap();
        assert!(pattern.has_substruct_match(&Molecule::from_smiles("Oc1ccccc1").unwrap()));
        assert!(!pattern.has_substruct_match(&Molecule::from_smiles("OC1CCCCC1").unwrap()));
    }
}
