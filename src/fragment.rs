use crate::catalog::{FunctionalGroup, GroupCatalog};
use crate::error::{FragmentError, FragmentResult};
use crate::molecule::Molecule;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Add;

/// Outcome of a fragmentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FragmentStatus {
    /// Every heavy atom belongs to exactly one group.
    Complete,
    /// The listed atoms could not be assigned to any group.
    Incomplete { unmatched: Vec<usize> },
}

impl fmt::Display for FragmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "OK"),
            Self::Incomplete { .. } => write!(f, "Did not match all atoms present"),
        }
    }
}

/// The decomposition of a molecule into functional groups.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FragmentAssignment {
    /// Number of occurrences of each group.
    pub counts: IndexMap<String, usize>,
    /// Atom indices of every occurrence of each group, in pattern order.
    pub group_assignments: IndexMap<String, Vec<Vec<usize>>>,
    pub matched_atoms: BTreeSet<usize>,
    pub status: FragmentStatus,
}

impl FragmentAssignment {
    pub fn success(&self) -> bool {
        self.status == FragmentStatus::Complete
    }

    /// Molecular van der Waals volume and surface area parameters `(r, q)`.
    pub fn van_der_waals(&self, catalog: &GroupCatalog) -> FragmentResult<(f64, f64)> {
        self.counts.iter().try_fold((0.0, 0.0), |(r, q), (group, &n)| {
            let g = catalog
                .get_by_name(group)
                .ok_or_else(|| FragmentError::UnknownGroup(group.clone()))?;
            Ok((r + n as f64 * g.r, q + n as f64 * g.q))
        })
    }

    /// Number of occurrences aggregated by UNIFAC main group.
    pub fn main_group_counts(
        &self,
        catalog: &GroupCatalog,
    ) -> FragmentResult<IndexMap<String, usize>> {
        let mut counts = IndexMap::new();
        for (group, &n) in &self.counts {
            let g = catalog
                .get_by_name(group)
                .ok_or_else(|| FragmentError::UnknownGroup(group.clone()))?;
            *counts.entry(g.main_group.clone()).or_insert(0) += n;
        }
        Ok(counts)
    }

    /// Group counts and the counts of bonds between different group
    /// occurrences. Atoms without a group are ignored.
    pub fn segment_and_bond_count(&self, molecule: &Molecule) -> SegmentAndBondCount {
        let mut owner = vec![None; molecule.atom_count()];
        for (k, (group, atoms)) in self
            .group_assignments
            .iter()
            .flat_map(|(g, occurrences)| occurrences.iter().map(move |a| (g, a)))
            .enumerate()
        {
            atoms.iter().for_each(|&a| owner[a] = Some((k, group)));
        }

        let mut bonds = IndexMap::new();
        for (a, b, _) in molecule.bonds() {
            if let (Some((k1, g1)), Some((k2, g2))) = (owner[a], owner[b]) {
                if k1 != k2 {
                    let key = if g1 <= g2 { [g1, g2] } else { [g2, g1] };
                    *bonds.entry(key.map(String::clone)).or_insert(0.0) += 1.0;
                }
            }
        }
        let segments = self
            .counts
            .iter()
            .map(|(g, &n)| (g.clone(), n as f64))
            .collect();
        SegmentAndBondCount::new(segments, bonds)
    }
}

/// The molecular features used by heterosegmented group-contribution models.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentAndBondCount {
    pub segments: IndexMap<String, f64>,
    pub bonds: IndexMap<[String; 2], f64>,
}

impl SegmentAndBondCount {
    pub fn new(segments: IndexMap<String, f64>, bonds: IndexMap<[String; 2], f64>) -> Self {
        Self { segments, bonds }
    }
}

impl Add for SegmentAndBondCount {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        rhs.segments
            .into_iter()
            .for_each(|(s, n)| *self.segments.entry(s).or_insert(0.0) += n);
        rhs.bonds
            .into_iter()
            .for_each(|(b, n)| *self.bonds.entry(b).or_insert(0.0) += n);
        self
    }
}

struct Candidate<'a> {
    group: &'a FunctionalGroup,
    atoms: Vec<usize>,
}

/// Decomposes a molecule into the functional groups of a catalog.
///
/// Groups covering more atoms take priority; groups of equal size are
/// tried in catalog order. Matches are accepted greedily as long as none of
/// their atoms is taken. If that leaves atoms unassigned, the same
/// prioritized matches are searched for an exact cover of all heavy atoms.
/// If none exists, the greedy result is returned with
/// [FragmentStatus::Incomplete].
pub fn smarts_fragment_priority(
    catalog: &GroupCatalog,
    molecule: &Molecule,
) -> FragmentAssignment {
    let n_atoms = molecule.atom_count();
    let candidates: Vec<_> = catalog
        .iter()
        .enumerate()
        .sorted_by_key(|&(i, g)| (Reverse(g.atoms()), i))
        .flat_map(|(_, group)| {
            let matches = group.pattern().substruct_matches(molecule);
            debug!("{}: {} match(es) of {}", group.group, matches.len(), group.smarts());
            matches.into_iter().map(move |atoms| Candidate { group, atoms })
        })
        .collect();

    let mut assigned = vec![false; n_atoms];
    let mut greedy = Vec::new();
    for (k, candidate) in candidates.iter().enumerate() {
        if candidate.atoms.iter().all(|&a| !assigned[a]) {
            candidate.atoms.iter().for_each(|&a| assigned[a] = true);
            greedy.push(k);
        }
    }
    if assigned.iter().all(|&a| a) {
        debug!("greedy assignment covers all {n_atoms} atoms");
        return assignment(&candidates, greedy, FragmentStatus::Complete);
    }

    let mut by_atom = vec![Vec::new(); n_atoms];
    for (k, candidate) in candidates.iter().enumerate() {
        candidate.atoms.iter().for_each(|&a| by_atom[a].push(k));
    }
    if by_atom.iter().all(|c| !c.is_empty()) {
        debug!("greedy assignment incomplete, searching for an exact cover");
        let mut search = ExactCover::new(&candidates, &by_atom);
        if let Some(mut selection) = search.solve() {
            selection.sort_unstable();
            return assignment(&candidates, selection, FragmentStatus::Complete);
        }
        if search.budget == 0 {
            warn!("exact cover search aborted after {EXACT_COVER_BUDGET} steps");
        }
    }

    let unmatched: Vec<_> = (0..n_atoms).filter(|&a| !assigned[a]).collect();
    warn!(
        "could not assign atoms {unmatched:?} of {} to any functional group",
        molecule.formula()
    );
    assignment(&candidates, greedy, FragmentStatus::Incomplete { unmatched })
}

/// Upper bound on the number of partial covers visited by [ExactCover].
const EXACT_COVER_BUDGET: usize = 100_000;

/// Depth-first search for a set of disjoint candidates covering every atom,
/// branching on the lowest uncovered atom. Covered sets that already failed
/// are not explored again.
struct ExactCover<'a> {
    candidates: &'a [Candidate<'a>],
    by_atom: &'a [Vec<usize>],
    covered: Vec<bool>,
    selection: Vec<usize>,
    failed: HashSet<Vec<bool>>,
    budget: usize,
}

impl<'a> ExactCover<'a> {
    fn new(candidates: &'a [Candidate<'a>], by_atom: &'a [Vec<usize>]) -> Self {
        Self {
            candidates,
            by_atom,
            covered: vec![false; by_atom.len()],
            selection: Vec::new(),
            failed: HashSet::new(),
            budget: EXACT_COVER_BUDGET,
        }
    }

    fn solve(&mut self) -> Option<Vec<usize>> {
        self.search().then(|| self.selection.clone())
    }

    fn search(&mut self) -> bool {
        let Some(atom) = self.covered.iter().position(|&c| !c) else {
            return true;
        };
        if self.budget == 0 || self.failed.contains(&self.covered) {
            return false;
        }
        self.budget -= 1;
        let (candidates, by_atom) = (self.candidates, self.by_atom);
        for &k in &by_atom[atom] {
            let atoms = &candidates[k].atoms;
            if atoms.iter().any(|&a| self.covered[a]) {
                continue;
            }
            atoms.iter().for_each(|&a| self.covered[a] = true);
            self.selection.push(k);
            if self.search() {
                return true;
            }
            self.selection.pop();
            atoms.iter().for_each(|&a| self.covered[a] = false);
        }
        if self.budget > 0 {
            self.failed.insert(self.covered.clone());
        }
        false
    }
}

fn assignment(
    candidates: &[Candidate],
    selection: Vec<usize>,
    status: FragmentStatus,
) -> FragmentAssignment {
    let mut counts = IndexMap::new();
    let mut group_assignments: IndexMap<_, Vec<_>> = IndexMap::new();
    let mut matched_atoms = BTreeSet::new();
    for k in selection {
        let Candidate { group, atoms } = &candidates[k];
        *counts.entry(group.group.clone()).or_insert(0) += 1;
        group_assignments
            .entry(group.group.clone())
            .or_default()
            .push(atoms.clone());
        matched_atoms.extend(atoms.iter().copied());
    }
    FragmentAssignment {
        counts,
        group_assignments,
        matched_atoms,
        status,
    }
}
