use crate::error::{FragmentError, FragmentResult};
use crate::smarts::SmartsPattern;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Clone, Serialize, Deserialize)]
struct FunctionalGroupRecord {
    id: u32,
    group: String,
    main_group_id: u32,
    main_group: String,
    r: f64,
    q: f64,
    smarts: String,
}

/// A UNIFAC subgroup together with the SMARTS pattern that identifies it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionalGroupRecord", into = "FunctionalGroupRecord")]
pub struct FunctionalGroup {
    pub id: u32,
    pub group: String,
    pub main_group_id: u32,
    pub main_group: String,
    /// Van der Waals volume parameter.
    pub r: f64,
    /// Van der Waals surface area parameter.
    pub q: f64,
    pattern: SmartsPattern,
}

impl FunctionalGroup {
    pub fn new(
        id: u32,
        group: &str,
        main_group_id: u32,
        main_group: &str,
        r: f64,
        q: f64,
        smarts: &str,
    ) -> FragmentResult<Self> {
        Ok(Self {
            id,
            group: group.into(),
            main_group_id,
            main_group: main_group.into(),
            r,
            q,
            pattern: SmartsPattern::parse(smarts)?,
        })
    }

    pub fn pattern(&self) -> &SmartsPattern {
        &self.pattern
    }

    pub fn smarts(&self) -> &str {
        self.pattern.smarts()
    }

    /// Number of heavy atoms covered by one occurrence of the group.
    pub fn atoms(&self) -> usize {
        self.pattern.atom_count()
    }
}

impl TryFrom<FunctionalGroupRecord> for FunctionalGroup {
    type Error = FragmentError;

    fn try_from(record: FunctionalGroupRecord) -> FragmentResult<Self> {
        Self::new(
            record.id,
            &record.group,
            record.main_group_id,
            &record.main_group,
            record.r,
            record.q,
            &record.smarts,
        )
    }
}

impl From<FunctionalGroup> for FunctionalGroupRecord {
    fn from(group: FunctionalGroup) -> Self {
        Self {
            smarts: group.smarts().to_string(),
            id: group.id,
            group: group.group,
            main_group_id: group.main_group_id,
            main_group: group.main_group,
            r: group.r,
            q: group.q,
        }
    }
}

/// An ordered collection of functional groups.
///
/// The order matters for fragmentation: among groups of equal size, groups
/// listed first are assigned first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupCatalog(Vec<FunctionalGroup>);

impl GroupCatalog {
    pub fn new(groups: Vec<FunctionalGroup>) -> Self {
        Self(groups)
    }

    /// The original UNIFAC subgroups (ids 1 to 27).
    pub fn unifac() -> FragmentResult<Self> {
        Ok(serde_json::from_str(include_str!(
            "../data/unifac_subgroups.json"
        ))?)
    }

    pub fn from_json<P: AsRef<Path>>(file: P) -> FragmentResult<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(file)?))?)
    }

    pub fn to_json<P: AsRef<Path>>(&self, file: P) -> FragmentResult<()> {
        Ok(serde_json::to_writer_pretty(
            BufWriter::new(File::create(file)?),
            self,
        )?)
    }

    /// The groups with the given ids, in the order of `ids`.
    pub fn select(&self, ids: &[u32]) -> FragmentResult<Self> {
        ids.iter()
            .map(|&id| self.get(id).cloned().ok_or(FragmentError::UnknownGroupId(id)))
            .collect()
    }

    pub fn get(&self, id: u32) -> Option<&FunctionalGroup> {
        self.0.iter().find(|g| g.id == id)
    }

    pub fn get_by_name(&self, group: &str) -> Option<&FunctionalGroup> {
        self.0.iter().find(|g| g.group == group)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FunctionalGroup> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FunctionalGroup> for GroupCatalog {
    fn from_iter<T: IntoIterator<Item = FunctionalGroup>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a GroupCatalog {
    type Item = &'a FunctionalGroup;
    type IntoIter = std::slice::Iter<'a, FunctionalGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
