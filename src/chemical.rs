use crate::error::{FragmentError, FragmentResult};
use crate::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Identifiers and structure of a pure chemical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalRecord {
    pub cas: String,
    pub name: String,
    pub formula: String,
    pub smiles: String,
}

impl ChemicalRecord {
    pub fn new(cas: &str, name: &str, formula: &str, smiles: &str) -> Self {
        Self {
            cas: cas.into(),
            name: name.into(),
            formula: formula.into(),
            smiles: smiles.into(),
        }
    }

    pub fn molecule(&self) -> FragmentResult<Molecule> {
        Molecule::from_smiles(&self.smiles)
    }

    fn matches(&self, identifier: &str) -> bool {
        self.cas == identifier || self.name.eq_ignore_ascii_case(identifier)
    }
}

/// A registry of chemicals searchable by CAS number or name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChemicalDatabase(Vec<ChemicalRecord>);

impl ChemicalDatabase {
    pub fn new(records: Vec<ChemicalRecord>) -> Self {
        Self(records)
    }

    /// The registry shipped with the crate.
    pub fn default_database() -> FragmentResult<Self> {
        Ok(serde_json::from_str(include_str!("../data/chemicals.json"))?)
    }

    pub fn from_json<P: AsRef<Path>>(file: P) -> FragmentResult<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(file)?))?)
    }

    pub fn get(&self, identifier: &str) -> FragmentResult<&ChemicalRecord> {
        let identifier = identifier.trim();
        self.0
            .iter()
            .find(|r| r.matches(identifier))
            .ok_or_else(|| FragmentError::UnknownChemical(identifier.into()))
    }

    pub fn records(&self) -> &[ChemicalRecord] {
        &self.0
    }
}

/// A chemical resolved from the default registry.
#[derive(Clone, Debug)]
pub struct Chemical {
    pub record: ChemicalRecord,
    pub molecule: Molecule,
}

impl Chemical {
    pub fn new(identifier: &str) -> FragmentResult<Self> {
        ChemicalDatabase::default_database()?
            .get(identifier)?
            .clone()
            .try_into()
    }
}

impl TryFrom<ChemicalRecord> for Chemical {
    type Error = FragmentError;

    fn try_from(record: ChemicalRecord) -> FragmentResult<Self> {
        let molecule = record.molecule()?;
        Ok(Self { record, molecule })
    }
}
