use crate::{
    smarts_fragment_priority, Chemical, FragmentAssignment, FragmentError, GroupCatalog, Molecule,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

impl From<FragmentError> for PyErr {
    fn from(e: FragmentError) -> PyErr {
        PyValueError::new_err(e.to_string())
    }
}

#[pyclass(name = "GroupCatalog")]
#[derive(Clone)]
pub struct PyGroupCatalog(pub GroupCatalog);

#[pymethods]
impl PyGroupCatalog {
    #[staticmethod]
    fn unifac() -> PyResult<Self> {
        Ok(Self(GroupCatalog::unifac()?))
    }

    #[staticmethod]
    fn from_json(path: &str) -> PyResult<Self> {
        Ok(Self(GroupCatalog::from_json(path)?))
    }

    fn select(&self, ids: Vec<u32>) -> PyResult<Self> {
        Ok(Self(self.0.select(&ids)?))
    }

    #[getter]
    fn get_groups(&self) -> Vec<String> {
        self.0.iter().map(|g| g.group.clone()).collect()
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }
}

#[pyclass(name = "Molecule")]
#[derive(Clone)]
pub struct PyMolecule(pub Molecule);

#[pymethods]
impl PyMolecule {
    #[staticmethod]
    fn from_smiles(smiles: &str) -> PyResult<Self> {
        Ok(Self(Molecule::from_smiles(smiles)?))
    }

    /// Resolve a CAS number or name through the built-in registry.
    #[staticmethod]
    fn from_identifier(identifier: &str) -> PyResult<Self> {
        Ok(Self(Chemical::new(identifier)?.molecule))
    }

    #[getter]
    fn get_formula(&self) -> String {
        self.0.formula()
    }

    #[getter]
    fn get_atom_count(&self) -> usize {
        self.0.atom_count()
    }
}

#[pyclass(name = "FragmentAssignment")]
#[derive(Clone)]
pub struct PyFragmentAssignment(pub FragmentAssignment);

#[pymethods]
impl PyFragmentAssignment {
    #[getter]
    fn get_counts(&self) -> HashMap<String, usize> {
        self.0.counts.clone().into_iter().collect()
    }

    #[getter]
    fn get_group_assignments(&self) -> HashMap<String, Vec<Vec<usize>>> {
        self.0.group_assignments.clone().into_iter().collect()
    }

    #[getter]
    fn get_matched_atoms(&self) -> Vec<usize> {
        self.0.matched_atoms.iter().copied().collect()
    }

    #[getter]
    fn get_success(&self) -> bool {
        self.0.success()
    }

    #[getter]
    fn get_status(&self) -> String {
        self.0.status.to_string()
    }

    fn van_der_waals(&self, catalog: &PyGroupCatalog) -> PyResult<(f64, f64)> {
        Ok(self.0.van_der_waals(&catalog.0)?)
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0.counts)
    }
}

#[pyfunction(name = "smarts_fragment_priority")]
fn py_smarts_fragment_priority(
    catalog: &PyGroupCatalog,
    molecule: &PyMolecule,
) -> PyFragmentAssignment {
    PyFragmentAssignment(smarts_fragment_priority(&catalog.0, &molecule.0))
}

#[pymodule]
pub fn feos_fragments(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyGroupCatalog>()?;
    m.add_class::<PyMolecule>()?;
    m.add_class::<PyFragmentAssignment>()?;
    m.add_function(wrap_pyfunction!(py_smarts_fragment_priority, m)?)?;
    Ok(())
}
