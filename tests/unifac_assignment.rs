use approx::assert_relative_eq;
use feos_fragments::*;
use indexmap::IndexMap;

fn counts(pairs: &[(&str, usize)]) -> IndexMap<String, usize> {
    pairs.iter().map(|&(g, n)| (g.to_string(), n)).collect()
}

fn original_unifac() -> FragmentResult<GroupCatalog> {
    let ids: Vec<u32> = (1..22).chain([27]).collect();
    GroupCatalog::unifac()?.select(&ids)
}

#[test]
pub fn test_unifac_assignment() -> anyhow::Result<()> {
    let catalog = original_unifac()?;
    let chemical = Chemical::new("17059-44-8")?;
    let assignment = smarts_fragment_priority(&catalog, &chemical.molecule);
    assert!(assignment.success());
    assert_eq!(assignment.status.to_string(), "OK");
    assert_eq!(
        assignment.counts,
        counts(&[("ACCH3", 2), ("ACCH2", 1), ("ACH", 3), ("CH3", 1), ("CH2", 1)])
    );
    assert_eq!(assignment.matched_atoms.len(), 11);

    let (r, q) = assignment.van_der_waals(&catalog)?;
    assert_relative_eq!(r, 6.7416, epsilon = 1e-10);
    assert_relative_eq!(q, 5.184, epsilon = 1e-10);
    Ok(())
}

#[test]
fn test_repeated_assignment() -> anyhow::Result<()> {
    let catalog = original_unifac()?;
    let molecule = Molecule::from_smiles("CCCc1cccc(C)c1C")?;
    let first = smarts_fragment_priority(&catalog, &molecule);
    let second = smarts_fragment_priority(&catalog, &molecule);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_common_solvents() -> anyhow::Result<()> {
    let catalog = GroupCatalog::unifac()?;
    let database = ChemicalDatabase::default_database()?;
    let expected = [
        ("benzene", counts(&[("ACH", 6)])),
        ("toluene", counts(&[("ACCH3", 1), ("ACH", 5)])),
        ("ethylbenzene", counts(&[("ACCH2", 1), ("CH3", 1), ("ACH", 5)])),
        ("p-xylene", counts(&[("ACCH3", 2), ("ACH", 4)])),
        ("hexane", counts(&[("CH3", 2), ("CH2", 4)])),
        ("isobutane", counts(&[("CH3", 3), ("CH", 1)])),
        ("cyclohexane", counts(&[("CH2", 6)])),
        ("1-hexene", counts(&[("CH2=CH", 1), ("CH3", 1), ("CH2", 3)])),
        ("ethanol", counts(&[("CH3", 1), ("CH2", 1), ("OH", 1)])),
        ("methanol", counts(&[("CH3OH", 1)])),
        ("water", counts(&[("H2O", 1)])),
        ("phenol", counts(&[("ACOH", 1), ("ACH", 5)])),
        ("acetone", counts(&[("CH3CO", 1), ("CH3", 1)])),
        ("acetaldehyde", counts(&[("CHO", 1), ("CH3", 1)])),
        ("ethyl acetate", counts(&[("CH3COO", 1), ("CH2", 1), ("CH3", 1)])),
        ("diethyl ether", counts(&[("CH2O", 1), ("CH3", 2), ("CH2", 1)])),
        ("tetrahydrofuran", counts(&[("THF", 1), ("CH2", 3)])),
    ];
    for (name, groups) in expected {
        let molecule = database.get(name)?.molecule()?;
        let assignment = smarts_fragment_priority(&catalog, &molecule);
        assert!(assignment.success(), "{name}");
        assert_eq!(assignment.counts, groups, "{name}");
        assert_eq!(assignment.matched_atoms.len(), molecule.atom_count(), "{name}");
    }
    Ok(())
}

#[test]
fn test_backtracking() -> anyhow::Result<()> {
    // greedily taking the central CH2-CH2 pair strands both methyl groups
    let catalog = GroupCatalog::new(vec![
        FunctionalGroup::new(1, "CH2CH2", 1, "CH2", 1.3488, 1.08, "[CX4;H2][CX4;H2]")?,
        FunctionalGroup::new(2, "CH3CH2", 1, "CH2", 1.5755, 1.388, "[CX4;H3][CX4;H2]")?,
    ]);
    let molecule = Molecule::from_smiles("CCCC")?;
    let assignment = smarts_fragment_priority(&catalog, &molecule);
    assert!(assignment.success());
    assert_eq!(assignment.counts, counts(&[("CH3CH2", 2)]));
    assert_eq!(
        assignment.group_assignments["CH3CH2"],
        vec![vec![0, 1], vec![3, 2]]
    );
    Ok(())
}

#[test]
fn test_incomplete_assignment() -> anyhow::Result<()> {
    let catalog = GroupCatalog::unifac()?.select(&[1, 2])?;
    let molecule = Molecule::from_smiles("c1ccccc1")?;
    let assignment = smarts_fragment_priority(&catalog, &molecule);
    assert!(!assignment.success());
    assert_eq!(assignment.status.to_string(), "Did not match all atoms present");
    assert_eq!(
        assignment.status,
        FragmentStatus::Incomplete {
            unmatched: (0..6).collect()
        }
    );
    assert!(assignment.counts.is_empty());

    let assignment = smarts_fragment_priority(&catalog, &Molecule::from_smiles("CCO")?);
    assert_eq!(assignment.counts, counts(&[("CH3", 1), ("CH2", 1)]));
    assert_eq!(
        assignment.status,
        FragmentStatus::Incomplete { unmatched: vec![2] }
    );
    Ok(())
}

#[test]
fn test_catalog_from_json() -> anyhow::Result<()> {
    let catalog = GroupCatalog::from_json("tests/ethanol_groups.json")?;
    assert_eq!(catalog.len(), 2);
    let molecule = Molecule::from_smiles("CCO")?;
    let assignment = smarts_fragment_priority(&catalog, &molecule);
    assert_eq!(assignment.counts, counts(&[("CH2OH", 1), ("CH3", 1)]));
    assert_eq!(assignment.group_assignments["CH2OH"], vec![vec![1, 2]]);

    let (r, q) = assignment.van_der_waals(&catalog)?;
    assert_relative_eq!(r, 2.5755, epsilon = 1e-10);
    assert_relative_eq!(q, 2.588, epsilon = 1e-10);
    Ok(())
}

#[test]
fn test_features_of_mixture() -> anyhow::Result<()> {
    let catalog = original_unifac()?;
    let features = ["toluene", "hexane"]
        .iter()
        .map(|name| -> FragmentResult<_> {
            let chemical = Chemical::new(name)?;
            Ok(smarts_fragment_priority(&catalog, &chemical.molecule)
                .segment_and_bond_count(&chemical.molecule))
        })
        .collect::<FragmentResult<Vec<_>>>()?;
    let total = features
        .into_iter()
        .fold(SegmentAndBondCount::default(), |acc, f| acc + f);
    assert_eq!(total.segments["ACH"], 5.0);
    assert_eq!(total.segments["CH2"], 4.0);
    assert_eq!(total.segments["CH3"], 2.0);
    assert_eq!(total.bonds[&["CH2".to_string(), "CH2".to_string()]], 3.0);
    assert_eq!(total.bonds[&["CH2".to_string(), "CH3".to_string()]], 2.0);
    Ok(())
}

fn toluene_units(n: usize) -> String {
    vec!["Cc1ccccc1"; n].join(".")
}

#[test]
fn test_unassignable_atom_ends_search() -> anyhow::Result<()> {
    let catalog = GroupCatalog::unifac()?;
    let molecule = Molecule::from_smiles(&format!("{}.Cl", toluene_units(30)))?;
    let assignment = smarts_fragment_priority(&catalog, &molecule);
    assert_eq!(
        assignment.status,
        FragmentStatus::Incomplete {
            unmatched: vec![210]
        }
    );
    assert_eq!(assignment.counts, counts(&[("ACCH3", 30), ("ACH", 150)]));
    Ok(())
}

#[test]
fn test_failed_covers_are_not_revisited() -> anyhow::Result<()> {
    // every toluene unit can be split two ways, the diol tail never closes
    let catalog: GroupCatalog = GroupCatalog::unifac()?
        .select(&[1, 9, 10, 11])?
        .iter()
        .cloned()
        .chain([FunctionalGroup::new(
            28,
            "CH2OH",
            5,
            "OH",
            1.6744,
            1.74,
            "[OX2;H1][CX4;H2]",
        )?])
        .collect();
    let molecule = Molecule::from_smiles(&format!("{}.OCO", toluene_units(40)))?;
    let assignment = smarts_fragment_priority(&catalog, &molecule);
    assert_eq!(
        assignment.status,
        FragmentStatus::Incomplete {
            unmatched: vec![282]
        }
    );
    assert_eq!(
        assignment.counts,
        counts(&[("ACCH3", 40), ("CH2OH", 1), ("ACH", 200)])
    );
    Ok(())
}
