//! Electron and muon kinematics of the Z→ee sample on a live ServiceX deployment.

use servicex_query::{EventDataset, Expr, Query, lambda, list, name};

use crate::testlib::{
    assert::expect_count, harness::Harness, helpers::run_transformation,
    physics::dielectron_masses,
};

const ZEE_DATASET: &str = "mc15_13TeV:mc15_13TeV.361106.PowhegPythia8EvtGen_AZNLOCTEQ6L1_Zee.merge.DAOD_STDM3.e3601_s2576_s2132_r6630_r6264_p2363_tid05630052_00";

const DIELECTRON_COUNT: usize = 1_502_958;

/// `ls[collection].Select(lambda x: x.<variable>())` for every kinematic variable.
fn kinematics(collection: i64, var: &str) -> Vec<Expr> {
    ["pt", "eta", "phi", "e"]
        .into_iter()
        .map(|variable| {
            name("ls").index(collection).method(
                "Select",
                vec![lambda([var], name(var).method(variable, vec![]))],
            )
        })
        .collect()
}

fn lepton_query() -> Query {
    EventDataset::new([format!("localds://{ZEE_DATASET}")])
        .select(lambda(
            ["e"],
            list([
                name("e").method("Electrons", vec!["Electrons".into()]),
                name("e").method("Muons", vec!["Muons".into()]),
            ]),
        ))
        .select(lambda(
            ["ls"],
            list(kinematics(0, "e").into_iter().chain(kinematics(1, "m"))),
        ))
        .as_awkward_array([
            "ElePt", "EleEta", "ElePhi", "EleE", "MuPt", "MuEta", "MuPhi", "MuE",
        ])
}

#[test]
fn lepton_query_selects_both_collections() {
    //* When
    let qastle = lepton_query().to_string();

    //* Then
    assert!(qastle.starts_with("(call ResultAwkwardArray (call Select (call Select (call EventDataset (list 'localds://mc15_13TeV:"));
    assert!(qastle.contains("(call (attr e 'Electrons') 'Electrons')"));
    assert!(qastle.contains(
        "(call (attr (subscript ls 1) 'Select') (lambda (list m) (call (attr m 'e'))))"
    ));
    assert!(qastle.ends_with("(list 'ElePt' 'EleEta' 'ElePhi' 'EleE' 'MuPt' 'MuEta' 'MuPhi' 'MuE'))"));
}

#[tokio::test]
#[ignore = "requires a live ServiceX deployment"]
async fn dielectron_masses_are_computed_for_every_two_electron_event() {
    //* Given
    let harness = Harness::live().expect("live harness");
    let request = harness.request(ZEE_DATASET, lepton_query());

    //* When
    let table = run_transformation(&harness, &request)
        .await
        .expect("transformation succeeds");
    let column = |column: &str| table.list_f64_column(column).expect("electron column");
    let masses = dielectron_masses(
        &column("ElePt"),
        &column("EleEta"),
        &column("ElePhi"),
        &column("EleE"),
    )
    .expect("consistent electron columns");

    //* Then
    expect_count("dielectron masses", masses.len(), DIELECTRON_COUNT)
        .expect("one mass per event with two electrons");
}
