//! End-to-end scenarios: raw text rows through validation, recommendation
//! and every procedure.

use u_abtest::config::EngineConfig;
use u_abtest::procedures::TestResult;
use u_abtest::session::ComparisonSlots;
use u_abtest::table::{CanonicalTable, RawTable};
use u_abtest::validate::{validate, ValidationError};
use u_abtest::{Engine, Error, ProcedureId};

fn two_group_table() -> CanonicalTable {
    CanonicalTable::from_groups(&[
        ("A", &[1.0, 2.0, 3.0, 4.0, 5.0][..]),
        ("B", &[6.0, 7.0, 8.0, 9.0, 10.0][..]),
    ])
    .unwrap()
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default().with_seed(2024)).unwrap()
}

#[test]
fn two_sample_separated_groups_is_significant() {
    match engine().run(ProcedureId::TwoSample, &two_group_table()).unwrap() {
        TestResult::Point(r) => {
            assert!(r.p_value < 0.01, "p = {}", r.p_value);
            assert!(r.significant);
            assert!(r.conclusion.contains("is statistically significant"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn resampling_separated_groups_near_zero() {
    match engine().run(ProcedureId::Resampling, &two_group_table()).unwrap() {
        TestResult::Resampling(r) => {
            assert_eq!(r.iterations, 10_000);
            assert!(r.p_value < 0.02, "p = {}", r.p_value);
            assert!(r.null_distribution.iter().all(|d| *d <= r.observed_diff + 1e-9));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn probabilistic_separated_groups() {
    match engine().run(ProcedureId::Probabilistic, &two_group_table()).unwrap() {
        TestResult::Probabilistic(r) => {
            // B is clearly larger, so A is almost never better.
            assert!(r.prob_b_better > 0.95);
            assert!((r.prob_a_better + r.prob_b_better - 1.0).abs() < 1e-12);
            assert!(r.conclusion.starts_with("There is a "));
            assert!(r.conclusion.ends_with("chance that `A` is better than `B`."));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn posthoc_identical_groups_no_rejections() {
    let values = [4.0, 5.0, 6.0, 5.5, 4.5];
    let table = CanonicalTable::from_groups(&[
        ("north", &values[..]),
        ("south", &values[..]),
        ("west", &values[..]),
    ])
    .unwrap();
    match engine().run(ProcedureId::PosthocPairwise, &table).unwrap() {
        TestResult::Pairwise(r) => {
            assert_eq!(r.rows.len(), 3);
            assert!(r.rows.iter().all(|row| !row.reject));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn recommendations_all_run_for_three_groups() {
    let table = CanonicalTable::from_groups(&[
        ("a", &[1.0, 2.0, 3.0, 2.5][..]),
        ("b", &[2.0, 3.0, 4.0, 3.5][..]),
        ("c", &[5.0, 6.0, 7.0, 6.5][..]),
    ])
    .unwrap();
    let engine = engine();
    let rec = engine.recommend(&table);
    assert_eq!(
        rec.as_slice(),
        &[
            ProcedureId::MultiGroupVariance,
            ProcedureId::PosthocPairwise,
            ProcedureId::Resampling
        ]
    );
    assert!(engine.run(ProcedureId::MultiGroupVariance, &table).is_ok());
    assert!(engine.run(ProcedureId::PosthocPairwise, &table).is_ok());
    // Listed for three groups, but the permutation test compares two.
    assert!(engine.run(ProcedureId::Resampling, &table).is_err());
}

#[test]
fn raw_csv_rows_to_verdict() {
    let rows: Vec<Vec<String>> = [
        ("1", "control", "12.1"),
        ("2", "treatment", "14.3"),
        ("3", "control", "11.8"),
        ("4", "treatment", "NA"),
        ("5", "control", "12.6"),
        ("6", "treatment", "15.0"),
        ("7", "control", "12.0"),
        ("8", "treatment", "14.1"),
    ]
    .iter()
    .map(|(id, g, v)| vec![id.to_string(), g.to_string(), v.to_string()])
    .collect();
    let raw = RawTable::from_text_rows(&["User Id", " Bucket ", "Spend"], &rows).unwrap();

    // `user id` is numeric with >5 distinct values, so it is chosen as
    // the default metric ahead of `spend`.
    let table = validate(&raw).unwrap();
    assert_eq!(table.len(), 8);
    assert_eq!(table.group_labels(), vec!["control", "treatment"]);

    let engine = engine();
    let selection = u_abtest::validate::ColumnSelection::new("bucket", "spend");
    let result = engine
        .analyze_with(&raw, &selection, ProcedureId::TwoSample)
        .unwrap();
    assert!(result.p_value().unwrap() < 0.05);
}

#[test]
fn invalid_dataset_surfaces_validation_error() {
    let rows: Vec<Vec<String>> = (0..20)
        .map(|i| vec![format!("store-{i}"), format!("{}", i * 3)])
        .collect();
    let raw = RawTable::from_text_rows(&["store", "sales"], &rows).unwrap();
    match engine().analyze(&raw, ProcedureId::TwoSample) {
        Err(Error::Validation(ValidationError::NoGroupColumn)) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn results_serialize_for_export() {
    let engine = Engine::new(EngineConfig {
        permutation_iterations: 50,
        posterior_samples: 50,
        seed: Some(1),
        ..EngineConfig::default()
    })
    .unwrap();
    let table = two_group_table();
    for id in engine.recommend(&table) {
        let result = engine.run(id, &table).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("kind").is_some(), "{id}: {json}");
    }
}

#[test]
fn comparison_slots_hold_two_runs() {
    let engine = engine();
    let table = two_group_table();
    let mut slots = ComparisonSlots::default();
    slots.record(engine.run(ProcedureId::TwoSample, &table).unwrap());
    slots.record(engine.run(ProcedureId::Probabilistic, &table).unwrap());
    let (first, second) = slots.both().unwrap();
    assert_eq!(first.procedure, ProcedureId::TwoSample);
    assert_eq!(second.procedure, ProcedureId::Probabilistic);
}
