use flightscore::criteria::exponential::load_lookup_file;
use flightscore::criteria::library::CriteriaLibrary;
use flightscore::criteria::{Criteria, CriteriaKind, Exponential};
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[rstest]
#[case("intra.angle", 30.0, 2.0)]
#[case("intra.angle", 90.0, 6.0)]
#[case("intra.track", 30.0, 1.75)]
#[case("intra.roll", 30.0, 1.25)]
#[case("intra.end_roll", 90.0, 6.0)]
fn angular_criteria_hit_their_calibration(#[case] key: &str, #[case] degrees: f64, #[case] dg: f64) {
    let c = CriteriaLibrary::default().get(key).unwrap();
    assert!((c.lookup.lookup(degrees.to_radians(), true) - dg).abs() < 1e-9);
}

#[rstest]
#[case("intra.angle")]
#[case("intra.loopshape")]
#[case("inter.radius")]
#[case("box.box")]
fn downgrades_never_exceed_the_limit(#[case] key: &str) {
    let c = CriteriaLibrary::default().get(key).unwrap();
    if let Some(limit) = c.lookup.limit {
        assert!(c.lookup.lookup(1e6, true) <= limit + 1e-12);
        assert!((c.lookup.lookup(c.lookup.error_limit(), true) - limit).abs() < 1e-6);
    }
}

#[test]
fn unknown_key_is_an_error() {
    assert!(CriteriaLibrary::default().get("intra.wobble").is_err());
}

#[test]
fn continuous_and_bounded_count_differently() {
    let sample = [0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 0.0];
    let cont = Criteria::continuous("c", Exponential::linear(1.0));
    assert_eq!(cont.evaluate(&sample, true).errors, vec![2.0, 1.0]);

    let bounded = Criteria::bounded("b", Exponential::linear(1.0), None, Some(0.5));
    let out = bounded.evaluate(&bounded.prepare(&sample), true);
    assert_eq!(out.errors.len(), 2);
    assert!((out.errors[0] - 1.5).abs() < 1e-12);
}

#[test]
fn deviation_is_relative_to_the_mean() {
    let c = Criteria::new("d", Exponential::linear(1.0), CriteriaKind::Deviation);
    let out = c.evaluate(&[9.0, 11.0, 9.0, 11.0], true);
    assert!((out.errors[0] - 0.1).abs() < 1e-12);
}

#[test]
fn lookup_file_overrides_library_curves() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "group;name;exponent;error;downgrade;haslimit").unwrap();
    writeln!(file, "intra;loopshape;1.0;2.0;1.0;true").unwrap();
    writeln!(file, "intra;nothing;1.0;2.0;1.0;false").unwrap();
    writeln!(file, "intra;broken;x;2.0;1.0;false").unwrap();

    let table = load_lookup_file(file.path()).unwrap();
    assert_eq!(table.len(), 2);

    let mut lib = CriteriaLibrary::default();
    let before = lib.len();
    let unknown = lib.apply_lookups(&table);
    assert_eq!(unknown, vec!["intra.nothing".to_string()]);
    assert_eq!(lib.len(), before);

    let shape = lib.get("intra.loopshape").unwrap();
    assert!(shape.lookup.approx_eq(&Exponential::new(0.5, 1.0, Some(1.0)), 1e-12));
}

#[test]
fn missing_lookup_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_lookup_file(dir.path().join("none.csv")).is_err());
}
