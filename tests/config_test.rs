use flightscore::config::Config;
use rstest::rstest;
use tempfile::tempdir;

#[test]
fn defaults_are_valid() {
    let cfg = Config::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.alignment.dtw_radius, 10);
    assert_eq!(cfg.scoring.difficulty, 3);
    assert_eq!(cfg.scoring.max_score, 10.0);
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut cfg = Config::default();
    cfg.alignment.max_passes = 5;
    cfg.scoring.visibility_enabled = false;
    cfg.save_to_file(&path).unwrap();

    let back = Config::load_from_file(&path).unwrap();
    assert_eq!(back.alignment.max_passes, 5);
    assert!(!back.scoring.visibility_enabled);
    assert!(back.scoring.visibility().is_none());
}

#[test]
fn partial_file_takes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"scoring": {"difficulty": 2}}"#).unwrap();
    let cfg = Config::load_from_file(&path).unwrap();
    assert_eq!(cfg.scoring.difficulty, 2);
    assert_eq!(cfg.scoring.template_freq, 25.0);
    assert_eq!(cfg.alignment.min_element_len, 3);
}

#[rstest]
#[case(r#"{"scoring": {"difficulty": 0}}"#)]
#[case(r#"{"scoring": {"difficulty": 4}}"#)]
#[case(r#"{"alignment": {"min_element_len": 0}}"#)]
#[case(r#"{"scoring": {"template_freq": -1.0}}"#)]
#[case(r#"{"scoring": {"visibility_base": 0.0}}"#)]
#[case("not json")]
fn bad_files_are_rejected(#[case] content: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, content).unwrap();
    assert!(Config::load_from_file(&path).is_err());
}

#[test]
fn missing_file_is_an_error() {
    assert!(Config::load_from_file("/definitely/not/here.json").is_err());
}
