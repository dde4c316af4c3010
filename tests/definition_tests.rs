mod common;

use common::{loops, perfect, schedule, stall_turn};
use flightscore::definition::builders::line;
use flightscore::definition::{
    Expr, Heading, ManDef, ManDefOrOption, ManOption, ManParm, ManParms, SchedDef,
};
use flightscore::scoring::JudgingBox;
use rstest::rstest;
use std::f64::consts::PI;

#[test]
fn entry_and_exit_lines_are_added() {
    let man = loops().create().unwrap();
    assert_eq!(
        man.element_names(),
        vec!["entry_line", "e1", "e2", "e3", "e4", "exit_line"]
    );
}

#[test]
fn duplicate_element_names_are_rejected() {
    let md = loops();
    let mut eds = md.eds.clone();
    eds.insert(2, line("e1", "speed", 10.0));
    assert!(ManDef::new(md.info.clone(), md.mps.clone(), eds, JudgingBox::triangular()).is_err());
}

#[test]
fn unknown_parameter_fails_on_create() {
    let md = loops();
    let mut eds = md.eds.clone();
    let at = eds.len() - 1;
    eds.insert(at, line("e9", "speed", "nowhere"));
    let bad = ManDef::new(md.info.clone(), md.mps.clone(), eds, JudgingBox::triangular());
    assert!(bad.and_then(|m| m.create()).is_err());
}

#[test]
fn element_references_read_earlier_elements() {
    let md = loops();
    let mut eds = md.eds.clone();
    let at = eds.len() - 1;
    eds.insert(at, line("e9", "speed", Expr::parse("e1.radius/2").unwrap()));
    let md = ManDef::new(md.info.clone(), md.mps.clone(), eds, JudgingBox::triangular()).unwrap();
    let man = md.create().unwrap();
    let e9 = man.elements.iter().find(|e| e.uid() == "e9").unwrap();
    assert!((e9.get_parameter("length").unwrap() - 27.5).abs() < 1e-9);
}

#[test]
fn element_references_cannot_look_ahead() {
    let md = loops();
    let mut eds = md.eds.clone();
    eds.insert(1, line("e9", "speed", Expr::parse("e4.length").unwrap()));
    let md = ManDef::new(md.info.clone(), md.mps.clone(), eds, JudgingBox::triangular()).unwrap();
    assert!(md.create().is_err());
}

#[rstest]
#[case("loop_radius*2", 110.0)]
#[case("(speed+10)/2", 20.0)]
#[case("abs(-roll_rate)", PI)]
#[case("90°", PI / 2.0)]
fn expressions_read_parameter_defaults(#[case] text: &str, #[case] expected: f64) {
    let mps = loops().mps;
    let v = Expr::parse(text).unwrap().eval(&mps).unwrap();
    assert!((v - expected).abs() < 1e-9, "{} = {}", text, v);
}

#[test]
fn collector_graph_links_shared_parameters() {
    let md = loops();
    let radius = md.mps.index("loop_radius").unwrap();
    let slots: Vec<&str> = md
        .mps
        .graph
        .slots_of(radius)
        .iter()
        .map(|s| s.element.as_str())
        .collect();
    assert_eq!(slots, vec!["e1", "e3"]);
}

#[test]
fn update_defaults_takes_the_flown_mean() {
    let md = loops();
    let mut man = md.create().unwrap();
    for (name, r) in [("e1", 50.0), ("e3", 60.0)] {
        let i = man.element_names().iter().position(|n| n == name).unwrap();
        if let flightscore::elements::Element::Loop(l) = &mut man.elements[i] {
            l.radius = r;
        }
    }
    let updated = md.update_defaults(&man).unwrap();
    assert!((updated.mps.value("loop_radius").unwrap() - 55.0).abs() < 1e-9);

    if let flightscore::elements::Element::Loop(l) = &mut man.elements[1] {
        l.radius = 70.0;
    }
    let updated = md.update_defaults(&man).unwrap();
    assert!((updated.mps.value("loop_radius").unwrap() - 65.0).abs() < 1e-9);
}

#[test]
fn mandef_json_round_trip() {
    let md = stall_turn();
    let text = serde_json::to_string_pretty(&md).unwrap();
    assert!(text.contains("\"box\""));
    let back: ManDef = serde_json::from_str(&text).unwrap();
    assert_eq!(back, md);
    assert_eq!(back.create().unwrap(), md.create().unwrap());
}

#[test]
fn options_must_share_a_short_name() {
    assert!(ManOption::new(vec![loops(), stall_turn()]).is_err());
    assert!(ManOption::new(vec![]).is_err());
    let opt = ManOption::new(vec![loops(), loops()]).unwrap();
    let mdo = ManDefOrOption::Options(opt);
    assert_eq!(mdo.uid(), "loops");
    assert_eq!(mdo.options().len(), 2);
    assert_eq!(mdo.k(), 3.0);
}

#[test]
fn empty_option_set_cannot_be_read() {
    assert!(serde_json::from_str::<ManOption>(r#"{"options": []}"#).is_err());
    let opt = ManOption::new(vec![stall_turn(), stall_turn()]).unwrap();
    let back: ManOption = serde_json::from_str(&serde_json::to_string(&opt).unwrap()).unwrap();
    assert_eq!(back.options().len(), 2);
    assert_eq!(back.primary().uid(), "stall");
}

#[test]
fn schedule_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sched.json");
    let sched = schedule();
    sched.save_to_file(&path).unwrap();
    let back = SchedDef::load_from_file(&path).unwrap();
    assert_eq!(back, sched);
    assert_eq!(back.len(), 2);
    assert!(back.get("stall").is_some());
    assert!(back.get("nothing").is_none());
}

#[test]
fn schedule_file_with_bad_definition_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sched.json");
    std::fs::write(&path, r#"{"name": "x", "manoeuvres": [{"info": 3}]}"#).unwrap();
    assert!(SchedDef::load_from_file(&path).is_err());
}

#[rstest]
#[case(Heading::Right)]
#[case(Heading::Left)]
fn box_fit_centres_the_manoeuvre(#[case] heading: Heading) {
    let md = loops();
    let it = md.initial_transform(heading, 150.0);
    let (_, tp) = md.fit_box(&it).unwrap().create_template(&it, 25.0).unwrap();
    let start = tp.span("e1").unwrap().start;
    let stop = tp.span("e4").unwrap().stop;
    let xs: Vec<f64> = tp.samples[start..stop].iter().map(|s| s.pos.x).collect();
    let lo = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(((lo + hi) / 2.0).abs() < 5.0, "centre at {}", (lo + hi) / 2.0);
}

#[test]
fn fitted_template_is_labelled_in_order() {
    let md = stall_turn();
    let tp = perfect(&md);
    assert_eq!(tp.element_names(), md.create().unwrap().element_names());
    assert_eq!(tp.labels.first().unwrap().start, 0);
    assert_eq!(tp.labels.last().unwrap().stop, tp.len());
    assert!(tp.labels.windows(2).all(|w| w[0].stop == w[1].start));
}

#[test]
fn manparm_without_criteria_is_not_compared() {
    let mps = ManParms::new(vec![ManParm::new("speed", 30.0, "m/s", None)]);
    let md = ManDef::new(
        loops().info,
        mps,
        vec![line("e1", "speed", 50.0), line("e2", "speed", 80.0)],
        JudgingBox::triangular(),
    )
    .unwrap();
    let res = md.mps.inter_results(&md.create().unwrap(), true).unwrap();
    assert!(res.results.is_empty());
}
