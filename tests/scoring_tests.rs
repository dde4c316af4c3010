mod common;

use common::{loops, perfect, rolled, shifted, stall_turn};
use flightscore::analysis::{Analysis, Basic, Scored};
use flightscore::config::Config;
use flightscore::criteria::library::CriteriaLibrary;
use flightscore::definition::builders::loop_;
use flightscore::definition::{ManDef, ManParm};
use flightscore::diagnostics::NullSink;
use flightscore::geometry::Vec3;
use flightscore::state::State;
use std::f64::consts::PI;

fn score(md: &ManDef, flown: State) -> Scored {
    Analysis::Basic(Basic::new(0, md.clone(), flown).unwrap())
        .run(&Config::default(), &CriteriaLibrary::default(), &NullSink)
        .unwrap()
}

#[test]
fn perfect_flights_keep_their_points() {
    for md in [loops(), stall_turn()] {
        let s = score(&md, perfect(&md));
        let summary = s.scores.summary();
        assert!(summary.intra < 0.1, "{}: {:?}", md.uid(), summary);
        assert!(summary.inter < 1e-6, "{}: {:?}", md.uid(), summary);
        assert!(s.score > 9.0, "{}: {}", md.uid(), s.score);
    }
}

#[test]
fn every_element_has_a_result() {
    let md = loops();
    let s = score(&md, perfect(&md));
    let names: Vec<&str> = s.scores.intra.elements.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, md.create().unwrap().element_names());
}

#[test]
fn wobbling_roll_is_downgraded() {
    let md = loops();
    let fl = perfect(&md);
    let clean = score(&md, fl.clone());
    let wobbly = score(&md, rolled(&fl, |i| 0.3 * (i as f64 * 0.12).sin()));
    assert!(
        wobbly.scores.intra.total() > clean.scores.intra.total() + 0.1,
        "{} vs {}",
        wobbly.scores.intra.total(),
        clean.scores.intra.total()
    );
    assert!(wobbly.score < clean.score);
}

#[test]
fn unequal_loops_give_an_inter_downgrade() {
    let md = loops();
    let mut mps = md.mps.clone();
    mps.add(ManParm::new("small_radius", 40.0, "m", None));
    let mut eds = md.eds.clone();
    let e3 = eds.iter().position(|e| e.name == "e3").unwrap();
    eds[e3] = loop_("e3", "speed", "small_radius", -2.0 * PI, 0.0);
    let flown_as = ManDef::new(md.info.clone(), mps, eds, md.judging_box).unwrap();

    let s = score(&md, perfect(&flown_as));
    let radius = s.scores.inter.get("loop_radius").unwrap();
    assert!(radius.total() > 0.0);
    assert!(s.scores.inter.total() > 0.0);
}

#[test]
fn leaving_the_box_costs_positioning() {
    let md = loops();
    let fl = perfect(&md);
    let inside = score(&md, fl.clone());
    let outside = score(&md, shifted(&fl, Vec3::new(400.0, 0.0, 0.0)));
    assert!(outside.scores.positioning.total() > inside.scores.positioning.total() + 0.1);
    assert!((outside.scores.intra.total() - inside.scores.intra.total()).abs() < 0.5);
}

#[test]
fn scores_never_go_negative() {
    let md = loops();
    let fl = perfect(&md);
    let wrecked = rolled(&fl, |i| if i % 20 < 10 { 1.5 } else { -1.5 });
    let s = score(&md, wrecked);
    assert!(s.score >= 0.0);
    assert!(s
        .scores
        .intra
        .elements
        .iter()
        .flat_map(|r| r.results.iter())
        .all(|r| r.dgs.iter().all(|d| *d >= 0.0)));
}

#[test]
fn scored_analysis_survives_json() {
    let md = loops();
    let s = score(&md, perfect(&md));
    let a = Analysis::Scored(s);
    let back = Analysis::from_json(&a.to_json().unwrap(), false).unwrap();
    assert_eq!(back, a);
}
