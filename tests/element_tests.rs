use flightscore::elements::{Element, Line, Loop, Snap, Spin, StallTurn, TimeBase};
use flightscore::geometry::{euler, Transform, Vec3};
use rstest::rstest;
use std::f64::consts::PI;

fn upright() -> Transform {
    Transform::new(Vec3::new(-100.0, 150.0, 100.0), euler(PI, 0.0, 0.0))
}

#[rstest]
#[case(30.0, 60.0, 0.0)]
#[case(20.0, 100.0, PI)]
#[case(40.0, 40.0, -2.0 * PI)]
fn line_ends_one_length_along_the_heading(#[case] speed: f64, #[case] length: f64, #[case] roll: f64) {
    let el = Element::Line(Line::new("e1", speed, length, roll));
    let tp = el.create_template(&upright(), TimeBase::freq(25.0)).unwrap();
    let travelled = tp.last().unwrap().pos - tp.first().unwrap().pos;
    assert!((travelled - Vec3::new(length, 0.0, 0.0)).norm() < 1e-6);
    assert!((tp.duration() - length / speed).abs() < 1e-9);
}

#[rstest]
#[case(2.0 * PI, 50.0)]
#[case(-2.0 * PI, 80.0)]
#[case(2.0 * PI, 30.0)]
fn full_loops_close(#[case] angle: f64, #[case] radius: f64) {
    let el = Element::Loop(Loop::new("e1", 30.0, angle, radius, 0.0, 0.0));
    let tp = el.create_template(&upright(), TimeBase::freq(25.0)).unwrap();
    assert!((tp.last().unwrap().pos - tp.first().unwrap().pos).norm() < 1e-6);
    let top = tp.samples.iter().map(|s| s.pos.z).fold(f64::NEG_INFINITY, f64::max);
    let bottom = tp.samples.iter().map(|s| s.pos.z).fold(f64::INFINITY, f64::min);
    assert!((top - bottom - 2.0 * radius).abs() < 0.5, "{}", top - bottom);
}

#[rstest]
#[case::line(Element::Line(Line::new("e1", 30.0, 60.0, PI)))]
#[case::loop_(Element::Loop(Loop::new("e1", 30.0, PI, 50.0, 0.0, 0.0)))]
#[case::rolling_loop(Element::Loop(Loop::new("e1", 30.0, 2.0 * PI, 60.0, PI, 0.0)))]
#[case::snap(Element::Snap(Snap::new("e1", 30.0, 45.0, 2.0 * PI, 0.3)))]
#[case::stall_turn(Element::StallTurn(StallTurn::new("e1", 2.0)))]
#[case::spin(Element::Spin(Spin::new("e1", 10.0, 100.0, 2.0 * PI, 0.0, 0.3)))]
#[case::inverted_spin(Element::Spin(Spin::new("e1", 10.0, 150.0, -4.0 * PI, 0.0, 0.4)))]
#[case::reversing_spin(Element::Spin(Spin::new("e1", 10.0, 160.0, 2.0 * PI, 2.0 * PI, 0.3)))]
fn own_template_matches_itself(#[case] el: Element) {
    let tp = el.create_template(&upright(), TimeBase::freq(25.0)).unwrap();
    let matched = el.match_intention(&upright(), &tp).unwrap();
    assert!(matched.approx_eq(&el, 0.05), "{:?} vs {:?}", matched, el);
}

#[rstest]
#[case(2.0 * PI, 0.0)]
#[case(4.0 * PI, 0.0)]
#[case(-4.0 * PI, 0.0)]
fn spin_drops_its_height(#[case] turns: f64, #[case] rturns: f64) {
    let el = Element::Spin(Spin::new("e1", 10.0, 100.0, turns, rturns, 0.3));
    let tp = el.create_template(&upright(), TimeBase::freq(25.0)).unwrap();
    let drop = tp.first().unwrap().pos.z - tp.last().unwrap().pos.z;
    assert!((drop - 100.0).abs() < 1e-6);
    let matched = el.match_intention(&upright(), &tp).unwrap();
    assert_eq!(matched.roll().signum(), el.roll().signum());
    assert!((matched.get_parameter("height").unwrap() - 100.0).abs() < 1e-6);
    assert!((matched.get_parameter("break_angle").unwrap() - 0.3).abs() < 0.01);
}

#[test]
fn flown_timebase_reuses_the_flown_timestamps() {
    let el = Element::Line(Line::new("e1", 30.0, 60.0, 0.0));
    let fast = el.create_template(&upright(), TimeBase::freq(50.0)).unwrap();
    let tp = el.create_template(&upright(), TimeBase::Flown(&fast)).unwrap();
    assert_eq!(tp.times(), fast.times());
    assert_eq!(tp.element_names(), vec!["e1"]);
}

#[test]
fn copy_direction_takes_the_sign_only() {
    let a = Element::Line(Line::new("e1", 30.0, 60.0, PI));
    let b = Element::Line(Line::new("e1", 25.0, 50.0, -PI / 2.0));
    let c = a.copy_direction(&b);
    assert_eq!(c.roll(), -PI);
    assert_eq!(c.speed(), 30.0);
}

#[test]
fn degenerate_elements_are_errors() {
    let bad = [
        Element::Line(Line::new("e1", 0.0, 60.0, 0.0)),
        Element::Loop(Loop::new("e1", 30.0, PI, 0.0, 0.0, 0.0)),
        Element::Snap(Snap::new("e1", 30.0, 45.0, 0.1, 0.3)),
        Element::StallTurn(StallTurn::new("e1", 0.0)),
    ];
    for el in bad {
        assert!(el.create_template(&upright(), TimeBase::freq(25.0)).is_err(), "{:?}", el);
    }
}
