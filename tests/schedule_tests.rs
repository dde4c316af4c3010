mod common;

use common::{loops, perfect, schedule, stall_turn};
use flightscore::analysis::{entry_headings, score_schedule, FlightData, ManoeuvreOutcome};
use flightscore::config::Config;
use flightscore::criteria::library::CriteriaLibrary;
use flightscore::definition::{Heading, ManDef, ManDefOrOption, ManOption, SchedDef};
use flightscore::diagnostics::{ChannelSink, DiagnosticEvent, NullSink};
use flightscore::state::State;
use std::sync::mpsc::channel;

fn flights() -> Vec<State> {
    vec![perfect(&loops()), perfect(&stall_turn())]
}

fn flown_on(md: &ManDef, heading: Heading) -> State {
    let it = md.initial_transform(heading, 150.0);
    md.fit_box(&it).unwrap().create_template(&it, 25.0).unwrap().1
}

#[test]
fn entry_follows_the_previous_exit() {
    let sched = SchedDef::new("turnaround", vec![stall_turn().into(), loops().into()]);
    let fl = vec![perfect(&stall_turn()), flown_on(&loops(), Heading::Left)];
    assert_eq!(entry_headings(&sched, &fl), vec![None, Some(Heading::Left)]);
    // the chain does not need the second flight
    assert_eq!(
        entry_headings(&sched, &fl[..1]),
        vec![None, Some(Heading::Left)]
    );
    assert_eq!(entry_headings(&sched, &[]), vec![None, None]);

    let res = score_schedule(
        &sched,
        fl,
        &Config::default(),
        &CriteriaLibrary::default(),
        &NullSink,
    );
    assert_eq!(res.failed(), 0);
    assert!(res.total > 0.8 * (2.0 + 3.0) * 10.0, "{}", res.total);
}

#[test]
fn total_is_the_k_weighted_sum() {
    let res = score_schedule(
        &schedule(),
        flights(),
        &Config::default(),
        &CriteriaLibrary::default(),
        &NullSink,
    );
    assert_eq!(res.failed(), 0);
    let names: Vec<&str> = res.manoeuvres.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["loops", "stall"]);
    let expected: f64 = res.manoeuvres.iter().map(|m| m.k() * m.score()).sum();
    assert!((res.total - expected).abs() < 1e-9);
    assert!(res.total > 0.8 * (3.0 + 2.0) * 10.0);
}

#[test]
fn events_reach_the_channel() {
    let (tx, rx) = channel();
    let sink = ChannelSink::new(tx);
    let res = score_schedule(
        &schedule(),
        flights(),
        &Config::default(),
        &CriteriaLibrary::default(),
        &sink,
    );
    let events: Vec<DiagnosticEvent> = rx.try_iter().collect();

    for uid in ["loops", "stall"] {
        let stages: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                DiagnosticEvent::StageCompleted { manoeuvre, stage } if manoeuvre == uid => {
                    Some(stage.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec!["alignment", "complete", "scored"], "{}", uid);
    }
    assert_eq!(
        events.last(),
        Some(&DiagnosticEvent::ScheduleScored { total: res.total })
    );
}

#[test]
fn broken_manoeuvre_does_not_stop_the_schedule() {
    let (tx, rx) = channel();
    let mut fl = flights();
    fl[0].labels[2].name = "nonsense".to_string();
    let res = score_schedule(
        &schedule(),
        fl,
        &Config::default(),
        &CriteriaLibrary::default(),
        &ChannelSink::new(tx),
    );
    assert!(matches!(res.manoeuvres[0], ManoeuvreOutcome::Failed { .. }));
    assert!(matches!(res.manoeuvres[1], ManoeuvreOutcome::Scored { .. }));
    assert!((res.total - 2.0 * res.manoeuvres[1].score()).abs() < 1e-9);
    assert!(rx.try_iter().any(|e| matches!(
        e,
        DiagnosticEvent::ManoeuvreFailed { ref manoeuvre, .. } if manoeuvre == "loops"
    )));
}

#[test]
fn no_flight_data_fails_everything() {
    let res = score_schedule(
        &schedule(),
        vec![],
        &Config::default(),
        &CriteriaLibrary::default(),
        &NullSink,
    );
    assert_eq!(res.failed(), 2);
    assert_eq!(res.total, 0.0);
}

#[test]
fn option_that_was_flown_is_reported() {
    let plain = loops();
    let mut shorter = loops();
    shorter.eds.retain(|e| e.name != "e4");
    let shorter = flightscore::definition::ManDef::new(
        shorter.info,
        shorter.mps,
        shorter.eds,
        shorter.judging_box,
    )
    .unwrap();
    let sched = SchedDef::new(
        "options",
        vec![ManDefOrOption::Options(
            ManOption::new(vec![plain, shorter.clone()]).unwrap(),
        )],
    );
    let res = score_schedule(
        &sched,
        vec![perfect(&shorter)],
        &Config::default(),
        &CriteriaLibrary::default(),
        &NullSink,
    );
    match &res.manoeuvres[0] {
        ManoeuvreOutcome::Scored { option, .. } => assert_eq!(*option, 1),
        other => panic!("not scored: {:?}", other),
    }
}

#[test]
fn flight_files_load_in_both_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let sched = schedule();

    let per_manoeuvre = dir.path().join("split.json");
    std::fs::write(&per_manoeuvre, serde_json::to_string(&flights()).unwrap()).unwrap();
    let a = FlightData::load_from_file(&per_manoeuvre)
        .unwrap()
        .into_manoeuvres(&sched);

    let whole = dir.path().join("whole.json");
    let stacked = State::stack(&[
        ("loops".to_string(), flights()[0].clone()),
        ("stall".to_string(), flights()[1].clone()),
    ]);
    std::fs::write(&whole, serde_json::to_string(&stacked).unwrap()).unwrap();
    let b = FlightData::load_from_file(&whole)
        .unwrap()
        .into_manoeuvres(&sched);

    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert_eq!(a[0].len(), b[0].len());
    assert!(a[0].is_labelled());
    assert!(!b[0].is_labelled());
}

#[test]
fn results_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    let res = score_schedule(
        &schedule(),
        flights(),
        &Config::default(),
        &CriteriaLibrary::default(),
        &NullSink,
    );
    res.save_to_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let back: flightscore::analysis::ScheduleResults = serde_json::from_str(&text).unwrap();
    assert_eq!(back.manoeuvres.len(), res.manoeuvres.len());
    assert!((back.total - res.total).abs() < 1e-9);
}
