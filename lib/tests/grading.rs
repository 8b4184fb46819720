use polars::prelude::*;
use serde_json::json;
use teamgrades::{
    grade_teams,
    publish::{MemoryStore, UPDATED_AT},
    PbpDf, Publisher, TeamGrades, DEFAULT_COLLECTION,
};

// Ten plays between four teams. Play 8 is a punt, so it only counts toward the
// pressure rates.
fn season() -> DataFrame {
    df!(
        "posteam" => &["A", "A", "A", "B", "B", "B", "C", "C", "D", "D"],
        "defteam" => &["B", "B", "C", "A", "A", "D", "D", "D", "C", "C"],
        "play_type" => &[
            "pass", "run", "pass", "pass", "pass", "run", "pass", "punt", "pass", "run",
        ],
        "sack" => &[1, 0, 0, 0, 0, 0, 1, 0, 0, 0],
        "qb_hit" => &[1, 0, 0, 1, 0, 0, 1, 0, 1, 0],
        "epa" => &[-1.5, 0.4, 0.8, 0.2, 1.1, -0.3, -2.0, 0.0, 0.6, -0.1],
    )
    .unwrap()
}

fn grades(team: &str, oline: f64, dline: f64, secondary: f64, offense: f64) -> TeamGrades {
    TeamGrades {
        team: team.to_string(),
        oline,
        dline,
        secondary,
        offense,
    }
}

#[test]
fn grades_match_hand_computed_values() {
    // oline    pressure allowed  A 2/3  B 1/3  C 1    D 1/2  (inverted)
    // dline    pressure made     A 1/2  B 1    C 1/3  D 2/3
    // secondary EPA allowed      A .65  B -1.5 C .7   D -2.0 (inverted)
    // offense  EPA per play      A -.1  B 1/3  C -2.0 D .25
    let plays = PbpDf::new(season()).unwrap();
    let records = grade_teams(&plays).unwrap().records().unwrap();

    assert_eq!(
        records,
        vec![
            grades("A", 72.9, 68.7, 62.9, 78.7),
            grades("B", 89.8, 94.0, 84.8, 84.4),
            grades("C", 56.0, 60.2, 62.4, 53.7),
            grades("D", 81.3, 77.1, 89.9, 83.3),
        ]
    );
}

#[test]
fn every_grade_is_in_range_with_one_decimal() {
    let plays = PbpDf::new(season()).unwrap();
    for record in grade_teams(&plays).unwrap().records().unwrap() {
        for grade in [record.oline, record.dline, record.secondary, record.offense] {
            assert!((0.0..=100.0).contains(&grade), "{} out of range", grade);
            assert!(((grade * 10.0).round() - grade * 10.0).abs() < 1e-9);
        }
    }
}

#[test]
fn team_without_defensive_snaps_is_dropped() {
    let extra = df!(
        "posteam" => &["E"],
        "defteam" => &["A"],
        "play_type" => &["pass"],
        "sack" => &[0],
        "qb_hit" => &[0],
        "epa" => &[0.3],
    )
    .unwrap();
    let df = season().vstack(&extra).unwrap();
    let plays = PbpDf::new(df).unwrap();

    let teams: Vec<String> = grade_teams(&plays)
        .unwrap()
        .records()
        .unwrap()
        .into_iter()
        .map(|r| r.team)
        .collect();
    assert_eq!(teams, vec!["A", "B", "C", "D"]);
}

#[test]
fn identical_teams_all_grade_neutral() {
    let df = df!(
        "posteam" => &["A", "B"],
        "defteam" => &["B", "A"],
        "play_type" => &["pass", "pass"],
        "sack" => &[0, 0],
        "qb_hit" => &[1, 1],
        "epa" => &[0.1, 0.1],
    )
    .unwrap();
    let records = grade_teams(&PbpDf::new(df).unwrap()).unwrap().records().unwrap();
    assert_eq!(
        records,
        vec![grades("A", 75.0, 75.0, 75.0, 75.0), grades("B", 75.0, 75.0, 75.0, 75.0)]
    );
}

#[test]
fn publishes_graded_teams() {
    let plays = PbpDf::new(season()).unwrap();
    let records = grade_teams(&plays).unwrap().records().unwrap();

    let mut publisher = Publisher::new(MemoryStore::new(), DEFAULT_COLLECTION);
    let report = publisher.publish(&records);
    assert!(report.is_success());
    assert_eq!(report.written.len(), 4);

    let store = publisher.into_store();
    let b = store.get(DEFAULT_COLLECTION, "B").unwrap();
    assert_eq!(b["id"], json!("B"));
    assert_eq!(
        b["grades"],
        json!({ "oline": 89.8, "dline": 94.0, "secondary": 84.8, "offense": 84.4 })
    );
    assert!(b[UPDATED_AT].is_string());
}
