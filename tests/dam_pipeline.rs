//! Integration tests for the paired-comparison organize/clean pipeline.

use audioval::prelude::*;
use std::io::Write;
use std::path::Path;

const HEADER: &str = "subject,condition,button_A,button_B,audio_file,outcome";

fn write_session(dir: &Path, name: &str, rows: &[String]) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
}

/// One trial row; track and snr are embedded in the audio file name.
fn trial(subject: &str, condition: &str, a: &str, b: &str, track: &str, snr: &str) -> String {
    format!(
        "{subject},{condition},{a},{b},{track}_sent_m_talker_{snr}_x.wav,{a}"
    )
}

/// Synthetic study:
/// - subject 1, snr 5: complete preference cell (4 trials, mirrored labels)
/// - subject 1, snr 0: incomplete preference cell (3 trials)
/// - subject 2, snr 5: complete noise cell (track 71, 4 trials)
fn write_study(dir: &Path) {
    let mut rows = Vec::new();
    // Mirrored presentations of the same comparison belong to one cell.
    rows.push(trial("1", "A", "DAM_3", "DAM_OFF", "42", "5"));
    rows.push(trial("1", "A", "DAM_OFF", "DAM_3", "42", "5"));
    rows.push(trial("1", "A", "DAM_3", "DAM_OFF", "42", "5"));
    rows.push(trial("1", "A", "DAM_OFF", "DAM_3", "42", "5"));
    for _ in 0..3 {
        rows.push(trial("1", "A", "DAM_3", "DAM_OFF", "42", "0"));
    }
    write_session(dir, "0001_aided_0001_Jul_02_2024.csv", &rows);

    let noise: Vec<String> = (0..4)
        .map(|_| trial("2", "A", "DAM_4", "DAM_3", "71", "5"))
        .collect();
    write_session(dir, "0002_aided_0001_Jul_03_2024.csv", &noise);
}

#[test]
fn test_full_dam_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    write_study(dir.path());

    let raw = read_observations_dir(dir.path()).unwrap();
    assert_eq!(raw.len(), 11);

    let organized = organize(&raw).unwrap();
    let (clean, stats) = remove_incomplete_with_stats(&organized, EXPECTED_TRIALS);

    // The complete pref cell and the complete noise cell survive.
    assert_eq!(clean.len(), 8);
    assert_eq!(stats.rows_before, 11);
    assert_eq!(stats.groups_dropped, 1);

    // Mirrored labels were canonicalized into one direction.
    let subject1: Vec<_> = clean.iter().filter(|r| r.subject == "1").collect();
    assert_eq!(subject1.len(), 4);
    assert!(subject1.iter().all(|r| r.comparison == "DAM_OFF-DAM_3"));
    assert!(subject1.iter().all(|r| r.snr == "5"));
    assert!(subject1.iter().all(|r| r.trial_type == TrialType::Pref));

    // The noise cell is classified by its track number.
    let subject2: Vec<_> = clean.iter().filter(|r| r.subject == "2").collect();
    assert_eq!(subject2.len(), 4);
    assert!(subject2.iter().all(|r| r.trial_type == TrialType::Noise));
    assert!(subject2.iter().all(|r| r.comparison == "DAM_3-DAM_4"));
}

#[test]
fn test_every_surviving_cell_is_complete() {
    let dir = tempfile::tempdir().unwrap();
    write_study(dir.path());

    let raw = read_observations_dir(dir.path()).unwrap();
    let organized = organize(&raw).unwrap();
    let clean = remove_incomplete(&organized);

    use std::collections::HashMap;
    let mut cells: HashMap<(TrialType, String, String, String, String), usize> = HashMap::new();
    for r in &clean {
        *cells
            .entry((
                r.trial_type,
                r.subject.clone(),
                r.comparison.clone(),
                r.snr.clone(),
                r.condition.clone(),
            ))
            .or_default() += 1;
    }
    assert!(!cells.is_empty());
    assert!(cells.values().all(|&n| n == EXPECTED_TRIALS));
}

#[test]
fn test_clean_csv_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    write_study(dir.path());

    let raw = read_observations_dir(dir.path()).unwrap();
    let organized = organize(&raw).unwrap();
    let clean = remove_incomplete(&organized);

    let out = dir.path().join("dam_clean.csv");
    write_observations_csv(&out, &clean).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "subject,condition,button_A,button_B,audio_file,outcome,comparison,snr,track,trial_type"
    );
    assert_eq!(lines.count(), clean.len());
    assert!(text.contains("DAM_OFF-DAM_3"));
    assert!(text.contains("noise"));
}

#[test]
fn test_bad_session_name_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_study(dir.path());
    write_session(
        dir.path(),
        "pilot_data.csv",
        &[trial("3", "A", "DAM_3", "DAM_4", "42", "5")],
    );

    let err = read_observations_dir(dir.path()).unwrap_err();
    match err {
        AudioValError::InvalidFileName(names) => assert!(names.contains("pilot_data.csv")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_comparison_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<String> = (0..4)
        .map(|_| trial("1", "A", "DAM_5", "DAM_3", "42", "5"))
        .collect();
    write_session(dir.path(), "0001_aided_0001_Jul_02_2024.csv", &rows);

    let raw = read_observations_dir(dir.path()).unwrap();
    assert!(matches!(
        organize(&raw),
        Err(AudioValError::UnknownComparisonLabel(_))
    ));
}
