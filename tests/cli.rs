use assert_cmd::cargo::cargo_bin_cmd;

#[test]
fn test_generates_deck_with_summary_line() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("shells.apkg");

    cargo_bin_cmd!("comping")
        .args(["--roots", "C,F,Bb", "--qualities", "maj7,dom7", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("6 cards generated and saved into deck"));

    assert!(out.is_file());
}

#[test]
fn test_config_file_with_flag_override() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("deck.yaml");
    let out = dir.path().join("override.apkg");
    std::fs::write(
        &config,
        format!(
            "deck-name: Test Deck\nroots: [D, Eb]\nqualities: [min7]\noutput: {}\n",
            dir.path().join("from-config.apkg").display()
        ),
    )
    .unwrap();

    cargo_bin_cmd!("comping")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("2 cards generated"));

    assert!(out.is_file());
    assert!(!dir.path().join("from-config.apkg").exists());
}

#[test]
fn test_unknown_voicing_fails() {
    cargo_bin_cmd!("comping")
        .args(["--voicings", "drop-2"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Unknown voicing: drop-2"));
}

#[test]
fn test_unknown_quality_fails() {
    cargo_bin_cmd!("comping")
        .args(["--qualities", "maj9"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("unknown quality 'maj9'"));
}

#[test]
fn test_missing_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("comping")
        .arg("--input")
        .arg(dir.path().join("nope.csv"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("Chord table not found"));
}

#[test]
fn test_bad_table_row_names_the_chord() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("ChordsData.csv");
    std::fs::write(&table, "Name\nCmaj7\nDsus4\n").unwrap();

    cargo_bin_cmd!("comping")
        .arg("--input")
        .arg(&table)
        .arg("--output")
        .arg(dir.path().join("deck.apkg"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("Chord Dsus4"));
}
