//! Integration tests for the deck generator
//!
//! Runs the full pipeline from chord list or chord table to `.apkg` and reads
//! the package back.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use comping::config::Config;
use comping::package::{COLLECTION_ENTRY, FIELD_SEPARATOR};
use comping::voicing::Voicing;
use comping::{generate_deck, DeckError};
use rusqlite::Connection;

/// Extract `collection.anki2` from a package and open it
fn open_collection(apkg: &Path, scratch: &Path) -> Connection {
    let mut archive = zip::ZipArchive::new(File::open(apkg).unwrap()).unwrap();
    let mut bytes = Vec::new();
    archive
        .by_name(COLLECTION_ENTRY)
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();

    let db = scratch.join("extracted.anki2");
    std::fs::write(&db, bytes).unwrap();
    Connection::open(db).unwrap()
}

fn notes(conn: &Connection) -> Vec<(String, String)> {
    let mut stmt = conn.prepare("SELECT guid, flds FROM notes ORDER BY id").unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

fn config_for(dir: &Path) -> Config {
    Config {
        output: dir.join("deck.apkg"),
        ..Config::default()
    }
}

#[test]
fn test_default_deck_has_one_note_per_chord() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let result = generate_deck(&config);
    assert!(result.is_ok(), "Should generate the default deck: {:?}", result.err());
    let report = result.unwrap();
    assert_eq!(report.notes, 14 * 4);
    assert_eq!(report.cards, 14 * 4 * 4);
    assert_eq!(report.media, 0);

    let conn = open_collection(&config.output, dir.path());
    let rows = notes(&conn);
    assert_eq!(rows.len(), 56);

    // Identity fields plus four per voicing
    let expected_fields = 4 + 4 * Voicing::DEFAULT.len();
    for (_, flds) in &rows {
        assert_eq!(flds.split(FIELD_SEPARATOR).count(), expected_fields);
    }

    let card_count: i64 = conn
        .query_row("SELECT count(*) FROM cards", [], |row| row.get(0))
        .unwrap();
    assert_eq!(card_count, 224);
}

#[test]
fn test_guids_stable_across_runs_and_added_voicings() {
    let dir = tempfile::tempdir().unwrap();
    let first = Config {
        output: dir.path().join("first.apkg"),
        voicings: vec![
            Voicing::ShellOff3rd,
            Voicing::ShellOff7th,
            Voicing::GuideToneOff3rd,
            Voicing::GuideToneOff7th,
        ],
        ..Config::default()
    };
    let second = Config {
        output: dir.path().join("second.apkg"),
        voicings: Voicing::ALL.to_vec(),
        ..Config::default()
    };

    generate_deck(&first).unwrap();
    generate_deck(&second).unwrap();

    let a = notes(&open_collection(&first.output, dir.path()));
    let b = notes(&open_collection(&second.output, dir.path()));
    let guids_a: Vec<&String> = a.iter().map(|(g, _)| g).collect();
    let guids_b: Vec<&String> = b.iter().map(|(g, _)| g).collect();
    assert_eq!(guids_a, guids_b);
    assert_ne!(a[0].1, b[0].1, "second deck carries more fields");
}

#[test]
fn test_deck_from_chord_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("ChordsData.csv");
    std::fs::write(
        &table,
        "SortId;Name;Root;Quality;Rootless_V_Off_3rd\n\
         1;Cmaj7;C;maj7;Do Mi\n\
         2;Fm7;Fa;min7;\n\
         3;Bb7;;;\n",
    )
    .unwrap();

    let config = Config {
        input: Some(table),
        ..config_for(dir.path())
    };
    let report = generate_deck(&config).unwrap();
    assert_eq!(report.notes, 3);

    let conn = open_collection(&config.output, dir.path());
    let rows = notes(&conn);
    let first: Vec<&str> = rows[0].1.split(FIELD_SEPARATOR).collect();
    assert_eq!(first[0], "Cmaj7");
    assert_eq!(first[2], "Do");
    assert_eq!(first[4], "Do Mi");
    assert!(first[5].starts_with("[lilypond=void]"));
    // Pass-through column lands after the generated fields
    assert_eq!(first.last(), Some(&"1"));

    let third: Vec<&str> = rows[2].1.split(FIELD_SEPARATOR).collect();
    assert_eq!(third[1], "Bb");
    assert_eq!(third[2], "Si♭");
    assert_eq!(third[3], "dom7");
}

#[test]
fn test_conflicting_table_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("ChordsData.csv");
    std::fs::write(&table, "Name;Rootless_V_Off_3rd\nCmaj7;Do Mib\n").unwrap();

    let config = Config {
        input: Some(table),
        ..config_for(dir.path())
    };
    let result = generate_deck(&config);
    match result {
        Err(DeckError::InRecord { chord, source }) => {
            assert_eq!(chord, "Cmaj7");
            assert!(matches!(*source, DeckError::InvalidChord { .. }));
        }
        other => panic!("expected InRecord, got {:?}", other),
    }
    assert!(!config.output.exists(), "No partial deck should be written");
}

#[test]
fn test_subset_of_voicings_keeps_matching_templates() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        voicings: vec![Voicing::GuideToneOff3rd, Voicing::FullRootPosition],
        ..config_for(dir.path())
    };
    let report = generate_deck(&config).unwrap();
    assert_eq!(report.notes, 56);
    assert_eq!(report.cards, 56);

    let conn = open_collection(&config.output, dir.path());
    let models: String = conn
        .query_row("SELECT models FROM col", [], |row| row.get(0))
        .unwrap();
    let models: serde_json::Value = serde_json::from_str(&models).unwrap();
    let templates = models["1149467492"]["tmpls"].as_array().unwrap().clone();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["name"], "NotesGuideTones3");
}

#[test]
fn test_markup_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let a = Config {
        output: dir.path().join("a.apkg"),
        ..Config::default()
    };
    let b = Config {
        output: dir.path().join("b.apkg"),
        ..Config::default()
    };
    generate_deck(&a).unwrap();
    generate_deck(&b).unwrap();

    let a = notes(&open_collection(&a.output, dir.path()));
    let b = notes(&open_collection(&b.output, dir.path()));
    assert_eq!(a, b);
}
