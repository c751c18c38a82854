//! # Package Writer
//!
//! Writes an assembled [`Deck`] as an Anki 2 package (`.apkg`): a zip archive
//! holding
//!
//! - `collection.anki2`: an SQLite collection with the `col`, `notes`,
//!   `cards`, `revlog` and `graves` tables. The note type, deck and deck
//!   options live as JSON in the single `col` row.
//! - `media`: a JSON object mapping archive entry names (`"0"`, `"1"`, ...)
//!   to media file names.
//! - one archive entry per media file, named by its index.
//!
//! Note fields are stored joined by `0x1f`; `sfld` holds the first field and
//! `csum` the first 8 hex digits of its SHA-1 as an integer.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha1::{Digest, Sha1};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::deck::{Deck, Model};
use crate::error::DeckError;

pub const COLLECTION_ENTRY: &str = "collection.anki2";
pub const MEDIA_ENTRY: &str = "media";

/// Separator between note fields in `notes.flds`
pub const FIELD_SEPARATOR: &str = "\u{1f}";

const COLLECTION_CREATED: i64 = 1411124400;
const SCHEMA_VERSION: i64 = 11;
const DEFAULT_CONF_ID: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
";

/// Counts of what went into a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageSummary {
    pub notes: usize,
    pub cards: usize,
    pub media: usize,
}

/// Write `deck` to `path` as an `.apkg` archive
pub fn write_package(deck: &Deck, path: &Path) -> Result<PackageSummary, DeckError> {
    let scratch = tempfile::tempdir()?;
    let collection_path = scratch.path().join(COLLECTION_ENTRY);

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .map_err(|e| DeckError::Package(e.to_string()))?;

    let (notes, cards) = {
        let conn = Connection::open(&collection_path)?;
        write_collection(&conn, deck, now_ms)?
    };
    debug!("Wrote collection with {} notes and {} cards", notes, cards);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(COLLECTION_ENTRY, options)?;
    zip.write_all(&fs::read(&collection_path)?)?;

    let mut media_map = serde_json::Map::new();
    for (index, file) in deck.media.iter().enumerate() {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DeckError::Package(format!("media path {} has no file name", file.display())))?;
        zip.start_file(index.to_string(), options)?;
        zip.write_all(&fs::read(file)?)?;
        media_map.insert(index.to_string(), Value::String(name));
    }

    zip.start_file(MEDIA_ENTRY, options)?;
    zip.write_all(Value::Object(media_map).to_string().as_bytes())?;
    zip.finish()?;

    let summary = PackageSummary {
        notes,
        cards,
        media: deck.media.len(),
    };
    info!(
        "Packaged {} notes, {} cards and {} media files into {}",
        summary.notes,
        summary.cards,
        summary.media,
        path.display()
    );
    Ok(summary)
}

/// Create the schema and insert the collection row, notes and cards
///
/// Returns the number of notes and cards written.
fn write_collection(conn: &Connection, deck: &Deck, now_ms: i64) -> Result<(usize, usize), DeckError> {
    conn.execute_batch(SCHEMA)?;
    let now = now_ms / 1000;

    let models = json!({ deck.model.id.to_string(): model_json(&deck.model, deck.id, now) });
    let decks = json!({
        "1": deck_json(1, "Default", now),
        deck.id.to_string(): deck_json(deck.id, &deck.name, now),
    });
    let dconf = json!({ DEFAULT_CONF_ID.to_string(): deck_options_json(now) });
    let conf = json!({
        "activeDecks": [1],
        "curDeck": 1,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": null,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    });

    conn.execute(
        "INSERT INTO col VALUES (NULL, ?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6, ?7, ?8, '{}')",
        params![
            COLLECTION_CREATED,
            now_ms,
            now_ms,
            SCHEMA_VERSION,
            conf.to_string(),
            models.to_string(),
            decks.to_string(),
            dconf.to_string(),
        ],
    )?;

    let mut next_id = now_ms;
    let mut card_count = 0;
    for (position, note) in deck.notes.iter().enumerate() {
        let note_id = next_id;
        next_id += 1;

        let sort_field = note.fields.first().map(String::as_str).unwrap_or_default();
        conn.execute(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
            params![
                note_id,
                note.guid,
                deck.model.id,
                now,
                note.fields.join(FIELD_SEPARATOR),
                sort_field,
                field_checksum(sort_field),
            ],
        )?;

        for ord in note.card_ordinals(&deck.model) {
            conn.execute(
                "INSERT INTO cards VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, ?6, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                params![next_id, note_id, deck.id, ord as i64, now, position as i64],
            )?;
            next_id += 1;
            card_count += 1;
        }
    }

    Ok((deck.notes.len(), card_count))
}

/// First 8 hex digits of the SHA-1 of a field, as an integer
pub fn field_checksum(field: &str) -> i64 {
    let digest = Sha1::digest(field.as_bytes());
    i64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

fn model_json(model: &Model, deck_id: i64, now: i64) -> Value {
    let fields: Vec<Value> = model
        .fields
        .iter()
        .enumerate()
        .map(|(ord, name)| {
            json!({
                "name": name,
                "ord": ord,
                "font": "Arial",
                "media": [],
                "rtl": false,
                "size": 20,
                "sticky": false,
            })
        })
        .collect();

    let templates: Vec<Value> = model
        .templates
        .iter()
        .enumerate()
        .map(|(ord, t)| {
            json!({
                "name": t.name,
                "ord": ord,
                "qfmt": t.qfmt,
                "afmt": t.afmt,
                "bqfmt": "",
                "bafmt": "",
                "did": null,
            })
        })
        .collect();

    let req: Vec<Value> = model
        .templates
        .iter()
        .enumerate()
        .map(|(ord, t)| {
            let indices: Vec<usize> = t
                .question_fields()
                .iter()
                .filter_map(|f| model.field_index(f))
                .collect();
            json!([ord, "any", indices])
        })
        .collect();

    json!({
        "id": model.id.to_string(),
        "name": model.name,
        "type": 0,
        "mod": now,
        "usn": -1,
        "sortf": 0,
        "did": deck_id,
        "tmpls": templates,
        "flds": fields,
        "css": model.css,
        "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
        "latexPost": "\\end{document}",
        "latexsvg": false,
        "req": req,
        "tags": [],
        "vers": [],
    })
}

fn deck_json(id: i64, name: &str, now: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "mod": now,
        "usn": -1,
        "dyn": 0,
        "conf": DEFAULT_CONF_ID,
        "collapsed": false,
        "browserCollapsed": false,
        "extendNew": 10,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
    })
}

fn deck_options_json(now: i64) -> Value {
    json!({
        "id": DEFAULT_CONF_ID,
        "name": "Default",
        "mod": now,
        "usn": 0,
        "maxTaken": 60,
        "autoplay": true,
        "timer": 0,
        "replayq": true,
        "dyn": false,
        "new": {
            "bury": true,
            "delays": [1, 10],
            "initialFactor": 2500,
            "ints": [1, 4, 7],
            "order": 1,
            "perDay": 20,
            "separate": true,
        },
        "lapse": {
            "delays": [10],
            "leechAction": 0,
            "leechFails": 8,
            "minInt": 1,
            "mult": 0,
        },
        "rev": {
            "bury": true,
            "ease4": 1.3,
            "fuzz": 0.05,
            "ivlFct": 1,
            "maxIvl": 36500,
            "minSpace": 1,
            "perDay": 100,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{assemble_deck, DeckSpec};
    use crate::names::NameTables;
    use crate::record::{build_records, ChordInput};
    use crate::voicing::Voicing;
    use crate::ChordSpec;
    use std::io::Read;

    fn sample_deck() -> Deck {
        let inputs: Vec<ChordInput> = [("C", "maj7"), ("A", "min7")]
            .iter()
            .map(|(r, q)| ChordInput::from_spec(ChordSpec::parse(r, q).unwrap()))
            .collect();
        let voicings = [
            Voicing::ShellOff3rd,
            Voicing::ShellOff7th,
            Voicing::GuideToneOff3rd,
            Voicing::GuideToneOff7th,
        ];
        let records = build_records(&inputs, &voicings, &NameTables::build(), None).unwrap();
        assemble_deck(&records, &DeckSpec::default()).unwrap()
    }

    #[test]
    fn test_field_checksum() {
        // sha1("Cmaj7") starts with these 8 hex digits
        let expected = {
            let digest = Sha1::digest(b"Cmaj7");
            let hex: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
            i64::from_str_radix(&hex, 16).unwrap()
        };
        assert_eq!(field_checksum("Cmaj7"), expected);
        assert!(field_checksum("") >= 0);
    }

    #[test]
    fn test_collection_contents() {
        let deck = sample_deck();
        let conn = Connection::open_in_memory().unwrap();
        let (notes, cards) = write_collection(&conn, &deck, 1_700_000_000_000).unwrap();
        assert_eq!(notes, 2);
        assert_eq!(cards, 8);

        let (flds, sfld, guid): (String, String, String) = conn
            .query_row("SELECT flds, sfld, guid FROM notes ORDER BY id LIMIT 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(sfld, "Cmaj7");
        assert_eq!(guid, deck.notes[0].guid);
        assert_eq!(flds.split(FIELD_SEPARATOR).count(), deck.model.fields.len());

        let models: String = conn
            .query_row("SELECT models FROM col", [], |row| row.get(0))
            .unwrap();
        let models: Value = serde_json::from_str(&models).unwrap();
        let model = &models["1149467492"];
        assert_eq!(model["name"], "Chords");
        assert_eq!(model["tmpls"].as_array().unwrap().len(), 4);
        assert_eq!(model["flds"][0]["name"], "Name");

        let decks: String = conn
            .query_row("SELECT decks FROM col", [], |row| row.get(0))
            .unwrap();
        let decks: Value = serde_json::from_str(&decks).unwrap();
        assert_eq!(decks["1393751746"]["name"], "Comping Chords");
    }

    #[test]
    fn test_write_package_archive_layout() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("Cmaj7-Rootless_V_Off_3rd.png");
        fs::write(&image, b"png").unwrap();

        let mut deck = sample_deck();
        deck.media.push(image);

        let out = dir.path().join("nested").join("deck.apkg");
        let summary = write_package(&deck, &out).unwrap();
        assert_eq!(summary, PackageSummary { notes: 2, cards: 8, media: 1 });

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut media = String::new();
        archive.by_name(MEDIA_ENTRY).unwrap().read_to_string(&mut media).unwrap();
        let media: Value = serde_json::from_str(&media).unwrap();
        assert_eq!(media["0"], "Cmaj7-Rootless_V_Off_3rd.png");

        let mut bytes = Vec::new();
        archive.by_name("0").unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"png");
        assert!(archive.by_name(COLLECTION_ENTRY).is_ok());
    }
}
