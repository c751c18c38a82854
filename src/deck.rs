//! # Deck Assembly
//!
//! Turns chord records into a flashcard deck: a note type ("model") with one
//! field per record field and the four voicing card templates, plus one note
//! per record.
//!
//! Card templates reference fields as `{{FieldName}}`. The names must match
//! the record fields exactly; [`assemble_deck`] refuses a template that
//! mentions a field the records do not have.
//!
//! Note identity (`guid`) is derived from `Name` and `Root` only, so adding
//! fields or voicings to a regenerated deck updates existing notes instead of
//! creating duplicates.

use std::path::PathBuf;

use log::info;
use sha2::{Digest, Sha256};

use crate::error::DeckError;
use crate::record::{ChordRecord, NAME_FIELD, ROOT_FIELD};

pub const DEFAULT_MODEL_NAME: &str = "Chords";

pub const DEFAULT_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n";

const BASE91_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// Field names the card renderer provides itself
const BUILTIN_FIELDS: [&str; 6] = ["FrontSide", "Tags", "Type", "Deck", "Subdeck", "Card"];

/// A card template: question and answer HTML with `{{Field}}` references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: String,
    pub qfmt: String,
    pub afmt: String,
}

impl CardTemplate {
    pub fn new(name: &str, qfmt: &str, afmt: &str) -> Self {
        Self {
            name: name.to_string(),
            qfmt: qfmt.to_string(),
            afmt: afmt.to_string(),
        }
    }

    /// Fields referenced by the question side
    pub fn question_fields(&self) -> Vec<String> {
        field_references(&self.qfmt)
    }

    /// Fields referenced by either side
    pub fn referenced_fields(&self) -> Vec<String> {
        let mut fields = field_references(&self.qfmt);
        for field in field_references(&self.afmt) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}

/// The four voicing drill templates
pub fn chord_templates() -> Vec<CardTemplate> {
    vec![
        CardTemplate::new(
            "NotesRootless3",
            "<center><font size=8>Notes in </font><hr> <font size=14>Rootless shell voicing, <br> <bold>off 3rd</bold> for: </font><hr> <font size=16>{{Name}}",
            "{{FrontSide}}<hr id=\"answer\">{{Rootless_V_Off_3rd}} <hr><center>{{Rootless_V_Off_3rd-lilypond}}</center>",
        ),
        CardTemplate::new(
            "NotesRootless7",
            "<center><font size=8>Notes in </font><hr> <font size=14>Rootless shell voicing, <br> <bold>off 7th</bold> for: </font><hr><font size=16>{{Name}}",
            "{{FrontSide}}<hr id=\"answer\">{{Rootless_V_Off_7th}}<hr><center>{{Rootless_V_Off_7th-lilypond}}</center>",
        ),
        CardTemplate::new(
            "NotesGuideTones3",
            "<center><font size=8>Notes in </font><hr> <font size=14>Lead tones 3-note voicing, <br> <bold>off 3rd</bold> for: </font><hr><font size=16>{{Name}}",
            "{{FrontSide}}<hr id=\"answer\">{{GuideTones_V_Off_3rd}}<hr><center>{{GuideTones_V_Off_3rd-lilypond}}</center>",
        ),
        CardTemplate::new(
            "NotesGuideTones7",
            "<center><font size=8>Notes in </font><hr> <font size=14>Lead tones 3-note voicing, <br> <bold>off 7th</bold> for: </font><hr><font size=16>{{Name}}",
            "{{FrontSide}}<hr id=\"answer\">{{GuideTones_V_Off_7th}}<hr><center>{{GuideTones_V_Off_7th-lilypond}}</center>",
        ),
    ]
}

/// Field names referenced in a template, in order of first appearance
///
/// Section markers (`{{#F}}`, `{{^F}}`, `{{/F}}`) and filters (`{{text:F}}`)
/// resolve to the bare field name; renderer built-ins are skipped.
pub fn field_references(template: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let inner = after[..end].trim().trim_start_matches(&['#', '^', '/'][..]);
        let field = inner.rsplit(':').next().unwrap_or(inner).trim();

        if !field.is_empty()
            && !BUILTIN_FIELDS.contains(&field)
            && !fields.iter().any(|f| f == field)
        {
            fields.push(field.to_string());
        }
        rest = &after[end + 2..];
    }
    fields
}

/// Identity and templates of the deck to assemble
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSpec {
    pub deck_id: i64,
    pub deck_name: String,
    pub model_id: i64,
    pub model_name: String,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

impl Default for DeckSpec {
    fn default() -> Self {
        Self {
            deck_id: crate::config::DEFAULT_DECK_ID,
            deck_name: crate::config::DEFAULT_DECK_NAME.to_string(),
            model_id: crate::config::DEFAULT_MODEL_ID,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            templates: chord_templates(),
            css: DEFAULT_CSS.to_string(),
        }
    }
}

/// Note type: the field list and card templates shared by every note
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

impl Model {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// One flashcard note: field values in model field order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub guid: String,
    pub fields: Vec<String>,
}

impl Note {
    /// Indices of the templates that produce a card for this note
    ///
    /// A template yields a card when at least one field on its question side,
    /// other than the renderer built-ins, is non-empty.
    pub fn card_ordinals(&self, model: &Model) -> Vec<usize> {
        model
            .templates
            .iter()
            .enumerate()
            .filter(|(_, template)| {
                template.question_fields().iter().any(|field| {
                    model
                        .field_index(field)
                        .and_then(|i| self.fields.get(i))
                        .is_some_and(|value| !value.trim().is_empty())
                })
            })
            .map(|(ord, _)| ord)
            .collect()
    }
}

/// An assembled deck, ready to be packaged
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub model: Model,
    pub notes: Vec<Note>,
    /// Files shipped with the deck; referenced from fields by file name
    pub media: Vec<PathBuf>,
}

impl Deck {
    pub fn card_count(&self) -> usize {
        self.notes
            .iter()
            .map(|note| note.card_ordinals(&self.model).len())
            .sum()
    }
}

/// Build the model from the first record's fields and one note per record
///
/// # Errors
/// - [`DeckError::Config`] when there are no records
/// - [`DeckError::MissingTemplateField`] when a template references a field
///   the records do not have
/// - [`DeckError::InvalidChord`] when a record's fields differ from the first
pub fn assemble_deck(records: &[ChordRecord], spec: &DeckSpec) -> Result<Deck, DeckError> {
    let first = records
        .first()
        .ok_or_else(|| DeckError::Config("no chords to put in the deck".to_string()))?;
    let fields: Vec<String> = first.field_names().into_iter().map(String::from).collect();

    for template in &spec.templates {
        for field in template.referenced_fields() {
            if !fields.contains(&field) {
                return Err(DeckError::MissingTemplateField {
                    template: template.name.clone(),
                    field,
                });
            }
        }
    }

    let mut notes = Vec::with_capacity(records.len());
    for record in records {
        if record.field_names() != first.field_names() {
            return Err(DeckError::InvalidChord {
                chord: record.name().to_string(),
                message: format!(
                    "record has fields {:?}, expected {:?}",
                    record.field_names(),
                    fields
                ),
            });
        }

        let guid = guid_for(&[
            record.get(NAME_FIELD).unwrap_or_default(),
            record.get(ROOT_FIELD).unwrap_or_default(),
        ]);
        notes.push(Note {
            guid,
            fields: record.values().into_iter().map(String::from).collect(),
        });
    }

    let model = Model {
        id: spec.model_id,
        name: spec.model_name.clone(),
        fields,
        templates: spec.templates.clone(),
        css: spec.css.clone(),
    };

    info!(
        "Assembled deck '{}' with {} notes and {} fields per note",
        spec.deck_name,
        notes.len(),
        model.fields.len()
    );

    Ok(Deck {
        id: spec.deck_id,
        name: spec.deck_name.clone(),
        model,
        notes,
        media: Vec::new(),
    })
}

/// Stable note identifier from a list of field values
///
/// The first 8 bytes of the SHA-256 of the values joined with `__`, read as a
/// big-endian integer and written in base 91.
///
/// # Examples
/// ```
/// use comping::deck::guid_for;
///
/// assert_eq!(guid_for(&["Cmaj7", "C"]), guid_for(&["Cmaj7", "C"]));
/// assert_ne!(guid_for(&["Cmaj7", "C"]), guid_for(&["Dbmaj7", "Db"]));
/// ```
pub fn guid_for<S: AsRef<str>>(values: &[S]) -> String {
    let joined = values
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join("__");
    let digest = Sha256::digest(joined.as_bytes());

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    base91(u64::from_be_bytes(bytes))
}

fn base91(mut n: u64) -> String {
    let base = BASE91_ALPHABET.len() as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(BASE91_ALPHABET[(n % base) as usize] as char);
        n /= base;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameTables;
    use crate::record::{build_records, ChordInput};
    use crate::voicing::Voicing;
    use crate::ChordSpec;

    const TEMPLATE_VOICINGS: [Voicing; 4] = [
        Voicing::ShellOff3rd,
        Voicing::ShellOff7th,
        Voicing::GuideToneOff3rd,
        Voicing::GuideToneOff7th,
    ];

    fn records(chords: &[(&str, &str)], voicings: &[Voicing]) -> Vec<ChordRecord> {
        let inputs: Vec<ChordInput> = chords
            .iter()
            .map(|(root, quality)| ChordInput::from_spec(ChordSpec::parse(root, quality).unwrap()))
            .collect();
        build_records(&inputs, voicings, &NameTables::build(), None).unwrap()
    }

    #[test]
    fn test_field_references() {
        let template = &chord_templates()[0];
        assert_eq!(template.question_fields(), vec!["Name"]);
        assert_eq!(
            template.referenced_fields(),
            vec!["Name", "Rootless_V_Off_3rd", "Rootless_V_Off_3rd-lilypond"]
        );
        assert_eq!(
            field_references("{{#Audio}}{{text:Audio}}{{/Audio}} {{ Name }}"),
            vec!["Audio", "Name"]
        );
    }

    #[test]
    fn test_templates_are_exact() {
        let templates = chord_templates();
        let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["NotesRootless3", "NotesRootless7", "NotesGuideTones3", "NotesGuideTones7"]
        );
        assert_eq!(
            templates[1].afmt,
            "{{FrontSide}}<hr id=\"answer\">{{Rootless_V_Off_7th}}<hr><center>{{Rootless_V_Off_7th-lilypond}}</center>"
        );
        assert!(templates[3].qfmt.contains("<bold>off 7th</bold>"));
    }

    #[test]
    fn test_assemble_one_note_per_record() {
        let recs = records(&[("C", "maj7"), ("F", "dom7"), ("Bb", "min7")], &TEMPLATE_VOICINGS);
        let deck = assemble_deck(&recs, &DeckSpec::default()).unwrap();

        assert_eq!(deck.notes.len(), 3);
        assert_eq!(deck.id, 1393751746);
        assert_eq!(deck.model.id, 1149467492);
        assert_eq!(deck.model.name, "Chords");
        for note in &deck.notes {
            assert_eq!(note.fields.len(), deck.model.fields.len());
            assert_eq!(note.card_ordinals(&deck.model), vec![0, 1, 2, 3]);
        }
        assert_eq!(deck.card_count(), 12);
    }

    #[test]
    fn test_missing_template_field() {
        let recs = records(&[("C", "maj7")], &[Voicing::ShellOff3rd]);
        match assemble_deck(&recs, &DeckSpec::default()) {
            Err(DeckError::MissingTemplateField { template, field }) => {
                assert_eq!(template, "NotesRootless7");
                assert_eq!(field, "Rootless_V_Off_7th");
            }
            other => panic!("expected MissingTemplateField, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_records_rejected() {
        let mut recs = records(&[("C", "maj7")], &TEMPLATE_VOICINGS);
        recs.extend(records(&[("D", "min7")], &Voicing::ALL));
        assert!(matches!(
            assemble_deck(&recs, &DeckSpec::default()),
            Err(DeckError::InvalidChord { .. })
        ));
    }

    #[test]
    fn test_no_records() {
        assert!(matches!(
            assemble_deck(&[], &DeckSpec::default()),
            Err(DeckError::Config(_))
        ));
    }

    #[test]
    fn test_guid_ignores_added_fields() {
        let short = records(&[("Eb", "dom7")], &TEMPLATE_VOICINGS);
        let long = records(&[("Eb", "dom7")], &Voicing::ALL);
        let a = assemble_deck(&short, &DeckSpec::default()).unwrap();
        let b = assemble_deck(&long, &DeckSpec::default()).unwrap();
        assert_eq!(a.notes[0].guid, b.notes[0].guid);
        assert_eq!(a.notes[0].guid, guid_for(&["Eb7", "Eb"]));
    }

    #[test]
    fn test_base91() {
        assert_eq!(base91(0), "a");
        assert_eq!(base91(90), "~");
        assert_eq!(base91(91), "ba");
        assert!(guid_for(&["x"]).chars().all(|c| BASE91_ALPHABET.contains(&(c as u8))));
    }
}
