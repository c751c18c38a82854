//! # Chord Records
//!
//! A `ChordRecord` is everything one flashcard note needs for one chord:
//! identity fields, then four fields per requested voicing, then any extra
//! columns carried over from the input table.
//!
//! Field order is fixed and identical for every record of a build, because
//! the deck binds field values positionally:
//!
//! ```text
//! Name, Root, Root_it, Quality,
//! <Base>, <Base>-lilypond, <Base>-image, <Base>-audio   (per voicing)
//! <extra table columns>
//! ```
//!
//! Note-list fields (`Root_it`, `<Base>`) are produced in Italian shorthand
//! and normalized to accidental symbols once complete. Markup fields are never
//! normalized.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::chord::ChordSpec;
use crate::error::DeckError;
use crate::media::{MediaLinks, MediaRenderer};
use crate::names::{normalize_field, NameTables, NoteTable};
use crate::voicing::{render_voicing, RenderedVoicing, Voicing};

pub const NAME_FIELD: &str = "Name";
pub const ROOT_FIELD: &str = "Root";
pub const ROOT_IT_FIELD: &str = "Root_it";
pub const QUALITY_FIELD: &str = "Quality";

pub const LILYPOND_SUFFIX: &str = "-lilypond";
pub const IMAGE_SUFFIX: &str = "-image";
pub const AUDIO_SUFFIX: &str = "-audio";

/// The four field names generated for one voicing
pub fn voicing_fields(voicing: Voicing) -> [String; 4] {
    let base = voicing.field_base();
    [
        base.to_string(),
        format!("{}{}", base, LILYPOND_SUFFIX),
        format!("{}{}", base, IMAGE_SUFFIX),
        format!("{}{}", base, AUDIO_SUFFIX),
    ]
}

/// One chord to build a record for, plus the table columns that came with it
#[derive(Debug, Clone, PartialEq)]
pub struct ChordInput {
    pub spec: ChordSpec,
    pub name: String,
    /// Table columns other than the chord identity, in table order
    pub columns: Vec<(String, String)>,
}

impl ChordInput {
    /// Input for a generated chord: display name, no table columns
    pub fn from_spec(spec: ChordSpec) -> Self {
        Self {
            name: spec.display_name(),
            spec,
            columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered, immutable field list for one chord
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordRecord {
    fields: Vec<(String, String)>,
}

impl ChordRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> &str {
        self.get(NAME_FIELD).unwrap_or_default()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn values(&self) -> Vec<&str> {
        self.fields.iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Accumulates the fields of one record; consumed by [`RecordBuilder::build`]
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    proper: &'a NoteTable,
    fields: Vec<(String, String)>,
}

impl<'a> RecordBuilder<'a> {
    /// Start a record with the identity fields `Name`, `Root`, `Root_it`, `Quality`
    pub fn new(input: &ChordInput, proper: &'a NoteTable) -> Result<Self, DeckError> {
        let root_it = normalize_field(&input.spec.root.italian_plain(), proper)?;
        Ok(Self {
            proper,
            fields: vec![
                (NAME_FIELD.to_string(), input.name.clone()),
                (ROOT_FIELD.to_string(), input.spec.root.to_string()),
                (ROOT_IT_FIELD.to_string(), root_it),
                (QUALITY_FIELD.to_string(), input.spec.quality.tag().to_string()),
            ],
        })
    }

    /// Append the four fields of a voicing
    ///
    /// `None` stands for a voicing without a selection rule: its fields exist
    /// but stay empty.
    pub fn voicing(
        mut self,
        voicing: Voicing,
        rendered: Option<&RenderedVoicing>,
        links: MediaLinks,
    ) -> Result<Self, DeckError> {
        let [notes_field, markup_field, image_field, audio_field] = voicing_fields(voicing);
        let (notes, markup) = match rendered {
            Some(r) => (normalize_field(&r.note_list(), self.proper)?, r.markup.clone()),
            None => (String::new(), String::new()),
        };
        self.fields.push((notes_field, notes));
        self.fields.push((markup_field, markup));
        self.fields.push((image_field, links.image));
        self.fields.push((audio_field, links.audio));
        Ok(self)
    }

    /// Append a pass-through column
    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> ChordRecord {
        ChordRecord {
            fields: self.fields,
        }
    }
}

/// Build one record per chord with the requested voicings, in caller order
///
/// Fails fast: the first chord that cannot be built aborts the whole run,
/// with the chord name attached to the error. Not-implemented voicings are
/// the one exception and produce empty fields.
///
/// When `media` is given, images and audio are rendered for every
/// implemented voicing; tool failures leave the fields empty.
///
/// # Examples
/// ```
/// use comping::names::NameTables;
/// use comping::record::{build_records, ChordInput};
/// use comping::voicing::Voicing;
/// use comping::ChordSpec;
///
/// let inputs = vec![ChordInput::from_spec(ChordSpec::parse("Bb", "dom7").unwrap())];
/// let records = build_records(&inputs, &[Voicing::ShellOff7th], &NameTables::build(), None).unwrap();
///
/// assert_eq!(records[0].get("Root_it"), Some("Si♭"));
/// assert_eq!(records[0].get("Rootless_V_Off_7th"), Some("Si♭ La♭"));
/// ```
pub fn build_records(
    inputs: &[ChordInput],
    voicings: &[Voicing],
    tables: &NameTables,
    mut media: Option<&mut MediaRenderer>,
) -> Result<Vec<ChordRecord>, DeckError> {
    let proper = tables.proper_notation();
    let generated = generated_field_names(voicings);

    let mut seen = HashSet::new();
    let mut skipped = HashSet::new();
    let mut records = Vec::with_capacity(inputs.len());

    for input in inputs {
        if !seen.insert(input.spec) {
            return Err(DeckError::InvalidChord {
                chord: input.name.clone(),
                message: format!(
                    "duplicate chord {} {}",
                    input.spec.root,
                    input.spec.quality.tag()
                ),
            });
        }

        let mut builder = RecordBuilder::new(input, &proper).map_err(|e| e.in_record(&input.name))?;

        for &voicing in voicings {
            let rendered = match render_voicing(&input.spec, voicing) {
                Ok(r) => Some(r),
                Err(DeckError::NotImplemented(name)) => {
                    if skipped.insert(voicing) {
                        warn!("Voicing {} is not implemented; its fields are left empty", name);
                    }
                    None
                }
                Err(e) => return Err(e.in_record(&input.name)),
            };

            if let Some(r) = &rendered {
                cross_check(input, r, tables).map_err(|e| e.in_record(&input.name))?;
            }

            let links = match (&rendered, media.as_deref_mut()) {
                (Some(r), Some(renderer)) => renderer.render(&input.name, voicing, r.source()),
                _ => MediaLinks::default(),
            };

            builder = builder
                .voicing(voicing, rendered.as_ref(), links)
                .map_err(|e| e.in_record(&input.name))?;
        }

        for (column, value) in &input.columns {
            if !generated.contains(column.as_str()) {
                builder = builder.field(column, value);
            }
        }

        let record = builder.build();
        debug!("Built record {} with {} fields", record.name(), record.fields().len());
        records.push(record);
    }

    info!("Built {} chord records", records.len());
    Ok(records)
}

/// Every field name the builder generates for the given voicings
fn generated_field_names(voicings: &[Voicing]) -> HashSet<String> {
    let mut names: HashSet<String> = [NAME_FIELD, ROOT_FIELD, ROOT_IT_FIELD, QUALITY_FIELD]
        .into_iter()
        .map(String::from)
        .collect();
    for &voicing in voicings {
        names.extend(voicing_fields(voicing));
    }
    names
}

/// Compare a table-supplied note list for a voicing against the derived tones
///
/// Tokens may be Italian or English shorthand; comparison is by pitch class.
/// Empty cells are not checked.
fn cross_check(input: &ChordInput, rendered: &RenderedVoicing, tables: &NameTables) -> Result<(), DeckError> {
    let base = rendered.voicing.field_base();
    let Some(supplied) = input.column(base).filter(|s| !s.trim().is_empty()) else {
        return Ok(());
    };

    let mut given = Vec::new();
    for token in supplied.split_whitespace() {
        let pitch = tables.lookup_pitch(token).ok_or_else(|| DeckError::UnknownNote {
            token: token.to_string(),
            field: supplied.to_string(),
        })?;
        given.push(pitch.pitch_class());
    }

    let mut derived: Vec<i32> = rendered.tones().map(|p| p.name.pitch_class()).collect();
    given.sort_unstable();
    given.dedup();
    derived.sort_unstable();
    derived.dedup();

    if given != derived {
        return Err(DeckError::InvalidChord {
            chord: input.name.clone(),
            message: format!(
                "column {} lists '{}' but the voicing is '{}'",
                base,
                supplied,
                rendered.note_list()
            ),
        });
    }
    Ok(())
}
