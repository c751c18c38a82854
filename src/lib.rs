pub mod chord;
pub mod config;
pub mod deck;
pub mod error;
pub mod lilypond;
pub mod media;
pub mod names;
pub mod package;
pub mod pitch;
pub mod record;
pub mod table;
pub mod voicing;

use std::path::PathBuf;

use log::{info, warn};

pub use chord::{parse_chord_symbol, ChordSpec, Quality};
pub use config::Config;
pub use deck::{assemble_deck, Deck, DeckSpec};
pub use error::*;
pub use names::{normalize_field, NameTables};
pub use package::write_package;
pub use record::{build_records, ChordInput, ChordRecord};
pub use voicing::{render_voicing, RenderedVoicing, Voicing};

use media::MediaRenderer;

/// Result of a full deck build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckReport {
    pub output: PathBuf,
    pub notes: usize,
    pub cards: usize,
    pub media: usize,
}

/// The chords a configuration asks for: the rows of its input table, or
/// every configured root with every configured quality
pub fn chord_inputs(config: &Config, tables: &NameTables) -> Result<Vec<ChordInput>, DeckError> {
    match &config.input {
        Some(path) => table::read_table(path, tables),
        None => Ok(config
            .roots
            .iter()
            .flat_map(|&root| {
                config
                    .qualities
                    .iter()
                    .map(move |&quality| ChordInput::from_spec(ChordSpec::new(root, quality)))
            })
            .collect()),
    }
}

/// Build the deck described by `config` and write it to `config.output`.
/// This is the main entry point for the library.
pub fn generate_deck(config: &Config) -> Result<DeckReport, DeckError> {
    let tables = NameTables::build();
    let inputs = chord_inputs(config, &tables)?;
    info!(
        "Generating {} chords with {} voicings",
        inputs.len(),
        config.voicings.len()
    );

    let mut renderer = if config.media.enabled {
        Some(MediaRenderer::new(&config.media)?)
    } else {
        None
    };

    let records = build_records(&inputs, &config.voicings, &tables, renderer.as_mut())?;

    let mut spec = DeckSpec {
        deck_id: config.deck_id,
        deck_name: config.deck_name.clone(),
        model_id: config.model_id,
        ..DeckSpec::default()
    };

    // Drop the card templates of voicings the configuration leaves out
    if let Some(first) = records.first() {
        let fields = first.field_names();
        spec.templates.retain(|template| {
            let covered = template
                .referenced_fields()
                .iter()
                .all(|f| fields.contains(&f.as_str()));
            if !covered {
                warn!("Card template {} skipped: its voicing is not generated", template.name);
            }
            covered
        });
        if spec.templates.is_empty() {
            return Err(DeckError::Config(
                "none of the configured voicings has a card template".to_string(),
            ));
        }
    }

    let mut deck = assemble_deck(&records, &spec)?;
    if let Some(renderer) = &renderer {
        deck.media = renderer.files().to_vec();
    }

    let summary = write_package(&deck, &config.output)?;
    Ok(DeckReport {
        output: config.output.clone(),
        notes: summary.notes,
        cards: summary.cards,
        media: summary.media,
    })
}
