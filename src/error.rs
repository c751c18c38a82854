//! # Error Types
//!
//! This module defines all error types for the deck generator.
//!
//! Every fatal error carries enough context (chord name, voicing, field or
//! token) to tell the user which part of the input to fix.
//!
//! ## Error Types
//! - `InvalidChord` - Chord spelling failed, wrong arity, or duplicate chord
//! - `UnknownVoicing` - Voicing name outside the known set
//! - `UnknownNote` - Note-name normalization lookup miss
//! - `NotImplemented` - Voicing kind that has no selection rule yet
//! - `ExternalTool` - Rendering/audio subprocess failed (recovered in `media`)
//! - `MissingTemplateField` - Card template references an unknown field
//! - `Table`, `Config`, `Package`, `Io` - Adapter failures
//! - `InRecord` - Any of the above, tagged with the chord being built
//!
//! ## Usage
//! ```rust
//! use comping::{ChordSpec, DeckError};
//!
//! match ChordSpec::parse("H", "maj7") {
//!     Ok(chord) => println!("{}", chord.display_name()),
//!     Err(DeckError::InvalidChord { chord, message }) => {
//!         eprintln!("Cannot spell {}: {}", chord, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    /// Chord spelling failed or produced the wrong number of tones.
    ///
    /// # Example
    /// ```
    /// # use comping::DeckError;
    /// let err = DeckError::InvalidChord {
    ///     chord: "Cmaj9".to_string(),
    ///     message: "unknown quality 'maj9'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid chord Cmaj9: unknown quality 'maj9'");
    /// ```
    #[error("Invalid chord {chord}: {message}")]
    InvalidChord { chord: String, message: String },

    /// Requested voicing kind is not in the closed set.
    ///
    /// # Example
    /// ```
    /// # use comping::DeckError;
    /// let err = DeckError::UnknownVoicing("drop-2".to_string());
    /// assert_eq!(err.to_string(), "Unknown voicing: drop-2");
    /// ```
    #[error("Unknown voicing: {0}")]
    UnknownVoicing(String),

    /// A token in a note-list field has no entry in the translation table.
    ///
    /// # Example
    /// ```
    /// # use comping::DeckError;
    /// let err = DeckError::UnknownNote {
    ///     token: "Hb".to_string(),
    ///     field: "Do Hb".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Unknown note 'Hb' in field 'Do Hb'");
    /// ```
    #[error("Unknown note '{token}' in field '{field}'")]
    UnknownNote { token: String, field: String },

    /// The voicing exists in the closed set but has no selection rule.
    #[error("Voicing {0} is not implemented")]
    NotImplemented(String),

    /// An external rendering or audio tool failed.
    ///
    /// Recovered inside the media step; the affected field is left empty.
    #[error("External tool {tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// A card template references a field the model does not define.
    #[error("Template {template} references unknown field {{{{{field}}}}}")]
    MissingTemplateField { template: String, field: String },

    #[error("Input table error: {0}")]
    Table(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A fatal error raised while building the record for one chord.
    ///
    /// # Example
    /// ```
    /// # use comping::DeckError;
    /// let err = DeckError::UnknownVoicing("drop-2".to_string()).in_record("Cmaj7");
    /// assert_eq!(err.to_string(), "Chord Cmaj7: Unknown voicing: drop-2");
    /// ```
    #[error("Chord {chord}: {source}")]
    InRecord {
        chord: String,
        #[source]
        source: Box<DeckError>,
    },
}

impl From<rusqlite::Error> for DeckError {
    fn from(e: rusqlite::Error) -> Self {
        DeckError::Package(format!("collection database: {}", e))
    }
}

impl From<zip::result::ZipError> for DeckError {
    fn from(e: zip::result::ZipError) -> Self {
        DeckError::Package(format!("zip archive: {}", e))
    }
}

impl DeckError {
    /// Attach the name of the chord being processed to a fatal error.
    pub fn in_record(self, chord: &str) -> Self {
        match self {
            e @ DeckError::InRecord { .. } => e,
            e => DeckError::InRecord {
                chord: chord.to_string(),
                source: Box::new(e),
            },
        }
    }
}
