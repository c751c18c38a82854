//! Chord table input.
//!
//! A `;`-delimited text file with a header row, one chord per row. A row
//! names its chord either with `Root` and `Quality` columns or with a chord
//! symbol in `Name` (`Dbmaj7`, `F#m7b5`). Every other column is carried into
//! the deck as-is. Cells missing from short rows read as the empty string.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};

use crate::chord::{parse_chord_symbol, ChordSpec, Quality};
use crate::error::DeckError;
use crate::names::NameTables;
use crate::record::{ChordInput, NAME_FIELD, QUALITY_FIELD, ROOT_FIELD};

pub const DELIMITER: u8 = b';';

/// Read a chord table from disk
pub fn read_table(path: &Path, tables: &NameTables) -> Result<Vec<ChordInput>, DeckError> {
    let file = File::open(path)?;
    let inputs = parse_table(file, tables)?;
    debug!("Read {} chords from {}", inputs.len(), path.display());
    Ok(inputs)
}

/// Parse a chord table from any reader
///
/// # Examples
/// ```
/// use comping::names::NameTables;
/// use comping::table::parse_table;
///
/// let data = "Name;Root;Quality;SortId\nDbmaj7;Reb;maj7;1\nF#m7b5;;;2\n";
/// let inputs = parse_table(data.as_bytes(), &NameTables::build()).unwrap();
///
/// assert_eq!(inputs.len(), 2);
/// assert_eq!(inputs[0].spec.root.to_string(), "Db");
/// assert_eq!(inputs[1].spec.display_name(), "F#m7b5");
/// assert_eq!(inputs[1].column("SortId"), Some("2"));
/// ```
pub fn parse_table<R: Read>(reader: R, tables: &NameTables) -> Result<Vec<ChordInput>, DeckError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .quote(b'"')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if !headers.iter().any(|h| h == NAME_FIELD || h == ROOT_FIELD) {
        return Err(DeckError::Config(format!(
            "chord table needs a {} or {} column",
            NAME_FIELD, ROOT_FIELD
        )));
    }

    let mut inputs = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let line = index + 2;

        if row.len() > headers.len() {
            warn!(
                "Row {} has {} cells but the header has {}; extra cells ignored",
                line,
                row.len(),
                headers.len()
            );
        }

        let columns: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).unwrap_or_default().to_string()))
            .collect();

        let cell = |name: &str| {
            columns
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };

        let label = if cell(NAME_FIELD).is_empty() {
            format!("row {}", line)
        } else {
            cell(NAME_FIELD).to_string()
        };
        let spec = row_spec(cell(NAME_FIELD), cell(ROOT_FIELD), cell(QUALITY_FIELD), tables)
            .map_err(|e| e.in_record(&label))?;

        let name = match cell(NAME_FIELD) {
            "" => spec.display_name(),
            name => name.to_string(),
        };
        inputs.push(ChordInput {
            spec,
            name,
            columns,
        });
    }
    Ok(inputs)
}

/// Chord identity of one row: `Root` + `Quality` when both are present,
/// otherwise the chord symbol in `Name`
fn row_spec(name: &str, root: &str, quality: &str, tables: &NameTables) -> Result<ChordSpec, DeckError> {
    if root.is_empty() || quality.is_empty() {
        return parse_chord_symbol(name);
    }

    let invalid = |message: String| DeckError::InvalidChord {
        chord: format!("{}{}", root, quality),
        message,
    };
    let root_name = tables
        .lookup_pitch(root)
        .ok_or_else(|| invalid(format!("invalid root '{}'", root)))?;
    let quality = Quality::parse_tag(quality)
        .ok_or_else(|| invalid(format!("unknown quality '{}'", quality)))?;
    Ok(ChordSpec::new(root_name, quality))
}
