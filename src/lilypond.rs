//! LilyPond markup for voicing fields.
//!
//! The grand-staff skeleton below is what the card-rendering add-on compiles:
//! the `[lilypond=void]` tag pair selects its empty template, and the paper,
//! header and title directives keep the image cropped to the two staves.

use crate::pitch::PitchOctave;

/// Duration of every voicing tone: a whole note
pub const DURATION: u8 = 1;

const TREBLE_PLACEHOLDER: &str = "$trebleClefNotes";
const BASS_PLACEHOLDER: &str = "$bassClefNotes";

const OPEN_TAG: &str = "[lilypond=void]";
const CLOSE_TAG: &str = "[/lilypond]";

const SCORE_TEMPLATE: &str = r#"\paper{#(set-paper-size '(cons (* 100 mm) (* 50 mm)))
        indent=0\mm
        oddFooterMarkup=##f
        oddHeaderMarkup=##f
        bookTitleMarkup = ##f
        scoreTitleMarkup = ##f
        }
\version "2.24.3"
\language "italiano"
\score {
        \new GrandStaff
        <<
          \new Staff {$trebleClefNotes}
          \new Staff {$bassClefNotes}
        >>
        \layout {}
        \midi {}
        }
"#;

/// Treble staff content: all tones sounding together, `<< do1 mi'1 >>`
pub fn treble_content(notes: &[PitchOctave]) -> String {
    if notes.is_empty() {
        return "r1".to_string();
    }
    let tokens: Vec<String> = notes.iter().map(|n| n.lilypond_token(DURATION)).collect();
    format!("<< {} >>", tokens.join(" "))
}

/// Bass staff content: bass clef followed by the tones or a whole rest
pub fn bass_content(notes: &[PitchOctave]) -> String {
    let body = match notes {
        [] => format!("r{}", DURATION),
        [single] => single.lilypond_token(DURATION),
        many => {
            let tokens: Vec<String> = many.iter().map(|n| n.lilypond_token(DURATION)).collect();
            format!("<< {} >>", tokens.join(" "))
        }
    };
    format!("\\clef bass {}", body)
}

/// Complete LilyPond source for a two-staff voicing, without the tag pair
pub fn score_source(treble: &[PitchOctave], bass: &[PitchOctave]) -> String {
    SCORE_TEMPLATE
        .replace(TREBLE_PLACEHOLDER, &treble_content(treble))
        .replace(BASS_PLACEHOLDER, &bass_content(bass))
}

/// Field markup: the score source wrapped in the add-on tag pair and escaped
/// for embedding in an HTML flashcard field
pub fn field_markup(source: &str) -> String {
    escape_html(&format!("{}\n{}{}", OPEN_TAG, source, CLOSE_TAG))
}

/// Escape `& < > " '` the way Python's `html.escape` does
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
