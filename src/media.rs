//! # Media Rendering
//!
//! Optional image and audio for voicing fields, produced by external tools:
//!
//! ```text
//! <stem>.ly --lilypond--> <stem>.png + <stem>.midi
//! <stem>.midi --fluidsynth--> <stem>.wav --ffmpeg--> <stem>.mp3
//! ```
//!
//! Every failure here is recoverable. A missing tool, a non-zero exit or a
//! missing output file is logged and leaves the corresponding field empty;
//! the deck is still written.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};
use tempfile::TempDir;

use crate::config::{MediaSettings, MediaTools};
use crate::error::DeckError;
use crate::voicing::Voicing;

/// Field values pointing at rendered media; empty when nothing was rendered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaLinks {
    /// `<img src="stem.png">`
    pub image: String,
    /// `[sound:stem.mp3]`
    pub audio: String,
}

/// Renders voicing sources to PNG and MP3 files in a working directory
#[derive(Debug)]
pub struct MediaRenderer {
    dir: PathBuf,
    // Keeps a scratch directory alive until the deck has been packaged
    _scratch: Option<TempDir>,
    soundfont: PathBuf,
    dpi: u32,
    tools: MediaTools,
    // Times each base stem has been handed out
    stems: HashMap<String, usize>,
    files: Vec<PathBuf>,
}

impl MediaRenderer {
    /// Use `settings.dir` as the working directory, or a fresh scratch directory
    pub fn new(settings: &MediaSettings) -> Result<Self, DeckError> {
        let (dir, scratch) = match &settings.dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                (dir.clone(), None)
            }
            None => {
                let scratch = tempfile::Builder::new().prefix("comping-media").tempdir()?;
                (scratch.path().to_path_buf(), Some(scratch))
            }
        };
        debug!("Rendering media in {}", dir.display());

        Ok(Self {
            dir,
            _scratch: scratch,
            soundfont: settings.soundfont.clone(),
            dpi: settings.dpi,
            tools: settings.tools.clone(),
            stems: HashMap::new(),
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rendered files to ship with the deck, in rendering order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// File stem for the next render. Chords whose stems collide get a
    /// `_2`, `_3`, ... suffix in rendering order.
    pub fn unique_stem(&mut self, chord: &str, voicing: Voicing) -> String {
        let base = media_stem(chord, voicing);
        let count = self.stems.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            let stem = format!("{}_{}", base, count);
            debug!("Media stem {} taken, using {}", base, stem);
            stem
        }
    }

    /// Render image and audio for one voicing of one chord
    pub fn render(&mut self, chord: &str, voicing: Voicing, source: &str) -> MediaLinks {
        let stem = self.unique_stem(chord, voicing);
        let mut links = MediaLinks::default();

        let midi = match self.render_score(&stem, source) {
            Ok((png, midi)) => {
                links.image = format!("<img src=\"{}\">", file_name(&png));
                self.files.push(png);
                midi
            }
            Err(e) => {
                warn!("No image for {} {}: {}", chord, voicing, e);
                return links;
            }
        };

        match self.render_audio(&stem, &midi) {
            Ok(mp3) => {
                links.audio = format!("[sound:{}]", file_name(&mp3));
                self.files.push(mp3);
            }
            Err(e) => warn!("No audio for {} {}: {}", chord, voicing, e),
        }
        links
    }

    /// Write `<stem>.ly` and compile it; returns the PNG and MIDI paths
    fn render_score(&self, stem: &str, source: &str) -> Result<(PathBuf, PathBuf), DeckError> {
        let ly = self.dir.join(format!("{}.ly", stem));
        fs::write(&ly, source)?;

        let resolution = format!("-dresolution={}", self.dpi);
        run_tool(
            &self.tools.lilypond,
            [
                OsStr::new("--png"),
                OsStr::new(&resolution),
                OsStr::new("-o"),
                OsStr::new(stem),
                ly.as_os_str(),
            ],
            &self.dir,
        )?;

        let png = expect_output("lilypond", self.dir.join(format!("{}.png", stem)))?;
        let midi = ["midi", "mid"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.is_file())
            .ok_or_else(|| DeckError::ExternalTool {
                tool: "lilypond".to_string(),
                message: format!("no MIDI output for {}", stem),
            })?;
        Ok((png, midi))
    }

    /// Synthesize `<stem>.wav` from MIDI and encode it as `<stem>.mp3`
    fn render_audio(&self, stem: &str, midi: &Path) -> Result<PathBuf, DeckError> {
        if !self.soundfont.is_file() {
            return Err(DeckError::ExternalTool {
                tool: "fluidsynth".to_string(),
                message: format!("soundfont {} not found", self.soundfont.display()),
            });
        }

        let wav = self.dir.join(format!("{}.wav", stem));
        run_tool(
            &self.tools.fluidsynth,
            [
                OsStr::new("-ni"),
                self.soundfont.as_os_str(),
                midi.as_os_str(),
                OsStr::new("-F"),
                wav.as_os_str(),
            ],
            &self.dir,
        )?;
        let wav = expect_output("fluidsynth", wav)?;

        let mp3 = self.dir.join(format!("{}.mp3", stem));
        run_tool(
            &self.tools.ffmpeg,
            [
                OsStr::new("-y"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                OsStr::new("-i"),
                wav.as_os_str(),
                mp3.as_os_str(),
            ],
            &self.dir,
        )?;
        expect_output("ffmpeg", mp3)
    }
}

/// Deterministic file stem: `<chord>-<voicing base>`, non-alphanumerics as `_`
pub fn media_stem(chord: &str, voicing: Voicing) -> String {
    format!("{}-{}", chord, voicing.field_base())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Locate `tool` (a name on `PATH` or a path) and run it in `dir`, failing
/// on a non-zero exit
pub(crate) fn run_tool<I, S>(tool: &Path, args: I, dir: &Path) -> Result<(), DeckError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let failure = |message: String| DeckError::ExternalTool {
        tool: tool.display().to_string(),
        message,
    };

    let path = which::which(tool).map_err(|e| failure(e.to_string()))?;

    let mut command = Command::new(&path);
    command
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    debug!("Running {:?}", command);

    let output = command.output().map_err(|e| failure(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failure(format!("{}: {}", output.status, stderr.trim())));
    }
    Ok(())
}

fn expect_output(tool: &str, path: PathBuf) -> Result<PathBuf, DeckError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(DeckError::ExternalTool {
            tool: tool.to_string(),
            message: format!("expected output {} was not produced", path.display()),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
