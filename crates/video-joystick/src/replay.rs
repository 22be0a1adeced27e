//! Replay collaborators: recorded frames, a scripted operator and a key
//! emulator that prints instead of typing.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use joystick_core::{FrameSource, KeyCode, KeyEmulator, OperatorEvent, OperatorInput, RgbFrame};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "ppm"];

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no image files in {0}")]
    NoFrames(PathBuf),
    #[error("invalid script token {0:?}")]
    ScriptToken(String),
}

/// Camera backed by a directory of image files, read in file-name order.
#[derive(Debug)]
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
    dimensions: (usize, usize),
}

impl ImageDirSource {
    /// List the images in `dir`. Frame dimensions come from the first file.
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, ReplayError> {
        let dir = dir.as_ref();
        let io_err = |source| ReplayError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| ReplayError::NoFrames(dir.to_path_buf()))?;
        let (w, h) = image::image_dimensions(first).map_err(|source| ReplayError::Image {
            path: first.clone(),
            source,
        })?;
        log::info!("replaying {} frames of {w}x{h} from {}", files.len(), dir.display());

        Ok(Self {
            files,
            next: 0,
            looping,
            dimensions: (w as usize, h as usize),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn read_frame(&mut self) -> Option<RgbFrame> {
        if self.next >= self.files.len() {
            if !self.looping {
                return None;
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;
        let img = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                log::warn!("cannot decode {}: {e}", path.display());
                return None;
            }
        };
        RgbFrame::from_raw(img.width() as usize, img.height() as usize, img.into_raw())
    }

    fn frame_dimensions(&self) -> (usize, usize) {
        self.dimensions
    }
}

/// Operator replaying a fixed list of events, one per poll.
///
/// Tokens are separated by whitespace or commas:
/// `confirm`, `back`, `exit`, `wait` / `wait:N` (N polls with no event) and
/// `key:<c>` (a single character). Once exhausted every poll yields `Exit`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptedInput {
    events: VecDeque<Option<OperatorEvent>>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = Option<OperatorEvent>>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn parse(script: &str) -> Result<Self, ReplayError> {
        let mut events = VecDeque::new();
        for token in script
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let bad = || ReplayError::ScriptToken(token.to_string());
            match token.split_once(':') {
                None => match token.to_ascii_lowercase().as_str() {
                    "confirm" => events.push_back(Some(OperatorEvent::Confirm)),
                    "back" => events.push_back(Some(OperatorEvent::Back)),
                    "exit" => events.push_back(Some(OperatorEvent::Exit)),
                    "wait" => events.push_back(None),
                    _ => return Err(bad()),
                },
                Some((head, arg)) => match head.to_ascii_lowercase().as_str() {
                    "wait" => {
                        let n: usize = arg.parse().map_err(|_| bad())?;
                        events.extend(std::iter::repeat_n(None, n));
                    }
                    "key" => {
                        let mut chars = arg.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => {
                                events.push_back(Some(OperatorEvent::Key(KeyCode::from_char(c))))
                            }
                            _ => return Err(bad()),
                        }
                    }
                    _ => return Err(bad()),
                },
            }
        }
        Ok(Self { events })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl OperatorInput for ScriptedInput {
    fn poll(&mut self) -> Option<OperatorEvent> {
        self.events.pop_front().unwrap_or(Some(OperatorEvent::Exit))
    }
}

/// Key emulator writing `press <key>` / `release <key>` lines.
#[derive(Debug)]
pub struct PrintingKeyboard<W> {
    out: W,
}

impl PrintingKeyboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PrintingKeyboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, verb: &str, key: KeyCode) {
        let written = if key == KeyCode::SPACE {
            writeln!(self.out, "{verb} space")
        } else {
            writeln!(self.out, "{verb} {key}")
        };
        if let Err(e) = written {
            log::warn!("key output failed: {e}");
        }
    }
}

impl<W: Write> KeyEmulator for PrintingKeyboard<W> {
    fn press(&mut self, key: KeyCode) {
        self.line("press", key);
    }

    fn release(&mut self, key: KeyCode) {
        self.line("release", key);
    }
}
