//! Argument-file sniffing.
//!
//! Classifies a command-line path as a scenario file, a session file, or
//! neither, by probing the XML namespace in the first 256 characters.
//! Gzip-compressed files are transparently decompressed. Invalid input of
//! any kind classifies as `Invalid`; this function never fails.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::trace;

/// Namespace URI marking scenario documents.
pub const SCENARIO_NAMESPACE: &str = "http://www.kynosarges.de/Hexkit.Scenario";
/// Namespace URI marking session documents.
pub const SESSION_NAMESPACE: &str = "http://www.kynosarges.de/Hexkit.Session";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const PROBE_CHARS: usize = 256;

/// Classification of one candidate input path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// A readable file without a recognized namespace, or unreadable data.
    Invalid,
    /// No candidate file exists.
    Missing,
    Scenario,
    Session,
}

/// Directories searched for relative arguments, after the current one.
#[derive(Clone, Debug, Default)]
pub struct SearchRoots {
    pub scenario_dir: Option<PathBuf>,
    pub session_dir: Option<PathBuf>,
}

/// Resolves and classifies one argument path.
///
/// Relative arguments are tried against the current directory, then the
/// scenario tree, then the session tree; absolute paths only at their
/// literal location. Extension-less arguments get `.xml` and `.xml.gz`
/// appended.
pub fn classify_argument(argument: &str, roots: &SearchRoots) -> FileKind {
    for candidate in candidate_paths(argument, roots) {
        if candidate.is_file() {
            trace!(target: "runtime::sniff", path = %candidate.display(), "probing");
            return classify_file(&candidate);
        }
    }
    FileKind::Missing
}

fn candidate_paths(argument: &str, roots: &SearchRoots) -> Vec<PathBuf> {
    let path = Path::new(argument);
    let bases: Vec<PathBuf> = if path.is_absolute() {
        vec![path.to_path_buf()]
    } else {
        let mut bases = vec![path.to_path_buf()];
        if let Some(dir) = &roots.scenario_dir {
            bases.push(dir.join(path));
        }
        if let Some(dir) = &roots.session_dir {
            bases.push(dir.join(path));
        }
        bases
    };

    let mut candidates = Vec::new();
    for base in bases {
        if base.extension().is_some() {
            candidates.push(base);
        } else {
            candidates.push(base.with_extension("xml"));
            candidates.push(base.with_extension("xml.gz"));
        }
    }
    candidates
}

fn classify_file(path: &Path) -> FileKind {
    let Ok(raw) = std::fs::read(path) else {
        return FileKind::Invalid;
    };
    let text_bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        let mut decoder = GzDecoder::new(raw.as_slice());
        // A truncated stream that already yielded the probe window is fine.
        match decoder.read_to_end(&mut decoded) {
            Ok(_) => decoded,
            Err(_) if decoded.len() >= PROBE_CHARS => decoded,
            Err(_) => return FileKind::Invalid,
        }
    } else {
        raw
    };

    let text = String::from_utf8_lossy(&text_bytes);
    let head: String = text.chars().take(PROBE_CHARS).collect();
    if head.contains(SCENARIO_NAMESPACE) {
        FileKind::Scenario
    } else if head.contains(SESSION_NAMESPACE) {
        FileKind::Session
    } else {
        FileKind::Invalid
    }
}
