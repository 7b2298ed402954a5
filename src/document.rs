//! The file open in the editor: binary sniffing, encoding detection, saving
//!
//! Files are saved back in the encoding they were read with. When the text no
//! longer fits that encoding the save falls back to UTF-8 and the document
//! switches encodings.

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes inspected by the binary check
pub const SNIFF_BYTES: usize = 2048;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

lazy_static! {
    /// PEP 263 coding cookie
    static ref CODING_COOKIE: Regex =
        Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").expect("valid cookie regex");
}

/// NUL byte, or more than 10% control bytes other than tab/CR/LF, in the first `sniff` bytes
pub fn is_probably_binary(path: &Path, sniff: usize) -> std::io::Result<bool> {
    if sniff == 0 {
        return Ok(false);
    }
    let mut data = Vec::with_capacity(sniff);
    File::open(path)?.take(sniff as u64).read_to_end(&mut data)?;
    Ok(looks_binary(&data))
}

fn looks_binary(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    if data.contains(&0) {
        return true;
    }
    let control = data
        .iter()
        .filter(|&&b| !matches!(b, b'\t' | b'\n' | b'\r') && (b < 32 || b == 127))
        .count();
    control * 10 > data.len()
}

/// Encoding label for `path`: BOM, then a Python coding cookie, then UTF-8 or windows-1252
pub fn detect_text_encoding(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => detect_bytes(&bytes, is_python(path)),
        Err(_) => "utf-8".to_string(),
    }
}

fn detect_bytes(bytes: &[u8], python: bool) -> String {
    let has_bom = bytes.starts_with(UTF8_BOM);
    if python {
        let cookie = coding_cookie(bytes);
        return match (has_bom, cookie) {
            (true, _) => "utf-8-sig".to_string(),
            (false, Some(label)) => label,
            (false, None) => "utf-8".to_string(),
        };
    }
    if has_bom {
        "utf-8-sig".to_string()
    } else if std::str::from_utf8(bytes).is_ok() {
        "utf-8".to_string()
    } else {
        "windows-1252".to_string()
    }
}

/// Cookie from the first two lines, normalized
fn coding_cookie(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    head.lines().take(2).find_map(|line| {
        let label = CODING_COOKIE.captures(line)?.get(1)?.as_str().to_ascii_lowercase();
        let label = label.replace('_', "-");
        let alias = match label.as_str() {
            "utf8" | "utf-8" => Some("utf-8"),
            "latin-1" | "latin1" | "iso-8859-1" | "cp1252" => Some("windows-1252"),
            _ => None,
        };
        Some(match alias {
            Some(alias) => alias.to_string(),
            None if resolve(&label).is_some() => label,
            None => "utf-8".to_string(),
        })
    })
}

/// encoding_rs encoding for a label; `utf-8-sig` maps to UTF-8
fn resolve(label: &str) -> Option<&'static Encoding> {
    match label {
        "utf-8-sig" | "utf-8" | "utf8" => Some(UTF_8),
        "latin-1" | "latin1" | "cp1252" => Some(WINDOWS_1252),
        other => Encoding::for_label(other.as_bytes()),
    }
}

/// Decode with replacement; a leading BOM is dropped
pub fn decode(bytes: &[u8], label: &str) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let encoding = resolve(label).unwrap_or(UTF_8);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Encode strictly; `None` when some character has no mapping
pub fn encode(text: &str, label: &str) -> Option<Vec<u8>> {
    let encoding = resolve(label)?;
    if encoding == UTF_8 {
        let mut out = Vec::with_capacity(text.len() + 3);
        if label == "utf-8-sig" {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(text.as_bytes());
        return Some(out);
    }
    let (bytes, used, unmappable) = encoding.encode(text);
    // UTF-16 labels encode as UTF-8 in encoding_rs
    (!unmappable && used == encoding).then(|| bytes.into_owned())
}

pub fn is_python(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false)
}

/// Result of opening a path
#[derive(Debug)]
pub enum Loaded {
    Text { document: OpenDocument, text: String },
    Binary,
}

/// How a save went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Written as UTF-8 because the original encoding could not hold the text
    FellBackToUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    pub path: PathBuf,
    pub encoding: String,
    dirty: bool,
}

impl OpenDocument {
    pub fn load(path: &Path) -> Result<Loaded> {
        let binary = is_probably_binary(path, SNIFF_BYTES)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if binary {
            return Ok(Loaded::Binary);
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let encoding = detect_bytes(&bytes, is_python(path));
        let text = decode(&bytes, &encoding);
        Ok(Loaded::Text {
            document: OpenDocument {
                path: path.to_path_buf(),
                encoding,
                dirty: false,
            },
            text,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_python(&self) -> bool {
        is_python(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Write `text` in the document's encoding, falling back to UTF-8
    pub fn save(&mut self, text: &str) -> Result<SaveOutcome> {
        let (bytes, outcome) = match encode(text, &self.encoding) {
            Some(bytes) => (bytes, SaveOutcome::Saved),
            None => (text.as_bytes().to_vec(), SaveOutcome::FellBackToUtf8),
        };
        std::fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        if outcome == SaveOutcome::FellBackToUtf8 {
            self.encoding = "utf-8".to_string();
        }
        self.dirty = false;
        Ok(outcome)
    }
}
