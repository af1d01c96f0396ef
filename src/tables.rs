//! Read-only tables loaded once at startup.
//!
//! - `LabelTable`: class names for the static/movement models (`label.csv`)
//! - `Vocabulary`: character codes for the fingerspelling model plus the
//!   PAD/START/END sentinels (`character_to_prediction_index.json`)
//! - `InferenceArgs`: landmark columns the fingerspelling model was exported
//!   with (`inference_args.json`)
//!
//! Every loader reports problems as `RecognitionError::Configuration`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::RecognitionError;

const UTF8_BOM: char = '\u{feff}';

/// Name returned for indices outside the label table.
pub const UNKNOWN_LABEL: &str = "Unknown";

fn read_table(path: &Path, what: &str) -> Result<String, RecognitionError> {
    std::fs::read_to_string(path).map_err(|e| {
        RecognitionError::configuration(format!(
            "failed to read {} {}: {}",
            what,
            path.display(),
            e
        ))
    })
}

// -------------------- Labels --------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self, RecognitionError> {
        let raw = read_table(path, "label table")?;
        let table = Self::from_csv_str(&raw);
        if table.is_empty() {
            return Err(RecognitionError::configuration(format!(
                "label table {} has no labels",
                path.display()
            )));
        }
        Ok(table)
    }

    /// First column of every record; blank rows and empty labels are skipped.
    /// Quoted fields may contain commas, doubled quotes and line breaks.
    pub fn from_csv_str(raw: &str) -> Self {
        let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
        let labels = first_csv_fields(raw)
            .into_iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        Self { labels }
    }

    /// Label for a class index; `"Unknown"` when out of range or negative.
    pub fn label(&self, index: i32) -> &str {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn first_csv_fields(raw: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_first = true;
    let mut quoted = false;
    let mut at_field_start = true;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    if in_first {
                        field.push('"');
                    }
                }
                '"' => quoted = false,
                _ if in_first => field.push(c),
                _ => {}
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                quoted = true;
                at_field_start = false;
            }
            ',' => {
                in_first = false;
                at_field_start = true;
            }
            '\n' => {
                fields.push(std::mem::take(&mut field));
                in_first = true;
                at_field_start = true;
            }
            '\r' => {}
            _ => {
                at_field_start = false;
                if in_first {
                    field.push(c);
                }
            }
        }
    }
    if !field.is_empty() {
        fields.push(field);
    }
    fields
}

// -------------------- Vocabulary --------------------

/// Decoded meaning of a fingerspelling output code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    Char(char),
    Pad,
    Start,
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    /// Index = code, for codes `0..base_size`.
    chars: Vec<char>,
    codes: HashMap<char, usize>,
}

impl Vocabulary {
    /// Build from a char -> code map. Codes must cover `0..n` exactly once.
    pub fn new(map: HashMap<char, usize>) -> Result<Self, RecognitionError> {
        let mut chars = vec![None; map.len()];
        for (&c, &code) in &map {
            let slot = chars.get_mut(code).ok_or_else(|| {
                RecognitionError::configuration(format!(
                    "character code {} for {:?} is outside 0..{}",
                    code,
                    c,
                    map.len()
                ))
            })?;
            if slot.replace(c).is_some() {
                return Err(RecognitionError::configuration(format!(
                    "character code {} assigned twice",
                    code
                )));
            }
        }
        let chars = chars.into_iter().flatten().collect();
        Ok(Self { chars, codes: map })
    }

    pub fn load(path: &Path) -> Result<Self, RecognitionError> {
        let raw = read_table(path, "character map")?;
        Self::from_json_str(&raw).map_err(|e| {
            RecognitionError::configuration(format!("{}: {}", path.display(), e.message()))
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RecognitionError> {
        let parsed: HashMap<String, usize> = serde_json::from_str(raw).map_err(|e| {
            RecognitionError::configuration(format!("invalid character map: {}", e))
        })?;
        let mut map = HashMap::with_capacity(parsed.len());
        for (key, code) in parsed {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    map.insert(c, code);
                }
                _ => {
                    return Err(RecognitionError::configuration(format!(
                        "character map key {:?} is not a single character",
                        key
                    )))
                }
            }
        }
        Self::new(map)
    }

    /// Number of real characters, excluding sentinels.
    pub fn base_size(&self) -> usize {
        self.chars.len()
    }

    /// Total number of codes including PAD/START/END.
    pub fn len(&self) -> usize {
        self.base_size() + 3
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn pad(&self) -> usize {
        self.base_size()
    }

    pub fn start(&self) -> usize {
        self.base_size() + 1
    }

    pub fn end(&self) -> usize {
        self.base_size() + 2
    }

    pub fn code(&self, c: char) -> Option<usize> {
        self.codes.get(&c).copied()
    }

    /// Inverse lookup; total over `0..len()`.
    pub fn token(&self, code: usize) -> Option<Token> {
        let base = self.base_size();
        match code {
            c if c < base => Some(Token::Char(self.chars[c])),
            c if c == base => Some(Token::Pad),
            c if c == base + 1 => Some(Token::Start),
            c if c == base + 2 => Some(Token::End),
            _ => None,
        }
    }
}

// -------------------- Inference args --------------------

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InferenceArgs {
    pub selected_columns: Vec<String>,
}

impl InferenceArgs {
    pub fn load(path: &Path) -> Result<Self, RecognitionError> {
        let raw = read_table(path, "inference args")?;
        Self::from_json_str(&raw).map_err(|e| {
            RecognitionError::configuration(format!("{}: {}", path.display(), e.message()))
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RecognitionError> {
        let args: Self = serde_json::from_str(raw).map_err(|e| {
            RecognitionError::configuration(format!("invalid inference args: {}", e))
        })?;
        if args.selected_columns.is_empty() {
            return Err(RecognitionError::configuration(
                "inference args list no selected columns",
            ));
        }
        Ok(args)
    }

    /// Values per flattened fingerspelling frame.
    pub fn frame_width(&self) -> usize {
        self.selected_columns.len()
    }
}
