//! Translation file codec.
//!
//! Reads and writes the small PO subset the engine understands. A document is
//! a sequence of records separated by blank lines; a record contributes an
//! entry when it carries a `msgctxt` key plus a non-empty payload. The payload
//! is `msgid` for templates and `msgstr` for completed translations.
//!
//! Escaping is deliberately narrow: `"` and newline only. Plural forms and
//! translator comments are accepted on input and ignored.

use crate::error::{I18nError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Mapping from string key to text. Decoding keeps the last duplicate.
pub type TranslationMap = HashMap<String, String>;

/// Application line written into every template header.
pub const HEADER_APPLICATION: &str = "\"Application: Oxygen Not Included\"";

/// Version line written into every template header.
pub const HEADER_POT_VERSION: &str = "\"POT Version: 2.0\"";

/// Which field of a record holds the text to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A `.pot` export: source text lives in `msgid`.
    Template,
    /// A completed `.po` translation: translated text lives in `msgstr`.
    Translation,
}

static FIELD_REGEX: OnceLock<Regex> = OnceLock::new();

fn field_regex() -> &'static Regex {
    FIELD_REGEX.get_or_init(|| {
        Regex::new(r#"^(msgctxt|msgid_plural|msgid|msgstr(?:\[\d+\])?)\s*"(.*)"$"#)
            .expect("field pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    Str,
    Ignored,
}

#[derive(Debug, Default)]
struct Record {
    context: Option<String>,
    id: Option<String>,
    translated: Option<String>,
}

impl Record {
    fn slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Context => Some(&mut self.context),
            Field::Id => Some(&mut self.id),
            Field::Str => Some(&mut self.translated),
            Field::Ignored => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.context.is_none() && self.id.is_none() && self.translated.is_none()
    }

    /// Move a finished record into `map` if it has a key and non-empty text.
    fn flush_into(self, kind: DocumentKind, map: &mut TranslationMap) {
        let text = match kind {
            DocumentKind::Template => self.id,
            DocumentKind::Translation => self.translated,
        };
        match (self.context, text) {
            (Some(key), Some(text)) if !key.is_empty() && !text.is_empty() => {
                map.insert(key, text);
            }
            _ => {}
        }
    }
}

/// Decode the document at `path`.
///
/// Fails with [`I18nError::FileAbsent`] when the file does not exist, which
/// callers treat as "run untranslated".
pub fn decode(path: &Path, kind: DocumentKind) -> Result<TranslationMap> {
    let content = fs::read_to_string(path).map_err(|e| I18nError::from_io(path, e))?;
    let map = decode_str(&content, kind, path)?;
    debug!("Decoded {} entries from {}", map.len(), path.display());
    Ok(map)
}

/// Decode a document already held in memory. `origin` is only used in errors.
pub fn decode_str(content: &str, kind: DocumentKind, origin: &Path) -> Result<TranslationMap> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut map = TranslationMap::new();
    let mut record = Record::default();
    // Field that a bare quoted continuation line extends.
    let mut last_field: Option<Field> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();

        if line.is_empty() {
            std::mem::take(&mut record).flush_into(kind, &mut map);
            last_field = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let malformed = |reason: &str| I18nError::MalformedInput {
            path: origin.to_path_buf(),
            line: index + 1,
            reason: reason.to_string(),
        };

        if line.starts_with('"') {
            let value = quoted_body(line).ok_or_else(|| malformed("unterminated quoted value"))?;
            let field = last_field.ok_or_else(|| malformed("quoted text outside of a field"))?;
            if let Some(slot) = record.slot(field) {
                slot.get_or_insert_with(String::new)
                    .push_str(&unescape(value));
            }
            continue;
        }

        let captures = field_regex()
            .captures(line)
            .ok_or_else(|| malformed("expected msgctxt, msgid or msgstr"))?;
        let value = &captures[2];

        let field = match &captures[1] {
            "msgctxt" => Field::Context,
            "msgid" => Field::Id,
            "msgstr" => Field::Str,
            _ => Field::Ignored,
        };

        // A new key without a separating blank line starts a new record.
        if field == Field::Context && !record.is_empty() {
            std::mem::take(&mut record).flush_into(kind, &mut map);
        }

        if let Some(slot) = record.slot(field) {
            *slot = Some(unescape(value));
        }
        last_field = Some(field);
    }
    record.flush_into(kind, &mut map);

    Ok(map)
}

/// Body of a line that is exactly one quoted string, or `None` if unterminated.
///
/// The value runs up to the line's final quote. Backslashes are never escaped
/// on output, so one right before that quote is literal text.
fn quoted_body(line: &str) -> Option<&str> {
    if line.len() < 2 || !line.ends_with('"') {
        return None;
    }
    Some(&line[1..line.len() - 1])
}

/// Reverse [`escape`]: `\"` becomes `"` and `\n` becomes a newline.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('"') => {
                    out.push('"');
                    chars.next();
                }
                Some('n') => {
                    out.push('\n');
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Escape text for a quoted field: `"` becomes `\"`, newline becomes `\n`.
pub fn escape(text: &str) -> String {
    text.replace('"', "\\\"").replace('\n', "\\n")
}

/// Write the fixed template header followed by one record per entry, in the
/// order given. Output is UTF-8 without a byte-order mark.
pub fn encode<W: Write>(entries: &[(String, String)], mut writer: W) -> io::Result<()> {
    writeln!(writer, "msgid \"\"")?;
    writeln!(writer, "msgstr \"\"")?;
    writeln!(writer, "{HEADER_APPLICATION}")?;
    writeln!(writer, "{HEADER_POT_VERSION}")?;
    writeln!(writer)?;

    for (key, text) in entries {
        writeln!(writer, "#. {key}")?;
        writeln!(writer, "msgctxt \"{key}\"")?;
        writeln!(writer, "msgid \"{}\"", escape(text))?;
        writeln!(writer, "msgstr \"\"")?;
        writeln!(writer)?;
    }
    writer.flush()
}
