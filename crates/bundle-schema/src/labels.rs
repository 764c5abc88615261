//! Label registry backed by a flat properties file.

use catalogx_common::Result;
use std::collections::HashMap;
use std::path::Path;

/// Ordered mapping from label key to its default-locale description.
///
/// Keys are unique: inserting an existing key replaces its value but keeps
/// the key's original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRegistry {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a label. Returns `true` when the key was new.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => {
                self.entries[pos].1 = value;
                false
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse properties text. Blank lines and `#`/`!` comments are skipped;
    /// the key ends at the first unescaped `=` or `:`. Backslash escapes
    /// (`\=`, `\:`, `\ `, `\#`, `\\`, `\n`, `\t`, `\r`) are decoded in
    /// keys and values.
    pub fn parse(text: &str) -> Self {
        let mut registry = Self::new();
        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = split_entry(line);
            registry.insert(key, value);
        }
        registry
    }

    /// Read and parse a properties file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Render as `key=value` lines in insertion order, escaped so that
    /// [`LabelRegistry::parse`] reads back the same entries.
    pub fn to_properties(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", escape_key(key), escape_value(value)))
            .collect()
    }
}

fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    // Unescaped whitespace is only part of the key when more key follows.
    let mut blank = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                key.push_str(&blank);
                blank.clear();
                if let Some(escaped) = chars.next() {
                    key.push(unescape_char(escaped));
                }
            }
            '=' | ':' => return (key, unescape(chars.as_str().trim_start())),
            c if c.is_whitespace() => blank.push(c),
            c => {
                key.push_str(&blank);
                blank.clear();
                key.push(c);
            }
        }
    }
    (key, String::new())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(unescape_char(escaped));
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn escape_control(c: char, out: &mut String) -> bool {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        _ => return false,
    }
    true
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if escape_control(c, &mut out) {
            continue;
        }
        if matches!(c, '=' | ':' | '#' | '!' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut leading = true;
    for c in value.chars() {
        if escape_control(c, &mut out) {
            leading = false;
            continue;
        }
        if leading && c == ' ' {
            out.push('\\');
        } else {
            leading = false;
        }
        out.push(c);
    }
    out
}
