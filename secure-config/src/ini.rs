//! Ordered section table and its INI text form.
//!
//! Sections and options keep insertion order so that saving the same table
//! twice produces byte-identical text. Names are case-sensitive.
//!
//! The parser is strict: a section or option repeated inside one source, an
//! option outside any section, or a line without a delimiter is reported with
//! the source label and line number instead of being guessed at.
//!
//! Values whose text would not survive a plain `key = value` line (control
//! characters, surrounding whitespace, a leading `"`) are written as JSON
//! string literals and decoded again on parse. Hand-edited files may still use
//! indented continuation lines for multi-line values.

use std::fmt::Write as _;

use thiserror::Error;
use zeroize::Zeroize;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{source_label}:{line}: {message}")]
pub struct ParseError {
    pub source_label: String,
    pub line: usize,
    pub message: String,
}

/// Checks that `name` can be written as a `[name]` header and read back.
pub fn validate_section_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("section name is empty".to_string());
    }
    if name.chars().any(char::is_control) {
        return Err("section name contains a control character".to_string());
    }
    if name.trim() != name {
        return Err("section name has surrounding whitespace".to_string());
    }
    Ok(())
}

/// Checks that `name` can be written left of a `=` and read back.
pub fn validate_option_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("option name is empty".to_string());
    }
    if name.chars().any(char::is_control) {
        return Err("option name contains a control character".to_string());
    }
    if name.trim() != name {
        return Err("option name has surrounding whitespace".to_string());
    }
    if name.contains(['=', ':']) {
        return Err("option name contains a delimiter".to_string());
    }
    if name.starts_with(['#', ';', '[']) {
        return Err("option name starts with a comment or header marker".to_string());
    }
    Ok(())
}

fn needs_quoting(value: &str) -> bool {
    value.starts_with('"') || value.trim() != value || value.chars().any(char::is_control)
}

/// A named group of options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    options: Vec<(String, String)>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == option)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, option: &str) -> bool {
        self.get(option).is_some()
    }

    /// Inserts or overwrites an option, keeping the original position on overwrite.
    pub fn set(&mut self, option: impl Into<String>, value: impl Into<String>) {
        let option = option.into();
        let value = value.into();
        match self.options.iter_mut().find(|(key, _)| *key == option) {
            Some(slot) => slot.1 = value,
            None => self.options.push((option, value)),
        }
    }

    pub fn remove(&mut self, option: &str) -> Option<String> {
        let index = self.options.iter().position(|(key, _)| key == option)?;
        Some(self.options.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Every section of a store, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    sections: Vec<Section>,
}

impl SectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Appends an empty section. Returns `false` if it already existed.
    pub fn add_section(&mut self, name: &str) -> bool {
        if self.has_section(name) {
            return false;
        }
        self.sections.push(Section::new(name));
        true
    }

    /// Returns `false` if there was nothing to remove.
    pub fn remove_section(&mut self, name: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        before != self.sections.len()
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.section(section)?.get(option)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Overwrites every name and value in place, then empties the table.
    pub fn wipe(&mut self) {
        for section in &mut self.sections {
            section.name.zeroize();
            for (key, value) in &mut section.options {
                key.zeroize();
                value.zeroize();
            }
        }
        self.sections.clear();
    }

    /// Folds `other` into this table. Options in `other` win; new sections are
    /// appended in their original order.
    pub fn merge(&mut self, other: SectionTable) {
        for incoming in other.sections {
            match self.section_mut(&incoming.name) {
                Some(existing) => {
                    for (key, value) in incoming.options {
                        existing.set(key, value);
                    }
                }
                None => self.sections.push(incoming),
            }
        }
    }

    /// Builds a table from nested name/value pairs, rejecting duplicates the
    /// same way [`SectionTable::parse`] does. `source_label` names the mapping in errors.
    pub fn from_mapping<S, O, K, V>(
        data: impl IntoIterator<Item = (S, O)>,
        source_label: &str,
    ) -> Result<Self, ParseError>
    where
        S: Into<String>,
        O: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = SectionTable::new();
        for (position, (name, options)) in data.into_iter().enumerate() {
            let name: String = name.into();
            let error = |message: String| ParseError {
                source_label: source_label.to_string(),
                line: position + 1,
                message,
            };
            validate_section_name(&name).map_err(|reason| error(format!("{reason}: '{name}'")))?;
            if table.has_section(&name) {
                return Err(error(format!("section '{name}' already exists")));
            }
            let mut section = Section::new(name.clone());
            for (key, value) in options {
                let key: String = key.into();
                validate_option_name(&key)
                    .map_err(|reason| error(format!("{reason}: '{key}' in section '{name}'")))?;
                if section.contains(&key) {
                    return Err(error(format!(
                        "option '{key}' in section '{name}' already exists"
                    )));
                }
                section.options.push((key, value.into()));
            }
            table.sections.push(section);
        }
        Ok(table)
    }

    /// Parses INI text into a fresh table.
    pub fn parse(text: &str, source_label: &str) -> Result<Self, ParseError> {
        IniParser::new(source_label).parse(text)
    }

    /// Renders the table as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.options {
                if value.is_empty() {
                    let _ = writeln!(out, "{key} =");
                } else if needs_quoting(value) {
                    let quoted = serde_json::Value::String(value.clone()).to_string();
                    let _ = writeln!(out, "{key} = {quoted}");
                } else {
                    let _ = writeln!(out, "{key} = {value}");
                }
            }
            out.push('\n');
        }
        out
    }
}

struct IniParser<'a> {
    source_label: &'a str,
    table: SectionTable,
    /// Option currently open for continuation lines.
    open_option: Option<String>,
}

impl<'a> IniParser<'a> {
    fn new(source_label: &'a str) -> Self {
        Self {
            source_label,
            table: SectionTable::new(),
            open_option: None,
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            source_label: self.source_label.to_string(),
            line,
            message: message.into(),
        }
    }

    fn current_section(&mut self) -> Option<&mut Section> {
        self.table.sections.last_mut()
    }

    fn parse(mut self, text: &str) -> Result<SectionTable, ParseError> {
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim();

            let indented = raw.starts_with(|c: char| c.is_whitespace());
            if indented && self.open_option.is_some() {
                self.continue_value(trimmed);
                continue;
            }

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if trimmed.is_empty() {
                self.close_option();
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() > 2 {
                self.close_option();
                let name = &trimmed[1..trimmed.len() - 1];
                if !self.table.add_section(name) {
                    return Err(self.error(line_no, format!("section '{name}' already exists")));
                }
                continue;
            }

            self.parse_option(line_no, trimmed)?;
        }
        self.close_option();
        Ok(self.table)
    }

    fn parse_option(&mut self, line_no: usize, trimmed: &str) -> Result<(), ParseError> {
        self.close_option();
        let Some(delimiter) = trimmed.find(['=', ':']) else {
            return Err(self.error(line_no, format!("expected `key = value`, found '{trimmed}'")));
        };
        let key = trimmed[..delimiter].trim();
        let value = trimmed[delimiter + 1..].trim();
        if key.is_empty() {
            return Err(self.error(line_no, "empty option name"));
        }

        let Some(section) = self.current_section() else {
            return Err(self.error(line_no, format!("option '{key}' appears before any section")));
        };
        if section.contains(key) {
            let message = format!("option '{key}' in section '{}' already exists", section.name);
            return Err(self.error(line_no, message));
        }
        section.options.push((key.to_string(), value.to_string()));
        self.open_option = Some(key.to_string());
        Ok(())
    }

    fn continue_value(&mut self, trimmed: &str) {
        if let Some(section) = self.table.sections.last_mut() {
            if let Some((_, value)) = section.options.last_mut() {
                value.push('\n');
                value.push_str(trimmed);
            }
        }
    }

    /// Trailing blank continuation lines are not part of the value. A
    /// single-line value written as a JSON string literal is decoded; anything
    /// that does not decode is kept as written.
    fn close_option(&mut self) {
        if self.open_option.take().is_none() {
            return;
        }
        if let Some((_, value)) = self
            .table
            .sections
            .last_mut()
            .and_then(|section| section.options.last_mut())
        {
            let kept = value.trim_end().len();
            value.truncate(kept);
            if value.starts_with('"') && !value.contains('\n') {
                if let Ok(decoded) = serde_json::from_str::<String>(value) {
                    *value = decoded;
                }
            }
        }
    }
}
