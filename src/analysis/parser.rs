//! Heading-driven section parser for model responses.
//!
//! A [`Schema`] lists the sections a response is expected to contain. The
//! scanner walks the response line by line with a single cursor: a heading
//! line (`#` markdown or a bold-only `**Marker**` line) that matches one of a
//! section's markers opens that section and closes whatever was open before. Content is then collected according to
//! the section's kind. Parsing never fails; anything missing falls back to
//! the defaults carried by the schema.

use std::collections::BTreeMap;
use tracing::debug;

/// Record field a section is extracted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Evaluation,
    Recommendations,
    RiskLevel,
    Priority,
    OverallEvaluation,
    FinalDecision,
    RiskAnalysis,
    ImprovementRoadmap,
}

/// One candidate of a classification section.
#[derive(Debug, Clone, Copy)]
pub struct Choice {
    /// Canonical label stored in the parsed record.
    pub label: &'static str,
    /// Keywords that select this choice. ASCII keywords only match whole
    /// words, other keywords match anywhere in the line.
    pub keywords: &'static [&'static str],
}

/// Fallback for a free-text section that collected nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDefault {
    /// The entire unparsed response, verbatim.
    WholeResponse,
    Literal(&'static str),
}

/// How the lines of a section are collected.
#[derive(Debug, Clone, Copy)]
pub enum SectionKind {
    /// Non-empty lines, newline-joined.
    Text { default: TextDefault },
    /// Bulleted lines only, marker stripped.
    Bullets { placeholder: &'static str },
    /// First keyword hit, scanned in the order the choices are listed.
    Classify {
        choices: &'static [Choice],
        default: &'static str,
    },
}

/// A section descriptor: heading markers, target field and field kind.
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub markers: &'static [&'static str],
    pub field: Field,
    pub kind: SectionKind,
}

/// The ordered section table for one record kind.
#[derive(Debug, Clone)]
pub struct Schema {
    sections: Vec<Section>,
}

/// Extracted value of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Label(&'static str),
}

/// Complete parse result; holds a value for every field in the schema.
#[derive(Debug, Clone, Default)]
pub struct ParsedSections {
    values: BTreeMap<Field, Value>,
}

impl ParsedSections {
    /// Take a text field out of the result. Missing fields yield an empty string.
    pub fn take_text(&mut self, field: Field) -> String {
        match self.values.remove(&field) {
            Some(Value::Text(text)) => text,
            _ => String::new(),
        }
    }

    /// Take a list field out of the result. Missing fields yield an empty list.
    pub fn take_list(&mut self, field: Field) -> Vec<String> {
        match self.values.remove(&field) {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        }
    }

    /// Canonical label of a classification field.
    pub fn label(&self, field: Field) -> Option<&'static str> {
        match self.values.get(&field) {
            Some(Value::Label(label)) => Some(label),
            _ => None,
        }
    }
}

/// Scanner state: which section, if any, is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Outside,
    Inside(usize),
}

/// Per-section accumulator while scanning.
#[derive(Debug)]
enum Accumulator {
    Text(Vec<String>),
    Bullets(Vec<String>),
    /// Keyword found on the heading line, and the first one found in the body.
    Classify {
        heading: Option<&'static str>,
        body: Option<&'static str>,
    },
}

impl Accumulator {
    fn for_kind(kind: &SectionKind) -> Self {
        match kind {
            SectionKind::Text { .. } => Accumulator::Text(Vec::new()),
            SectionKind::Bullets { .. } => Accumulator::Bullets(Vec::new()),
            SectionKind::Classify { .. } => Accumulator::Classify {
                heading: None,
                body: None,
            },
        }
    }
}

impl Schema {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Parse a response into one value per section.
    pub fn parse(&self, response: &str) -> ParsedSections {
        let mut accumulators: Vec<Accumulator> = self
            .sections
            .iter()
            .map(|s| Accumulator::for_kind(&s.kind))
            .collect();
        let mut cursor = Cursor::Outside;

        for raw_line in response.lines() {
            let line = raw_line.trim();

            if let Some((index, rest)) = self.match_heading(line) {
                cursor = Cursor::Inside(index);
                // "## Risk Level: High" carries its value on the heading line.
                // A body line still wins, since the heading may echo the choices.
                if let (
                    SectionKind::Classify { choices, .. },
                    Accumulator::Classify { heading, .. },
                ) = (&self.sections[index].kind, &mut accumulators[index])
                {
                    if heading.is_none() {
                        *heading = classify(rest, choices);
                    }
                }
                continue;
            }

            let Cursor::Inside(index) = cursor else {
                continue;
            };

            match (&self.sections[index].kind, &mut accumulators[index]) {
                (SectionKind::Text { .. }, Accumulator::Text(lines)) => {
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                }
                (SectionKind::Bullets { .. }, Accumulator::Bullets(items)) => {
                    if let Some(item) = strip_bullet(line) {
                        items.push(item.to_string());
                    }
                }
                (SectionKind::Classify { choices, .. }, Accumulator::Classify { body, .. }) => {
                    if body.is_none() {
                        *body = classify(line, choices);
                    }
                }
                _ => {}
            }
        }

        self.finish(response, accumulators)
    }

    fn finish(&self, response: &str, accumulators: Vec<Accumulator>) -> ParsedSections {
        let mut parsed = ParsedSections::default();

        for (section, accumulator) in self.sections.iter().zip(accumulators) {
            let value = match (section.kind, accumulator) {
                (SectionKind::Text { default }, Accumulator::Text(lines)) => {
                    let text = lines.join("\n");
                    if text.is_empty() {
                        debug!(field = ?section.field, "Section empty, using default");
                        Value::Text(match default {
                            TextDefault::WholeResponse => response.to_string(),
                            TextDefault::Literal(s) => s.to_string(),
                        })
                    } else {
                        Value::Text(text)
                    }
                }
                (SectionKind::Bullets { placeholder }, Accumulator::Bullets(items)) => {
                    if items.is_empty() {
                        debug!(field = ?section.field, "No list entries, using placeholder");
                        Value::List(vec![placeholder.to_string()])
                    } else {
                        Value::List(items)
                    }
                }
                (SectionKind::Classify { default, .. }, Accumulator::Classify { heading, body }) => {
                    Value::Label(body.or(heading).unwrap_or_else(|| {
                        debug!(field = ?section.field, default, "No keyword found, using default");
                        default
                    }))
                }
                // Accumulators are built from the same kinds, so shapes always agree.
                _ => continue,
            };
            parsed.values.insert(section.field, value);
        }

        parsed
    }

    /// Find the section a heading line opens, returning the text after the marker.
    fn match_heading<'a>(&self, line: &'a str) -> Option<(usize, &'a str)> {
        let title = heading_title(line)?;

        self.sections.iter().enumerate().find_map(|(index, section)| {
            section
                .markers
                .iter()
                .find_map(|marker| strip_marker(title, marker))
                .map(|rest| (index, rest))
        })
    }
}

/// Title text of a heading line, without `#` and bold markers.
///
/// Accepts markdown headings (`## Evaluation`) and bold-only lines
/// (`**Evaluation**`, `**Risk Level:** High`).
fn heading_title(line: &str) -> Option<&str> {
    let title = if line.starts_with('#') {
        line.trim_start_matches('#').trim()
    } else if line.len() > 2 && line.starts_with("**") && line[2..].contains("**") {
        line
    } else {
        return None;
    };
    Some(title.trim_start_matches("**").trim())
}

/// Prefix-match `marker` against a heading title (ASCII case-insensitive).
fn strip_marker<'a>(title: &'a str, marker: &str) -> Option<&'a str> {
    if title.len() < marker.len() || !title.is_char_boundary(marker.len()) {
        return None;
    }
    let (head, rest) = title.split_at(marker.len());
    if !head.eq_ignore_ascii_case(marker) {
        return None;
    }
    Some(
        rest.trim_start_matches(|c: char| c == '*' || c == ':' || c == '：' || c.is_whitespace())
            .trim_end(),
    )
}

/// Strip a list marker (`-`, `*`, `+`, `•`, `・`, `1.`, `1)`) from a line.
fn strip_bullet(line: &str) -> Option<&str> {
    if line.starts_with("**") {
        return None;
    }

    let rest = if let Some(rest) = line.strip_prefix(['-', '*', '+', '•', '・']) {
        rest
    } else {
        let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return None;
        }
        // "1.5x faster" is prose, "1. faster" is a list item.
        let rest = line[digits..].strip_prefix(['.', ')'])?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest
    };

    let item = rest.trim();
    // Empty, or a horizontal rule such as "---" or "* * *".
    let is_rule = item
        .chars()
        .all(|c| matches!(c, '-' | '*' | '+' | '_' | '=') || c.is_whitespace());
    if is_rule {
        None
    } else {
        Some(item)
    }
}

/// Return the label of the first choice with a keyword present in `text`.
fn classify(text: &str, choices: &[Choice]) -> Option<&'static str> {
    choices
        .iter()
        .find(|choice| choice.keywords.iter().any(|kw| contains_keyword(text, kw)))
        .map(|choice| choice.label)
}

fn contains_keyword(text: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return text.contains(keyword);
    }

    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    text.match_indices(keyword).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + keyword.len()..].chars().next();
        !is_word(before) && !is_word(after)
    })
}
