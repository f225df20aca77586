//! Bilingual content package: command detection, section extraction and
//! validation.
//!
//! Grammar (command line first, then the two locale sections in any order):
//!
//! ```text
//! /pr filename=<name>.<ext>
//! ---ES_START---
//! ---MDX_START---
//! locale: es
//! slug: <slug>
//! ...content...
//! ---MDX_END---
//! ---ES_END---
//! ---EN_START---
//! ...same shape, locale: en...
//! ---EN_END---
//! ```

use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::rejection::Rejection;

pub const COMMAND: &str = "/pr";

const BOM: char = '\u{feff}';
const MDX_START: &str = "---MDX_START---";
const MDX_END: &str = "---MDX_END---";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Locale {
    Es,
    En,
}

impl Locale {
    pub const PRIMARY: Locale = Locale::Es;
    pub const SECONDARY: Locale = Locale::En;

    pub fn code(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Locale::Es => "ES",
            Locale::En => "EN",
        }
    }

    fn section_markers(self) -> (&'static str, &'static str) {
        match self {
            Locale::Es => ("---ES_START---", "---ES_END---"),
            Locale::En => ("---EN_START---", "---EN_END---"),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One locale's content block, exactly as it will be written to the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleBlock {
    pub locale: Locale,
    pub body: String,
}

impl LocaleBlock {
    /// File contents: the block body with a single trailing newline.
    pub fn file_contents(&self) -> String {
        format!("{}\n", self.body)
    }
}

/// A validated submission: both locales present, tagged correctly, same slug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPackage {
    pub filename: String,
    pub slug: String,
    pub primary: LocaleBlock,
    pub secondary: LocaleBlock,
}

impl ContentPackage {
    /// Parse and validate merged submission text.
    ///
    /// Checks run in a fixed order and stop at the first failure: filename,
    /// locale sections, content blocks, locale tags, slugs.
    pub fn parse(merged: &str) -> Result<Self, Rejection> {
        let text = strip_leading_noise(merged);
        let command = text.lines().next().unwrap_or_default();
        let filename = parse_filename(command)?;

        let (Some(primary), Some(secondary)) = (
            section(text, Locale::PRIMARY),
            section(text, Locale::SECONDARY),
        ) else {
            return Err(Rejection::MissingSections);
        };

        let primary = content_block(primary).ok_or(Rejection::MissingContentBlock {
            locale: Locale::PRIMARY,
        })?;
        let secondary = content_block(secondary).ok_or(Rejection::MissingContentBlock {
            locale: Locale::SECONDARY,
        })?;

        check_locale(Locale::PRIMARY, primary)?;
        check_locale(Locale::SECONDARY, secondary)?;

        let primary_slug = header_value(primary, "slug").ok_or(Rejection::MissingSlug {
            locale: Locale::PRIMARY,
        })?;
        let secondary_slug = header_value(secondary, "slug").ok_or(Rejection::MissingSlug {
            locale: Locale::SECONDARY,
        })?;
        if primary_slug != secondary_slug {
            return Err(Rejection::SlugMismatch {
                primary: primary_slug,
                secondary: secondary_slug,
            });
        }
        validate_slug(&primary_slug)?;

        Ok(Self {
            filename,
            slug: primary_slug,
            primary: LocaleBlock {
                locale: Locale::PRIMARY,
                body: primary.to_string(),
            },
            secondary: LocaleBlock {
                locale: Locale::SECONDARY,
                body: secondary.to_string(),
            },
        })
    }

    /// Repository path for one locale: `<root>/<locale>/<filename>`.
    pub fn path_for(&self, root: &str, locale: Locale) -> String {
        let root = root.trim_matches('/');
        if root.is_empty() {
            format!("{}/{}", locale.code(), self.filename)
        } else {
            format!("{root}/{}/{}", locale.code(), self.filename)
        }
    }

    pub fn blocks(&self) -> [&LocaleBlock; 2] {
        [&self.primary, &self.secondary]
    }
}

/// Strip a leading byte-order mark and whitespace, in any interleaving.
pub fn strip_leading_noise(text: &str) -> &str {
    text.trim_start_matches(|c: char| c == BOM || c.is_whitespace())
}

/// Whether `text` opens with the `/pr` command (optionally `/pr@botname`).
pub fn detect_command(text: &str) -> bool {
    let Some(rest) = strip_leading_noise(text).strip_prefix(COMMAND) else {
        return false;
    };
    // Telegram addresses commands in groups as `/pr@botname`.
    let rest = match rest.strip_prefix('@') {
        Some(r) => r.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        None => rest,
    };
    rest.is_empty() || rest.starts_with(char::is_whitespace)
}

/// Combine the caption and the document body into one submission text.
///
/// The command line comes from whichever source carries a complete one
/// (`/pr filename=...`), caption first; a caption command is prepended to the
/// body. If neither names a file, a bare caption command still wins so the
/// author is told the filename is missing. Returns `None` when neither source
/// carries the command.
pub fn merge_sources(caption: Option<&str>, body: Option<&str>) -> Option<String> {
    let caption = caption.filter(|c| detect_command(c));
    let body_command = body.filter(|b| detect_command(b));

    let prepend_caption = |caption: &str| {
        let mut merged = strip_leading_noise(caption).to_string();
        if let Some(body) = body {
            merged.push('\n');
            merged.push_str(body.trim_start_matches(BOM));
        }
        merged
    };

    match (caption, body_command) {
        (Some(c), _) if names_file(c) => Some(prepend_caption(c)),
        (_, Some(b)) if names_file(b) => Some(strip_leading_noise(b).to_string()),
        (Some(c), _) => Some(prepend_caption(c)),
        (None, Some(b)) => Some(strip_leading_noise(b).to_string()),
        (None, None) => None,
    }
}

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)filename=(\S+)").expect("valid regex"))
}

/// Whether the command line of `text` has a `filename=` parameter.
fn names_file(text: &str) -> bool {
    let line = strip_leading_noise(text).lines().next().unwrap_or_default();
    filename_re().is_match(line)
}

/// Extract `filename=<value>` from the command line.
pub fn parse_filename(command_line: &str) -> Result<String, Rejection> {
    let raw = filename_re()
        .captures(command_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(|c: char| c == '"' || c == '\''))
        .filter(|s| !s.is_empty())
        .ok_or(Rejection::MissingFilename)?;

    if raw.contains(['/', '\\']) || raw.contains("..") || raw.starts_with('.') {
        return Err(Rejection::InvalidFilename(raw.to_string()));
    }
    Ok(raw.to_string())
}

/// Text between the first `start` marker and the next `end` marker, trimmed.
pub fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(text[from..from + len].trim())
}

fn section(text: &str, locale: Locale) -> Option<&str> {
    let (start, end) = locale.section_markers();
    extract_between(text, start, end)
}

fn content_block(section: &str) -> Option<&str> {
    extract_between(section, MDX_START, MDX_END)
}

fn check_locale(section: Locale, block: &str) -> Result<(), Rejection> {
    let found = header_value(block, "locale");
    if found.as_deref() == Some(section.code()) {
        Ok(())
    } else {
        Err(Rejection::LocaleMismatch { section, found })
    }
}

/// Leading metadata lines of a block.
///
/// Either a `---` fenced front-matter header, or the lines up to the first
/// blank line.
fn header_lines(block: &str) -> Vec<&str> {
    let mut lines = block
        .lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty())
        .peekable();

    if lines.peek() == Some(&"---") {
        lines.next();
        lines.take_while(|l| *l != "---").collect()
    } else {
        lines.take_while(|l| !l.is_empty()).collect()
    }
}

/// Value of `key: value` in a block's header, trimmed and unquoted.
pub fn header_value(block: &str, key: &str) -> Option<String> {
    header_lines(block)
        .into_iter()
        .find_map(|line| {
            let (k, v) = line.split_once(':')?;
            (k.trim() == key).then(|| unquote(v.trim()).to_string())
        })
        .filter(|v| !v.is_empty())
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

/// The slug becomes part of a branch name, so it must be a safe ref component.
fn validate_slug(slug: &str) -> Result<(), Rejection> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid regex"));

    if re.is_match(slug) && !slug.contains("..") && !slug.ends_with('.') && !slug.ends_with(".lock")
    {
        Ok(())
    } else {
        Err(Rejection::InvalidSlug(slug.to_string()))
    }
}
