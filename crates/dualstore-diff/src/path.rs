//! Field paths for addressing within compared values
//!
//! Provides [`FieldPath`] for concrete positions inside a JSON value and the
//! pattern matching used by comparator rules and classification rows.

use std::fmt::{self, Display, Formatter};

/// One step into a JSON value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Object field
    Key(String),
    /// Position in an ordered array
    Index(usize),
    /// Element of a keyed set, e.g. `[food_id=7]`
    Keyed { key: String, value: String },
    /// Unmatched element of an unordered set
    Element,
}

/// Path within a compared value
///
/// # Examples
/// - root → `$`
/// - `["items", 2, "qty"]` → `items[2].qty`
/// - keyed element → `items[food_id=7].grams`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Root path
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut new = self.clone();
        new.0.push(segment);
        new
    }

    /// Append an object key
    #[inline]
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    /// Pattern form: every array position becomes `[*]`
    #[must_use]
    pub fn normalized(&self) -> String {
        render(&self.0, true)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.0, false))
    }
}

fn render(segments: &[Segment], normalize: bool) -> String {
    if segments.is_empty() {
        return "$".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                push_escaped(&mut out, k);
            }
            _ if normalize => out.push_str("[*]"),
            Segment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
            Segment::Keyed { key, value } => {
                out.push('[');
                push_escaped(&mut out, key);
                out.push('=');
                push_escaped(&mut out, value);
                out.push(']');
            }
            Segment::Element => out.push_str("[*]"),
        }
    }
    out
}

/// Brackets and backslashes inside keys and keyed values are escaped
fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Normalize a rendered concrete path (as stored in a diff entry)
///
/// Bracket contents collapse to `*`: `items[food_id=7].grams` becomes
/// `items[*].grams`. Escaped characters never open or close a bracket.
#[must_use]
pub fn normalize_str(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_brackets = false;
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next();
                if !in_brackets {
                    out.push('\\');
                    out.extend(escaped);
                }
            }
            '[' if !in_brackets => {
                in_brackets = true;
                out.push_str("[*]");
            }
            ']' if in_brackets => in_brackets = false,
            _ if in_brackets => {}
            _ => out.push(c),
        }
    }
    out
}

/// Strip a leading list-element segment
///
/// LIST results are arrays of records; stripping lets a rule written for
/// `status` match `[*].status` too. A bare element becomes `$`.
#[must_use]
pub fn strip_element_prefix(normalized: &str) -> &str {
    match normalized.strip_prefix("[*]") {
        Some("") => "$",
        Some(rest) => rest.strip_prefix('.').unwrap_or(rest),
        None => normalized,
    }
}

/// Check a rule pattern against a normalized path
///
/// - exact match
/// - `*` matches everything
/// - `prefix.*` matches every descendant of `prefix`
#[must_use]
pub fn pattern_matches(pattern: &str, normalized: &str) -> bool {
    if pattern == normalized || pattern == "*" {
        return true;
    }
    match pattern.strip_suffix(".*") {
        Some(prefix) => normalized
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('[')),
        None => false,
    }
}

/// Specificity used to pick between several matching patterns
///
/// Exact matches beat wildcards; longer wildcard prefixes beat shorter ones.
#[must_use]
pub fn pattern_specificity(pattern: &str) -> usize {
    match pattern {
        "*" => 0,
        p if p.ends_with(".*") => p.len(),
        _ => usize::MAX,
    }
}
