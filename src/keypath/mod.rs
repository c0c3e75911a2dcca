//! Dotted key-path expressions with optional array indices.
//!
//! A key-path locates a leaf in a structured file: `database.host`,
//! `servers[0].port`, `a.b[3].c`. The grammar is
//! `step ("." step)*` with `step = name ("[" digits "]")?`. Parsing and
//! rendering round-trip exactly for well-formed paths.

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;

/// One step of a key-path: a mapping key plus an optional sequence
/// index applied to the value under that key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyStep {
    pub name: String,
    pub index: Option<usize>,
}

impl KeyStep {
    /// Plain mapping-key step.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    /// Mapping-key step followed by a sequence index.
    #[must_use]
    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }
}

/// An ordered sequence of [`KeyStep`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    steps: Vec<KeyStep>,
}

impl KeyPath {
    /// Parse a textual key-path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::Syntax`] with the byte position of the
    /// offending segment on empty steps, bad indices, unbalanced
    /// brackets, or leading/trailing dots.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Syntax { position: 0 });
        }

        let mut steps = Vec::new();
        let mut position = 0usize;

        for segment in input.split('.') {
            steps.push(parse_step(segment, position)?);
            position += segment.len() + 1;
        }

        Ok(Self { steps })
    }

    /// The steps in order.
    #[must_use]
    pub fn steps(&self) -> &[KeyStep] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// A key-path always has at least one step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render the prefix covering the first `n` steps, as used in
    /// navigation error messages.
    #[must_use]
    pub fn prefix(&self, n: usize) -> String {
        let mut out = String::new();
        for (i, step) in self.steps.iter().take(n).enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&step.name);
            if let Some(index) = step.index {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
        out
    }
}

/// Parse one `name` or `name[digits]` segment.
fn parse_step(segment: &str, position: usize) -> Result<KeyStep, PathError> {
    if segment.is_empty() {
        return Err(PathError::Syntax { position });
    }

    let Some(open) = segment.find('[') else {
        if segment.contains(']') {
            return Err(PathError::Syntax { position });
        }
        return Ok(KeyStep::name(segment));
    };

    // Exactly `name[digits]`: one bracket pair closing at the end.
    let name = &segment[..open];
    let rest = &segment[open + 1..];
    let Some(close) = rest.find(']') else {
        return Err(PathError::Syntax { position });
    };
    let digits = &rest[..close];
    let trailing = &rest[close + 1..];

    if name.is_empty()
        || !trailing.is_empty()
        || digits.is_empty()
        || name.contains(']')
        || digits.contains('[')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(PathError::Syntax { position });
    }

    let index: usize = digits
        .parse()
        .map_err(|_| PathError::Syntax { position })?;

    Ok(KeyStep::indexed(name, index))
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.steps.len()))
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_name() {
        let path = KeyPath::parse("host").unwrap();
        assert_eq!(path.steps(), &[KeyStep::name("host")]);
    }

    #[test]
    fn test_parse_nested_with_index() {
        let path = KeyPath::parse("a.b[3].c").unwrap();
        assert_eq!(
            path.steps(),
            &[
                KeyStep::name("a"),
                KeyStep::indexed("b", 3),
                KeyStep::name("c"),
            ]
        );
    }

    #[test]
    fn test_render_roundtrip() {
        for text in ["a", "a.b", "a.b[3].c", "servers[0].port", "x[10]"] {
            let path = KeyPath::parse(text).unwrap();
            assert_eq!(path.to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            KeyPath::parse(""),
            Err(PathError::Syntax { position: 0 })
        );
    }

    #[test]
    fn test_parse_rejects_leading_dot() {
        assert_eq!(
            KeyPath::parse(".a"),
            Err(PathError::Syntax { position: 0 })
        );
    }

    #[test]
    fn test_parse_rejects_trailing_dot() {
        assert_eq!(
            KeyPath::parse("a."),
            Err(PathError::Syntax { position: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_empty_step() {
        assert_eq!(
            KeyPath::parse("a..b"),
            Err(PathError::Syntax { position: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_brackets() {
        for text in ["a[", "a]", "a[]", "a[x]", "[0]", "a[0]b", "a[0][1]", "a[-1]"] {
            assert!(KeyPath::parse(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_error_position_points_at_segment() {
        assert_eq!(
            KeyPath::parse("ok.bad[x]"),
            Err(PathError::Syntax { position: 3 })
        );
    }

    #[test]
    fn test_prefix_rendering() {
        let path = KeyPath::parse("a.b[2].c").unwrap();
        assert_eq!(path.prefix(1), "a");
        assert_eq!(path.prefix(2), "a.b[2]");
        assert_eq!(path.prefix(3), "a.b[2].c");
    }
}
