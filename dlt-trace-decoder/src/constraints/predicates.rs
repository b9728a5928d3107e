//! Predicates on the text and type of a line

use super::MatchConstraint;
use crate::line::TraceLine;
use crate::types::ConstraintError;
use regex::{Regex, RegexBuilder};
use std::marker::PhantomData;

/// Matches every line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraint;

impl MatchConstraint for NoConstraint {
    fn check(&self, _line: &dyn TraceLine) -> bool {
        true
    }

    fn is_wildcard(&self) -> bool {
        true
    }
}

/// The text contains a substring
#[derive(Debug, Clone)]
pub struct TextString {
    text: String,
}

impl TextString {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl MatchConstraint for TextString {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.text().contains(self.text.as_str())
    }
}

/// The text contains a substring, ignoring case
#[derive(Debug, Clone)]
pub struct TextIString {
    text: String,
}

impl TextIString {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().to_lowercase(),
        }
    }
}

impl MatchConstraint for TextIString {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.text().to_lowercase().contains(self.text.as_str())
    }
}

/// The text is exactly a string
#[derive(Debug, Clone)]
pub struct TextEquals {
    text: String,
}

impl TextEquals {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl MatchConstraint for TextEquals {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.text() == self.text
    }
}

/// The text is exactly a string, ignoring case
#[derive(Debug, Clone)]
pub struct TextIEquals {
    text: String,
}

impl TextIEquals {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().to_lowercase(),
        }
    }
}

impl MatchConstraint for TextIEquals {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.text().to_lowercase() == self.text
    }
}

#[derive(Debug, Clone)]
pub struct TextStartsWith {
    text: String,
}

impl TextStartsWith {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl MatchConstraint for TextStartsWith {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.text().starts_with(self.text.as_str())
    }
}

/// The text matches a regular expression anywhere
#[derive(Debug, Clone)]
pub struct TextRegex {
    regex: Regex,
}

impl TextRegex {
    pub fn new(pattern: &str) -> Result<Self, ConstraintError> {
        Self::with_case(pattern, false)
    }

    /// Case insensitive match
    pub fn new_ignore_case(pattern: &str) -> Result<Self, ConstraintError> {
        Self::with_case(pattern, true)
    }

    fn with_case(pattern: &str, ignore_case: bool) -> Result<Self, ConstraintError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ConstraintError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { regex })
    }
}

impl MatchConstraint for TextRegex {
    fn check(&self, line: &dyn TraceLine) -> bool {
        self.regex.is_match(line.text())
    }
}

/// The line is of type `T`
pub struct InstanceOf<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> InstanceOf<T> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for InstanceOf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TraceLine> MatchConstraint for InstanceOf<T> {
    fn check(&self, line: &dyn TraceLine) -> bool {
        line.as_any().is::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::DltLineBuilder;
    use std::any::Any;

    struct Line(&'static str);

    impl TraceLine for Line {
        fn text(&self) -> &str {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_text_predicates() {
        let line = Line("Temperature measurement 23");
        assert!(TextString::new("measure").check(&line));
        assert!(!TextString::new("Measure").check(&line));
        assert!(TextIString::new("MEASURE").check(&line));
        assert!(TextEquals::new("Temperature measurement 23").check(&line));
        assert!(!TextEquals::new("Temperature").check(&line));
        assert!(TextIEquals::new("temperature MEASUREMENT 23").check(&line));
        assert!(TextStartsWith::new("Temp").check(&line));
        assert!(!TextStartsWith::new("temp").check(&line));
        assert!(NoConstraint.check(&line));
    }

    #[test]
    fn test_regex() {
        let line = Line("Buffer near limit. Free size: 512");
        assert!(TextRegex::new(r"size: \d+$").unwrap().check(&line));
        assert!(!TextRegex::new(r"^size").unwrap().check(&line));
        assert!(TextRegex::new_ignore_case("BUFFER").unwrap().check(&line));
        assert!(!TextRegex::new("BUFFER").unwrap().check(&line));

        let err = TextRegex::new("(unclosed").unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidRegex { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_instance_of() {
        let dlt = DltLineBuilder::new().build();
        let other = Line("");
        let check = InstanceOf::<crate::line::DltTraceLine>::new();
        assert!(check.check(&dlt));
        assert!(!check.check(&other));
        assert!(InstanceOf::<Line>::new().check(&other));
    }
}
