//! Declarative line filters
//!
//! A [`FilterConfig`] is one group of conditions that must all hold. Field
//! names listed in `not` are negated. Each entry of `or` is another group,
//! and the line matches if this group or any alternative matches. The
//! filter is turned into a sealed [`Constraint`] once, before decoding.

use dlt_trace_decoder::{Constraint, ConstraintError, ConstraintOptions, DltType};
use serde::{Deserialize, Serialize};

const FIELDS: &[&str] = &[
    "ecu_id",
    "app_id",
    "ctx_id",
    "text",
    "itext",
    "regex",
    "iregex",
    "dlt_type",
    "verbose",
    "session_id",
    "awake_ms",
];

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Unknown filter field '{0}' in 'not'")]
    UnknownField(String),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FilterConfig {
    pub ecu_id: Option<String>,
    pub app_id: Option<String>,
    pub ctx_id: Option<String>,
    /// Substring of the line text
    pub text: Option<String>,
    /// Substring of the line text, ignoring case
    pub itext: Option<String>,
    pub regex: Option<String>,
    pub iregex: Option<String>,
    pub dlt_type: Option<DltType>,
    /// Verbose (true) or non-verbose (false) messages only
    pub verbose: Option<bool>,
    pub session_id: Option<u32>,
    /// Minimum device uptime in milliseconds
    pub awake_ms: Option<u64>,

    /// Fields of this group whose condition is negated
    #[serde(default)]
    pub not: Vec<String>,

    /// Alternative groups
    #[serde(default)]
    pub or: Vec<FilterConfig>,
}

impl FilterConfig {
    /// True if the filter has no condition at all
    pub fn is_empty(&self) -> bool {
        self.term_count() == 0 && self.or.iter().all(FilterConfig::is_empty)
    }

    fn term_count(&self) -> usize {
        [
            self.ecu_id.is_some(),
            self.app_id.is_some(),
            self.ctx_id.is_some(),
            self.text.is_some(),
            self.itext.is_some(),
            self.regex.is_some(),
            self.iregex.is_some(),
            self.dlt_type.is_some(),
            self.verbose.is_some(),
            self.session_id.is_some(),
            self.awake_ms.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    /// Build and seal the constraint for this filter
    ///
    /// An empty filter matches every line.
    pub fn to_constraint(&self, options: ConstraintOptions) -> Result<Constraint, FilterError> {
        let constraint = match self.alternatives(options)? {
            Some(constraint) => constraint,
            None => Constraint::with_options(options).none(),
        };
        Ok(constraint.end()?)
    }

    /// This group or-ed with its alternatives, `None` if all are empty
    fn alternatives(&self, options: ConstraintOptions) -> Result<Option<Constraint>, FilterError> {
        let mut groups = Vec::new();
        if let Some(group) = self.group(options)? {
            groups.push(group);
        }
        for alternative in &self.or {
            if let Some(group) = alternative.alternatives(options)? {
                groups.push(group);
            }
        }

        if groups.len() == 1 {
            return Ok(groups.pop());
        }
        let mut combined: Option<Constraint> = None;
        for group in groups {
            combined = Some(match combined {
                None => Constraint::with_options(options).expr(group),
                Some(constraint) => constraint.or().expr(group),
            });
        }
        Ok(combined)
    }

    /// The conditions of this group alone, and-ed
    fn group(&self, options: ConstraintOptions) -> Result<Option<Constraint>, FilterError> {
        if let Some(unknown) = self.not.iter().find(|name| !FIELDS.contains(&name.as_str())) {
            return Err(FilterError::UnknownField(unknown.clone()));
        }
        if self.term_count() == 0 {
            return Ok(None);
        }

        let mut constraint = Constraint::with_options(options);
        let negate = |constraint: Constraint, field: &str| {
            if self.not.iter().any(|name| name == field) {
                constraint.not()
            } else {
                constraint
            }
        };

        if let Some(id) = &self.ecu_id {
            constraint = negate(constraint, "ecu_id").dlt_ecu_id(id.as_str());
        }
        if let Some(id) = &self.app_id {
            constraint = negate(constraint, "app_id").dlt_app_id(id.as_str());
        }
        if let Some(id) = &self.ctx_id {
            constraint = negate(constraint, "ctx_id").dlt_ctx_id(id.as_str());
        }
        if let Some(text) = &self.text {
            constraint = negate(constraint, "text").text_string(text.as_str());
        }
        if let Some(text) = &self.itext {
            constraint = negate(constraint, "itext").text_istring(text.as_str());
        }
        if let Some(pattern) = &self.regex {
            constraint = negate(constraint, "regex").text_regex(pattern);
        }
        if let Some(pattern) = &self.iregex {
            constraint = negate(constraint, "iregex").text_iregex(pattern);
        }
        if let Some(dlt_type) = self.dlt_type {
            constraint = negate(constraint, "dlt_type").dlt_type(dlt_type);
        }
        if let Some(verbose) = self.verbose {
            constraint = negate(constraint, "verbose").dlt_is_verbose(verbose);
        }
        if let Some(session_id) = self.session_id {
            constraint = negate(constraint, "session_id").dlt_session_id(session_id);
        }
        if let Some(milliseconds) = self.awake_ms {
            constraint = negate(constraint, "awake_ms").awake(milliseconds);
        }
        Ok(Some(constraint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlt_trace_decoder::{Argument, DltLineBuilder, DltTraceLine, StringEncoding};

    fn line(app: &str, text: &str, dlt_type: DltType) -> DltTraceLine {
        let mut builder = DltLineBuilder::new();
        builder
            .set_application_id(app)
            .set_dlt_type(dlt_type)
            .set_is_verbose(true)
            .add_argument(Argument::string(text, StringEncoding::Utf8));
        builder.build()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = FilterConfig::default();
        assert!(filter.is_empty());
        let constraint = filter.to_constraint(ConstraintOptions::Tree).unwrap();
        assert!(constraint.check(&line("APP1", "", DltType::LogInfo)).unwrap());
    }

    #[test]
    fn test_group_is_and() {
        let filter = FilterConfig {
            app_id: Some("APP1".to_string()),
            dlt_type: Some(DltType::LogWarn),
            ..Default::default()
        };
        let constraint = filter.to_constraint(ConstraintOptions::Compiled).unwrap();
        assert!(constraint.check(&line("APP1", "x", DltType::LogWarn)).unwrap());
        assert!(!constraint.check(&line("APP1", "x", DltType::LogInfo)).unwrap());
        assert!(!constraint.check(&line("APP2", "x", DltType::LogWarn)).unwrap());
    }

    #[test]
    fn test_not_and_or() {
        // not APP1, or any line mentioning voltage
        let filter = FilterConfig {
            app_id: Some("APP1".to_string()),
            not: vec!["app_id".to_string()],
            or: vec![FilterConfig {
                itext: Some("VOLTAGE".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let constraint = filter.to_constraint(ConstraintOptions::Tree).unwrap();
        assert!(constraint.check(&line("APP2", "temperature", DltType::LogInfo)).unwrap());
        assert!(!constraint.check(&line("APP1", "temperature", DltType::LogInfo)).unwrap());
        assert!(constraint.check(&line("APP1", "Low voltage", DltType::LogInfo)).unwrap());
    }

    #[test]
    fn test_only_alternatives() {
        let filter = FilterConfig {
            or: vec![
                FilterConfig {
                    text: Some("a".to_string()),
                    ..Default::default()
                },
                FilterConfig {
                    text: Some("b".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert!(!filter.is_empty());
        let constraint = filter.to_constraint(ConstraintOptions::Tree).unwrap();
        assert!(constraint.check(&line("APP1", "b", DltType::LogInfo)).unwrap());
        assert!(!constraint.check(&line("APP1", "c", DltType::LogInfo)).unwrap());
    }

    #[test]
    fn test_errors() {
        let filter = FilterConfig {
            text: Some("a".to_string()),
            not: vec!["txt".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            filter.to_constraint(ConstraintOptions::Tree),
            Err(FilterError::UnknownField(name)) if name == "txt"
        ));

        let filter = FilterConfig {
            regex: Some("(".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            filter.to_constraint(ConstraintOptions::Tree),
            Err(FilterError::Constraint(ConstraintError::InvalidRegex { .. }))
        ));
    }
}
