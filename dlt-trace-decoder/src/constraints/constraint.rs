//! The fluent [`Constraint`] builder

use super::compiled::CompiledExpr;
use super::dlt::{
    Awake, DltAppId, DltCtxId, DltEcuId, DltIsVerbose, DltMessageType, DltNotAfter,
    DltNotBefore, DltSessionId,
};
use super::eval;
use super::predicates::{
    InstanceOf, NoConstraint, TextEquals, TextIEquals, TextIString, TextRegex, TextStartsWith,
    TextString,
};
use super::tokens::{ConstraintTokens, Token};
use super::tree::ExprTree;
use super::{ConstraintOptions, ConstraintState, MatchConstraint};
use crate::line::TraceLine;
use crate::types::{ConstraintError, DltType, Timestamp};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

type ConstraintResult<T> = std::result::Result<T, ConstraintError>;

enum Evaluator {
    Tree(Arc<ExprTree>),
    Compiled(CompiledExpr),
}

impl Evaluator {
    fn evaluate(&self, line: &dyn TraceLine) -> bool {
        match self {
            Evaluator::Tree(tree) => eval::evaluate(tree, line),
            Evaluator::Compiled(compiled) => compiled.evaluate(line),
        }
    }
}

/// A boolean expression of predicates over trace lines
///
/// Predicates written one after the other must all match. [`or`](Self::or)
/// separates alternatives and [`not`](Self::not) negates the predicate that
/// follows it. Parentheses are written with [`expr`](Self::expr). NOT binds
/// tightest, then the implicit AND, then OR:
///
/// ```
/// use dlt_trace_decoder::Constraint;
///
/// // ("sub1" or "sub2") and not "sub3"
/// let c = Constraint::new()
///     .expr(Constraint::new().text_string("sub1").or().text_string("sub2"))
///     .not()
///     .text_string("sub3");
/// ```
///
/// The expression is sealed by [`end`](Self::end) or by the first
/// [`check`](Self::check). Its tree is built once and reused. Changing a
/// sealed expression is an error that is reported by the next `end` or
/// `check`.
pub struct Constraint {
    options: ConstraintOptions,
    tokens: ConstraintTokens,
    error: Option<ConstraintError>,
    tree: OnceLock<ConstraintResult<Arc<ExprTree>>>,
    evaluator: OnceLock<Evaluator>,
}

impl Constraint {
    /// An empty expression using the tree-walk evaluator
    pub fn new() -> Self {
        Self::with_options(ConstraintOptions::default())
    }

    pub fn with_options(options: ConstraintOptions) -> Self {
        Self {
            options,
            tokens: ConstraintTokens::default(),
            error: None,
            tree: OnceLock::new(),
            evaluator: OnceLock::new(),
        }
    }

    pub fn options(&self) -> ConstraintOptions {
        self.options
    }

    /// How far the expression has been prepared
    pub fn state(&self) -> ConstraintState {
        if self.evaluator.get().is_some() {
            ConstraintState::Compiled
        } else if matches!(self.tree.get(), Some(Ok(_))) {
            ConstraintState::Built
        } else {
            ConstraintState::Unbuilt
        }
    }

    fn is_sealed(&self) -> bool {
        self.tree.get().is_some()
    }

    fn fail(&mut self, error: ConstraintError) {
        log::debug!("Constraint error: {}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push(mut self, token: Token) -> Self {
        if self.is_sealed() {
            self.fail(ConstraintError::ReadOnly);
            return self;
        }
        match token {
            Token::Or => self.tokens.or(),
            Token::Not => self.tokens.not(),
            operand => self.tokens.append(operand),
        }
        self
    }

    /// Add any predicate
    pub fn predicate(self, constraint: impl MatchConstraint + 'static) -> Self {
        self.push(Token::Check(Arc::new(constraint)))
    }

    /// Add a predicate that is already shared
    pub fn shared(self, constraint: Arc<dyn MatchConstraint>) -> Self {
        self.push(Token::Check(constraint))
    }

    /// Add a grouped sub-expression
    ///
    /// The sub-expression's tree is copied into this one when this expression
    /// is built.
    pub fn expr(self, constraint: Constraint) -> Self {
        self.push(Token::Expr(Arc::new(constraint)))
    }

    /// Matches every line
    pub fn none(self) -> Self {
        self.predicate(NoConstraint)
    }

    pub fn or(self) -> Self {
        self.push(Token::Or)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        self.push(Token::Not)
    }

    pub fn text_string(self, text: impl Into<String>) -> Self {
        self.predicate(TextString::new(text))
    }

    pub fn text_istring(self, text: impl AsRef<str>) -> Self {
        self.predicate(TextIString::new(text))
    }

    pub fn text_equals(self, text: impl Into<String>) -> Self {
        self.predicate(TextEquals::new(text))
    }

    pub fn text_iequals(self, text: impl AsRef<str>) -> Self {
        self.predicate(TextIEquals::new(text))
    }

    pub fn text_starts_with(self, text: impl Into<String>) -> Self {
        self.predicate(TextStartsWith::new(text))
    }

    /// A pattern that does not compile makes the expression invalid
    pub fn text_regex(mut self, pattern: &str) -> Self {
        match TextRegex::new(pattern) {
            Ok(regex) => self.predicate(regex),
            Err(e) => {
                self.fail(e);
                self
            }
        }
    }

    pub fn text_iregex(mut self, pattern: &str) -> Self {
        match TextRegex::new_ignore_case(pattern) {
            Ok(regex) => self.predicate(regex),
            Err(e) => {
                self.fail(e);
                self
            }
        }
    }

    pub fn instance_of<T: TraceLine>(self) -> Self {
        self.predicate(InstanceOf::<T>::new())
    }

    pub fn dlt_ecu_id(self, id: impl Into<String>) -> Self {
        self.predicate(DltEcuId::new(id))
    }

    pub fn dlt_app_id(self, id: impl Into<String>) -> Self {
        self.predicate(DltAppId::new(id))
    }

    pub fn dlt_ctx_id(self, id: impl Into<String>) -> Self {
        self.predicate(DltCtxId::new(id))
    }

    pub fn dlt_type(self, dlt_type: DltType) -> Self {
        self.predicate(DltMessageType::new(dlt_type))
    }

    pub fn dlt_is_verbose(self, is_verbose: bool) -> Self {
        self.predicate(DltIsVerbose::new(is_verbose))
    }

    pub fn dlt_session_id(self, session_id: u32) -> Self {
        self.predicate(DltSessionId::new(session_id))
    }

    /// The device timestamp is at least `milliseconds`
    pub fn awake(self, milliseconds: u64) -> Self {
        self.predicate(Awake::from_millis(milliseconds))
    }

    pub fn dlt_not_before(self, time: Timestamp) -> Self {
        self.predicate(DltNotBefore::new(time))
    }

    pub fn dlt_not_after(self, time: Timestamp) -> Self {
        self.predicate(DltNotAfter::new(time))
    }

    /// Seal the expression and prepare its evaluator
    pub fn end(self) -> ConstraintResult<Self> {
        self.evaluator()?;
        Ok(self)
    }

    /// Check a line against the expression
    ///
    /// Seals the expression on first use.
    pub fn check(&self, line: &dyn TraceLine) -> ConstraintResult<bool> {
        let evaluator = self.evaluator()?;
        panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(line))).map_err(|cause| {
            let reason = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            ConstraintError::Evaluation(reason)
        })
    }

    /// The expression tree, built on first use
    pub(crate) fn build(&self) -> ConstraintResult<&ExprTree> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.tree
            .get_or_init(|| ExprTree::build(self.tokens.as_slice()).map(Arc::new))
            .as_ref()
            .map(|tree| &**tree)
            .map_err(Clone::clone)
    }

    fn evaluator(&self) -> ConstraintResult<&Evaluator> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if let Some(evaluator) = self.evaluator.get() {
            return Ok(evaluator);
        }

        self.build()?;
        let tree = match self.tree.get() {
            Some(Ok(tree)) => Arc::clone(tree),
            _ => unreachable!("expression tree not built"),
        };
        Ok(self.evaluator.get_or_init(|| match self.options {
            ConstraintOptions::Tree => Evaluator::Tree(tree),
            ConstraintOptions::Compiled => Evaluator::Compiled(CompiledExpr::new(&tree)),
        }))
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("options", &self.options)
            .field("tokens", &self.tokens)
            .field("state", &self.state())
            .field("error", &self.error)
            .finish()
    }
}

/// A constraint can be used wherever a predicate can
///
/// An invalid expression matches nothing.
impl MatchConstraint for Constraint {
    fn check(&self, line: &dyn TraceLine) -> bool {
        match Constraint::check(self, line) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Constraint check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::DltLineBuilder;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Line(&'static str);

    impl TraceLine for Line {
        fn text(&self) -> &str {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn both() -> [ConstraintOptions; 2] {
        [ConstraintOptions::Tree, ConstraintOptions::Compiled]
    }

    #[test]
    fn test_or() {
        for options in both() {
            let c = Constraint::with_options(options)
                .text_string("a")
                .or()
                .text_string("b");
            assert!(c.check(&Line("xa")).unwrap());
            assert!(c.check(&Line("xb")).unwrap());
            assert!(!c.check(&Line("xc")).unwrap());
        }
    }

    #[test]
    fn test_not() {
        for options in both() {
            let c = Constraint::with_options(options).not().text_string("a");
            assert!(!c.check(&Line("a")).unwrap());
            assert!(c.check(&Line("b")).unwrap());
        }
    }

    #[test]
    fn test_not_or_is_error() {
        let c = Constraint::new().not().or().text_string("a");
        assert_eq!(c.end().unwrap_err(), ConstraintError::NotOr);
    }

    #[test]
    fn test_empty_is_error() {
        let c = Constraint::new();
        assert_eq!(c.check(&Line("")).unwrap_err(), ConstraintError::NoConstraints);
        assert_eq!(c.state(), ConstraintState::Unbuilt);
    }

    #[test]
    fn test_none_matches_everything() {
        let c = Constraint::new().none();
        assert!(c.check(&Line("")).unwrap());

        let c = Constraint::new().none().text_string("a");
        assert!(!c.check(&Line("b")).unwrap());
    }

    #[test]
    fn test_sub_expression() {
        for options in both() {
            let c = Constraint::with_options(options)
                .expr(Constraint::new().text_string("sub1").or().text_string("sub2"))
                .not()
                .text_string("sub3");
            assert!(c.check(&Line("sub1")).unwrap());
            assert!(c.check(&Line("sub2")).unwrap());
            assert!(!c.check(&Line("sub1 sub3")).unwrap());
            assert!(!c.check(&Line("sub4")).unwrap());
        }
    }

    #[test]
    fn test_sub_expression_error_propagates() {
        let c = Constraint::new().expr(Constraint::new().text_string("a").or());
        assert_eq!(c.end().unwrap_err(), ConstraintError::OrWithoutRightOperand);
    }

    #[test]
    fn test_state_transitions() {
        let c = Constraint::new().text_string("a");
        assert_eq!(c.state(), ConstraintState::Unbuilt);
        c.build().unwrap();
        assert_eq!(c.state(), ConstraintState::Built);
        let c = c.end().unwrap();
        assert_eq!(c.state(), ConstraintState::Compiled);
        let c = c.end().unwrap();
        assert_eq!(c.state(), ConstraintState::Compiled);
    }

    #[test]
    fn test_read_only_after_seal() {
        let c = Constraint::new().text_string("a").end().unwrap();
        assert!(c.check(&Line("a")).unwrap());

        let c = c.text_string("b");
        assert_eq!(c.check(&Line("a")).unwrap_err(), ConstraintError::ReadOnly);
    }

    #[test]
    fn test_invalid_regex() {
        let c = Constraint::new().text_regex("[a-").or().text_string("a");
        assert!(matches!(
            c.check(&Line("a")).unwrap_err(),
            ConstraintError::InvalidRegex { .. }
        ));
    }

    #[test]
    fn test_panicking_predicate() {
        struct Broken;
        impl MatchConstraint for Broken {
            fn check(&self, _line: &dyn TraceLine) -> bool {
                panic!("predicate failed")
            }
        }

        let c = Constraint::new().predicate(Broken);
        assert_eq!(
            c.check(&Line("")).unwrap_err(),
            ConstraintError::Evaluation("predicate failed".to_string())
        );
    }

    #[test]
    fn test_constraint_as_predicate() {
        let inner = Arc::new(Constraint::new().text_string("a").end().unwrap());
        let c = Constraint::new().shared(inner.clone()).text_string("b");
        assert!(c.check(&Line("ab")).unwrap());
        assert!(!c.check(&Line("b")).unwrap());
        assert_eq!(inner.state(), ConstraintState::Compiled);
    }

    #[test]
    fn test_short_circuit_with_counter() {
        struct Counted(Arc<AtomicUsize>);
        impl MatchConstraint for Counted {
            fn check(&self, _line: &dyn TraceLine) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                true
            }
        }

        for options in both() {
            let calls = Arc::new(AtomicUsize::new(0));
            let c = Constraint::with_options(options)
                .text_string("a")
                .or()
                .predicate(Counted(Arc::clone(&calls)));
            assert!(c.check(&Line("a")).unwrap());
            assert_eq!(calls.load(Ordering::SeqCst), 0);
            assert!(c.check(&Line("b")).unwrap());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_dlt_predicates() {
        let mut builder = DltLineBuilder::new();
        builder.set_application_id("APP1").set_dlt_type(DltType::LogInfo);
        let line = builder.build();

        let c = Constraint::new()
            .dlt_app_id("APP1")
            .dlt_type(DltType::LogInfo)
            .instance_of::<crate::line::DltTraceLine>();
        assert!(c.check(&line).unwrap());
        assert!(!c.check(&Line("")).unwrap());
    }
}
