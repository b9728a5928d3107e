// Constraint expressions evaluated through the public API
use dlt_trace_decoder::{
    Constraint, ConstraintError, ConstraintOptions, ConstraintState, DltLineBuilder, DltType,
    MatchConstraint, TraceLine,
};
use proptest::prelude::*;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Text(String);

impl TraceLine for Text {
    fn text(&self) -> &str {
        &self.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn text(s: &str) -> Text {
    Text(s.to_string())
}

/// Counts how often it is evaluated
struct Counted {
    needle: &'static str,
    calls: Arc<AtomicUsize>,
}

impl MatchConstraint for Counted {
    fn check(&self, line: &dyn TraceLine) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        line.text().contains(self.needle)
    }
}

#[test]
fn test_or_short_circuits() {
    for options in [ConstraintOptions::Tree, ConstraintOptions::Compiled] {
        let calls = Arc::new(AtomicUsize::new(0));
        let constraint = Constraint::with_options(options)
            .text_string("a")
            .or()
            .predicate(Counted {
                needle: "b",
                calls: Arc::clone(&calls),
            })
            .end()
            .unwrap();

        assert!(constraint.check(&text("a")).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0, "{:?}", options);
        assert!(constraint.check(&text("b")).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "{:?}", options);
        assert!(!constraint.check(&text("c")).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2, "{:?}", options);
    }
}

#[test]
fn test_not() {
    let constraint = Constraint::new().not().text_string("a");
    assert!(constraint.check(&text("xyz")).unwrap());
    assert!(!constraint.check(&text("xaz")).unwrap());
}

#[test]
fn test_configuration_errors() {
    assert_eq!(
        Constraint::new().check(&text("")).unwrap_err(),
        ConstraintError::NoConstraints
    );
    assert_eq!(
        Constraint::new().not().or().text_string("a").end().unwrap_err(),
        ConstraintError::NotOr
    );
    assert_eq!(
        Constraint::new().text_string("a").or().end().unwrap_err(),
        ConstraintError::OrWithoutRightOperand
    );
    assert_eq!(
        Constraint::new().or().text_string("a").check(&text("a")).unwrap_err(),
        ConstraintError::OrWithoutLeftOperand
    );
    assert!(matches!(
        Constraint::new().text_regex("[").end(),
        Err(ConstraintError::InvalidRegex { .. })
    ));
}

#[test]
fn test_sealed_expression_is_shared_between_threads() {
    let constraint = Arc::new(
        Constraint::with_options(ConstraintOptions::Compiled)
            .dlt_app_id("APP1")
            .text_istring("warning")
            .end()
            .unwrap(),
    );
    assert_eq!(constraint.state(), ConstraintState::Compiled);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let constraint = Arc::clone(&constraint);
            std::thread::spawn(move || {
                let mut builder = DltLineBuilder::new();
                builder
                    .set_application_id(if i % 2 == 0 { "APP1" } else { "APP2" })
                    .set_dlt_type(DltType::LogWarn)
                    .add_argument(dlt_trace_decoder::Argument::string(
                        "Low voltage WARNING",
                        dlt_trace_decoder::StringEncoding::Utf8,
                    ));
                constraint.check(&builder.build()).unwrap()
            })
        })
        .collect();

    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![true, false, true, false]);
}

/// One element of a random expression
#[derive(Debug, Clone)]
enum Step {
    Check(&'static str),
    Or,
    Not,
    Group(Vec<Step>),
}

fn step() -> impl Strategy<Value = Step> {
    let leaf = prop_oneof![
        4 => prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(Step::Check),
        1 => Just(Step::Or),
        1 => Just(Step::Not),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop::collection::vec(inner, 1..6).prop_map(Step::Group)
    })
}

fn apply(mut constraint: Constraint, steps: &[Step]) -> Constraint {
    for step in steps {
        constraint = match step {
            Step::Check(needle) => constraint.text_string(*needle),
            Step::Or => constraint.or(),
            Step::Not => constraint.not(),
            Step::Group(inner) => constraint.expr(apply(Constraint::new(), inner)),
        };
    }
    constraint
}

proptest! {
    #[test]
    fn tree_and_compiled_agree(
        steps in prop::collection::vec(step(), 1..10),
        inputs in prop::collection::vec("[a-e]{0,5}", 1..8),
    ) {
        let tree = apply(Constraint::new(), &steps);
        let compiled = apply(Constraint::with_options(ConstraintOptions::Compiled), &steps);

        for input in &inputs {
            let line = text(input);
            match (tree.check(&line), compiled.check(&line)) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b, "{:?} on {:?}", steps, input),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                (a, b) => prop_assert!(false, "{:?} vs {:?} for {:?}", a, b, steps),
            }
        }
    }
}
