//! Constraint expressions for selecting trace lines
//!
//! A [`Constraint`] is written with a fluent builder and evaluated against
//! any [`TraceLine`]. The builder only records a flat list of tokens. When
//! the expression is sealed the tokens are turned into a binary tree, and
//! from then on the expression is immutable and can be shared between
//! threads.
//!
//! # Architecture
//!
//! - `tokens`: the recorded token list, with wildcard folding
//! - `tree`: builds the expression tree in a node arena with dense ids
//! - `eval`: the tree-walk evaluator, iterative with per-call state
//! - `compiled`: the tree flattened into a jump program
//! - `predicates` and `dlt`: the predicates offered by the builder
//!
//! Both evaluators give the same result for every line. The tree-walk
//! evaluator is the default; [`ConstraintOptions::Compiled`] selects the
//! other.

mod compiled;
mod constraint;
mod dlt;
mod eval;
mod predicates;
mod tokens;
mod tree;

use crate::line::TraceLine;
use serde::{Deserialize, Serialize};

pub use constraint::Constraint;
pub use dlt::{
    Awake, DltAppId, DltCtxId, DltEcuId, DltIsVerbose, DltMessageType, DltNotAfter,
    DltNotBefore, DltSessionId,
};
pub use predicates::{
    InstanceOf, NoConstraint, TextEquals, TextIEquals, TextIString, TextRegex, TextStartsWith,
    TextString,
};

/// A test against a single line
pub trait MatchConstraint: Send + Sync {
    fn check(&self, line: &dyn TraceLine) -> bool;

    /// True for a predicate that matches every line. Such predicates are
    /// dropped from an expression wherever they cannot change its result
    fn is_wildcard(&self) -> bool {
        false
    }
}

/// How a [`Constraint`] is evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintOptions {
    /// Walk the expression tree for every line
    #[default]
    Tree,
    /// Flatten the tree once into a jump program
    Compiled,
}

/// How far a [`Constraint`] has been prepared
///
/// Moves only forward: `Unbuilt`, then `Built` once the tree exists, then
/// `Compiled` once the evaluator exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintState {
    Unbuilt,
    Built,
    Compiled,
}
