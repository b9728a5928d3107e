//! The flat token list recorded by the fluent builder

use super::constraint::Constraint;
use super::MatchConstraint;
use std::fmt;
use std::sync::Arc;

/// One element of a constraint expression, in the order it was written
#[derive(Clone)]
pub(crate) enum Token {
    /// A predicate, joined to the previous operand by an implicit AND
    Check(Arc<dyn MatchConstraint>),
    /// A nested constraint, copied into the tree when it is built
    Expr(Arc<Constraint>),
    Or,
    Not,
}

impl Token {
    fn is_operand(&self) -> bool {
        matches!(self, Token::Check(_) | Token::Expr(_))
    }

    fn is_wildcard(&self) -> bool {
        match self {
            Token::Check(check) => check.is_wildcard(),
            _ => false,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Check(_) => write!(f, "Check"),
            Token::Expr(_) => write!(f, "Expr"),
            Token::Or => write!(f, "Or"),
            Token::Not => write!(f, "Not"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ConstraintTokens {
    tokens: Vec<Token>,
}

impl ConstraintTokens {
    /// Append an operand
    ///
    /// A wildcard only matters as the first token, so that an otherwise empty
    /// expression matches everything, or directly after an operator. It is
    /// replaced by the first real operand that follows it.
    pub fn append(&mut self, token: Token) {
        if token.is_wildcard() {
            match self.tokens.last() {
                None => self.tokens.push(token),
                Some(last) if !last.is_operand() => self.tokens.push(token),
                Some(_) => {}
            }
            return;
        }

        if self.tokens.len() == 1 && self.tokens[0].is_wildcard() {
            self.tokens.clear();
        }
        self.tokens.push(token);
    }

    pub fn or(&mut self) {
        self.tokens.push(Token::Or);
    }

    pub fn not(&mut self) {
        self.tokens.push(Token::Not);
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }
}
