//! Expression tree construction
//!
//! The token list is read once, left to right. A NOT takes the operand that
//! follows it, juxtaposed operands are joined with AND, and an OR takes
//! everything to its left as one operand and everything to its right as the
//! other. That gives the usual precedence: NOT, then AND, then OR.
//!
//! Nodes live in one vector and are referenced by index, so every node has a
//! small dense id that the evaluators use to index their per-call state.

use super::tokens::Token;
use super::MatchConstraint;
use crate::types::ConstraintError;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) enum NodeKind {
    Check(Arc<dyn MatchConstraint>),
    And,
    Or,
    /// Unary. Only the right child is set
    Not,
}

#[derive(Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl Node {
    /// Child of a binary or unary node
    ///
    /// Tree construction always sets the children an operation needs, so a
    /// missing child is a broken tree.
    pub fn child(slot: Option<usize>) -> usize {
        match slot {
            Some(id) => id,
            None => unreachable!("expression node without operand"),
        }
    }
}

/// An immutable expression tree
#[derive(Clone)]
pub(crate) struct ExprTree {
    nodes: Vec<Node>,
    root: usize,
    checks: usize,
}

impl ExprTree {
    /// Build the tree for a token list
    pub fn build(tokens: &[Token]) -> Result<Self, ConstraintError> {
        if tokens.is_empty() {
            return Err(ConstraintError::NoConstraints);
        }

        let mut builder = TreeBuilder::default();
        let mut position = 0;
        let root = builder.expression(tokens, &mut position)?;
        Ok(ExprTree {
            nodes: builder.nodes,
            root,
            checks: builder.checks,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of nodes. Ids are `0..len()`
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of predicate leaves
    pub fn checks(&self) -> usize {
        self.checks
    }
}

#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
    checks: usize,
}

impl TreeBuilder {
    fn expression(
        &mut self,
        tokens: &[Token],
        position: &mut usize,
    ) -> Result<usize, ConstraintError> {
        let mut tree: Option<usize> = None;

        while let Some(token) = tokens.get(*position) {
            match token {
                Token::Check(_) | Token::Expr(_) => {
                    let operand = self.operand(token)?;
                    tree = Some(self.and(tree, operand));
                    *position += 1;
                }
                Token::Not => {
                    *position += 1;
                    match tokens.get(*position) {
                        None => return Err(ConstraintError::NotWithoutRightOperand),
                        Some(Token::Or) => return Err(ConstraintError::NotOr),
                        Some(Token::Not) => {
                            // Double negation cancels
                            *position += 1;
                            if *position >= tokens.len() {
                                return Err(ConstraintError::NotWithoutRightOperand);
                            }
                        }
                        Some(operand) => {
                            let operand = self.operand(operand)?;
                            let not = self.node(NodeKind::Not, None, Some(operand));
                            tree = Some(self.and(tree, not));
                            *position += 1;
                        }
                    }
                }
                Token::Or => {
                    let left = tree.ok_or(ConstraintError::OrWithoutLeftOperand)?;
                    *position += 1;
                    if *position >= tokens.len() {
                        return Err(ConstraintError::OrWithoutRightOperand);
                    }
                    let right = self.expression(tokens, position)?;
                    tree = Some(self.node(NodeKind::Or, Some(left), Some(right)));
                }
            }
        }

        tree.ok_or(ConstraintError::NoConstraints)
    }

    fn operand(&mut self, token: &Token) -> Result<usize, ConstraintError> {
        match token {
            Token::Check(check) => {
                self.checks += 1;
                Ok(self.node(NodeKind::Check(Arc::clone(check)), None, None))
            }
            Token::Expr(constraint) => {
                let tree = constraint.build()?;
                Ok(self.splice(tree))
            }
            Token::Or | Token::Not => unreachable!("operator used as operand"),
        }
    }

    /// Copy another tree in, giving its nodes fresh ids
    fn splice(&mut self, tree: &ExprTree) -> usize {
        let base = self.nodes.len();
        for node in &tree.nodes {
            self.nodes.push(Node {
                kind: node.kind.clone(),
                left: node.left.map(|id| id + base),
                right: node.right.map(|id| id + base),
            });
        }
        self.checks += tree.checks;
        tree.root + base
    }

    fn and(&mut self, tree: Option<usize>, operand: usize) -> usize {
        match tree {
            None => operand,
            Some(left) => self.node(NodeKind::And, Some(left), Some(operand)),
        }
    }

    fn node(&mut self, kind: NodeKind, left: Option<usize>, right: Option<usize>) -> usize {
        self.nodes.push(Node { kind, left, right });
        self.nodes.len() - 1
    }
}
