//! Tree-walk evaluation
//!
//! Walks the tree with an explicit stack instead of recursion. The visited
//! flags and results live in a vector indexed by node id that is created for
//! each call, so one tree can be evaluated from several threads at once.

use super::tree::{ExprTree, Node, NodeKind};
use crate::line::TraceLine;

#[derive(Debug, Clone, Copy, Default)]
struct EvalState {
    visited: bool,
    result: bool,
}

/// Evaluate `tree` against `line`
///
/// AND and OR evaluate the left operand first and only evaluate the right
/// one if it can still change the result.
pub(crate) fn evaluate(tree: &ExprTree, line: &dyn TraceLine) -> bool {
    let nodes = tree.nodes();
    let mut state = vec![EvalState::default(); nodes.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut id = tree.root();

    loop {
        if state[id].visited {
            match stack.pop() {
                Some(parent) => {
                    id = parent;
                    continue;
                }
                None => return state[id].result,
            }
        }

        let node = &nodes[id];
        match &node.kind {
            NodeKind::Check(check) => {
                state[id].result = check.check(line);
            }
            NodeKind::And | NodeKind::Or => {
                let left = Node::child(node.left);
                if !state[left].visited {
                    stack.push(id);
                    id = left;
                    continue;
                }

                let mut result = state[left].result;
                let short_circuit = match node.kind {
                    NodeKind::And => !result,
                    _ => result,
                };
                if !short_circuit {
                    let right = Node::child(node.right);
                    if !state[right].visited {
                        stack.push(id);
                        id = right;
                        continue;
                    }
                    result = state[right].result;
                }
                state[id].result = result;
            }
            NodeKind::Not => {
                let operand = Node::child(node.right);
                if !state[operand].visited {
                    stack.push(id);
                    id = operand;
                    continue;
                }
                state[id].result = !state[operand].result;
            }
        }
        state[id].visited = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::tokens::Token;
    use crate::constraints::MatchConstraint;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Line(&'static str);

    impl TraceLine for Line {
        fn text(&self) -> &str {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Counted {
        text: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl MatchConstraint for Counted {
        fn check(&self, line: &dyn TraceLine) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            line.text().contains(self.text)
        }
    }

    fn counted(text: &'static str) -> (Token, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = Token::Check(Arc::new(Counted {
            text,
            calls: Arc::clone(&calls),
        }));
        (token, calls)
    }

    #[test]
    fn test_or_short_circuits() {
        let (a, a_calls) = counted("a");
        let (b, b_calls) = counted("b");
        let tree = ExprTree::build(&[a, Token::Or, b]).unwrap();

        assert!(evaluate(&tree, &Line("a")));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);

        assert!(evaluate(&tree, &Line("b")));
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert!(!evaluate(&tree, &Line("c")));
    }

    #[test]
    fn test_and_short_circuits() {
        let (a, _) = counted("a");
        let (b, b_calls) = counted("b");
        let tree = ExprTree::build(&[a, b]).unwrap();

        assert!(!evaluate(&tree, &Line("b")));
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
        assert!(evaluate(&tree, &Line("ab")));
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not() {
        let (a, _) = counted("a");
        let tree = ExprTree::build(&[Token::Not, a]).unwrap();
        assert!(!evaluate(&tree, &Line("a")));
        assert!(evaluate(&tree, &Line("x")));
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let mut tokens = Vec::new();
        for _ in 0..10_000 {
            tokens.push(counted("z").0);
            tokens.push(Token::Not);
            tokens.push(counted("q").0);
        }
        let tree = ExprTree::build(&tokens).unwrap();
        assert!(evaluate(&tree, &Line("z")));
        assert!(!evaluate(&tree, &Line("zq")));
    }
}
