//! Compiled evaluation
//!
//! The tree is flattened once into a linear program over a single boolean
//! accumulator. Short-circuit AND and OR become conditional jumps past the
//! right operand, so evaluation is a plain loop with no node dispatch on the
//! tree and no recursion.

use super::tree::{ExprTree, Node, NodeKind};
use super::MatchConstraint;
use crate::line::TraceLine;
use std::sync::Arc;

#[derive(Clone)]
enum Op {
    /// Set the accumulator to the predicate's result
    Test(Arc<dyn MatchConstraint>),
    /// Jump if the accumulator is false
    JumpIfFalse(usize),
    /// Jump if the accumulator is true
    JumpIfTrue(usize),
    Negate,
}

/// Work items for flattening the tree without recursion
enum Step {
    Visit(usize),
    /// Emit a jump whose target is patched later
    Jump { if_true: bool },
    /// Point the most recent unpatched jump at the next instruction
    Patch,
    Negate,
}

/// A tree flattened into jumps and tests
#[derive(Clone)]
pub(crate) struct CompiledExpr {
    program: Vec<Op>,
}

impl CompiledExpr {
    pub fn new(tree: &ExprTree) -> Self {
        let nodes = tree.nodes();
        let mut program = Vec::with_capacity(nodes.len());
        let mut pending: Vec<usize> = Vec::new();
        let mut steps = vec![Step::Visit(tree.root())];

        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(id) => {
                    let node = &nodes[id];
                    match &node.kind {
                        NodeKind::Check(check) => program.push(Op::Test(Arc::clone(check))),
                        NodeKind::And | NodeKind::Or => {
                            let if_true = matches!(node.kind, NodeKind::Or);
                            steps.push(Step::Patch);
                            steps.push(Step::Visit(Node::child(node.right)));
                            steps.push(Step::Jump { if_true });
                            steps.push(Step::Visit(Node::child(node.left)));
                        }
                        NodeKind::Not => {
                            steps.push(Step::Negate);
                            steps.push(Step::Visit(Node::child(node.right)));
                        }
                    }
                }
                Step::Jump { if_true } => {
                    pending.push(program.len());
                    program.push(if if_true {
                        Op::JumpIfTrue(0)
                    } else {
                        Op::JumpIfFalse(0)
                    });
                }
                Step::Patch => {
                    let target = program.len();
                    let at = match pending.pop() {
                        Some(at) => at,
                        None => unreachable!("patch without a pending jump"),
                    };
                    match &mut program[at] {
                        Op::JumpIfTrue(to) | Op::JumpIfFalse(to) => *to = target,
                        _ => unreachable!("patch target is not a jump"),
                    }
                }
                Step::Negate => program.push(Op::Negate),
            }
        }

        Self { program }
    }

    pub fn evaluate(&self, line: &dyn TraceLine) -> bool {
        let mut result = false;
        let mut pc = 0;
        while let Some(op) = self.program.get(pc) {
            pc += 1;
            match op {
                Op::Test(check) => result = check.check(line),
                Op::JumpIfFalse(target) if !result => pc = *target,
                Op::JumpIfTrue(target) if result => pc = *target,
                Op::JumpIfFalse(_) | Op::JumpIfTrue(_) => {}
                Op::Negate => result = !result,
            }
        }
        result
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.program.len()
    }
}
