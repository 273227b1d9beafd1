//! Hash-consed LTL expressions in negation normal form
//!
//! Expressions live in an [`Interner`] and are referred to by [`ExprId`]. The interner keeps
//! exactly one node for every operator and operand combination, so two identifiers are equal if
//! and only if the expressions they refer to are structurally equal.
//!
//! Negation is never stored as an operator above a compound expression. Requests to negate an
//! expression push the negation inward using the dual of each operator
//!
//! | operator  | dual      |
//! | --------- | --------- |
//! | `next`    | `next`    |
//! | `and`     | `or`      |
//! | `or`      | `and`     |
//! | `until`   | `release` |
//! | `release` | `until`   |
//!
//! until only atomic values remain, which are wrapped in a `not` node. The negation of every
//! expression is remembered by the interner, so negating twice returns the original identifier.
//!
//! ```rust
//! use ltl_nnf::ltl::Interner;
//!
//! let mut interner = Interner::new();
//! let a = interner.value("a");
//! let b = interner.value("b");
//! let both = interner.and(a, b);
//! let negated = interner.negate(both);
//!
//! assert_eq!(interner.display(negated).to_string(), "(not a or not b)");
//! assert_eq!(interner.negate(negated), both);
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::trace;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::DfsPostOrder;
use thiserror::Error;

use super::literal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Operator of an interned expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Value,
    Not,
    Next,
    And,
    Or,
    Until,
    Release,
}

impl Op {
    pub fn is_temporal(&self) -> bool {
        matches!(self, Op::Next | Op::Until | Op::Release)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyword = match self {
            Op::Value => "value",
            Op::Not => "not",
            Op::Next => "next",
            Op::And => "and",
            Op::Or => "or",
            Op::Until => "until",
            Op::Release => "release",
        };

        f.write_str(keyword)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown operator \"{0}\"")]
pub struct UnknownOperator(String);

/// Prefix operators accepted when building expressions
///
/// `finally` and `globally` are not stored, they are rewritten to `until` and `release`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Next,
    Finally,
    Globally,
}

impl FromStr for UnaryOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not" => Ok(Self::Not),
            "next" => Ok(Self::Next),
            "finally" => Ok(Self::Finally),
            "globally" => Ok(Self::Globally),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyword = match self {
            Self::Not => "not",
            Self::Next => "next",
            Self::Finally => "finally",
            Self::Globally => "globally",
        };

        f.write_str(keyword)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    And,
    Or,
    Until,
    Release,
}

impl FromStr for BinaryOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            "until" => Ok(Self::Until),
            "release" => Ok(Self::Release),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyword = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Until => "until",
            Self::Release => "release",
        };

        f.write_str(keyword)
    }
}

/// Interned expression node
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Value(String),
    Not([ExprId; 1]),
    Next([ExprId; 1]),
    And([ExprId; 2]),
    Or([ExprId; 2]),
    Until([ExprId; 2]),
    Release([ExprId; 2]),
}

impl Node {
    pub fn op(&self) -> Op {
        match self {
            Node::Value(_) => Op::Value,
            Node::Not(_) => Op::Not,
            Node::Next(_) => Op::Next,
            Node::And(_) => Op::And,
            Node::Or(_) => Op::Or,
            Node::Until(_) => Op::Until,
            Node::Release(_) => Op::Release,
        }
    }

    pub fn args(&self) -> &[ExprId] {
        match self {
            Node::Value(_) => &[],
            Node::Not(args) | Node::Next(args) => args,
            Node::And(args) | Node::Or(args) | Node::Until(args) | Node::Release(args) => args,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Temporal operator {0} cannot be evaluated in a single state")]
    Temporal(Op),
}

/// Owner of every expression node and of the negation of each node
#[derive(Clone, Debug)]
pub struct Interner {
    nodes: Vec<Node>,
    index: HashMap<Node, ExprId>,
    negations: HashMap<ExprId, ExprId>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub const TRUE: ExprId = ExprId(0);
    pub const FALSE: ExprId = ExprId(1);

    pub fn new() -> Self {
        let mut interner = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            negations: HashMap::new(),
        };

        let top = interner.value("true");
        let bottom = interner.value("false");

        debug_assert_eq!((top, bottom), (Self::TRUE, Self::FALSE));
        interner.link(top, bottom);

        interner
    }

    fn intern(&mut self, node: Node) -> ExprId {
        if let Some(id) = self.index.get(&node) {
            return *id;
        }

        if let Node::Not([atom]) = node {
            assert!(
                !self.negations.contains_key(&atom),
                "value {} is already negated",
                self.display(atom)
            );
        }

        let id = ExprId(self.nodes.len());

        self.nodes.push(node.clone());
        self.index.insert(node, id);

        id
    }

    fn link(&mut self, expr: ExprId, negation: ExprId) {
        self.negations.insert(expr, negation);
        self.negations.insert(negation, expr);
    }

    /// Number of distinct expressions created so far
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ExprId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn op(&self, id: ExprId) -> Op {
        self.node(id).op()
    }

    pub fn args(&self, id: ExprId) -> &[ExprId] {
        self.node(id).args()
    }

    /// Atomic value with the given name. `"true"` and `"false"` are [`Self::TRUE`] and [`Self::FALSE`].
    pub fn value(&mut self, name: &str) -> ExprId {
        self.intern(Node::Value(name.to_string()))
    }

    /// The negation of `id`, created the first time it is requested
    ///
    /// Operands are negated before the expressions using them. The pending expressions are kept
    /// on an explicit stack, so the nesting depth is only limited by memory.
    pub fn negate(&mut self, id: ExprId) -> ExprId {
        let mut pending = vec![id];

        while let Some(&top) = pending.last() {
            if self.negations.contains_key(&top) {
                pending.pop();
                continue;
            }

            let node = self.nodes[top.0].clone();
            let missing: Vec<ExprId> = node
                .args()
                .iter()
                .copied()
                .filter(|arg| !self.negations.contains_key(arg))
                .collect();

            if !missing.is_empty() {
                pending.extend(missing);
                continue;
            }

            let negation = match node {
                Node::Value(_) => self.intern(Node::Not([top])),
                Node::Not(_) => unreachable!("negation of {:?} was not linked when it was created", top),
                Node::Next([arg]) => {
                    let arg = self.negations[&arg];
                    self.intern(Node::Next([arg]))
                }
                Node::And([left, right]) => {
                    let (left, right) = (self.negations[&left], self.negations[&right]);
                    self.intern(Node::Or([left, right]))
                }
                Node::Or([left, right]) => {
                    let (left, right) = (self.negations[&left], self.negations[&right]);
                    self.intern(Node::And([left, right]))
                }
                Node::Until([left, right]) => {
                    let (left, right) = (self.negations[&left], self.negations[&right]);
                    self.intern(Node::Release([left, right]))
                }
                Node::Release([left, right]) => {
                    let (left, right) = (self.negations[&left], self.negations[&right]);
                    self.intern(Node::Until([left, right]))
                }
            };

            trace!("negated {:?} into {:?}", top, negation);
            self.link(top, negation);
            pending.pop();
        }

        self.negations[&id]
    }

    /// Same as [`Self::negate`], `not` only ever wraps values that have no negation yet
    pub fn not(&mut self, id: ExprId) -> ExprId {
        self.negate(id)
    }

    pub fn next(&mut self, id: ExprId) -> ExprId {
        self.intern(Node::Next([id]))
    }

    pub fn and(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.intern(Node::And([left, right]))
    }

    pub fn or(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.intern(Node::Or([left, right]))
    }

    pub fn until(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.intern(Node::Until([left, right]))
    }

    pub fn release(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.intern(Node::Release([left, right]))
    }

    /// `finally e` is `true until e`
    pub fn finally(&mut self, id: ExprId) -> ExprId {
        self.until(Self::TRUE, id)
    }

    /// `globally e` is `false release e`
    pub fn globally(&mut self, id: ExprId) -> ExprId {
        self.release(Self::FALSE, id)
    }

    pub fn unary(&mut self, op: UnaryOperator, id: ExprId) -> ExprId {
        match op {
            UnaryOperator::Not => self.not(id),
            UnaryOperator::Next => self.next(id),
            UnaryOperator::Finally => self.finally(id),
            UnaryOperator::Globally => self.globally(id),
        }
    }

    pub fn binary(&mut self, op: BinaryOperator, left: ExprId, right: ExprId) -> ExprId {
        match op {
            BinaryOperator::And => self.and(left, right),
            BinaryOperator::Or => self.or(left, right),
            BinaryOperator::Until => self.until(left, right),
            BinaryOperator::Release => self.release(left, right),
        }
    }

    pub fn display(&self, id: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { interner: self, id }
    }

    /// Graph of every expression reachable from `root`
    ///
    /// Shared subexpressions appear once. Each edge points from an operator to an operand and is
    /// weighted with the position of the first argument referring to that operand.
    pub fn subformula_graph(&self, root: ExprId) -> DiGraphMap<ExprId, usize> {
        let mut graph = DiGraphMap::new();
        let mut pending = vec![root];

        graph.add_node(root);

        while let Some(id) = pending.pop() {
            for (position, arg) in self.args(id).iter().enumerate() {
                if !graph.contains_node(*arg) {
                    graph.add_node(*arg);
                    pending.push(*arg);
                }

                if !graph.contains_edge(id, *arg) {
                    graph.add_edge(id, *arg, position);
                }
            }
        }

        graph
    }

    /// Every distinct subexpression of `root`, operands before the operators using them
    pub fn closure(&self, root: ExprId) -> Vec<ExprId> {
        let graph = self.subformula_graph(root);
        let mut dfs = DfsPostOrder::new(&graph, root);
        let mut closure = Vec::with_capacity(graph.node_count());

        while let Some(id) = dfs.next(&graph) {
            closure.push(id);
        }

        closure
    }

    /// Evaluate a formula without temporal operators in a single state
    ///
    /// Values other than `true` and `false` are looked up using `labels`, which should return
    /// true for every label that holds in the state. Any temporal operator in the formula is an
    /// error, even one that would not affect the result.
    pub fn evaluate<F>(&self, id: ExprId, labels: &F) -> Result<bool, EvaluationError>
    where
        F: Fn(&str) -> bool,
    {
        let mut values: HashMap<ExprId, bool> = HashMap::new();

        for subformula in self.closure(id) {
            let value = match self.node(subformula) {
                _ if subformula == Self::TRUE || subformula == Self::FALSE => subformula == Self::TRUE,
                Node::Value(name) => labels(name),
                Node::Not([arg]) => !values[arg],
                Node::And([left, right]) => values[left] && values[right],
                Node::Or([left, right]) => values[left] || values[right],
                node => return Err(EvaluationError::Temporal(node.op())),
            };

            values.insert(subformula, value);
        }

        Ok(values[&id])
    }
}

/// Textual form of an expression that parses back into the same expression
pub struct ExprDisplay<'a> {
    interner: &'a Interner,
    id: ExprId,
}

enum Piece {
    Expr(ExprId),
    Infix(Op),
    Close,
}

impl<'a> Display for ExprDisplay<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut pending = vec![Piece::Expr(self.id)];

        while let Some(piece) = pending.pop() {
            let id = match piece {
                Piece::Expr(id) => id,
                Piece::Infix(op) => {
                    write!(f, " {} ", op)?;
                    continue;
                }
                Piece::Close => {
                    f.write_str(")")?;
                    continue;
                }
            };

            let node = self.interner.node(id);

            match node {
                Node::Value(name) => f.write_str(&literal::render(name))?,
                Node::Not([arg]) | Node::Next([arg]) => {
                    write!(f, "{} ", node.op())?;
                    pending.push(Piece::Expr(*arg));
                }
                Node::And([left, right])
                | Node::Or([left, right])
                | Node::Until([left, right])
                | Node::Release([left, right]) => {
                    f.write_str("(")?;
                    pending.extend([
                        Piece::Close,
                        Piece::Expr(*right),
                        Piece::Infix(node.op()),
                        Piece::Expr(*left),
                    ]);
                }
            }
        }

        Ok(())
    }
}
