//! Linear temporal logic formulas
//!
//! Formulas are written with the prefix operators `not`, `next`, `finally` and `globally`, the
//! infix operators `and`, `or`, `until` and `release`, parentheses, the constants `true` and
//! `false`, and atoms. An atom is either an identifier or a double-quoted string. Infix operators
//! all share one precedence level and group to the right, so `a and b or c` is read as
//! `a and (b or c)`.
//!
//! Parsing produces an expression in negation normal form inside an [`Interner`]:
//!
//! ```rust
//! use ltl_nnf::ltl::{self, Interner};
//!
//! let mut interner = Interner::new();
//! let formula = ltl::parse(&mut interner, "not (a until globally b)")?;
//!
//! assert_eq!(
//!     interner.display(formula).to_string(),
//!     "(not a release (true until not b))"
//! );
//! # Ok::<(), ltl_nnf::ltl::FormulaError>(())
//! ```

use log::debug;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::grammar::{Grammar, RuleDecl};
use crate::lexer::{TokenClass, TokenSet};
use crate::parser::{ParseError, Reduction};

mod builder;
pub mod expression;
mod literal;

use builder::FormulaBuilder;
pub use expression::{
    BinaryOperator, EvaluationError, ExprDisplay, ExprId, Interner, Node, Op, UnaryOperator, UnknownOperator,
};

#[derive(Debug, Error)]
pub enum FormulaError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid string literal {0}")]
    Literal(String),

    #[error(transparent)]
    Operator(#[from] UnknownOperator),
}

/// Name of the start symbol of the formula grammar
pub const START: &str = "#^";

const RULES: [&str; 17] = [
    "#expr-primary := true",
    "#expr-primary := false",
    "#expr-primary := PREDICATE",
    "#expr-primary := ( #expr )",
    "#expr-unary := #expr-primary",
    "#expr-unary := not #expr-unary",
    "#expr-unary := next #expr-unary",
    "#expr-unary := finally #expr-unary",
    "#expr-unary := globally #expr-unary",
    "#expr-binary' :=",
    "#expr-binary' := and #expr-binary",
    "#expr-binary' := or #expr-binary",
    "#expr-binary' := until #expr-binary",
    "#expr-binary' := release #expr-binary",
    "#expr-binary := #expr-unary #expr-binary'",
    "#expr := #expr-binary",
    "#^ := #expr $end",
];

fn token_classes() -> [TokenClass; 4] {
    [
        TokenClass::ignored("_", r"[ \t\r\n]+"),
        TokenClass::literal(
            "KEYWORD",
            r"(?:not|and|or|until|release|next|finally|globally|true|false)\b|[()]",
        ),
        TokenClass::named("PREDICATE", r#"[_A-Za-z][_0-9A-Za-z]*|"(?:\\.|[^"\\])*""#),
        TokenClass::named("INVALID", r"[^ \t\r\n]+"),
    ]
}

static TOKENS: Lazy<TokenSet> =
    Lazy::new(|| TokenSet::new(token_classes()).expect("formula token classes are valid patterns"));

static GRAMMAR: Lazy<Grammar> = Lazy::new(|| {
    let rules = RULES
        .iter()
        .map(|rule| rule.parse::<RuleDecl>())
        .collect::<Result<Vec<_>, _>>()
        .expect("formula rules are well formed");
    let grammar = Grammar::compile(START, rules).expect("formula grammar is valid");

    debug!("formula grammar has {} table entries", grammar.table().len());
    grammar
});

/// Token classes used to split formulas
pub fn token_set() -> &'static TokenSet {
    &TOKENS
}

/// Compiled formula grammar
pub fn grammar() -> &'static Grammar {
    &GRAMMAR
}

/// Parse a formula that arrives in several pieces of text
///
/// Chunks are only pulled as the tokenizer needs more text, and the result does not depend on
/// where the text is split.
pub fn parse_chunks<I>(interner: &mut Interner, chunks: I) -> Result<ExprId, FormulaError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    parse_chunks_with(interner, chunks, |_| {})
}

/// Same as [`parse_chunks`], calling `inspect` with every reduction before it is applied
pub fn parse_chunks_with<I, F>(interner: &mut Interner, chunks: I, mut inspect: F) -> Result<ExprId, FormulaError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: FnMut(&Reduction<'static>),
{
    let mut builder = FormulaBuilder::new(interner);

    for reduction in grammar().parse(token_set().tokenize(chunks)) {
        let reduction = reduction?;

        inspect(&reduction);
        builder.reduce(&reduction)?;
    }

    Ok(builder.finish())
}

pub fn parse(interner: &mut Interner, source: &str) -> Result<ExprId, FormulaError> {
    parse_chunks(interner, [source])
}
