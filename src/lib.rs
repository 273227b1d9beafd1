#![deny(clippy::all)]

//! Table driven LL(1) parsing and linear temporal logic formulas in negation normal form
//!
//! The crate is organised as a small pipeline:
//!
//! * [`lexer`] turns chunks of text into tokens using an ordered list of regex token classes
//! * [`grammar`] analyses an ordered list of rules and builds a predictive parse table
//! * [`parser`] runs the table over a token source and yields rule reductions in post-order
//! * [`ltl`] uses the three stages above to build hash-consed LTL expressions

pub mod grammar;
pub mod lexer;
pub mod ltl;
pub mod parser;

pub use crate::grammar::{Grammar, GrammarError, RuleDecl};
pub use crate::lexer::{LexError, Token, TokenClass, TokenSet};
pub use crate::parser::{ParseError, Reduction};
