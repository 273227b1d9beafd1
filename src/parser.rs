//! Table driven predictive parsing
//!
//! [`Reductions`] runs the LL(1) automaton of a compiled [`Grammar`] over a token source and
//! yields a [`Reduction`] each time the body of a rule has been completely matched. Reductions of
//! nested rules are yielded before the rule containing them, so the sequence is a post-order
//! walk of the derivation tree. Tokens are pulled only when the automaton moves past a matched
//! terminal and another frame needs a lookahead, which means nothing after the last token the
//! grammar needs is ever read.

use std::fmt::{Display, Formatter};
use std::iter::FusedIterator;

use log::trace;
use thiserror::Error;

use crate::grammar::{Grammar, Rule, SymbolId};
use crate::lexer::{LexError, Token, TokenSource};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Unexpected {found} (expected terminal {expected})")]
    UnexpectedTerminal { expected: String, found: String },

    #[error("Unexpected {found} (expected one of {})", .expected.join(", "))]
    UnexpectedToken { found: String, expected: Vec<String> },
}

/// A completed rule and the lexemes its own terminals matched, from left to right
#[derive(Clone, Debug)]
pub struct Reduction<'g> {
    grammar: &'g Grammar,
    rule: &'g Rule,
    matches: Vec<String>,
}

impl<'g> Reduction<'g> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Name of the nonterminal the rule reduces to
    pub fn head(&self) -> &'g str {
        self.grammar.symbol(self.rule.head()).name()
    }

    pub fn rule(&self) -> &'g Rule {
        self.rule
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<String> {
        self.matches
    }
}

impl<'g> Display for Reduction<'g> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}", self.grammar.display_rule(self.rule), self.matches)
    }
}

enum Frame {
    Symbol(SymbolId),
    Complete,
}

struct Lookahead {
    symbol: Option<SymbolId>,
    token: Option<Token>,
}

impl Lookahead {
    fn new(grammar: &Grammar, token: Token) -> Self {
        Self {
            symbol: grammar.symbol_id(&token.kind),
            token: Some(token),
        }
    }

    fn end(grammar: &Grammar) -> Self {
        Self {
            symbol: Some(grammar.end()),
            token: None,
        }
    }

    fn describe(&self, grammar: &Grammar) -> String {
        match (&self.token, self.symbol) {
            (Some(token), _) => token.to_string(),
            (None, Some(symbol)) => grammar.symbol(symbol).to_string(),
            (None, None) => String::from("end of input"),
        }
    }
}

/// Pull based LL(1) parse over a token source
pub struct Reductions<'g, S> {
    grammar: &'g Grammar,
    source: S,
    stack: Vec<Frame>,
    open: Vec<Reduction<'g>>,
    lookahead: Option<Lookahead>,
    started: bool,
    finished: bool,
}

impl<'g, S> Reductions<'g, S>
where
    S: TokenSource,
{
    pub fn new(grammar: &'g Grammar, source: S) -> Self {
        Self {
            grammar,
            source,
            stack: vec![Frame::Symbol(grammar.start())],
            open: Vec::new(),
            lookahead: None,
            started: false,
            finished: false,
        }
    }

    fn advance(&mut self) -> Result<Lookahead, ParseError> {
        let started = std::mem::replace(&mut self.started, true);

        match self.source.next_token() {
            Ok(token) => Ok(Lookahead::new(self.grammar, token)),
            // The first token has to exist, running out of input later is the end marker
            Err(LexError::EndOfInput) if started => Ok(Lookahead::end(self.grammar)),
            Err(err) => Err(err.into()),
        }
    }

    fn step(&mut self) -> Result<Option<Reduction<'g>>, ParseError> {
        let grammar = self.grammar;

        while let Some(frame) = self.stack.pop() {
            let top = match frame {
                Frame::Symbol(symbol) => symbol,
                Frame::Complete => {
                    let reduction = self.open.pop().expect("completion marker without an open rule");
                    trace!("reduce {}", reduction);

                    return Ok(Some(reduction));
                }
            };

            let mut lookahead = match self.lookahead.take() {
                Some(lookahead) => lookahead,
                None => self.advance()?,
            };

            // A matched token is consumed, the next one is only pulled once a frame needs it
            if lookahead.symbol == Some(top) {
                if let (Some(open), Some(token)) = (self.open.last_mut(), lookahead.token.take()) {
                    open.matches.push(token.lexeme);
                }

                continue;
            }

            let symbol = grammar.symbol(top);

            if symbol.is_terminal() {
                return Err(ParseError::UnexpectedTerminal {
                    expected: symbol.to_string(),
                    found: lookahead.describe(grammar),
                });
            }

            let rule = match lookahead.symbol.and_then(|next| grammar.table().get(top, next)) {
                Some(rule) => grammar.rule(rule),
                None => {
                    return Err(ParseError::UnexpectedToken {
                        found: lookahead.describe(grammar),
                        expected: grammar
                            .table()
                            .expected(top)
                            .map(|expected| grammar.symbol(expected).to_string())
                            .collect(),
                    });
                }
            };

            trace!("expand {}", grammar.display_rule(rule));

            self.lookahead = Some(lookahead);
            self.open.push(Reduction {
                grammar,
                rule,
                matches: Vec::new(),
            });
            self.stack.push(Frame::Complete);
            self.stack.extend(rule.body().iter().rev().map(|symbol| Frame::Symbol(*symbol)));
        }

        Ok(None)
    }
}

impl<'g, S> Iterator for Reductions<'g, S>
where
    S: TokenSource,
{
    type Item = Result<Reduction<'g>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.step();

        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }

        result.transpose()
    }
}

impl<'g, S> FusedIterator for Reductions<'g, S> where S: TokenSource {}

#[cfg(test)]
mod tests {
    use super::ParseError;
    use crate::grammar::{Grammar, GrammarError, RuleDecl};
    use crate::lexer::{LexError, Token};

    fn grammar() -> Result<Grammar, GrammarError> {
        let rules = [
            RuleDecl::new("#item", ["n"]),
            RuleDecl::new("#item", ["[", "#list", "]"]),
            RuleDecl::new("#list'", Vec::<&str>::new()),
            RuleDecl::new("#list'", [",", "#list"]),
            RuleDecl::new("#list", ["#item", "#list'"]),
            RuleDecl::new("#top", ["#item", "$end"]),
        ];

        Grammar::compile("#top", rules)
    }

    fn tokens(kinds: &[&str]) -> std::vec::IntoIter<Token> {
        kinds
            .iter()
            .map(|kind| Token::new(*kind, *kind))
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn trace(grammar: &Grammar, kinds: &[&str]) -> Result<Vec<String>, ParseError> {
        grammar
            .parse(tokens(kinds))
            .map(|reduction| reduction.map(|r| r.to_string()))
            .collect()
    }

    #[test]
    fn reductions_are_post_order() -> Result<(), Box<dyn std::error::Error>> {
        let grammar = grammar()?;
        let reductions = trace(&grammar, &["[", "n", ",", "n", "]"])?;
        let expected = [
            "<item> := 'n' [\"n\"]",
            "<item> := 'n' [\"n\"]",
            "<list'> := ε []",
            "<list> := <item> <list'> []",
            "<list'> := ',' <list> [\",\"]",
            "<list> := <item> <list'> []",
            "<item> := '[' <list> ']' [\"[\", \"]\"]",
            "<top> := <item> $end []",
        ];

        assert_eq!(reductions, expected);
        Ok(())
    }

    #[test]
    fn unexpected_token() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let result = trace(&grammar, &["[", "]"]);

        match result {
            Err(ParseError::UnexpectedToken { found, expected }) => {
                assert_eq!(found, "']'");
                assert_eq!(expected, ["'n'", "'['"]);
            }
            other => panic!("unexpected result {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn trailing_input() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let result = trace(&grammar, &["n", "n"]);

        assert!(matches!(
            result,
            Err(ParseError::UnexpectedTerminal { expected, found }) if expected == "$end" && found == "'n'"
        ));

        Ok(())
    }

    #[test]
    fn premature_end_of_input() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let result = trace(&grammar, &["[", "n"]);

        match result {
            Err(ParseError::UnexpectedToken { found, expected }) => {
                assert_eq!(found, "$end");
                assert_eq!(expected, ["']'", "','"]);
            }
            other => panic!("unexpected result {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn unknown_token_kind() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let mut source = vec![Token::new("NUMBER", "42")].into_iter();
        let result = grammar.parse(&mut source).collect::<Result<Vec<_>, _>>();

        assert!(matches!(
            result,
            Err(ParseError::UnexpectedToken { found, .. }) if found == "NUMBER \"42\""
        ));

        Ok(())
    }

    #[test]
    fn empty_input() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let result = trace(&grammar, &[]);

        assert!(matches!(result, Err(ParseError::Lex(LexError::EndOfInput))));
        Ok(())
    }

    #[test]
    fn stops_after_error() -> Result<(), GrammarError> {
        let grammar = grammar()?;
        let mut reductions = grammar.parse(tokens(&["]"]));

        assert!(matches!(reductions.next(), Some(Err(_))));
        assert!(reductions.next().is_none());

        Ok(())
    }
}
