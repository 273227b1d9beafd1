//! Grammar analysis and LL(1) table construction
//!
//! Rules are analysed in a single forward pass in declaration order. The pass computes
//! nullability, FIRST and FOLLOW sets without iterating to a fixpoint, so rules have to be
//! declared such that every symbol a rule depends on has already been completely described by
//! earlier rules. The compiler does not check this ordering; violating it produces incomplete
//! sets and therefore an incomplete parse table.
//!
//! Names starting with `#` are nonterminals, every other name is a terminal. The terminal
//! [`END`] stands for the end of the input.
//!
//! ```rust
//! use ltl_nnf::grammar::{Grammar, RuleDecl};
//!
//! let rules = ["#a := y", "#a :=", "#s := #a x"]
//!     .into_iter()
//!     .map(str::parse::<RuleDecl>)
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! let grammar = Grammar::compile("#s", rules).unwrap();
//! let a = grammar.symbol_id("#a").unwrap();
//! let x = grammar.symbol_id("x").unwrap();
//!
//! assert!(grammar.symbol(a).is_nullable());
//! assert!(grammar.symbol(a).follow().any(|symbol| symbol == x));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use log::debug;
use thiserror::Error;

use crate::lexer::TokenSource;
use crate::parser::Reductions;

mod notation;
mod table;

pub use table::{Conflict, ParseTable};

/// Name of the terminal that is matched once all input has been consumed
pub const END: &str = "$end";

const NONTERMINAL_PREFIX: char = '#';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Invalid rule declaration \"{0}\"")]
    InvalidRule(String),

    #[error("Rule head {0} is not a nonterminal")]
    TerminalHead(String),

    #[error("Start symbol {0} is not a nonterminal")]
    TerminalStart(String),

    #[error("Start symbol {0} has no rules")]
    UnknownStart(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A rule as declared by the grammar author, before symbols are resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDecl {
    head: String,
    body: Vec<String>,
}

impl RuleDecl {
    pub fn new<H, I, S>(head: H, body: I) -> Self
    where
        H: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            head: head.into(),
            body: body.into_iter().map(Into::into).collect(),
        }
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }
}

/// Grammar symbol together with the sets computed for it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    id: SymbolId,
    name: String,
    terminal: bool,
    nullable: bool,
    first: BTreeSet<SymbolId>,
    follow: BTreeSet<SymbolId>,
    last: BTreeSet<SymbolId>,
}

impl Symbol {
    fn new(id: SymbolId, name: &str) -> Self {
        let terminal = !name.starts_with(NONTERMINAL_PREFIX);
        let mut first = BTreeSet::new();
        let mut last = BTreeSet::new();

        if terminal {
            first.insert(id);
        } else {
            last.insert(id);
        }

        Self {
            id,
            name: name.to_string(),
            terminal,
            nullable: false,
            first,
            follow: BTreeSet::new(),
            last,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Terminals that can begin a string derived from this symbol
    pub fn first(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.first.iter().copied()
    }

    /// Terminals that can immediately follow this symbol
    pub fn follow(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.follow.iter().copied()
    }

    /// Nonterminals that can appear rightmost in a derivation of this symbol
    pub fn last(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.last.iter().copied()
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name == END {
            write!(f, "{}", END)
        } else if self.terminal {
            write!(f, "'{}'", self.name)
        } else {
            write!(f, "<{}>", &self.name[NONTERMINAL_PREFIX.len_utf8()..])
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    id: RuleId,
    head: SymbolId,
    body: Vec<SymbolId>,
}

impl Rule {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn head(&self) -> SymbolId {
        self.head
    }

    pub fn body(&self) -> &[SymbolId] {
        &self.body
    }
}

pub struct RuleDisplay<'g> {
    grammar: &'g Grammar,
    rule: &'g Rule,
}

impl<'g> Display for RuleDisplay<'g> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} :=", self.grammar.symbol(self.rule.head))?;

        if self.rule.body.is_empty() {
            return write!(f, " ε");
        }

        for symbol in &self.rule.body {
            write!(f, " {}", self.grammar.symbol(*symbol))?;
        }

        Ok(())
    }
}

/// Compiled grammar: interned symbols, analysed rules and the predictive parse table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grammar {
    symbols: Vec<Symbol>,
    names: HashMap<String, SymbolId>,
    rules: Vec<Rule>,
    table: ParseTable,
    start: SymbolId,
    end: SymbolId,
}

impl Grammar {
    /// Compile an ordered list of rules into a grammar whose parses begin at `start`
    pub fn compile<I>(start: &str, rules: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = RuleDecl>,
    {
        let mut grammar = Self {
            symbols: Vec::new(),
            names: HashMap::new(),
            rules: Vec::new(),
            table: ParseTable::default(),
            start: SymbolId(0),
            end: SymbolId(0),
        };

        grammar.end = grammar.intern(END);

        for decl in rules {
            let head = grammar.intern(&decl.head);

            if grammar.symbol(head).is_terminal() {
                return Err(GrammarError::TerminalHead(decl.head));
            }

            let body = decl.body.iter().map(|name| grammar.intern(name)).collect();
            let id = RuleId(grammar.rules.len());

            grammar.rules.push(Rule { id, head, body });
        }

        grammar.start = match grammar.symbol_id(start) {
            Some(id) if grammar.symbol(id).is_terminal() => {
                return Err(GrammarError::TerminalStart(start.to_string()));
            }
            Some(id) if grammar.rules.iter().any(|rule| rule.head == id) => id,
            _ => return Err(GrammarError::UnknownStart(start.to_string())),
        };

        grammar.analyze();
        grammar.table = ParseTable::build(&grammar);

        debug!(
            "compiled grammar with {} symbols, {} rules and {} table entries",
            grammar.symbols.len(),
            grammar.rules.len(),
            grammar.table.len()
        );

        Ok(grammar)
    }

    fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }

        let id = SymbolId(self.symbols.len());

        self.symbols.push(Symbol::new(id, name));
        self.names.insert(name.to_string(), id);

        id
    }

    fn analyze(&mut self) {
        for index in 0..self.rules.len() {
            let head = self.rules[index].head;
            let body = self.rules[index].body.clone();
            let mut nullable = true;
            let mut previous: Option<SymbolId> = None;

            for &symbol in &body {
                let first = self.symbols[symbol.0].first.clone();

                if nullable {
                    self.symbols[head.0].first.extend(first.iter().copied());
                }

                // Whatever can end the previous symbol may be followed by our FIRST
                if let Some(previous) = previous {
                    for last in self.symbols[previous.0].last.clone() {
                        self.symbols[last.0].follow.extend(first.iter().copied());
                    }
                }

                nullable = nullable && self.symbols[symbol.0].nullable;
                previous = Some(symbol);
            }

            self.symbols[head.0].nullable |= nullable;

            for &symbol in body.iter().rev() {
                let last = self.symbols[symbol.0].last.clone();
                self.symbols[head.0].last.extend(last.iter().copied());

                let follow = self.symbols[head.0].follow.clone();

                for last in last {
                    self.symbols[last.0].follow.extend(follow.iter().copied());
                }

                if !self.symbols[symbol.0].nullable {
                    break;
                }
            }
        }
    }

    /// Terminals that can begin a string derived from `sequence`
    pub fn first_of(&self, sequence: &[SymbolId]) -> BTreeSet<SymbolId> {
        let mut first = BTreeSet::new();

        for symbol in sequence.iter().map(|id| self.symbol(*id)) {
            first.extend(symbol.first().filter(|id| self.symbol(*id).is_terminal()));

            if !symbol.is_nullable() {
                break;
            }
        }

        first
    }

    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn display_rule<'g>(&'g self, rule: &'g Rule) -> RuleDisplay<'g> {
        RuleDisplay { grammar: self, rule }
    }

    pub fn start(&self) -> SymbolId {
        self.start
    }

    pub fn end(&self) -> SymbolId {
        self.end
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Table entries that were overwritten by a later rule during construction
    pub fn conflicts(&self) -> &[Conflict] {
        self.table.conflicts()
    }

    /// Parse the tokens produced by `source`, yielding reductions as rules are completed
    pub fn parse<S: TokenSource>(&self, source: S) -> Reductions<'_, S> {
        Reductions::new(self, source)
    }
}
