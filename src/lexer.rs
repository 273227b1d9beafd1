//! Regex driven tokenizer
//!
//! A [`TokenSet`] compiles an ordered list of [`TokenClass`]es into a single alternation. When
//! more than one class matches at the same position the class declared first wins, which means
//! that keyword classes must be declared before any identifier class that would also match them.
//!
//! Text is read in chunks. A token is only committed once no class could still match past the
//! end of the buffered text, so the tokens produced do not depend on where the input is split.
//!
//! ```rust
//! use ltl_nnf::lexer::{TokenClass, TokenSet};
//!
//! let tokens = TokenSet::new([
//!     TokenClass::ignored("_", r"\s+"),
//!     TokenClass::literal("KEYWORD", r"let\b|="),
//!     TokenClass::named("NAME", r"[a-z]+"),
//! ])
//! .unwrap();
//!
//! let kinds = tokens
//!     .tokenize(["let x = y"])
//!     .map(|token| token.map(|t| t.kind))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! assert_eq!(kinds, ["let", "NAME", "=", "NAME"]);
//! ```

use std::fmt::{Display, Formatter};
use std::iter::FusedIterator;

use log::{debug, trace};
use regex::Regex;
use regex_automata::dfa::{dense, Automaton};
use regex_automata::{Anchored, Input};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexError {
    #[error("Invalid pattern for token class {name}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Token classes cannot be compiled into a prefix automaton: {source}")]
    Automaton {
        #[source]
        source: dense::BuildError,
    },

    #[error("Unexpected end of input")]
    EndOfInput,

    #[error("No token class matches input \"{input}\"")]
    NoMatch { input: String },
}

/// How matches of a token class are reported
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Tokens are reported with the class name as their kind
    Named,

    /// Matches are consumed and never reported
    Ignored,

    /// Every distinct lexeme is its own kind
    Literal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClass {
    name: String,
    pattern: String,
    kind: ClassKind,
}

impl TokenClass {
    pub fn new<N, P>(name: N, pattern: P, kind: ClassKind) -> Self
    where
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            kind,
        }
    }

    pub fn named<N: Into<String>, P: Into<String>>(name: N, pattern: P) -> Self {
        Self::new(name, pattern, ClassKind::Named)
    }

    pub fn ignored<N: Into<String>, P: Into<String>>(name: N, pattern: P) -> Self {
        Self::new(name, pattern, ClassKind::Ignored)
    }

    pub fn literal<N: Into<String>, P: Into<String>>(name: N, pattern: P) -> Self {
        Self::new(name, pattern, ClassKind::Literal)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: String,
    pub lexeme: String,
}

impl Token {
    pub fn new<K: Into<String>, L: Into<String>>(kind: K, lexeme: L) -> Self {
        Self {
            kind: kind.into(),
            lexeme: lexeme.into(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.kind == self.lexeme {
            write!(f, "'{}'", self.kind)
        } else {
            write!(f, "{} \"{}\"", self.kind, self.lexeme)
        }
    }
}

/// Anything the parse automaton can pull tokens from
///
/// Implementations return [`LexError::EndOfInput`] once no more tokens are available.
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, LexError>;
}

impl<S> TokenSource for &mut S
where
    S: TokenSource + ?Sized,
{
    fn next_token(&mut self) -> Result<Token, LexError> {
        (**self).next_token()
    }
}

impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.next().ok_or(LexError::EndOfInput)
    }
}

/// Compiled matcher for an ordered list of token classes
#[derive(Clone, Debug)]
pub struct TokenSet {
    matcher: Regex,
    prefixes: dense::DFA<Vec<u32>>,
    groups: Vec<String>,
    classes: Vec<TokenClass>,
}

impl TokenSet {
    pub fn new<I>(classes: I) -> Result<Self, LexError>
    where
        I: IntoIterator<Item = TokenClass>,
    {
        let classes: Vec<TokenClass> = classes.into_iter().collect();

        // Compiling each pattern on its own lets the error name the class at fault
        for class in &classes {
            Regex::new(&class.pattern).map_err(|source| LexError::Pattern {
                name: class.name.clone(),
                source,
            })?;
        }

        let groups: Vec<String> = (0..classes.len()).map(|index| format!("class{index}")).collect();
        let alternation = classes
            .iter()
            .zip(&groups)
            .map(|(class, group)| format!("(?P<{}>{})", group, class.pattern))
            .collect::<Vec<_>>()
            .join("|");

        let matcher = Regex::new(&format!(r"\A(?:{alternation})")).map_err(|source| LexError::Pattern {
            name: groups.join("|"),
            source,
        })?;

        // Only used to decide whether more input could extend a match, so `\b` may give up on
        // non-ASCII text
        let prefixes = dense::Builder::new()
            .configure(dense::Config::new().unicode_word_boundary(true))
            .build(&alternation)
            .map_err(|source| LexError::Automaton { source })?;

        debug!(
            "compiled {} token classes, prefix automaton uses {} bytes",
            classes.len(),
            prefixes.memory_usage()
        );

        Ok(Self {
            matcher,
            prefixes,
            groups,
            classes,
        })
    }

    pub fn classes(&self) -> &[TokenClass] {
        &self.classes
    }

    /// Find the class and length of the token at the start of `text`, ignoring empty matches
    fn match_prefix(&self, text: &str) -> Option<(&TokenClass, usize)> {
        let captures = self.matcher.captures(text)?;
        let length = captures.get(0)?.end();
        let index = self.groups.iter().position(|group| captures.name(group).is_some())?;

        if length == 0 {
            None
        } else {
            Some((&self.classes[index], length))
        }
    }

    /// Whether some class could match a string that starts with all of `text`
    ///
    /// Errs on the side of `true` whenever the automaton gives up.
    fn may_extend(&self, text: &str) -> bool {
        let dfa = &self.prefixes;
        let input = Input::new(text).anchored(Anchored::Yes);
        let mut state = match dfa.start_state_forward(&input) {
            Ok(state) => state,
            Err(_) => return true,
        };

        for byte in text.bytes() {
            state = dfa.next_state(state, byte);

            if dfa.is_dead_state(state) {
                return false;
            }

            if dfa.is_quit_state(state) {
                return true;
            }
        }

        true
    }

    /// Create a tokenizer that pulls text from `source` one chunk at a time
    pub fn tokenize<I>(&self, source: I) -> Tokenizer<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Tokenizer {
            set: self,
            source: source.into_iter(),
            buffer: String::new(),
            consumed: 0,
            exhausted: false,
            failed: false,
        }
    }
}

/// Lazy token producer over a sequence of text chunks
pub struct Tokenizer<'t, I> {
    set: &'t TokenSet,
    source: I,
    buffer: String,
    consumed: usize,
    exhausted: bool,
    failed: bool,
}

impl<'t, I> Tokenizer<'t, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn pull(&mut self) -> bool {
        if self.exhausted {
            return false;
        }

        match self.source.next() {
            Some(chunk) => {
                self.buffer.drain(..self.consumed);
                self.consumed = 0;
                self.buffer.push_str(chunk.as_ref());
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// Text that has been pulled from the source but not yet turned into tokens
    pub fn remaining(&self) -> &str {
        &self.buffer[self.consumed..]
    }
}

impl<'t, I> TokenSource for Tokenizer<'t, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    fn next_token(&mut self) -> Result<Token, LexError> {
        let set = self.set;

        loop {
            if self.remaining().is_empty() && !self.pull() {
                return Err(LexError::EndOfInput);
            }

            let text = self.remaining();

            let (class, length) = match set.match_prefix(text) {
                // Some class may still match a longer token once the next chunk arrives
                Some((class, length)) if self.exhausted || !set.may_extend(text) => (class, length),
                Some(_) => {
                    self.pull();
                    continue;
                }
                None => {
                    if self.pull() {
                        continue;
                    }

                    return Err(LexError::NoMatch {
                        input: self.remaining().to_string(),
                    });
                }
            };

            let lexeme = text[..length].to_string();
            self.consumed += length;

            let token = match class.kind {
                ClassKind::Ignored => continue,
                ClassKind::Literal => Token::new(lexeme.clone(), lexeme),
                ClassKind::Named => Token::new(class.name.clone(), lexeme),
            };

            trace!("token {}", token);
            return Ok(token);
        }
    }
}

impl<'t, I> Iterator for Tokenizer<'t, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.next_token() {
            Err(LexError::EndOfInput) => {
                self.failed = true;
                None
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
            Ok(token) => Some(Ok(token)),
        }
    }
}

impl<'t, I> FusedIterator for Tokenizer<'t, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
}

#[cfg(test)]
mod tests {
    use super::{LexError, Token, TokenClass, TokenSet, TokenSource};

    fn keywords() -> Result<TokenSet, LexError> {
        TokenSet::new([
            TokenClass::ignored("_", r"[ \t\r\n]+"),
            TokenClass::literal("KEYWORD", r"(?:if|then)\b|[()]"),
            TokenClass::named("NAME", r"[a-z]+"),
            TokenClass::named("INVALID", r"[^ \t\r\n]+"),
        ])
    }

    #[test]
    fn earlier_classes_take_priority() -> Result<(), LexError> {
        let set = keywords()?;
        let tokens = set.tokenize(["if iffy then (x)"]).collect::<Result<Vec<_>, _>>()?;
        let expected = vec![
            Token::new("if", "if"),
            Token::new("NAME", "iffy"),
            Token::new("then", "then"),
            Token::new("(", "("),
            Token::new("NAME", "x"),
            Token::new(")", ")"),
        ];

        assert_eq!(tokens, expected);
        Ok(())
    }

    #[test]
    fn tokens_span_chunks() -> Result<(), LexError> {
        let set = keywords()?;
        let tokens = set.tokenize(["th", "en ab", "c", " i", "f"]).collect::<Result<Vec<_>, _>>()?;
        let expected = vec![
            Token::new("then", "then"),
            Token::new("NAME", "abc"),
            Token::new("if", "if"),
        ];

        assert_eq!(tokens, expected);
        Ok(())
    }

    #[test]
    fn split_points_do_not_change_tokens() -> Result<(), LexError> {
        let set = TokenSet::new([
            TokenClass::ignored("_", r"[ \t\r\n]+"),
            TokenClass::named("STRING", r#""[^"]*""#),
            TokenClass::named("WORD", r"[^ \t\r\n]+"),
        ])?;
        let source = "say \"a b\nc\" now";
        let whole = set.tokenize([source]).collect::<Result<Vec<_>, _>>()?;

        assert_eq!(whole[1], Token::new("STRING", "\"a b\nc\""));

        for split in 1..source.len() {
            let chunks = [&source[..split], &source[split..]];
            let tokens = set.tokenize(chunks).collect::<Result<Vec<_>, _>>()?;

            assert_eq!(tokens, whole, "split at {}", split);
        }

        Ok(())
    }

    #[test]
    fn finished_tokens_are_not_held_back() -> Result<(), LexError> {
        let set = keywords()?;
        let mut tokenizer = set.tokenize(["if x", "y"]);

        assert_eq!(tokenizer.next_token()?, Token::new("if", "if"));
        assert_eq!(tokenizer.remaining(), " x");

        Ok(())
    }

    #[test]
    fn empty_input_is_an_error() -> Result<(), LexError> {
        let set = keywords()?;
        let mut tokenizer = set.tokenize(Vec::<String>::new());

        assert!(matches!(tokenizer.next_token(), Err(LexError::EndOfInput)));

        let mut blank = set.tokenize(["   ", "\n"]);
        assert!(matches!(blank.next_token(), Err(LexError::EndOfInput)));

        Ok(())
    }

    #[test]
    fn unmatched_input() -> Result<(), LexError> {
        let set = TokenSet::new([TokenClass::named("DIGITS", r"[0-9]+")])?;
        let mut tokenizer = set.tokenize(["12ab"]);

        assert_eq!(tokenizer.next_token()?, Token::new("DIGITS", "12"));
        assert!(matches!(tokenizer.next_token(), Err(LexError::NoMatch { input }) if input == "ab"));
        assert_eq!(tokenizer.remaining(), "ab");

        Ok(())
    }

    #[test]
    fn iterator_stops_after_error() -> Result<(), LexError> {
        let set = TokenSet::new([TokenClass::named("DIGITS", r"[0-9]+")])?;
        let mut tokenizer = set.tokenize(["1x"]);

        assert!(matches!(tokenizer.next(), Some(Ok(_))));
        assert!(matches!(tokenizer.next(), Some(Err(LexError::NoMatch { .. }))));
        assert!(tokenizer.next().is_none());

        Ok(())
    }

    #[test]
    fn invalid_pattern() {
        let result = TokenSet::new([TokenClass::named("GOOD", "a+"), TokenClass::named("BAD", "(b")]);

        assert!(matches!(result, Err(LexError::Pattern { name, .. }) if name == "BAD"));
    }

    #[test]
    fn token_vectors_are_sources() {
        let mut tokens = vec![Token::new("x", "x")].into_iter();

        assert_eq!(tokens.next_token().ok(), Some(Token::new("x", "x")));
        assert!(matches!(tokens.next_token(), Err(LexError::EndOfInput)));
    }
}
