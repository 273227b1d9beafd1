use crate::parser::Reduction;

use super::expression::{BinaryOperator, ExprId, Interner, UnaryOperator};
use super::{literal, FormulaError};

/// Value stack entry
///
/// The binary rules are right recursive, so the operator and right operand of a binary
/// expression are reduced before the rule that owns the left operand. A `Tail` holds them until
/// then, `None` standing for a primary expression without an operator.
#[derive(Debug, PartialEq)]
enum Slot {
    Formula(ExprId),
    Tail(Option<(BinaryOperator, ExprId)>),
}

/// Assembles a formula from the reductions of the LTL grammar, in the order they are produced
pub(crate) struct FormulaBuilder<'i> {
    interner: &'i mut Interner,
    stack: Vec<Slot>,
}

impl<'i> FormulaBuilder<'i> {
    pub(crate) fn new(interner: &'i mut Interner) -> Self {
        Self {
            interner,
            stack: Vec::new(),
        }
    }

    fn pop_formula(&mut self) -> ExprId {
        match self.stack.pop() {
            Some(Slot::Formula(id)) => id,
            slot => panic!("expected a formula on the value stack, found {:?}", slot),
        }
    }

    fn pop_tail(&mut self) -> Option<(BinaryOperator, ExprId)> {
        match self.stack.pop() {
            Some(Slot::Tail(tail)) => tail,
            slot => panic!("expected an operator tail on the value stack, found {:?}", slot),
        }
    }

    /// Leading terminal of an operator or atom rule
    fn lexeme<'r>(reduction: &'r Reduction<'_>) -> &'r str {
        match reduction.matches().first() {
            Some(lexeme) => lexeme.as_str(),
            None => panic!("expected a terminal in reduction {}", reduction),
        }
    }

    pub(crate) fn reduce(&mut self, reduction: &Reduction<'_>) -> Result<(), FormulaError> {
        let body = reduction.rule().body().len();

        match reduction.head() {
            // true, false and atoms, parentheses leave their contents in place
            "#expr-primary" if body == 1 => {
                let lexeme = Self::lexeme(reduction);
                let id = if lexeme.starts_with('"') {
                    let name = literal::unescape(lexeme).ok_or_else(|| FormulaError::Literal(lexeme.to_string()))?;
                    self.interner.value(&name)
                } else {
                    self.interner.value(lexeme)
                };

                self.stack.push(Slot::Formula(id));
            }

            "#expr-unary" if body == 2 => {
                let op: UnaryOperator = Self::lexeme(reduction).parse()?;
                let arg = self.pop_formula();
                let id = self.interner.unary(op, arg);

                self.stack.push(Slot::Formula(id));
            }

            "#expr-binary'" if body == 0 => self.stack.push(Slot::Tail(None)),

            "#expr-binary'" => {
                let op: BinaryOperator = Self::lexeme(reduction).parse()?;
                let right = self.pop_formula();

                self.stack.push(Slot::Tail(Some((op, right))));
            }

            "#expr-binary" => {
                if let Some((op, right)) = self.pop_tail() {
                    let left = self.pop_formula();
                    let id = self.interner.binary(op, left, right);

                    self.stack.push(Slot::Formula(id));
                }
            }

            _ => {}
        }

        Ok(())
    }

    /// The finished formula, exactly one value must be left on the stack
    pub(crate) fn finish(mut self) -> ExprId {
        assert_eq!(self.stack.len(), 1, "value stack holds {} entries", self.stack.len());
        self.pop_formula()
    }
}

#[cfg(test)]
mod tests {
    use super::{FormulaBuilder, Slot};
    use crate::grammar::{Grammar, RuleDecl};
    use crate::lexer::Token;
    use crate::ltl::{token_set, FormulaError, Interner};

    fn build(interner: &mut Interner, source: &str) -> Result<super::ExprId, FormulaError> {
        let grammar = crate::ltl::grammar();
        let mut builder = FormulaBuilder::new(interner);

        for reduction in grammar.parse(token_set().tokenize([source])) {
            builder.reduce(&reduction?)?;
        }

        Ok(builder.finish())
    }

    #[test]
    fn binary_operators_nest_to_the_right() -> Result<(), FormulaError> {
        let mut interner = Interner::new();
        let id = build(&mut interner, "a and b or c")?;

        let a = interner.value("a");
        let b = interner.value("b");
        let c = interner.value("c");
        let or = interner.or(b, c);

        assert_eq!(id, interner.and(a, or));
        Ok(())
    }

    #[test]
    fn tails_wait_for_left_operands() -> Result<(), FormulaError> {
        let mut interner = Interner::new();
        let grammar = crate::ltl::grammar();
        let mut builder = FormulaBuilder::new(&mut interner);
        let mut reductions = grammar.parse(token_set().tokenize(["x until y"]));

        // x, its unary wrapper, then y and its unary wrapper
        for _ in 0..4 {
            builder.reduce(&reductions.next().unwrap()?)?;
        }
        assert!(matches!(builder.stack.last(), Some(Slot::Formula(_))));

        // the empty tail after y and the binary rule around it
        builder.reduce(&reductions.next().unwrap()?)?;
        assert_eq!(builder.stack.last(), Some(&Slot::Tail(None)));
        builder.reduce(&reductions.next().unwrap()?)?;

        // the tail holding `until y`
        builder.reduce(&reductions.next().unwrap()?)?;
        assert!(matches!(builder.stack.last(), Some(Slot::Tail(Some(_)))));
        assert_eq!(builder.stack.len(), 2);

        for reduction in reductions {
            builder.reduce(&reduction?)?;
        }

        let id = builder.finish();
        let x = interner.value("x");
        let y = interner.value("y");

        assert_eq!(id, interner.until(x, y));
        Ok(())
    }

    #[test]
    fn invalid_escape() {
        let mut interner = Interner::new();
        let result = build(&mut interner, r#""bad\q""#);

        assert!(matches!(result, Err(FormulaError::Literal(lexeme)) if lexeme == r#""bad\q""#));
    }

    #[test]
    #[should_panic(expected = "expected a terminal in reduction")]
    fn operator_rules_need_a_terminal() {
        let rules = [
            RuleDecl::new("#a", ["x"]),
            RuleDecl::new("#b", ["y"]),
            RuleDecl::new("#expr-unary", ["#a", "#b"]),
        ];
        let grammar = Grammar::compile("#expr-unary", rules).unwrap();
        let tokens = vec![Token::new("x", "x"), Token::new("y", "y")];
        let mut interner = Interner::new();
        let mut builder = FormulaBuilder::new(&mut interner);

        for reduction in grammar.parse(tokens.into_iter()) {
            let _ = builder.reduce(&reduction.unwrap());
        }
    }

    #[test]
    #[should_panic]
    fn unfinished_formula() {
        let mut interner = Interner::new();
        let builder = FormulaBuilder::new(&mut interner);

        builder.finish();
    }
}
