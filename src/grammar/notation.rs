//! Textual rule declarations of the form `head := symbol symbol ...`
//!
//! Symbols are separated by whitespace and an empty body declares an epsilon rule.

use std::str::FromStr;

use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{space0, space1};
use nom::combinator::all_consuming;
use nom::multi::separated_list0;
use nom::sequence::{delimited, separated_pair};
use nom::IResult;

use super::{GrammarError, RuleDecl};

fn symbol(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

fn arrow(input: &str) -> IResult<&str, &str> {
    delimited(space0, tag(":="), space0)(input)
}

fn rule(input: &str) -> IResult<&str, RuleDecl> {
    let body = separated_list0(space1, symbol);
    let mut parser = delimited(space0, separated_pair(symbol, arrow, body), space0);
    let (rest, (head, body)) = parser(input)?;

    Ok((rest, RuleDecl::new(head, body)))
}

impl FromStr for RuleDecl {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(rule)(s)
            .map(|(_, decl)| decl)
            .map_err(|_| GrammarError::InvalidRule(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::rule;
    use crate::grammar::{GrammarError, RuleDecl};

    #[test]
    fn parse_rule() -> Result<(), GrammarError> {
        let decl: RuleDecl = "#expr-primary := ( #expr )".parse()?;

        assert_eq!(decl.head(), "#expr-primary");
        assert_eq!(decl.body(), ["(", "#expr", ")"]);

        Ok(())
    }

    #[test]
    fn parse_epsilon_rule() -> Result<(), GrammarError> {
        let decl: RuleDecl = "  #expr-binary' :=   ".parse()?;

        assert_eq!(decl, RuleDecl::new("#expr-binary'", Vec::<String>::new()));
        Ok(())
    }

    #[test]
    fn parse_partial_rule() {
        let (rest, decl) = rule("#a := b c\n#d").unwrap();

        assert_eq!(rest, "\n#d");
        assert_eq!(decl.body(), ["b", "c"]);
    }

    #[test]
    fn reject_missing_arrow() {
        let result = "#a b c".parse::<RuleDecl>();
        assert_eq!(result, Err(GrammarError::InvalidRule("#a b c".to_string())));
    }
}
