//! Quoted atom names
//!
//! Atoms that are not plain identifiers are written as double-quoted strings. The escapes
//! `\\ \" \' \n \r \t \0 \xHH \u{H..}` are decoded before the name becomes a value, and
//! [`render`] quotes names back so that the rendering tokenizes as a single atom again.

use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while_m_n};
use nom::character::complete::char;
use nom::combinator::{all_consuming, map, map_opt, map_res, value};
use nom::multi::fold_many0;
use nom::sequence::{delimited, preceded};
use nom::IResult;

const KEYWORDS: [&str; 8] = ["not", "and", "or", "until", "release", "next", "finally", "globally"];

enum Fragment<'a> {
    Text(&'a str),
    Escaped(char),
}

fn code_point(digits: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(digits, 16)
}

fn hex_byte(input: &str) -> IResult<&str, char> {
    let digits = take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit());
    map_opt(map_res(digits, code_point), char::from_u32)(input)
}

fn unicode(input: &str) -> IResult<&str, char> {
    let digits = take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit());
    map_opt(map_res(delimited(char('{'), digits, char('}')), code_point), char::from_u32)(input)
}

fn escape(input: &str) -> IResult<&str, char> {
    let mut parser = preceded(
        char('\\'),
        alt((
            value('\\', char('\\')),
            value('"', char('"')),
            value('\'', char('\'')),
            value('\n', char('n')),
            value('\r', char('r')),
            value('\t', char('t')),
            value('\0', char('0')),
            preceded(char('x'), hex_byte),
            preceded(char('u'), unicode),
        )),
    );

    parser(input)
}

fn fragment(input: &str) -> IResult<&str, Fragment<'_>> {
    alt((map(is_not("\\\""), Fragment::Text), map(escape, Fragment::Escaped)))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let contents = fold_many0(fragment, String::new, |mut name, fragment| {
        match fragment {
            Fragment::Text(text) => name.push_str(text),
            Fragment::Escaped(c) => name.push(c),
        }
        name
    });

    delimited(char('"'), contents, char('"'))(input)
}

/// Decode a double-quoted atom, returning `None` for malformed quoting or unknown escapes
pub fn unescape(lexeme: &str) -> Option<String> {
    all_consuming(quoted)(lexeme).ok().map(|(_, name)| name)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

/// Atom name as it should appear in a formula
pub fn render(name: &str) -> String {
    if is_identifier(name) && !KEYWORDS.contains(&name) {
        return name.to_string();
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');

    for c in name.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\0' => quoted.push_str("\\0"),
            c if c.is_control() => quoted.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}
