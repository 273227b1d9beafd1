use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use log::info;
use thiserror::Error;

use ltl_nnf::ltl::{self, ExprId, FormulaError, Interner};

/// Rewrite LTL formulas into negation normal form
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Formulas to rewrite, read from standard input when none are given
    formulas: Vec<String>,

    /// Also print the negation of each formula
    #[arg(short, long)]
    negate: bool,

    /// Print every distinct subformula, operands first
    #[arg(short, long)]
    closure: bool,

    /// Print the grammar reductions while parsing
    #[arg(short, long)]
    trace: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn parse<I, W>(interner: &mut Interner, chunks: I, trace: bool, out: &mut W) -> Result<ExprId, CliError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    W: Write,
{
    let mut reductions = Vec::new();
    let result = ltl::parse_chunks_with(interner, chunks, |reduction| {
        if trace {
            reductions.push(reduction.to_string());
        }
    });

    // Reductions leading up to a parse error are printed too
    for reduction in reductions {
        writeln!(out, "  {}", reduction)?;
    }

    Ok(result?)
}

fn report<W: Write>(interner: &mut Interner, formula: ExprId, args: &Args, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", interner.display(formula))?;

    if args.negate {
        let negation = interner.negate(formula);
        writeln!(out, "negation: {}", interner.display(negation))?;
    }

    if args.closure {
        for subformula in interner.closure(formula) {
            writeln!(out, "  {}", interner.display(subformula))?;
        }
    }

    Ok(())
}

fn run<R, W>(args: &Args, input: R, out: &mut W) -> Result<(), CliError>
where
    R: BufRead,
    W: Write,
{
    let mut interner = Interner::new();

    if args.formulas.is_empty() {
        let mut failure = None;
        let lines = input.lines().map_while(|line| match line {
            Ok(line) => Some(line + "\n"),
            Err(err) => {
                failure = Some(err);
                None
            }
        });
        let formula = parse(&mut interner, lines, args.trace, out);

        // A read error ends the chunks early, so it takes precedence over whatever was parsed
        if let Some(err) = failure {
            return Err(err.into());
        }

        report(&mut interner, formula?, args, out)?;
    } else {
        for source in &args.formulas {
            let formula = parse(&mut interner, [source], args.trace, out)?;
            report(&mut interner, formula, args, out)?;
        }
    }

    info!("interned {} expressions", interner.len());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    let stdin = io::stdin();
    let stdout = io::stdout();

    match run(&args, stdin.lock(), &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{run, Args, CliError};

    fn output(argv: &[&str], input: &[u8]) -> Result<String, CliError> {
        let args = Args::parse_from(argv.iter().copied());
        let mut out = Vec::new();

        run(&args, input, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn formulas_from_arguments() -> Result<(), CliError> {
        let out = output(&["ltl-nnf", "--negate", "not (a and next b)", "finally c"], b"")?;

        assert_eq!(
            out,
            "(not a or next not b)\nnegation: (a and next b)\n(true until c)\nnegation: (false release not c)\n"
        );
        Ok(())
    }

    #[test]
    fn formula_from_input_lines() -> Result<(), CliError> {
        let out = output(&["ltl-nnf", "--closure"], b"globally\n  \"x y\"\n")?;

        assert_eq!(out, "(false release \"x y\")\n  \"x y\"\n  false\n  (false release \"x y\")\n");
        Ok(())
    }

    #[test]
    fn reductions_are_traced() -> Result<(), CliError> {
        let out = output(&["ltl-nnf", "--trace", "a"], b"")?;
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "  <expr-primary> := 'PREDICATE' [\"a\"]");
        assert_eq!(lines[6], "a");
        Ok(())
    }

    #[test]
    fn read_errors_are_reported() {
        let result = output(&["ltl-nnf"], b"a\n\xff or b\n");

        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[test]
    fn parse_errors_are_reported() {
        let result = output(&["ltl-nnf", "a and"], b"");

        assert!(matches!(result, Err(CliError::Formula(_))));
    }
}
