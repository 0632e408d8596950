//! Debugger command parsing

use thiserror::Error;

/// Errors reported back to the user at the debugger prompt.
///
/// None of these change debugger state or end the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Line number or function name expected.")]
    MissingTarget,

    #[error("Line number must be greater than zero.")]
    NonPositiveLine(i64),

    #[error("Function `{0}` not found.")]
    FunctionNotFound(String),

    #[error("Expression expected.")]
    MissingExpression,

    #[error("Undefined command: '{0}'.  Try 'help'.")]
    Undefined(String),
}

/// What a breakpoint command refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointTarget {
    Line(usize),
    Function(String),
}

impl BreakpointTarget {
    /// Integers are line numbers and must be positive; anything else names a function
    pub fn parse(arg: &str) -> Result<BreakpointTarget, CommandError> {
        match arg.parse::<i64>() {
            Ok(line) if line > 0 => usize::try_from(line)
                .map(BreakpointTarget::Line)
                .map_err(|_| CommandError::NonPositiveLine(line)),
            Ok(line) => Err(CommandError::NonPositiveLine(line)),
            Err(_) => Ok(BreakpointTarget::Function(arg.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `continue`, `c`
    Continue,
    /// `next`, `n`
    Next,
    /// `b`, `bp`
    Break(BreakpointTarget),
    /// `d`, `del`
    Delete(BreakpointTarget),
    /// `p`, `print`, `e`, `eval`
    Eval(String),
    /// `list`, `l`
    List,
    /// `info b`, `info breakpoints`
    Info,
    /// `help`, `h`, `?`
    Help,
    /// `exit`, `quit`, `bye`, `q`
    Quit,
}

impl Command {
    /// Parse one line of user input. The first whitespace-separated token
    /// selects the command.
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let mut tokens = input.split_whitespace();
        let Some(head) = tokens.next() else {
            return Err(CommandError::Undefined(input.to_string()));
        };
        let rest: Vec<&str> = tokens.collect();

        let command = match head {
            "c" | "continue" => Command::Continue,
            "n" | "next" => Command::Next,
            "b" | "bp" => Command::Break(Self::target(&rest)?),
            "d" | "del" => Command::Delete(Self::target(&rest)?),
            "p" | "print" | "e" | "eval" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingExpression);
                }
                Command::Eval(rest.join(" "))
            }
            "l" | "list" => Command::List,
            "info" if matches!(rest.as_slice(), [] | ["b"] | ["breakpoints"]) => Command::Info,
            "h" | "help" | "?" => Command::Help,
            "exit" | "quit" | "bye" | "q" => Command::Quit,
            _ => return Err(CommandError::Undefined(input.to_string())),
        };
        Ok(command)
    }

    fn target(args: &[&str]) -> Result<BreakpointTarget, CommandError> {
        match args.first() {
            Some(arg) => BreakpointTarget::parse(arg),
            None => Err(CommandError::MissingTarget),
        }
    }
}

pub const HELP: &str = "\
Commands:
  c, continue          resume execution until the next breakpoint
  n, next              step to the next stoppable statement
  b, bp <line|name>    set a line breakpoint or enable a function breakpoint
  d, del <line|name>   remove a line breakpoint or disable a function breakpoint
  p, print <expr>      evaluate an expression in the current scope
  e, eval <expr>       same as print
  l, list              list source lines around the current position
  info b               show breakpoints
  h, help              show this help
  q, quit, exit, bye   terminate the program";
