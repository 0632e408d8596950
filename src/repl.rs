//! Interactive read-eval-print loop

use miette::{IntoDiagnostic, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::debugger::Evaluator;
use crate::interp::{Interpreter, Value};

const HELP: &str = "\
Commands:
  :help, :h    Show this help
  :quit, :q    Exit the REPL
Anything else is run as Kestrel code; bindings persist between lines.";

/// What a line typed at the REPL asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Blank,
    Help,
    Quit,
    Code(&'a str),
}

impl<'a> Input<'a> {
    pub fn classify(line: &'a str) -> Self {
        match line.trim() {
            "" => Input::Blank,
            ":help" | ":h" => Input::Help,
            ":quit" | ":q" => Input::Quit,
            code => Input::Code(code),
        }
    }
}

/// REPL state: one interpreter whose global scope lives across lines
#[derive(Default)]
pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one entry against the persistent globals. Printed output has
    /// already reached stdout, so the recorded copy is dropped.
    pub fn eval(&mut self, code: &str) -> Result<Value> {
        let globals = self.interpreter.globals().clone();
        let result = self.interpreter.eval_in_scope(code, &globals);
        self.interpreter.clear_output();
        result
    }
}

/// Run the REPL on the terminal until `:quit` or end of input
pub fn run() -> Result<()> {
    println!("Kestrel REPL v{}", crate::VERSION);
    println!("Type :help for help, :quit to exit");
    println!();

    let mut editor = DefaultEditor::new().into_diagnostic()?;
    let mut session = Session::new();

    loop {
        let line = match editor.readline("k> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).into_diagnostic(),
        };

        match Input::classify(&line) {
            Input::Blank => continue,
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Code(code) => {
                if let Err(err) = editor.add_history_entry(code) {
                    tracing::warn!(%err, "could not record history entry");
                }
                match session.eval(code) {
                    Ok(Value::Nil) => {}
                    Ok(value) => println!("{}", value.inspect()),
                    Err(report) => eprintln!("{:?}", report),
                }
            }
        }
    }

    Ok(())
}
