//! The command loop run while execution is paused

use colored::Colorize;

use crate::interp::Environment;

use super::command::{BreakpointTarget, Command, CommandError, HELP};
use super::{Debugger, Evaluator, Resume};

impl Debugger {
    /// Read and run commands until one of them resumes execution.
    pub(super) fn command_loop(
        &mut self,
        line: usize,
        scope: &Environment,
        evaluator: &mut dyn Evaluator,
    ) -> Resume {
        loop {
            self.show_line(line);

            let Some(input) = self.input.read_line(&self.config.prompt) else {
                tracing::debug!("command input closed, detaching");
                self.detached = true;
                self.stepping = false;
                return Resume::Continue;
            };

            let input = match input.trim() {
                "" => match &self.previous_command {
                    Some(previous) => previous.clone(),
                    None => continue,
                },
                text => text.to_string(),
            };
            self.previous_command = Some(input.clone());

            match Command::parse(&input) {
                Ok(command) => {
                    if let Some(resume) = self.execute(command, line, scope, evaluator) {
                        return resume;
                    }
                }
                Err(err) => self.report(&err),
            }
        }
    }

    /// Run one command; `Some` ends the pause
    fn execute(
        &mut self,
        command: Command,
        line: usize,
        scope: &Environment,
        evaluator: &mut dyn Evaluator,
    ) -> Option<Resume> {
        match command {
            Command::Continue => {
                self.stepping = false;
                return Some(Resume::Continue);
            }
            Command::Next => {
                self.stepping = true;
                return Some(Resume::Step);
            }
            Command::Quit => {
                tracing::info!(line, "quit requested");
                return Some(Resume::Quit);
            }
            Command::Break(target) => self.add_breakpoint(target),
            Command::Delete(target) => self.delete_breakpoint(target),
            Command::Eval(expr) => self.evaluate(&expr, scope, evaluator),
            Command::List => self.list(line),
            Command::Info => self.info(),
            Command::Help => self.say(HELP),
        }
        None
    }

    fn add_breakpoint(&mut self, target: BreakpointTarget) {
        match target {
            BreakpointTarget::Line(n) => {
                self.breakpoints.add_line(n);
                tracing::debug!(line = n, "line breakpoint added");
                self.say(format!("Breakpoint set at line {n}."));
            }
            BreakpointTarget::Function(name) => match self.functions.enable(&name) {
                Ok(descriptor) => {
                    let message = format!(
                        "Breakpoint set at function `{}` (lines {}-{}).",
                        descriptor.name, descriptor.begin_line, descriptor.end_line
                    );
                    tracing::debug!(function = %name, "function breakpoint enabled");
                    self.say(message);
                }
                Err(err) => self.report(&err),
            },
        }
    }

    fn delete_breakpoint(&mut self, target: BreakpointTarget) {
        match target {
            BreakpointTarget::Line(n) => {
                self.breakpoints.remove_line(n);
                tracing::debug!(line = n, "line breakpoint removed");
                self.say(format!("Breakpoint at line {n} deleted."));
            }
            BreakpointTarget::Function(name) => match self.functions.disable(&name) {
                Ok(_) => {
                    tracing::debug!(function = %name, "function breakpoint disabled");
                    self.say(format!("Breakpoint at function `{name}` deleted."));
                }
                Err(err) => self.report(&err),
            },
        }
    }

    /// Run `expr` in the paused scope and print its value.
    ///
    /// Failures are printed and the session carries on.
    fn evaluate(&mut self, expr: &str, scope: &Environment, evaluator: &mut dyn Evaluator) {
        tracing::debug!(%expr, "evaluating in paused scope");
        let saved_line = self.paused_line;
        self.prompt_visible = false;
        let result = evaluator.eval_in_scope(expr, scope);
        self.prompt_visible = true;
        self.paused_line = saved_line;

        match result {
            Ok(value) => self.say(value.inspect()),
            Err(report) => {
                let message = self.paint_error(&format!("error: {report}"));
                self.say(message);
            }
        }
    }

    /// Page through the source starting at the current line. Each call
    /// shows `list_window + 1` lines and wraps once past the end.
    fn list(&mut self, line: usize) {
        if self.list_cursor == 0 {
            self.list_cursor = line;
        }

        let len = self.source.len();
        if self.list_cursor <= len {
            let last = (self.list_cursor + self.config.list_window).min(len);
            let listing: Vec<String> = (self.list_cursor..=last)
                .map(|n| self.format_line(n))
                .collect();
            for text in listing {
                self.say(text);
            }
        }

        self.list_cursor += self.config.list_window + 1;
        if self.list_cursor > len {
            self.list_cursor = 0;
        }
    }

    fn info(&mut self) {
        let lines = self.breakpoints.lines();
        let functions: Vec<String> = self
            .functions
            .enabled()
            .map(|d| format!("{} (lines {}-{})", d.name, d.begin_line, d.end_line))
            .collect();

        if lines.is_empty() && functions.is_empty() {
            self.say("No breakpoints.");
            return;
        }
        for n in lines {
            self.say(format!("line {n}"));
        }
        for function in functions {
            self.say(format!("function {function}"));
        }
    }

    fn show_line(&mut self, line: usize) {
        let text = self.format_line(line);
        self.say(text);
    }

    fn format_line(&self, line: usize) -> String {
        let text = self.source.line(line).unwrap_or_default();
        if self.config.color {
            format!("{}\t{}", line.to_string().bold().cyan(), text)
        } else {
            format!("{line}\t{text}")
        }
    }

    fn report(&mut self, err: &CommandError) {
        let message = self.paint_error(&err.to_string());
        self.say(message);
    }

    fn paint_error(&self, message: &str) -> String {
        if self.config.color {
            message.red().to_string()
        } else {
            message.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::{DebugConfig, ScriptedInput, Transcript};
    use crate::interp::Value;

    /// Evaluator that can only answer `1`
    struct OneEvaluator;

    impl Evaluator for OneEvaluator {
        fn eval_in_scope(&mut self, source: &str, _scope: &Environment) -> miette::Result<Value> {
            match source {
                "1" => Ok(Value::Int(1)),
                other => Err(miette::miette!("cannot evaluate `{other}`")),
            }
        }
    }

    fn debugger(source: &str, commands: &[&str]) -> (Debugger, Transcript) {
        let transcript = Transcript::new();
        let debugger = Debugger::new(
            source,
            DebugConfig::plain(),
            Box::new(ScriptedInput::new(commands.iter().copied())),
            Box::new(transcript.clone()),
        );
        (debugger, transcript)
    }

    fn pause(debugger: &mut Debugger, line: usize) -> Resume {
        debugger.command_loop(line, &Environment::new(), &mut OneEvaluator)
    }

    #[test]
    fn list_pages_and_wraps() {
        let source: String = (1..=12).map(|n| format!("line {n}\n")).collect();
        let (mut debugger, transcript) = debugger(&source, &[]);

        debugger.list(3);
        assert_eq!(debugger.list_cursor, 9);
        debugger.list(3);
        assert_eq!(debugger.list_cursor, 0);

        let expected: Vec<String> = (3..=12).map(|n| format!("{n}\tline {n}")).collect();
        let contents = transcript.contents();
        let listed: Vec<&str> = contents.lines().collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn list_restarts_at_current_line_after_wrap() {
        let source: String = (1..=4).map(|n| format!("line {n}\n")).collect();
        let (mut debugger, transcript) = debugger(&source, &[]);

        debugger.list(2);
        assert_eq!(debugger.list_cursor, 0);
        debugger.list(2);
        assert_eq!(transcript.contents().matches("2\tline 2").count(), 2);
    }

    #[test]
    fn blank_input_repeats_previous_command() {
        let (mut debugger, transcript) = debugger("let a = 1\n", &["b 4", "", "c"]);
        assert_eq!(pause(&mut debugger, 1), Resume::Continue);
        assert!(debugger.breakpoints.has_line(4));
        assert_eq!(
            transcript.contents().matches("Breakpoint set at line 4.").count(),
            2
        );
    }

    #[test]
    fn next_sets_stepping_and_continue_clears_it() {
        let (mut debugger, _) = debugger("let a = 1\n", &["n", "c"]);
        assert_eq!(pause(&mut debugger, 1), Resume::Step);
        assert!(debugger.stepping);
        assert_eq!(pause(&mut debugger, 1), Resume::Continue);
        assert!(!debugger.stepping);
    }

    #[test]
    fn evaluation_errors_stay_local() {
        let (mut debugger, transcript) = debugger("let a = 1\n", &["p oops", "p 1", "q"]);
        assert_eq!(pause(&mut debugger, 1), Resume::Quit);
        let contents = transcript.contents();
        assert!(contents.contains("error: cannot evaluate `oops`"));
        assert!(contents.lines().any(|l| l == "1"));
        assert!(debugger.prompt_visible);
    }

    #[test]
    fn bad_commands_are_reported() {
        let (mut debugger, transcript) =
            debugger("let a = 1\n", &["b 0", "b -3", "d nope", "frobnicate", "c"]);
        pause(&mut debugger, 1);
        let contents = transcript.contents();
        assert_eq!(
            contents
                .matches("Line number must be greater than zero.")
                .count(),
            2
        );
        assert!(contents.contains("Function `nope` not found."));
        assert!(contents.contains("Undefined command: 'frobnicate'.  Try 'help'."));
        assert!(debugger.breakpoints.is_empty());
    }

    #[test]
    fn end_of_input_detaches() {
        let (mut debugger, _) = debugger("let a = 1\n", &[]);
        assert_eq!(pause(&mut debugger, 1), Resume::Continue);
        assert!(debugger.detached);
        assert!(!debugger.stepping);
    }

    #[test]
    fn info_lists_breakpoints_in_order() {
        let (mut debugger, transcript) = debugger("let a = 1\n", &["b 9", "b 2", "info b", "c"]);
        pause(&mut debugger, 1);
        let contents = transcript.contents();
        let two = contents.find("line 2\n").unwrap();
        let nine = contents.find("line 9\n").unwrap();
        assert!(two < nine);
    }
}
