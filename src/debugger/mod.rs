//! Interactive source-level debugger
//!
//! The interpreter calls [`Debugger::visit`] before every statement,
//! expression and function body it is about to run. The debugger decides
//! whether to pause there; if it does, it blocks in a command loop until the
//! user continues, steps or quits.
//!
//! ```text
//! Interpreter ── visit(node, scope) ──▶ pause wanted? ──▶ oracle::can_stop ──▶ command loop
//!      ▲                                                                         │
//!      └──────────────────────── Resume (continue / step / quit) ◀───────────────┘
//! ```
//!
//! Pausing is governed by three pieces of state:
//!
//! - [`BreakpointStore`]: line breakpoints
//! - [`FunctionTable`]: which top-level functions the user has marked
//! - `stepping`: pause at the very next stoppable node
//!
//! Code inside a function that is not marked is never paused in, so stepping
//! passes straight over calls into it.

pub mod breakpoints;
pub mod command;
pub mod config;
pub mod functions;
pub mod io;
pub mod oracle;
mod session;
pub mod source;

use std::io::Write;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{FnDecl, Node};
use crate::interp::{Environment, Value};

pub use breakpoints::BreakpointStore;
pub use command::{BreakpointTarget, Command, CommandError};
pub use config::DebugConfig;
pub use functions::{FunctionDescriptor, FunctionTable};
pub use io::{EditorInput, LineSource, ScriptedInput, Transcript};
pub use source::SourceBuffer;

/// Evaluates user-typed code while the program is paused
pub trait Evaluator {
    /// Parse `source` and run it in `scope`, returning the last value
    fn eval_in_scope(&mut self, source: &str, scope: &Environment) -> miette::Result<Value>;
}

/// How the interpreter should carry on after a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Run until a breakpoint
    Continue,
    /// Pause again at the next stoppable node
    Step,
    /// Terminate the program
    Quit,
}

pub struct Debugger {
    config: DebugConfig,
    source: SourceBuffer,
    breakpoints: BreakpointStore,
    functions: FunctionTable,
    input: Box<dyn LineSource>,
    out: Box<dyn Write>,
    stepping: bool,
    previous_command: Option<String>,
    /// Cleared while a nested evaluation runs
    prompt_visible: bool,
    /// Next line `list` starts from; 0 means "the current line"
    list_cursor: usize,
    /// Line of the last pause; cleared at the next statement or function entry
    paused_line: Option<usize>,
    /// Set once the command stream is exhausted
    detached: bool,
}

impl Debugger {
    pub fn new(
        source: &str,
        config: DebugConfig,
        input: Box<dyn LineSource>,
        out: Box<dyn Write>,
    ) -> Self {
        let stepping = config.stop_on_entry;
        Self {
            config,
            source: SourceBuffer::new(source),
            breakpoints: BreakpointStore::new(),
            functions: FunctionTable::default(),
            input,
            out,
            stepping,
            previous_command: None,
            prompt_visible: true,
            list_cursor: 0,
            paused_line: None,
            detached: false,
        }
    }

    /// Register the program's functions and greet the user.
    ///
    /// Called once by the interpreter after hoisting, before the first node runs.
    pub fn begin_session(&mut self, functions: &IndexMap<String, Rc<FnDecl>>) {
        self.functions = FunctionTable::from_functions(functions);
        tracing::debug!(functions = self.functions.len(), "debug session started");
        let banner = Self::banner();
        self.say(banner);
    }

    pub fn banner() -> String {
        format!(
            "Kestrel debugger {}\nType 'help' for a list of commands.",
            crate::VERSION
        )
    }

    /// Called before `node` is evaluated in `scope`. Blocks in the command
    /// loop when execution should pause here.
    pub fn visit(
        &mut self,
        node: Node<'_>,
        scope: &Environment,
        evaluator: &mut dyn Evaluator,
    ) -> Resume {
        let line = node.line();
        if matches!(node, Node::Stmt(_) | Node::FnEntry(_)) {
            self.paused_line = None;
        }

        if self.detached || !self.prompt_visible {
            return Resume::Continue;
        }

        // A breakpoint pauses once per statement: expressions nested in the
        // statement that just paused on its line do not pause again.
        let fresh = self.paused_line != Some(line);
        let wanted = self.stepping
            || (fresh
                && (self.breakpoints.has_line(line)
                    || self.functions.entry_line_matches_enabled_function(line)));
        if !wanted || !oracle::can_stop(&node, &self.functions) {
            return Resume::Continue;
        }

        tracing::debug!(line, kind = ?node.kind(), stepping = self.stepping, "paused");
        self.paused_line = Some(line);
        self.list_cursor = 0;
        let resume = self.command_loop(line, scope, evaluator);
        tracing::debug!(?resume, "resumed");
        resume
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    pub fn breakpoints(&self) -> &BreakpointStore {
        &self.breakpoints
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn list_cursor(&self) -> usize {
        self.list_cursor
    }

    /// Write one line of output; write failures are logged and dropped
    fn say(&mut self, text: impl std::fmt::Display) {
        if let Err(err) = writeln!(self.out, "{text}") {
            tracing::warn!(%err, "failed to write debugger output");
        }
    }
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("config", &self.config)
            .field("breakpoints", &self.breakpoints)
            .field("functions", &self.functions)
            .field("stepping", &self.stepping)
            .field("list_cursor", &self.list_cursor)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}
