//! Debugger tests
//!
//! Each test runs a program under the debugger with a scripted command
//! stream and inspects the transcript. Every time the debugger prompts it
//! echoes `<line>\t<source>`, so the sequence of echoed line numbers shows
//! exactly where execution paused.

use kestrel::debugger::{DebugConfig, Debugger, ScriptedInput, Transcript};
use kestrel::interp::{Completion, Interpreter, Value};
use pretty_assertions::assert_eq;

struct Run {
    interpreter: Interpreter,
    transcript: String,
    completion: Completion,
}

impl Run {
    /// Line numbers echoed by the command loop and by `list`, in order
    fn echoed_lines(&self) -> Vec<usize> {
        self.transcript
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .filter_map(|(number, _)| number.parse().ok())
            .collect()
    }

    fn debugger(&mut self) -> Debugger {
        self.interpreter.detach_debugger().expect("debugger attached")
    }
}

fn debug_run(source: &str, commands: &[&str]) -> Run {
    debug_run_with(source, commands, DebugConfig::plain())
}

fn debug_run_with(source: &str, commands: &[&str], config: DebugConfig) -> Run {
    let program = kestrel::parse_source(source).unwrap();
    let transcript = Transcript::new();
    let debugger = Debugger::new(
        source,
        config,
        Box::new(ScriptedInput::new(commands.iter().copied())),
        Box::new(transcript.clone()),
    );
    let mut interpreter = Interpreter::new();
    interpreter.attach_debugger(debugger);
    let completion = interpreter.run(&program).unwrap();
    Run {
        interpreter,
        transcript: transcript.contents(),
        completion,
    }
}

const STRAIGHT_LINE: &str = "\
let a = 1
let b = 2
let c = 3
println(a + b + c)
";

#[test]
fn test_banner_is_printed_once() {
    let run = debug_run(STRAIGHT_LINE, &["c"]);
    assert_eq!(run.transcript.matches("Kestrel debugger").count(), 1);
}

#[test]
fn test_stops_on_entry_and_continue_runs_to_end() {
    let run = debug_run(STRAIGHT_LINE, &["c"]);
    assert_eq!(run.echoed_lines(), vec![1]);
    assert_eq!(run.interpreter.get_output(), &["6"]);
    assert_eq!(run.completion, Completion::Value(Value::Nil));
}

#[test]
fn test_no_stop_on_entry_never_pauses_without_breakpoints() {
    let config = DebugConfig {
        stop_on_entry: false,
        ..DebugConfig::plain()
    };
    let run = debug_run_with(STRAIGHT_LINE, &[], config);
    assert!(run.echoed_lines().is_empty());
    assert_eq!(run.interpreter.get_output(), &["6"]);
}

#[test]
fn test_line_breakpoint_then_continue() {
    let source = "\
fn add(x, y) {
    return x + y
}
let a = 1
let b = 2
let c = 3
let d = 4
let e = 5
let unused = 0
let f = add(a, b)
let g = f * 2
println(g)
";
    let mut run = debug_run(source, &["b 10", "c", "p a + b", "c"]);

    // Entry pause at line 4 (twice: `b 10`, `c`), then line 10 (`p`, `c`).
    // The call on line 10 does not pause again.
    assert_eq!(run.echoed_lines(), vec![4, 4, 10, 10]);
    assert!(run.transcript.contains("Breakpoint set at line 10."));
    assert!(run.transcript.lines().any(|line| line == "3"));
    assert_eq!(run.interpreter.get_output(), &["6"]);

    let debugger = run.debugger();
    assert_eq!(debugger.breakpoints().lines(), vec![10]);
    assert!(!debugger.is_stepping());
}

#[test]
fn test_line_breakpoint_on_call_statement() {
    let source = "\
let a = 1
println(a)
let b = 2
";
    let run = debug_run(source, &["b 2", "c", "c"]);
    assert_eq!(run.echoed_lines(), vec![1, 1, 2]);
    assert_eq!(run.interpreter.get_output(), &["1"]);
}

#[test]
fn test_line_breakpoint_on_if_line() {
    let source = "\
let a = 1
if a == 1 {
    println(\"one\")
}
";
    let run = debug_run(source, &["b 2", "c", "c"]);
    assert_eq!(run.echoed_lines(), vec![1, 1, 2]);
    assert_eq!(run.interpreter.get_output(), &["one"]);
}

#[test]
fn test_line_breakpoint_on_while_line() {
    let source = "\
let i = 0
while i < 2 {
    i += 1
}
";
    let run = debug_run(source, &["b 2", "c", "c"]);
    assert_eq!(run.echoed_lines(), vec![1, 1, 2]);
    assert_eq!(run.interpreter.globals().get("i"), Some(Value::Int(2)));
}

#[test]
fn test_line_breakpoint_in_loop_body_hits_every_iteration() {
    let source = "\
let xs = [1, 2, 3]
let total = 0
for x in xs {
    total += x
}
println(total)
";
    let run = debug_run(
        source,
        &["b 4", "c", "p x", "c", "p x", "c", "p x", "c"],
    );
    assert_eq!(run.echoed_lines(), vec![1, 1, 4, 4, 4, 4, 4, 4]);
    let values: Vec<&str> = run
        .transcript
        .lines()
        .filter(|line| line.len() == 1)
        .collect();
    assert_eq!(values, vec!["1", "2", "3"]);
    assert_eq!(run.interpreter.get_output(), &["6"]);
}

#[test]
fn test_line_breakpoint_on_one_line_loop() {
    let source = "\
let xs = [1, 2, 3]
let total = 0
for x in xs { total += x }
";
    // Once at the loop itself, then once per body statement.
    let run = debug_run(source, &["b 3", "c", "c", "c", "c", "c"]);
    assert_eq!(run.echoed_lines(), vec![1, 1, 3, 3, 3, 3]);
    assert_eq!(run.interpreter.globals().get("total"), Some(Value::Int(6)));
}

#[test]
fn test_stepping_skips_unmarked_functions() {
    let source = "\
fn foo(n) {
    let doubled = n * 2
    return doubled
}
fn bar(n) {
    let tripled = n * 3
    return tripled
}
let x = bar(1)
let y = foo(2)
println(x + y)
";
    let run = debug_run(source, &["b foo", "n", "n", "n", "n", "n", "c"]);

    // Nothing inside bar (lines 5-8) is ever shown; foo is entered and stepped.
    assert_eq!(run.echoed_lines(), vec![9, 9, 9, 10, 10, 1, 2]);
    assert!(
        run.transcript
            .contains("Breakpoint set at function `foo` (lines 1-4).")
    );
    assert_eq!(run.interpreter.get_output(), &["7"]);
}

#[test]
fn test_function_breakpoint_pauses_at_entry_with_arguments_in_scope() {
    let source = "\
fn scale(n) {
    let result = n * 10
    return result
}
let v = scale(4)
";
    let run = debug_run(source, &["b scale", "c", "p n * 10", "p missing", "c"]);

    assert_eq!(run.echoed_lines(), vec![5, 5, 1, 1, 1]);
    let lines: Vec<&str> = run.transcript.lines().collect();
    assert!(lines.contains(&"40"));
    assert!(run.transcript.contains("error: Undefined variable `missing`"));
    assert_eq!(run.interpreter.globals().get("v"), Some(Value::Int(40)));
}

#[test]
fn test_line_breakpoint_inside_unmarked_function_is_gated() {
    let source = "\
fn helper() {
    let inner = 1
    return inner
}
let out = helper()
";
    let run = debug_run(source, &["b 2", "c"]);
    assert_eq!(run.echoed_lines(), vec![5, 5]);
}

#[test]
fn test_delete_function_breakpoint() {
    let source = "\
fn ping() {
    return 1
}
ping()
ping()
";
    let run = debug_run(source, &["b ping", "c", "d ping", "c"]);
    assert_eq!(run.echoed_lines(), vec![4, 4, 1, 1]);
    assert!(run.transcript.contains("Breakpoint at function `ping` deleted."));
}

#[test]
fn test_eval_does_not_reenter_debugger() {
    let source = "\
fn foo(n) {
    return n + 1
}
let r = foo(1)
";
    let run = debug_run(source, &["b foo", "p foo(10)", "c", "c"]);

    assert_eq!(run.echoed_lines(), vec![4, 4, 4, 1]);
    let lines: Vec<&str> = run.transcript.lines().collect();
    let result = lines.iter().position(|line| *line == "11").unwrap();
    let entry = lines.iter().position(|line| line.starts_with("1\t")).unwrap();
    assert!(result < entry);
}

#[test]
fn test_eval_can_update_paused_scope() {
    let run = debug_run(STRAIGHT_LINE, &["n", "n", "n", "p a = 100", "c"]);
    assert_eq!(run.interpreter.get_output(), &["105"]);
}

#[test]
fn test_blank_input_repeats_previous_command() {
    let run = debug_run(STRAIGHT_LINE, &["n", "", "", "c"]);
    assert_eq!(run.echoed_lines(), vec![1, 2, 3, 4]);
    assert_eq!(run.interpreter.get_output(), &["6"]);
}

#[test]
fn test_list_pages_through_source() {
    let source = "\
// list demo
// second comment
let a = 1
let b = 2
let c = 3
let d = 4
let e = 5
let f = 6
let g = 7
let h = 8
let i = 9
let j = 10
";
    let mut run = debug_run(source, &["l", "l", "c"]);
    assert_eq!(
        run.echoed_lines(),
        vec![3, 3, 4, 5, 6, 7, 8, 3, 9, 10, 11, 12, 3]
    );
    assert_eq!(run.debugger().list_cursor(), 0);
}

#[test]
fn test_invalid_commands_change_nothing() {
    let mut run = debug_run(
        STRAIGHT_LINE,
        &["b 0", "b -5", "b nowhere", "d nowhere", "bogus", "p", "info", "c"],
    );
    let transcript = run.transcript.clone();
    assert_eq!(
        transcript
            .matches("Line number must be greater than zero.")
            .count(),
        2
    );
    assert_eq!(transcript.matches("Function `nowhere` not found.").count(), 2);
    assert!(transcript.contains("Undefined command: 'bogus'.  Try 'help'."));
    assert!(transcript.contains("Expression expected."));
    assert!(transcript.contains("No breakpoints."));

    let debugger = run.debugger();
    assert!(debugger.breakpoints().is_empty());
    assert_eq!(debugger.functions().enabled().count(), 0);
    assert_eq!(run.interpreter.get_output(), &["6"]);
}

#[test]
fn test_quit_halts_without_running_defers() {
    let source = "\
fn work() {
    defer println(\"deferred\")
    let a = 1
}
work()
println(\"after\")
";
    let run = debug_run(source, &["b work", "c", "n", "n", "q"]);
    assert_eq!(run.completion, Completion::Quit);
    assert_eq!(run.echoed_lines(), vec![5, 5, 1, 2, 3]);
    assert!(run.interpreter.get_output().is_empty());
}

#[test]
fn test_end_of_input_detaches() {
    let mut run = debug_run(STRAIGHT_LINE, &["n"]);
    assert_eq!(run.echoed_lines(), vec![1, 2]);
    assert_eq!(run.interpreter.get_output(), &["6"]);
    assert!(run.debugger().is_detached());
}

#[test]
fn test_info_lists_line_and_function_breakpoints() {
    let source = "\
fn noop() {
    return nil
}
noop()
";
    let run = debug_run(source, &["b 4", "b noop", "info b", "q"]);
    assert!(run.transcript.contains("line 4\n"));
    assert!(run.transcript.contains("function noop (lines 1-3)\n"));
    assert_eq!(run.completion, Completion::Quit);
}
