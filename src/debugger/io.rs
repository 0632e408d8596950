//! Where debugger commands come from and where its output goes

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// A blocking source of command lines
pub trait LineSource {
    /// Show `prompt` and read one line. `None` means the input is closed.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Interactive terminal input with line editing and history
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                            tracing::warn!(%err, "could not record history entry");
                        }
                    }
                    return Some(line);
                }
                // Ctrl-C at the prompt abandons the current line only
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return None,
                Err(err) => {
                    tracing::warn!(%err, "debugger input failed");
                    return None;
                }
            }
        }
    }
}

/// Pre-recorded command lines, consumed in order
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Read every line from `reader` up front (piped stdin)
    pub fn from_reader(reader: impl BufRead) -> io::Result<Self> {
        let lines = reader.lines().collect::<io::Result<VecDeque<String>>>()?;
        Ok(Self { lines })
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Shared in-memory output sink; clones write to the same buffer
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<u8>>>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Transcript {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_drains_in_order() {
        let mut input = ScriptedInput::new(["b 3", "c"]);
        assert_eq!(input.read_line("> ").as_deref(), Some("b 3"));
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_line("> ").as_deref(), Some("c"));
        assert_eq!(input.read_line("> "), None);
    }

    #[test]
    fn scripted_input_from_reader() {
        let input = ScriptedInput::from_reader("n\nn\nq\n".as_bytes()).unwrap();
        assert_eq!(input.remaining(), 3);
    }

    #[test]
    fn transcript_clones_share_buffer() {
        let transcript = Transcript::new();
        let mut writer = transcript.clone();
        write!(writer, "hello").unwrap();
        assert_eq!(transcript.contents(), "hello");
    }
}
