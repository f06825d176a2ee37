use std::io::{self, Write};

use anyhow::Context;

use crate::commands::{self, Action};
use crate::completion::ShellCompleter;
use crate::editor::{LineEditor, Outcome};
use crate::errors::ShellResult;
use crate::redirection::{OutputWriter, parse_command};
use crate::search_path::SearchPath;
use crate::tokenize::tokenize;

const DEFAULT_PROMPT: &str = "$ ";

#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    /// Names offered by tab completion besides path executables.
    pub builtins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: String::from(DEFAULT_PROMPT),
            builtins: commands::builtin_names(),
        }
    }
}

/// Whether the session continues after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

pub struct Shell {
    config: Config,
    editor: LineEditor<ShellCompleter>,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        let completer = ShellCompleter::new(config.builtins.clone());
        Self {
            config,
            editor: LineEditor::new(completer),
        }
    }

    /// Runs the read-eval loop and returns the session's exit status.
    pub fn run(&self) -> anyhow::Result<i32> {
        let mut stdout = io::stdout();
        loop {
            write!(stdout, "\r{}", self.config.prompt)?;
            stdout.flush()?;

            let mut seed = String::new();
            let line = loop {
                match self.editor.read_line(seed).context("reading from terminal")? {
                    Outcome::Submitted(line) => break line,
                    Outcome::Listed(buffer) => {
                        write!(stdout, "\r\n{}{}", self.config.prompt, buffer)?;
                        stdout.flush()?;
                        seed = buffer;
                    }
                    Outcome::Interrupted | Outcome::EndOfInput => return Ok(0),
                }
            };

            match execute_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => return Ok(code),
                Err(e) => eprintln!("{}", e),
            }
        }
    }
}

/// Tokenizes, redirects and runs one submitted line.
pub fn execute_line(line: &str) -> ShellResult<Flow> {
    execute_line_with(line, &SearchPath::from_env())
}

pub fn execute_line_with(line: &str, path: &SearchPath) -> ShellResult<Flow> {
    let parsed = parse_command(tokenize(line))?;
    log::trace!("parsed {:?}", parsed);
    if parsed.is_blank() {
        return Ok(Flow::Exit(0));
    }

    let mut writer = OutputWriter::open(parsed.redirection.as_ref())?;
    match commands::dispatch(&parsed.args, path) {
        Action::Output(out) => {
            writer.write_output(&out.stdout, &out.stderr)?;
            Ok(Flow::Continue)
        }
        Action::Exit(code) => Ok(Flow::Exit(code)),
        Action::EndSession => Ok(Flow::Exit(0)),
    }
}
