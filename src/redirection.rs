use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::{ShellError, ShellResult};
use crate::tokenize::Word;

/// Which of the command's output streams is redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Truncate,
    Append,
}

/// Represents a redirection operator and its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub stream: Stream,
    pub mode: Mode,
    pub file: PathBuf,
}

/// A parsed command with arguments and at most one redirection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub redirection: Option<Redirection>,
}

impl ParsedCommand {
    /// A blank line is the single empty-string argument.
    pub fn is_blank(&self) -> bool {
        self.redirection.is_none() && self.args.len() == 1 && self.args[0].is_empty()
    }
}

fn operator(word: &Word) -> Option<(Stream, Mode)> {
    if word.quoted {
        return None;
    }
    match word.as_str() {
        ">" | "1>" => Some((Stream::Stdout, Mode::Truncate)),
        ">>" | "1>>" => Some((Stream::Stdout, Mode::Append)),
        "2>" => Some((Stream::Stderr, Mode::Truncate)),
        "2>>" => Some((Stream::Stderr, Mode::Append)),
        _ => None,
    }
}

/// Parses words into a ParsedCommand, extracting the first redirection
/// operator and its target. Later operators are kept as plain arguments.
pub fn parse_command(words: Vec<Word>) -> ShellResult<ParsedCommand> {
    if words.is_empty() {
        return Ok(ParsedCommand {
            args: vec![String::new()],
            redirection: None,
        });
    }

    let mut args = Vec::with_capacity(words.len());
    let mut redirection = None;
    let mut words = words.into_iter();

    while let Some(word) = words.next() {
        match operator(&word) {
            Some((stream, mode)) if redirection.is_none() => {
                let target = words
                    .next()
                    .ok_or_else(|| ShellError::MissingRedirectTarget(word.text.clone()))?;
                redirection = Some(Redirection {
                    stream,
                    mode,
                    file: PathBuf::from(target.text),
                });
            }
            _ => args.push(word.text),
        }
    }

    Ok(ParsedCommand { args, redirection })
}

/// Opens a redirection target, creating it when absent.
pub fn open_file(file: &Path, mode: Mode) -> io::Result<File> {
    match mode {
        Mode::Truncate => File::create(file),
        Mode::Append => OpenOptions::new().create(true).append(true).open(file),
    }
}

/// Destination for one output stream of a command.
#[derive(Debug)]
pub enum Sink {
    Stdout,
    Stderr,
    File(File),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::File(f) => f.flush(),
        }
    }
}

/// Routes a command's captured output to its resolved destinations.
/// The redirected file, if any, is closed when the writer is dropped.
#[derive(Debug)]
pub struct OutputWriter {
    stdout: Sink,
    stderr: Sink,
}

impl OutputWriter {
    pub fn open(redirection: Option<&Redirection>) -> ShellResult<Self> {
        let mut writer = OutputWriter {
            stdout: Sink::Stdout,
            stderr: Sink::Stderr,
        };
        if let Some(r) = redirection {
            let file = open_file(&r.file, r.mode).map_err(|source| ShellError::Redirect {
                path: r.file.clone(),
                source,
            })?;
            log::debug!("redirecting {:?} to {} ({:?})", r.stream, r.file.display(), r.mode);
            match r.stream {
                Stream::Stdout => writer.stdout = Sink::File(file),
                Stream::Stderr => writer.stderr = Sink::File(file),
            }
        }
        Ok(writer)
    }

    /// Writes each stream once, stderr first.
    pub fn write_output(&mut self, out: &[u8], err: &[u8]) -> io::Result<()> {
        if !err.is_empty() {
            self.stderr.write_all(err)?;
        }
        self.stderr.flush()?;
        if !out.is_empty() {
            self.stdout.write_all(out)?;
        }
        self.stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::tokenize;

    fn parse(line: &str) -> ShellResult<ParsedCommand> {
        parse_command(tokenize(line))
    }

    #[test]
    fn test_parse_stdout_redirect() {
        let parsed = parse("cmd > out.txt").unwrap();
        assert_eq!(parsed.args, vec!["cmd"]);
        assert_eq!(
            parsed.redirection,
            Some(Redirection {
                stream: Stream::Stdout,
                mode: Mode::Truncate,
                file: PathBuf::from("out.txt"),
            })
        );
    }

    #[test]
    fn test_parse_stderr_append() {
        let parsed = parse("cmd 2>> err.log").unwrap();
        assert_eq!(parsed.args, vec!["cmd"]);
        let r = parsed.redirection.unwrap();
        assert_eq!((r.stream, r.mode), (Stream::Stderr, Mode::Append));
        assert_eq!(r.file, PathBuf::from("err.log"));
    }

    #[test]
    fn test_operator_table() {
        for (op, stream, mode) in [
            ("1>", Stream::Stdout, Mode::Truncate),
            ("2>", Stream::Stderr, Mode::Truncate),
            ("1>>", Stream::Stdout, Mode::Append),
            (">>", Stream::Stdout, Mode::Append),
        ] {
            let r = parse(&format!("ls {op} f")).unwrap().redirection.unwrap();
            assert_eq!((r.stream, r.mode), (stream, mode), "operator {op}");
        }
    }

    #[test]
    fn test_only_first_operator_honored() {
        let parsed = parse("echo a > first b 2> second").unwrap();
        assert_eq!(parsed.args, vec!["echo", "a", "b", "2>", "second"]);
        assert_eq!(parsed.redirection.unwrap().file, PathBuf::from("first"));
    }

    #[test]
    fn test_quoted_operator_is_an_argument() {
        let parsed = parse("echo '>' file").unwrap();
        assert_eq!(parsed.args, vec!["echo", ">", "file"]);
        assert!(parsed.redirection.is_none());
    }

    #[test]
    fn test_missing_target() {
        assert!(matches!(
            parse("echo hi >"),
            Err(ShellError::MissingRedirectTarget(op)) if op == ">"
        ));
    }

    #[test]
    fn test_blank_line_sentinel() {
        for line in ["", "   "] {
            let parsed = parse(line).unwrap();
            assert_eq!(parsed.args, vec![String::new()]);
            assert!(parsed.is_blank());
        }
        assert!(!parse("> f").unwrap().is_blank());
    }

    #[test]
    fn test_append_twice_concatenates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let r = Redirection {
            stream: Stream::Stdout,
            mode: Mode::Append,
            file: path.clone(),
        };
        for text in ["one\n", "two\n"] {
            let mut w = OutputWriter::open(Some(&r)).unwrap();
            w.write_output(text.as_bytes(), b"").unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_truncate_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old contents\n").unwrap();
        let r = Redirection {
            stream: Stream::Stdout,
            mode: Mode::Truncate,
            file: path.clone(),
        };
        let mut w = OutputWriter::open(Some(&r)).unwrap();
        w.write_output(b"new\n", b"").unwrap();
        drop(w);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_stderr_redirect_creates_file_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("err.txt");
        let r = Redirection {
            stream: Stream::Stderr,
            mode: Mode::Truncate,
            file: path.clone(),
        };
        let mut w = OutputWriter::open(Some(&r)).unwrap();
        w.write_output(b"", b"").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_open_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let r = Redirection {
            stream: Stream::Stdout,
            mode: Mode::Truncate,
            file: dir.path().join("missing").join("out.txt"),
        };
        assert!(matches!(
            OutputWriter::open(Some(&r)),
            Err(ShellError::Redirect { .. })
        ));
    }
}
