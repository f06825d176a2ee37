use std::io::{self, IsTerminal, Read, Write};
use std::os::unix::io::AsRawFd;

use crate::completion::{Complete, longest_common_prefix};
use crate::terminal::RawMode;

const INTERRUPT: char = '\x03';
const END_OF_TRANSMISSION: char = '\x04';
const BACKSPACE: char = '\x08';
const DELETE: char = '\x7f';
const BELL: &str = "\x07";

/// How one edit cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Enter was pressed.
    Submitted(String),
    /// A double tab printed the candidate list. The buffer should seed the
    /// next cycle.
    Listed(String),
    /// Ctrl-C.
    Interrupted,
    /// Input closed, or Ctrl-D on an empty line.
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabState {
    Reading,
    AwaitingSecondTab,
}

/// Character-at-a-time line editor with tab completion.
pub struct LineEditor<C> {
    completer: C,
}

impl<C: Complete> LineEditor<C> {
    pub fn new(completer: C) -> Self {
        Self { completer }
    }

    /// Runs one edit cycle against the process terminal. Raw mode is held
    /// only for the duration of the cycle.
    pub fn read_line(&self, seed: String) -> io::Result<Outcome> {
        let stdin = io::stdin();
        let _raw = if stdin.is_terminal() {
            Some(RawMode::enable(stdin.as_raw_fd())?)
        } else {
            log::debug!("stdin is not a terminal, reading without raw mode");
            None
        };
        let mut input = stdin.lock();
        let mut output = io::stdout().lock();
        self.edit(&mut input, &mut output, seed)
    }

    /// Drives the editing state machine over arbitrary byte streams.
    /// The caller has already echoed `seed`.
    pub fn edit<R: Read, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
        seed: String,
    ) -> io::Result<Outcome> {
        let mut keys = Keys::new(input);
        let mut buffer = seed;
        let mut state = TabState::Reading;

        loop {
            let Some(c) = keys.next_char()? else {
                if buffer.is_empty() {
                    return Ok(Outcome::EndOfInput);
                }
                write_flush(output, "\r\n")?;
                return Ok(Outcome::Submitted(buffer));
            };

            if c == '\t' {
                match self.tab(&mut buffer, state, output)? {
                    Some(next) => state = next,
                    None => return Ok(Outcome::Listed(buffer)),
                }
                continue;
            }
            state = TabState::Reading;

            match c {
                INTERRUPT => {
                    write_flush(output, "\r\n")?;
                    return Ok(Outcome::Interrupted);
                }
                END_OF_TRANSMISSION if buffer.is_empty() => {
                    write_flush(output, "\r\n")?;
                    return Ok(Outcome::EndOfInput);
                }
                END_OF_TRANSMISSION => {}
                '\r' | '\n' => {
                    write_flush(output, "\r\n")?;
                    return Ok(Outcome::Submitted(buffer));
                }
                DELETE | BACKSPACE => {
                    if buffer.pop().is_some() {
                        write_flush(output, "\x08 \x08")?;
                    }
                }
                c => {
                    buffer.push(c);
                    let mut encoded = [0u8; 4];
                    write_flush(output, c.encode_utf8(&mut encoded))?;
                }
            }
        }
    }

    /// Handles a tab press. Returns the next state, or `None` when the
    /// candidate list was printed and the cycle ends.
    fn tab<W: Write>(
        &self,
        buffer: &mut String,
        state: TabState,
        output: &mut W,
    ) -> io::Result<Option<TabState>> {
        let candidates = self.completer.complete(buffer.as_str());
        match candidates.as_slice() {
            [] => {
                write_flush(output, BELL)?;
                Ok(Some(TabState::Reading))
            }
            [only] => {
                let suffix = format!("{} ", only.strip_prefix(buffer.as_str()).unwrap_or(""));
                buffer.push_str(&suffix);
                write_flush(output, &suffix)?;
                Ok(Some(TabState::Reading))
            }
            _ if state == TabState::AwaitingSecondTab => {
                write_flush(output, &format!("\r\n{}", candidates.join("  ")))?;
                Ok(None)
            }
            _ => {
                let extension = longest_common_prefix(&candidates)
                    .strip_prefix(buffer.as_str())
                    .unwrap_or("")
                    .to_string();
                if extension.is_empty() {
                    write_flush(output, BELL)?;
                    Ok(Some(TabState::AwaitingSecondTab))
                } else {
                    buffer.push_str(&extension);
                    write_flush(output, &extension)?;
                    Ok(Some(TabState::Reading))
                }
            }
        }
    }
}

fn write_flush<W: Write>(output: &mut W, text: &str) -> io::Result<()> {
    output.write_all(text.as_bytes())?;
    output.flush()
}

/// Byte reader with one byte of lookahead, so a malformed UTF-8 sequence
/// never swallows the key that follows it.
struct Keys<'a, R> {
    input: &'a mut R,
    pending: Option<u8>,
}

impl<'a, R: Read> Keys<'a, R> {
    fn new(input: &'a mut R) -> Self {
        Self {
            input,
            pending: None,
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads one UTF-8 encoded character. Malformed sequences decode to
    /// U+FFFD and the offending byte is kept for the next call. Returns
    /// `None` at end of input.
    fn next_char(&mut self) -> io::Result<Option<char>> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7f => return Ok(Some(first as char)),
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };

        let mut encoded = [first, 0, 0, 0];
        for slot in encoded.iter_mut().take(width).skip(1) {
            match self.next_byte()? {
                Some(b @ 0x80..=0xbf) => *slot = b,
                Some(b) => {
                    self.pending = Some(b);
                    return Ok(Some(char::REPLACEMENT_CHARACTER));
                }
                None => return Ok(Some(char::REPLACEMENT_CHARACTER)),
            }
        }
        Ok(Some(
            std::str::from_utf8(&encoded[..width])
                .ok()
                .and_then(|s| s.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Fixed(Vec<&'static str>);

    impl Complete for Fixed {
        fn complete(&self, prefix: &str) -> Vec<String> {
            let mut c: Vec<String> = self
                .0
                .iter()
                .filter(|s| s.starts_with(prefix))
                .map(|s| s.to_string())
                .collect();
            c.sort();
            c.dedup();
            c
        }
    }

    fn run(candidates: Vec<&'static str>, keys: &str, seed: &str) -> (Outcome, String) {
        run_bytes(candidates, keys.as_bytes(), seed)
    }

    fn run_bytes(candidates: Vec<&'static str>, keys: &[u8], seed: &str) -> (Outcome, String) {
        let editor = LineEditor::new(Fixed(candidates));
        let mut input = Cursor::new(keys.to_vec());
        let mut output = Vec::new();
        let outcome = editor.edit(&mut input, &mut output, seed.to_string()).unwrap();
        (outcome, String::from_utf8_lossy(&output).into_owned())
    }

    fn builtins() -> Vec<&'static str> {
        vec!["exit", "echo", "type", "pwd", "cd"]
    }

    #[test]
    fn test_typing_is_echoed() {
        let (outcome, echoed) = run(vec![], "ls -l\r", "");
        assert_eq!(outcome, Outcome::Submitted("ls -l".to_string()));
        assert_eq!(echoed, "ls -l\r\n");
    }

    #[test]
    fn test_newline_also_submits() {
        let (outcome, _) = run(vec![], "pwd\nrest", "");
        assert_eq!(outcome, Outcome::Submitted("pwd".to_string()));
    }

    #[test]
    fn test_backspace() {
        let (outcome, echoed) = run(vec![], "\x7fab\x7f\x08c\r", "");
        assert_eq!(outcome, Outcome::Submitted("c".to_string()));
        assert_eq!(echoed, "ab\x08 \x08\x08 \x08c\r\n");
    }

    #[test]
    fn test_single_candidate_completes_with_space() {
        let (outcome, echoed) = run(builtins(), "ec\t\r", "");
        assert_eq!(outcome, Outcome::Submitted("echo ".to_string()));
        assert_eq!(echoed, "echo \r\n");
    }

    #[test]
    fn test_no_candidates_rings_bell() {
        let (outcome, echoed) = run(builtins(), "zz\t\r", "");
        assert_eq!(outcome, Outcome::Submitted("zz".to_string()));
        assert_eq!(echoed, "zz\x07\r\n");
    }

    #[test]
    fn test_common_prefix_extends_without_bell() {
        let (outcome, echoed) = run(vec!["xyz_foo", "xyz_foo_bar"], "xy\t\r", "");
        assert_eq!(outcome, Outcome::Submitted("xyz_foo".to_string()));
        assert_eq!(echoed, "xyz_foo\r\n");
    }

    #[test]
    fn test_double_tab_lists_candidates() {
        let (outcome, echoed) = run(vec!["foo", "bar", "baz"], "\t\t", "");
        assert_eq!(outcome, Outcome::Listed(String::new()));
        assert_eq!(echoed, "\x07\r\nbar  baz  foo");
    }

    #[test]
    fn test_listing_keeps_buffer() {
        let (outcome, echoed) = run(vec!["bar", "baz"], "\t\t", "ba");
        assert_eq!(outcome, Outcome::Listed("ba".to_string()));
        assert_eq!(echoed, "\x07\r\nbar  baz");
    }

    #[test]
    fn test_other_key_resets_tab_state() {
        let (outcome, echoed) = run(vec!["bar", "baz"], "\tx\x7f\t\r", "ba");
        assert_eq!(outcome, Outcome::Submitted("ba".to_string()));
        assert_eq!(echoed, "\x07x\x08 \x08\x07\r\n");
    }

    #[test]
    fn test_interrupt() {
        let (outcome, _) = run(vec![], "abc\x03def\r", "");
        assert_eq!(outcome, Outcome::Interrupted);
    }

    #[test]
    fn test_end_of_input() {
        assert_eq!(run(vec![], "", "").0, Outcome::EndOfInput);
        assert_eq!(run(vec![], "\x04", "").0, Outcome::EndOfInput);
        assert_eq!(run(vec![], "ab\x04c\r", "").0, Outcome::Submitted("abc".to_string()));
        assert_eq!(run(vec![], "echo hi", "").0, Outcome::Submitted("echo hi".to_string()));
    }

    #[test]
    fn test_multibyte_input() {
        let (outcome, echoed) = run(vec![], "echo héllo\x7f\r", "");
        assert_eq!(outcome, Outcome::Submitted("echo héll".to_string()));
        assert_eq!(echoed, "echo héllo\x08 \x08\r\n");
    }

    #[test]
    fn test_truncated_sequence_keeps_next_key() {
        let (outcome, _) = run_bytes(vec![], b"ab\xc3\x03cd\r", "");
        assert_eq!(outcome, Outcome::Interrupted);

        let (outcome, echoed) = run_bytes(vec![], b"ls\xe2\rmore", "");
        assert_eq!(outcome, Outcome::Submitted("ls\u{fffd}".to_string()));
        assert_eq!(echoed, "ls\u{fffd}\r\n");

        let (outcome, _) = run_bytes(vec![], b"\xe2\x82x\r", "");
        assert_eq!(outcome, Outcome::Submitted("\u{fffd}x".to_string()));
    }

    #[test]
    fn test_stray_continuation_byte() {
        let (outcome, _) = run_bytes(vec![], b"a\x80b\r", "");
        assert_eq!(outcome, Outcome::Submitted("a\u{fffd}b".to_string()));
    }

    #[test]
    fn test_truncated_sequence_at_end_of_input() {
        let (outcome, _) = run_bytes(vec![], b"ab\xc3", "");
        assert_eq!(outcome, Outcome::Submitted("ab\u{fffd}".to_string()));
    }
}
