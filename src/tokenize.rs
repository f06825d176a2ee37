/// A word produced by the tokenizer, with quotes and escapes already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Set when any part of the word was quoted or escaped. Such words are
    /// never treated as redirection operators.
    pub quoted: bool,
}

impl Word {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Tokenizes shell input into words.
/// Handles single quotes, double quotes and backslash escapes.
///
/// An unterminated quote is closed implicitly at end of input and a trailing
/// lone backslash is dropped.
pub fn tokenize(input: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            escaped = false;
            if in_double_quote && !matches!(c, '$' | '`' | '"' | '\\') {
                current.push('\\');
            }
            current.push(c);
            continue;
        }

        match c {
            '\\' if in_single_quote => current.push(c),
            '\\' => {
                escaped = true;
                quoted = true;
            }
            '\'' if in_double_quote => current.push(c),
            '\'' => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if in_single_quote => current.push(c),
            '"' => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    words.push(Word {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                }
                quoted = false;
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        words.push(Word {
            text: current,
            quoted,
        });
    }

    words
}
