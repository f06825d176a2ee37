use crate::search_path::SearchPath;

/// Source of completion candidates for a partial command name.
pub trait Complete {
    /// Returns sorted, deduplicated candidates starting with `prefix`.
    fn complete(&self, prefix: &str) -> Vec<String>;
}

/// Shell completer for tab completion.
///
/// Candidates are builtin names plus executables on the search path.
pub struct ShellCompleter {
    builtins: Vec<String>,
    search_path: Option<SearchPath>,
}

impl ShellCompleter {
    /// Completer that re-reads `PATH` on every call.
    pub fn new(builtins: Vec<String>) -> Self {
        Self {
            builtins,
            search_path: None,
        }
    }

    #[cfg(test)]
    pub fn with_search_path(builtins: Vec<String>, search_path: SearchPath) -> Self {
        Self {
            builtins,
            search_path: Some(search_path),
        }
    }
}

impl Complete for ShellCompleter {
    fn complete(&self, prefix: &str) -> Vec<String> {
        let mut candidates: Vec<String> = self
            .builtins
            .iter()
            .filter(|b| b.starts_with(prefix))
            .cloned()
            .collect();

        let path = match &self.search_path {
            Some(p) => p.clone(),
            None => SearchPath::from_env(),
        };
        candidates.extend(path.executables_with_prefix(prefix));

        candidates.sort();
        candidates.dedup();
        log::trace!("{} completion candidates for {prefix:?}", candidates.len());
        candidates
    }
}

/// Longest prefix shared by every candidate, narrowed pairwise.
pub fn longest_common_prefix(candidates: &[String]) -> &str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };
    let mut common: &str = first;
    for candidate in rest {
        let end = common
            .char_indices()
            .zip(candidate.chars())
            .find(|((_, a), b)| a != b)
            .map_or_else(|| common.len().min(candidate.len()), |((i, _), _)| i);
        common = &common[..end];
        if common.is_empty() {
            break;
        }
    }
    common
}
