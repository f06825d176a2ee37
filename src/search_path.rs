use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Snapshot of the executable search path.
///
/// Callers take a fresh snapshot for every lookup so that changes to `PATH`
/// are always observed.
#[derive(Debug, Clone, Default)]
pub struct SearchPath(Option<OsString>);

impl SearchPath {
    pub fn from_env() -> Self {
        SearchPath(env::var_os("PATH"))
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.0
            .as_deref()
            .map(|p| env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Finds the full path of a command. Names containing a `/` are used as
    /// given instead of being searched for.
    pub fn find(&self, command: &str) -> Option<PathBuf> {
        if command.contains('/') {
            let path = PathBuf::from(command);
            return is_executable(&path).then_some(path);
        }
        self.dirs()
            .into_iter()
            .map(|dir| dir.join(command))
            .find(|full| is_executable(full))
    }

    /// Names of executables in any search directory that start with `prefix`.
    /// Duplicates are not removed here.
    pub fn executables_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names = Vec::new();
        for dir in self.dirs() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                log::trace!("skipping unreadable path entry {}", dir.display());
                continue;
            };
            names.extend(
                entries
                    .flatten()
                    .filter(|e| is_executable(&e.path()))
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|name| name.starts_with(prefix)),
            );
        }
        names
    }
}

/// A regular file with at least one execute bit set.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| {
            m.is_file() && {
                #[cfg(unix)]
                {
                    m.permissions().mode() & 0o111 != 0
                }
                #[cfg(not(unix))]
                {
                    true
                }
            }
        })
        .unwrap_or(false)
}
