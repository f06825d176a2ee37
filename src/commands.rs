use std::env;
use std::os::unix::process::CommandExt;
use std::process::Command;

use bytes::Bytes;

use crate::errors::ShellError;
use crate::search_path::SearchPath;

/// Commands implemented by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
}

impl Builtin {
    pub const ALL: [Builtin; 5] = [
        Builtin::Exit,
        Builtin::Echo,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Echo => "echo",
            Builtin::Type => "type",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Names of all builtins, for completion.
pub fn builtin_names() -> Vec<String> {
    Builtin::ALL.iter().map(|b| b.name().to_string()).collect()
}

/// Captured output of one command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Bytes,
    pub stderr: Bytes,
}

impl CommandOutput {
    fn error(err: &ShellError) -> Self {
        Self {
            stdout: Bytes::new(),
            stderr: Bytes::from(format!("{err}\n")),
        }
    }
}

impl From<Result<String, String>> for CommandOutput {
    fn from(result: Result<String, String>) -> Self {
        match result {
            Ok(out) => Self {
                stdout: Bytes::from(out),
                stderr: Bytes::new(),
            },
            Err(err) => Self {
                stdout: Bytes::new(),
                stderr: Bytes::from(err),
            },
        }
    }
}

/// What the shell should do after a command ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Output(CommandOutput),
    Exit(i32),
    EndSession,
}

/// Runs a command line's arguments. The first argument picks a builtin or
/// an executable found on `path`.
pub fn dispatch(args: &[String], path: &SearchPath) -> Action {
    let Some(name) = args.first() else {
        return Action::Output(CommandOutput::default());
    };
    if name.is_empty() && args.len() == 1 {
        return Action::EndSession;
    }
    match Builtin::parse(name) {
        Some(builtin) => execute_builtin(builtin, args, path),
        None => Action::Output(run_external(name, &args[1..], path)),
    }
}

/// Executes a builtin command in-process.
pub fn execute_builtin(builtin: Builtin, args: &[String], path: &SearchPath) -> Action {
    let result = match builtin {
        Builtin::Exit => {
            return match args.get(1) {
                None => Action::Exit(0),
                Some(code) => match code.parse::<i32>() {
                    Ok(code) => Action::Exit(code),
                    Err(_) => Action::Output(CommandOutput::error(&ShellError::InvalidExitCode(
                        code.clone(),
                    ))),
                },
            };
        }
        Builtin::Pwd => env::current_dir()
            .map(|p| format!("{}\n", p.display()))
            .map_err(|e| format!("pwd: {}\n", e)),
        Builtin::Cd => execute_cd(args),
        Builtin::Type => execute_type(args, path),
        Builtin::Echo => Ok(args[1..].join(" ") + "\n"),
    };
    Action::Output(result.into())
}

fn execute_cd(args: &[String]) -> Result<String, String> {
    let home = || env::var("HOME").map_err(|_| "cd: HOME not set\n".to_string());
    let target = match args.get(1).map(String::as_str) {
        None | Some("~") => home()?,
        Some(arg) => match arg.strip_prefix("~/") {
            Some(rest) => format!("{}/{}", home()?, rest),
            None => arg.to_string(),
        },
    };
    let shown = args.get(1).map_or(target.as_str(), String::as_str);
    env::set_current_dir(&target)
        .map(|_| String::new())
        .map_err(|_| format!("cd: {}: No such file or directory\n", shown))
}

fn execute_type(args: &[String], path: &SearchPath) -> Result<String, String> {
    let Some(arg) = args.get(1) else {
        return Ok(String::new());
    };
    if Builtin::parse(arg).is_some() {
        Ok(format!("{} is a shell builtin\n", arg))
    } else {
        match path.find(arg) {
            Some(full) => Ok(format!("{} is {}\n", arg, full.display())),
            None => Err(format!("{}: not found\n", arg)),
        }
    }
}

/// Runs an external program to completion, capturing both output streams.
/// The child's working directory is the directory holding its binary.
fn run_external(name: &str, args: &[String], path: &SearchPath) -> CommandOutput {
    let Some(binary) = path.find(name) else {
        return CommandOutput::from(Err::<String, String>(format!(
            "{}: command not found\n",
            name
        )));
    };
    let binary = std::path::absolute(&binary).unwrap_or(binary);
    log::debug!("running {} as {}", name, binary.display());

    let mut command = Command::new(&binary);
    command.arg0(name).args(args);
    if let Some(dir) = binary.parent() {
        command.current_dir(dir);
    }

    match command.output() {
        Ok(output) => {
            if !output.status.success() {
                log::debug!("{} exited with {}", name, output.status);
            }
            CommandOutput {
                stdout: Bytes::from(output.stdout),
                stderr: Bytes::from(output.stderr),
            }
        }
        Err(source) => CommandOutput::error(&ShellError::Spawn {
            program: name.to_string(),
            source,
        }),
    }
}
