mod commands;
mod completion;
mod editor;
mod errors;
mod redirection;
mod search_path;
mod shell;
mod terminal;
mod tokenize;

use shell::{Config, Shell};

fn main() {
    env_logger::init();
    match Shell::new(Config::default()).run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
