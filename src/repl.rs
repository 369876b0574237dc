// File: src/repl.rs
//
// Interactive REPL driver: reads one logical statement at a time, tracking
// brace balance so a multi-line function or class body isn't fed to the VM
// half-finished, and keeps history across the session. Ambient CLI
// scaffolding around the VM core — the VM itself has no idea it's being
// driven interactively.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::vm::Vm;

const BANNER: &str = "Lumen REPL — Ctrl-D to quit.";

pub struct Repl {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    vm: Vm,
}

impl Repl {
    pub fn new(vm: Vm) -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let history_path = history_file_path();
        if let Some(path) = &history_path {
            let _ = editor.load_history(path);
        }
        Ok(Repl { editor, history_path, vm })
    }

    pub fn run(&mut self) -> rustyline::Result<()> {
        println!("{}", BANNER.bright_blue());
        while let Some(source) = self.read_statement()? {
            if !source.trim().is_empty() {
                let _ = self.editor.add_history_entry(source.as_str());
                self.vm.interpret(&source);
            }
        }
        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
        Ok(())
    }

    /// Reads one logical statement, prompting with `"... "` while braces
    /// opened on an earlier line remain unclosed. Returns `Ok(None)` on EOF
    /// (Ctrl-D).
    fn read_statement(&mut self) -> rustyline::Result<Option<String>> {
        let mut buffer = String::new();
        let mut depth: i32 = 0;
        loop {
            let prompt = if buffer.is_empty() { "> " } else { "... " };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    depth += brace_delta(&line);
                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    buffer.push_str(&line);
                    if depth <= 0 {
                        return Ok(Some(buffer));
                    }
                }
                Err(ReadlineError::Interrupted) => return Ok(Some(String::new())),
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err),
            }
        }
    }
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |delta, c| match c {
        '{' => delta + 1,
        '}' => delta - 1,
        _ => delta,
    })
}

fn history_file_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".lumen_history"))
}
