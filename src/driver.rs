//! Per-invocation orchestration of the scan → parse → resolve → evaluate
//! pipeline.
//!
//! The `Driver` owns everything that would otherwise be process-global: the
//! interpreter instance, the static/runtime error flags, and the debug and
//! test-mode switches.  Tests construct a fresh driver instead of resetting
//! shared state.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::{debug, info};

use crate::ast_printer::Ast;
use crate::error::{KloxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Driver {
    interpreter: Interpreter,
    debug: bool,
    test_mode: bool,
    had_error: bool,
    had_runtime_error: bool,
}

impl Driver {
    pub fn new(debug: bool, test_mode: bool) -> Self {
        Driver {
            interpreter: Interpreter::new(),
            debug,
            test_mode,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Execute a script file and report the process exit code the CLI should
    /// use: 0 on success, 65 after static errors, 70 after a runtime error.
    /// Test mode always reports 0 so diagnostics can be captured.
    pub fn run_file(&mut self, path: &Path) -> Result<i32> {
        info!("Running file {}", path.display());

        let source = fs::read_to_string(path)?;

        self.run(&source);

        if self.test_mode {
            return Ok(0);
        }

        if self.had_error {
            Ok(65)
        } else if self.had_runtime_error {
            Ok(70)
        } else {
            Ok(0)
        }
    }

    /// Read-execute loop on stdin until EOF.  Errors in one line never
    /// poison the next: both flags reset before each prompt.
    pub fn run_prompt(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut line = String::new();

        loop {
            print!("> ");
            io::stdout().flush()?;

            line.clear();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            self.run(&line);

            self.had_error = false;
            self.had_runtime_error = false;
        }

        Ok(())
    }

    /// Run one source text through the pipeline, reporting diagnostics on
    /// stderr.  A tree with any static error is never evaluated.
    pub fn run(&mut self, source: &str) {
        let mut tokens: Vec<Token> = Vec::new();
        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),

                Err(e) => self.report(&e),
            }
        }

        debug!("Scanned {} token(s)", tokens.len());

        let (statements, parse_errors) = Parser::new(tokens).parse();
        for e in &parse_errors {
            self.report(e);
        }

        if self.debug {
            // Debug mode replaces resolution and evaluation entirely.
            let printer = Ast;
            for statement in &statements {
                println!("{}", printer.print_stmt(statement));
            }

            return;
        }

        if self.had_error {
            return;
        }

        for e in Resolver::new(&mut self.interpreter).resolve(&statements) {
            self.report(&e);
        }

        if self.had_error {
            return;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            eprintln!("{}", e);
            self.had_runtime_error = true;
        }
    }

    fn report(&mut self, error: &KloxError) {
        eprintln!("{}", error);
        self.had_error = true;
    }
}

#[cfg(test)]
mod tests {
    use super::Driver;

    use std::fs;

    fn script(name: &str, source: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn clean_script_exits_zero() {
        let path = script("klox_driver_ok.klox", "print 1 + 2;\n");

        let mut driver = Driver::new(false, false);
        assert_eq!(driver.run_file(&path).unwrap(), 0);
    }

    #[test]
    fn static_error_exits_65() {
        let path = script("klox_driver_static.klox", "return;\n");

        let mut driver = Driver::new(false, false);
        assert_eq!(driver.run_file(&path).unwrap(), 65);
    }

    #[test]
    fn runtime_error_exits_70() {
        let path = script("klox_driver_runtime.klox", "unknown = 1;\n");

        let mut driver = Driver::new(false, false);
        assert_eq!(driver.run_file(&path).unwrap(), 70);
    }

    #[test]
    fn test_mode_suppresses_nonzero_exits() {
        let path = script("klox_driver_testmode.klox", "unknown = 1;\n");

        let mut driver = Driver::new(false, true);
        assert_eq!(driver.run_file(&path).unwrap(), 0);
    }
}
