//! The interactive line-oriented shell driving a [`Kernel`].
//!
//! Thin glue over the core: split a line into words, dispatch on the first
//! word, print a one-line diagnostic on error. Scripts are just files of
//! such lines, run with the same dispatcher.

mod commands;

use std::io::{self, BufRead, Write};

use crate::kernel::Kernel;

/// Runs commands against a [`Kernel`] until `exit`/EOF.
pub struct Shell {
	kernel: Kernel,
	running: bool,
}

impl Shell {
	pub fn new(kernel: Kernel) -> Self {
		Self {
			kernel,
			running: true,
		}
	}

	/// The interactive read-eval-print loop, reading from stdin.
	pub fn run(&mut self) {
		let stdin = io::stdin();
		while self.running {
			print!("tinix> ");
			let _ = io::stdout().flush();

			let mut line = String::new();
			if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
				break; // EOF
			}
			self.execute_line(&line);
		}
	}

	/// Splits `line` into words and dispatches it. Public so scripts and the
	/// interactive loop share one code path.
	pub fn execute_line(&mut self, line: &str) {
		let args = Self::parse_command(line);
		if args.is_empty() {
			return;
		}
		self.execute_command(&args);
	}

	/// Splits on whitespace. No quoting support: this is a teaching shell,
	/// not a POSIX one.
	fn parse_command(input: &str) -> Vec<String> {
		input
			.trim()
			.split_whitespace()
			.map(str::to_string)
			.collect()
	}

	fn execute_command(&mut self, args: &[String]) {
		if args[0].starts_with('#') {
			return;
		}
		match commands::dispatch(&mut self.kernel, args) {
			Ok(commands::Outcome::Continue) => {}
			Ok(commands::Outcome::Exit) => self.running = false,
			Err(e) => eprintln!("{}: {e}", args[0]),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	static COUNTER: AtomicU32 = AtomicU32::new(0);

	fn test_shell() -> Shell {
		let n = COUNTER.fetch_add(1, Ordering::Relaxed);
		let path = std::env::temp_dir().join(format!("tinix_shell_test_{n}.img"));
		let mut kernel = Kernel::new_with_path(&path).unwrap();
		kernel.format().unwrap();
		Shell::new(kernel)
	}

	#[test]
	fn parse_command_splits_on_whitespace() {
		assert_eq!(Shell::parse_command("  mkdir   /a  "), vec!["mkdir", "/a"]);
	}

	#[test]
	fn blank_and_comment_lines_are_ignored() {
		let mut shell = test_shell();
		shell.execute_line("");
		shell.execute_line("   ");
		shell.execute_line("# a comment");
		assert!(shell.running);
	}

	#[test]
	fn exit_stops_the_loop() {
		let mut shell = test_shell();
		shell.execute_line("exit");
		assert!(!shell.running);
	}

	#[test]
	fn end_to_end_mkdir_ls() {
		let mut shell = test_shell();
		shell.execute_line("mkdir /a");
		shell.execute_line("ls /");
	}
}
