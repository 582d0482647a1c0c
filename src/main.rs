//! The `tinix` binary: builds a [`Kernel`] over the default disk image and
//! hands it to the interactive shell.

use std::env;
use std::process::ExitCode;

use tinix::kernel::Kernel;
use tinix::shell::Shell;

fn main() -> ExitCode {
	let mut kernel = match Kernel::new() {
		Ok(k) => k,
		Err(e) => {
			eprintln!("tinix: cannot open disk image: {e}");
			return ExitCode::FAILURE;
		}
	};

	if kernel.mount().is_err() {
		eprintln!("tinix: no existing file system found, formatting");
		if let Err(e) = kernel.format() {
			eprintln!("tinix: format failed: {e}");
			return ExitCode::FAILURE;
		}
	}

	let mut shell = Shell::new(kernel);

	let script: Vec<String> = env::args().skip(1).collect();
	if let Some(path) = script.first() {
		shell.execute_line(&format!("script {path}"));
	} else {
		shell.run();
	}

	ExitCode::SUCCESS
}
