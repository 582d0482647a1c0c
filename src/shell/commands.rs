//! The verb dispatch table behind the shell prompt.

use std::fmt;

use crate::kernel::Kernel;
use crate::program::Program;

/// What the caller (the REPL or a script) should do after a command runs.
pub enum Outcome {
	Continue,
	Exit,
}

/// A command-line usage mistake, distinct from a core [`crate::error::Error`].
#[derive(Debug)]
pub struct Usage(pub String);

impl fmt::Display for Usage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::error::Error for Usage {}

impl From<crate::error::Error> for Usage {
	fn from(e: crate::error::Error) -> Self {
		Usage(e.to_string())
	}
}

type Result<T> = std::result::Result<T, Usage>;

/// Dispatches one already-split command line against `kernel`.
pub fn dispatch(kernel: &mut Kernel, args: &[String]) -> Result<Outcome> {
	let rest = &args[1..];
	match args[0].as_str() {
		"help" => {
			print_help();
			Ok(Outcome::Continue)
		}
		"exit" | "quit" => Ok(Outcome::Exit),
		"script" => {
			let path = arg(rest, 0, "script <file>")?;
			run_script(kernel, path);
			Ok(Outcome::Continue)
		}

		"format" => {
			kernel.format()?;
			println!("file system formatted");
			Ok(Outcome::Continue)
		}
		"mount" => {
			kernel.mount()?;
			println!("file system mounted");
			Ok(Outcome::Continue)
		}
		"pwd" => {
			println!("{}", kernel.get_current_directory());
			Ok(Outcome::Continue)
		}
		"df" => {
			let sb = kernel.superblock()?;
			println!(
				"blocks: {}/{} free, inodes: {}/{} free",
				sb.free_blocks, sb.total_blocks, sb.free_inodes, sb.total_inodes
			);
			Ok(Outcome::Continue)
		}
		"cd" => {
			let path = arg(rest, 0, "cd <path>")?;
			kernel.change_directory(path)?;
			Ok(Outcome::Continue)
		}
		"mkdir" => {
			let path = arg(rest, 0, "mkdir <path>")?;
			kernel.create_directory(path)?;
			Ok(Outcome::Continue)
		}
		"ls" => {
			let path = rest.first().map(String::as_str).unwrap_or(".");
			for entry in kernel.list_directory(path)? {
				println!("{}\t{}", entry.inode_num, entry.name);
			}
			Ok(Outcome::Continue)
		}
		"touch" => {
			let path = arg(rest, 0, "touch <path>")?;
			kernel.create_file(path)?;
			Ok(Outcome::Continue)
		}
		"rm" => {
			let path = arg(rest, 0, "rm <path>")?;
			kernel.remove_file(path)?;
			Ok(Outcome::Continue)
		}
		"cat" => {
			let path = arg(rest, 0, "cat <path>")?;
			let fd = kernel.open_file(path)?;
			let mut buf = [0u8; 4096];
			let mut out = Vec::new();
			loop {
				let n = kernel.read_file(fd, &mut buf)?;
				if n == 0 {
					break;
				}
				out.extend_from_slice(&buf[..n]);
			}
			kernel.close_file(fd);
			print!("{}", String::from_utf8_lossy(&out));
			Ok(Outcome::Continue)
		}
		"write" => {
			let path = arg(rest, 0, "write <path> <text...>")?;
			let text = rest[1..].join(" ");
			let fd = kernel.open_file(path)?;
			kernel.write_file(fd, text.as_bytes())?;
			kernel.close_file(fd);
			Ok(Outcome::Continue)
		}

		"devices" => {
			for dev in kernel.device_snapshot() {
				println!(
					"dev={} name={} owner={:?} waiters={:?}",
					dev.dev_id, dev.name, dev.owner, dev.wait_queue
				);
			}
			Ok(Outcome::Continue)
		}
		"request" => {
			let (pid, dev_id) = two_u32(rest, "request <pid> <dev_id>")?;
			println!("{:?}", kernel.request_device(pid, dev_id)?);
			Ok(Outcome::Continue)
		}
		"release" => {
			let (pid, dev_id) = two_u32(rest, "release <pid> <dev_id>")?;
			println!("{:?}", kernel.release_device(pid, dev_id)?);
			Ok(Outcome::Continue)
		}
		"register_device" => {
			let dev_id: u32 = arg(rest, 0, "register_device <dev_id> <name>")?
				.parse()
				.map_err(|_| Usage("dev_id must be an integer".to_string()))?;
			let name = arg(rest, 1, "register_device <dev_id> <name>")?;
			kernel.register_device(dev_id, name);
			Ok(Outcome::Continue)
		}

		"spawn" => {
			let total_time: i32 = arg(rest, 0, "spawn <total_time> [name]")?
				.parse()
				.map_err(|_| Usage("total_time must be an integer".to_string()))?;
			let name = rest.get(1).map(String::as_str).unwrap_or("a.out");
			let pid = kernel.create_process(total_time, Program::new(name));
			println!("pid={pid}");
			Ok(Outcome::Continue)
		}
		"kill" => {
			let pid = one_u32(rest, "kill <pid>")?;
			kernel.terminate_process(pid)?;
			Ok(Outcome::Continue)
		}
		"run" => {
			let pid = one_u32(rest, "run <pid>")?;
			kernel.run_process(pid)?;
			Ok(Outcome::Continue)
		}
		"sleep" => {
			let (pid, duration) = two_u32(rest, "sleep <pid> <duration>")?;
			kernel.sleep_process(pid, duration as i32)?;
			Ok(Outcome::Continue)
		}
		"wake" => {
			let pid = one_u32(rest, "wake <pid>")?;
			kernel.wakeup_process(pid)?;
			Ok(Outcome::Continue)
		}
		"tick" => {
			let n: u32 = rest
				.first()
				.map(|s| s.parse().map_err(|_| Usage("tick count must be an integer".to_string())))
				.transpose()?
				.unwrap_or(1);
			for _ in 0..n {
				kernel.tick();
			}
			Ok(Outcome::Continue)
		}
		"ps" => {
			print!("{}", kernel.dump_processes());
			Ok(Outcome::Continue)
		}

		other => Err(Usage(format!("unknown command '{other}' (try 'help')"))),
	}
}

fn run_script(kernel: &mut Kernel, path: &str) {
	let Ok(contents) = std::fs::read_to_string(path) else {
		eprintln!("script: cannot open {path}");
		return;
	};
	for line in contents.lines() {
		let words: Vec<String> = line.trim().split_whitespace().map(str::to_string).collect();
		if words.is_empty() || words[0].starts_with('#') {
			continue;
		}
		if let Err(e) = dispatch(kernel, &words) {
			eprintln!("{}: {e}", words[0]);
		}
	}
}

fn arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str> {
	args.get(index)
		.map(String::as_str)
		.ok_or_else(|| Usage(format!("usage: {usage}")))
}

fn one_u32(args: &[String], usage: &str) -> Result<u32> {
	arg(args, 0, usage)?
		.parse()
		.map_err(|_| Usage(format!("usage: {usage} (pid must be an integer)")))
}

fn two_u32(args: &[String], usage: &str) -> Result<(u32, u32)> {
	let a = arg(args, 0, usage)?
		.parse()
		.map_err(|_| Usage(format!("usage: {usage}")))?;
	let b = arg(args, 1, usage)?
		.parse()
		.map_err(|_| Usage(format!("usage: {usage}")))?;
	Ok((a, b))
}

fn print_help() {
	println!("file system: format, mount, pwd, df, cd, mkdir, ls, touch, rm, cat, write");
	println!("devices:     devices, request, release, register_device");
	println!("processes:   spawn, kill, run, sleep, wake, tick, ps");
	println!("shell:       script <file>, help, exit");
}
