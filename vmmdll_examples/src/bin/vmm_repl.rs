use anyhow::Context;
use rustyline::{
	completion::Pair as CompletionPair, config::Config, error::ReadlineError, history::MemHistory,
	Editor,
};

use vmmdll::prelude::{Address, ReadFlags};

struct ReplHelper {}
impl ReplHelper {
	pub fn new() -> Self {
		Self {}
	}

	fn try_complete(line: &str) -> Vec<CompletionPair> {
		let mut results = Vec::new();

		macro_rules! complete_to {
			(
				$( $command: literal),+ $(,)?
			) => {
				$(
					if $command.starts_with(line) {
						results.push(CompletionPair {
							display: $command.into(),
							replacement: $command.into()
						});
					}
				)+
			};
		}
		complete_to! {
			"attach ",
			"detach",
			"info",
			"module ",
			"proc ",
			"read ",
			"readex ",
			"write i16 ",
			"write i32 ",
			"write i64 ",
			"write f32 ",
			"write f64 ",
			"scatter ",
			"exit"
		}

		results
	}
}
impl rustyline::validate::Validator for ReplHelper {}
impl rustyline::highlight::Highlighter for ReplHelper {}
impl rustyline::hint::Hinter for ReplHelper {
	type Hint = String;

	fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
		if line.is_empty() {
			return None;
		}

		let completions = Self::try_complete(line);

		completions
			.first()
			.map(|completion| completion.replacement[pos..].to_string())
	}
}
impl rustyline::completion::Completer for ReplHelper {
	type Candidate = CompletionPair;

	fn complete(
		&self,
		line: &str,
		_pos: usize,
		_ctx: &rustyline::Context<'_>,
	) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
		Ok((0, Self::try_complete(line)))
	}
}
impl rustyline::Helper for ReplHelper {}

fn parse_address(value: Option<&str>) -> anyhow::Result<Address> {
	let value = value.context("address is required")?;

	value
		.parse()
		.with_context(|| format!("invalid address \"{}\"", value))
}

fn parse_len(value: Option<&str>) -> anyhow::Result<usize> {
	let value = value.context("length is required")?;

	match value.strip_prefix("0x") {
		Some(hex) => usize::from_str_radix(hex, 16),
		None => value.parse(),
	}
	.with_context(|| format!("invalid length \"{}\"", value))
}

fn main() -> anyhow::Result<()> {
	const PROMPT: &str = "> ";

	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
		.format_timestamp(None)
		.init();

	let device = std::env::args().nth(1).unwrap_or_else(|| "fpga".to_string());
	let mut app = App::initialize(&device)?;
	println!("Initialized with device {}", device);

	let mut rl = Editor::<ReplHelper, MemHistory>::with_history(
		Config::builder()
			.completion_type(rustyline::CompletionType::List)
			.auto_add_history(true)
			.bell_style(rustyline::config::BellStyle::None)
			.tab_stop(4)
			.build(),
		MemHistory::default(),
	)?;
	rl.set_helper(Some(ReplHelper::new()));

	loop {
		macro_rules! on_attached {
			($app: ident => $($code: tt)+) => {
				match app.attached() {
					false => {
						println!("Not attached, use `attach NAME` first");
						Ok(())
					}
					true => (|| -> anyhow::Result<()> {
						let $app = &mut app;
						$($code)+
					})()
				}
			};
		}

		let result: anyhow::Result<()> = match rl.readline(PROMPT) {
			Err(ReadlineError::Eof) => break,
			Err(ReadlineError::Interrupted) => break,
			Ok(line) if line == "exit" => break,
			Err(err) => anyhow::bail!("Failed to read line: {}", err),
			// commands
			Ok(line) if line.starts_with("attach ") => {
				let name = line["attach ".len()..].trim();
				app.attach(name).map(|pid| println!("Attached to {} ({})", name, pid))
			}
			Ok(line) if line == "detach" => {
				match app.detach() {
					None => println!("Not attached, cannot detach"),
					Some(name) => println!("Detached from {}", name),
				}
				Ok(())
			}
			Ok(line) if line == "info" => on_attached! { app =>
				app.print_info();
				Ok(())
			},
			Ok(line) if line.starts_with("module ") => on_attached! { app =>
				app.module(line["module ".len()..].trim())
			},
			Ok(line) if line.starts_with("proc ") => on_attached! { app =>
				let mut arguments = line.split_whitespace().skip(1);

				let module = arguments.next().context("module is required")?;
				let function = arguments.next().context("function is required")?;

				app.proc_address(module, function)
			},
			Ok(line) if line.starts_with("read ") => on_attached! { app =>
				let mut arguments = line.split_whitespace().skip(1);

				let address = parse_address(arguments.next())?;
				let len = parse_len(arguments.next())?;

				app.read(address, len)
			},
			Ok(line) if line.starts_with("readex ") => on_attached! { app =>
				let mut arguments = line.split_whitespace().skip(1);

				let address = parse_address(arguments.next())?;
				let len = parse_len(arguments.next())?;

				let mut flags = ReadFlags::empty();
				for argument in arguments {
					match ReadFlags::from_short_name(argument) {
						Some(flag) => flags |= flag,
						None => anyhow::bail!("Invalid read flag \"{}\"", argument)
					}
				}

				app.read_ex(address, len, flags)
			},
			Ok(line) if line.starts_with("write ") => on_attached! { app =>
				let mut arguments = line.split_whitespace().skip(1);

				let value_type = arguments.next().context("write type is required")?;
				let address = parse_address(arguments.next())?;
				let value_str = arguments.next().context("write value is required")?;

				macro_rules! do_write {
					($write_type: ty) => {
						match value_str.parse::<$write_type>() {
							Err(err) => {
								println!("Skipping write: {}", err);
								Ok(())
							}
							Ok(value) => app.write(address, value)
						}
					};
				}

				match value_type {
					"i16" => do_write!(i16),
					"i32" => do_write!(i32),
					"i64" => do_write!(i64),
					"f32" => do_write!(f32),
					"f64" => do_write!(f64),
					value_type => Err(anyhow::anyhow!("Unknown value type \"{}\"", value_type))
				}
			},
			Ok(line) if line.starts_with("scatter ") => on_attached! { app =>
				let ranges = line.split_whitespace()
					.skip(1)
					.map(|range| {
						let mut split = range.splitn(2, ':');
						Ok((parse_address(split.next())?, parse_len(split.next())?))
					})
					.collect::<anyhow::Result<Vec<_>>>()?;

				app.scatter(&ranges)
			},
			// rest
			Ok(line) => {
				println!("Unknown command \"{}\"", line);
				Ok(())
			}
		};

		if let Err(err) = result {
			println!("Error: {:#}", err);
		}
	}

	Ok(())
}

fn print_hex(address: Address, bytes: &[u8]) {
	for (i, chunk) in bytes.chunks(16).enumerate() {
		let line_address = address.saturating_add(i as u64 * 16);
		let ascii: String = chunk
			.iter()
			.map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
			.collect();

		let hex = chunk.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ");

		println!("\t{:016x}  {:<47}  {}", line_address, hex, ascii);
	}
}

mod app {
	use anyhow::Context;

	use vmmdll::prelude::{
		Address, InitArgs, MemoryAccess, Pid, Process, RawBytes, ReadFlags, Vmm, VmmLibrary,
	};

	use super::print_hex;

	pub struct App {
		vmm: Vmm,
		attached: Option<(String, Pid)>,
	}
	impl App {
		pub fn initialize(device: &str) -> anyhow::Result<Self> {
			let library = VmmLibrary::load_default().context("Could not load the native libraries")?;
			let vmm = Vmm::initialize(library, &InitArgs::new().device(device))
				.context("Could not initialize vmm")?;

			Ok(Self {
				vmm,
				attached: None,
			})
		}

		pub fn attached(&self) -> bool {
			self.attached.is_some()
		}

		fn process(&self) -> anyhow::Result<Process<'_>> {
			let (_, pid) = self.attached.as_ref().context("Not attached")?;

			Ok(self.vmm.process(*pid))
		}

		pub fn attach(&mut self, name: &str) -> anyhow::Result<Pid> {
			let pid = self.vmm.pid_from_name(name)?;
			self.attached = Some((name.to_string(), pid));

			Ok(pid)
		}

		pub fn detach(&mut self) -> Option<String> {
			self.attached.take().map(|(name, _)| name)
		}

		pub fn print_info(&self) {
			if let Some((name, pid)) = self.attached.as_ref() {
				println!("Name: {}", name);
				println!("PID: {}", pid);
				match self.vmm.module_from_name(*pid, name) {
					Ok(module) => println!("Image: {}", module),
					Err(err) => println!("Image: {}", err),
				}
			}
		}

		pub fn module(&self, name: &str) -> anyhow::Result<()> {
			let module = self.process()?.module(name)?;

			println!("{}", module);
			println!("\ttype: {:?}, wow64: {}", module.module_type, module.wow64);
			println!(
				"\tfile size: {:#x}, sections: {}, exports: {}, imports: {}",
				module.file_size_raw, module.section_count, module.eat_count, module.iat_count
			);

			Ok(())
		}

		pub fn proc_address(&self, module: &str, function: &str) -> anyhow::Result<()> {
			let address = self.process()?.proc_address(module, function)?;
			println!("{}!{} = 0x{}", module, function, address);

			Ok(())
		}

		pub fn read(&self, address: Address, len: usize) -> anyhow::Result<()> {
			let bytes = self.process()?.read_vec(address, len)?;
			print_hex(address, &bytes);

			Ok(())
		}

		pub fn read_ex(&self, address: Address, len: usize, flags: ReadFlags) -> anyhow::Result<()> {
			u32::try_from(len).with_context(|| format!("length {} is too large", len))?;

			let mut buffer = vec![0u8; len];
			let read = self.process()?.read_ex(address, &mut buffer, flags)?;

			println!("Read {} of {} bytes (flags {:?})", read, len, flags);
			print_hex(address, &buffer[..read]);

			Ok(())
		}

		pub fn write<T: RawBytes + std::fmt::Display>(
			&mut self,
			address: Address,
			value: T,
		) -> anyhow::Result<()> {
			self.process()?
				.write_value(address, &value)
				.context("Could not write memory")?;
			println!("Wrote {} at 0x{}", value, address);

			Ok(())
		}

		pub fn scatter(&self, ranges: &[(Address, usize)]) -> anyhow::Result<()> {
			let process = self.process()?;
			let mut scatter = process.scatter(ReadFlags::empty())?;

			for &(address, len) in ranges {
				scatter.prepare(address, len)?;
			}
			scatter.execute_read()?;

			for &(address, len) in ranges {
				match scatter.read_vec(address, len) {
					Ok(bytes) => print_hex(address, &bytes),
					Err(err) => println!("\t{}", err),
				}
			}

			Ok(())
		}
	}
}
use app::App;
