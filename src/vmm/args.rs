use std::{ffi::CString, os::raw::c_char};

use super::VmmError;

/// Command line handed to `VMMDLL_Initialize`.
///
/// The native library parses it like `argv` of a program, so the first argument is
/// an empty program name followed by the options in the order they were added.
///
/// ## Example
/// ```
/// # use vmmdll::vmm::InitArgs;
/// let args = InitArgs::new().device("fpga").memmap("auto").verbose();
///
/// assert_eq!(args.args(), ["", "-device", "fpga", "-memmap", "auto", "-v"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitArgs {
	args: Vec<String>
}
impl InitArgs {
	pub fn new() -> Self {
		InitArgs {
			args: vec![String::new()]
		}
	}

	/// Builds the arguments from `args` without the program name, which is prepended.
	pub fn from_args<I: IntoIterator<Item = S>, S: Into<String>>(args: I) -> Self {
		args.into_iter().fold(Self::new(), |acc, arg| acc.arg(arg))
	}

	/// Appends a raw argument.
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	fn option(self, name: &str, value: impl Into<String>) -> Self {
		self.arg(name).arg(value)
	}

	/// Acquisition device, e.g. `fpga`, `pmem` or a path to a memory dump.
	pub fn device(self, device: impl Into<String>) -> Self {
		self.option("-device", device)
	}

	/// Remote LeechAgent to connect through.
	pub fn remote(self, remote: impl Into<String>) -> Self {
		self.option("-remote", remote)
	}

	/// Physical memory map, `auto` or a path to a map file.
	pub fn memmap(self, memmap: impl Into<String>) -> Self {
		self.option("-memmap", memmap)
	}

	pub fn verbose(self) -> Self {
		self.arg("-v")
	}

	pub fn very_verbose(self) -> Self {
		self.arg("-vv")
	}

	pub fn extra_verbose(self) -> Self {
		self.arg("-vvv")
	}

	/// Print native log output to stdout.
	pub fn printf(self) -> Self {
		self.arg("-printf")
	}

	/// Disable the background refresh of processes and caches.
	pub fn no_refresh(self) -> Self {
		self.arg("-norefresh")
	}

	/// Block in initialize until the native library finished its initial scan.
	pub fn wait_initialize(self) -> Self {
		self.arg("-waitinitialize")
	}

	pub fn args(&self) -> &[String] {
		&self.args
	}

	pub(crate) fn to_native(&self) -> Result<NativeArgs, VmmError> {
		let strings = self
			.args
			.iter()
			.map(|arg| CString::new(arg.as_str()).map_err(|_| VmmError::InvalidArgument(arg.clone())))
			.collect::<Result<Vec<_>, _>>()?;

		let pointers = strings.iter().map(|s| s.as_ptr() as *mut c_char).collect();

		Ok(NativeArgs {
			_strings: strings,
			pointers
		})
	}
}
impl Default for InitArgs {
	fn default() -> Self {
		Self::new()
	}
}

/// Nul terminated copies of the arguments together with the `argv` array pointing into them.
pub(crate) struct NativeArgs {
	_strings: Vec<CString>,
	pointers: Vec<*mut c_char>
}
impl NativeArgs {
	pub fn argc(&self) -> u32 {
		self.pointers.len() as u32
	}

	pub fn argv(&mut self) -> *mut *mut c_char {
		self.pointers.as_mut_ptr()
	}
}

#[cfg(test)]
mod test {
	use std::ffi::CStr;

	use super::InitArgs;
	use crate::vmm::VmmError;

	#[test]
	fn test_argv_order() {
		let args = InitArgs::new()
			.device("fpga")
			.remote("rpc://insecure:host")
			.printf()
			.no_refresh()
			.wait_initialize()
			.very_verbose()
			.extra_verbose();

		assert_eq!(
			args.args(),
			[
				"",
				"-device",
				"fpga",
				"-remote",
				"rpc://insecure:host",
				"-printf",
				"-norefresh",
				"-waitinitialize",
				"-vv",
				"-vvv"
			]
		);
	}

	#[test]
	fn test_from_args() {
		let args = InitArgs::from_args(["-device", "FPGA"]);

		assert_eq!(args, InitArgs::new().device("FPGA"));
	}

	#[test]
	fn test_to_native() {
		let mut native = InitArgs::new().device("pmem").to_native().unwrap();

		assert_eq!(native.argc(), 3);
		let argv = native.argv();
		let second = unsafe { CStr::from_ptr(*argv.add(1)) };
		assert_eq!(second.to_str().unwrap(), "-device");
	}

	#[test]
	fn test_to_native_rejects_nul() {
		match InitArgs::new().device("fp\0ga").to_native() {
			Err(VmmError::InvalidArgument(arg)) => assert_eq!(arg, "fp\0ga"),
			_ => panic!("expected InvalidArgument")
		}
	}
}
