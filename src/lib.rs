//! Bindings to the MemProcFS memory acquisition and introspection libraries.
//!
//! This library loads `leechcore` and `vmm` at runtime, resolves their exports and wraps them
//! in typed calls: handle lifecycle, process and module lookup, memory reading and writing
//! and scatter sessions. All of the actual work happens in the native library.
//!
//! ```no_run
//! use vmmdll::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let library = VmmLibrary::load_default()?;
//! let vmm = Vmm::initialize(library, &InitArgs::new().device("fpga"))?;
//!
//! let process = vmm.process_by_name("explorer.exe")?;
//! let module = process.module("explorer.exe")?;
//! let header: [u8; 2] = process.read_value(module.base)?;
//! assert_eq!(&header, b"MZ");
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod ffi;
pub mod library;
pub mod memory;
pub mod platform;
pub mod process;
pub mod scatter;
pub mod vmm;

pub mod prelude;
pub use crate::{
	common::{Address, Pid},
	library::{LibraryConfig, VmmLibrary},
	memory::{access::MemoryAccess, flags::ReadFlags},
	process::Process,
	scatter::ScatterHandle,
	vmm::{InitArgs, Vmm}
};
