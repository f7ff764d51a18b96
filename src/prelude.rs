pub use crate::{
	common::{Address, Pid, RawBytes},
	library::{LibraryConfig, LoadError, VmmLibrary},
	memory::{
		access::{MemoryAccess, ReadError, WriteError},
		flags::ReadFlags
	},
	process::Process,
	scatter::{ScatterError, ScatterHandle},
	vmm::{InitArgs, ModuleInfo, ModuleType, Vmm, VmmError}
};
