use crate::{
	common::{Address, Pid},
	memory::{
		access::{MemoryAccess, ReadError, WriteError},
		flags::ReadFlags
	},
	scatter::{ScatterError, ScatterHandle},
	vmm::{ModuleInfo, Vmm, VmmError}
};

/// A [`Vmm`] bound to one process.
///
/// Cheap to copy, all calls go straight to the handle with the bound pid.
#[derive(Debug, Clone, Copy)]
pub struct Process<'vmm> {
	vmm: &'vmm Vmm,
	pid: Pid
}
impl<'vmm> Process<'vmm> {
	pub fn new(vmm: &'vmm Vmm, pid: Pid) -> Self {
		Process { vmm, pid }
	}

	pub fn pid(&self) -> Pid {
		self.pid
	}

	pub fn vmm(&self) -> &'vmm Vmm {
		self.vmm
	}

	/// Same process with kernel memory mapped into its address space.
	pub fn with_kernel_memory(&self) -> Self {
		Process::new(self.vmm, self.pid.with_kernel_memory())
	}

	pub fn module(&self, name: &str) -> Result<ModuleInfo, VmmError> {
		self.vmm.module_from_name(self.pid, name)
	}

	pub fn proc_address(&self, module: &str, function: &str) -> Result<Address, VmmError> {
		self.vmm.proc_address(self.pid, module, function)
	}

	pub fn read_ex(&self, address: Address, buffer: &mut [u8], flags: ReadFlags) -> Result<usize, ReadError> {
		self.vmm.mem_read_ex(self.pid, address, buffer, flags)
	}

	pub fn scatter<'buf>(&self, flags: ReadFlags) -> Result<ScatterHandle<'vmm, 'buf>, ScatterError> {
		self.vmm.scatter(self.pid, flags)
	}
}
impl MemoryAccess for Process<'_> {
	fn read(&self, address: Address, buffer: &mut [u8]) -> Result<(), ReadError> {
		self.vmm.mem_read(self.pid, address, buffer)
	}

	fn write(&self, address: Address, data: &[u8]) -> Result<(), WriteError> {
		self.vmm.mem_write(self.pid, address, data)
	}
}
