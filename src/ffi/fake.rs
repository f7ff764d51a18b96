//! In-process stand-in for the native library used by the tests.
//!
//! State is thread local, every test runs on its own thread and therefore sees a fresh fake.

use std::{
	cell::RefCell,
	collections::HashMap,
	ffi::{CStr, CString},
	os::raw::{c_char, c_void},
	sync::Arc
};

use super::*;
use crate::library::VmmLibrary;

pub const FAKE_VMM: usize = 0x7a11;
pub const FAKE_PID: u32 = 1234;
pub const FAKE_PROCESS: &str = "target.exe";
pub const FAKE_MODULE_PATH: &str = "C:\\Program Files\\Target\\target.exe";
pub const MODULE_BASE: u64 = 0x1_4000_0000;
pub const MODULE_SIZE: usize = 0x2000;
pub const MODULE_ENTRY: u64 = MODULE_BASE + 0x400;
pub const FAKE_EXPORT: &str = "Tick";
pub const EXPORT_ADDRESS: u64 = MODULE_BASE + 0x1230;
/// Any initialize argument equal to this makes initialization fail.
pub const FAIL_ARG: &str = "fail";
/// Scatter prepare calls at this address fail.
pub const REJECTED_ADDRESS: u64 = 0xdead_0000;

struct PreparedRead {
	address: u64,
	size: u32,
	buffer: *mut u8,
	bytes_read: *mut u32
}

#[derive(Default)]
pub struct FakeScatter {
	pub pid: u32,
	pub flags: u32,
	prepared: Vec<PreparedRead>,
	pub writes: Vec<(u64, Vec<u8>)>,
	pub executed: bool,
	pub clears: usize,
	/// Makes execute and clear fail.
	pub failing: bool
}
impl FakeScatter {
	pub fn prepared_count(&self) -> usize {
		self.prepared.len()
	}
}

pub struct FakeState {
	pub memory: Vec<u8>,
	pub last_argv: Vec<String>,
	pub closed: Vec<usize>,
	pub close_all_calls: usize,
	pub freed: usize,
	pub last_read_flags: Option<u64>,
	/// Added to the byte count reported by `VMMDLL_MemReadEx`.
	pub read_ex_overreport: u32,
	pub scatters: HashMap<usize, FakeScatter>,
	pub scatters_closed: Vec<usize>,
	next_scatter: usize
}
impl FakeState {
	fn new() -> Self {
		FakeState {
			memory: (0 .. MODULE_SIZE).map(|i| i as u8).collect(),
			last_argv: Vec::new(),
			closed: Vec::new(),
			close_all_calls: 0,
			freed: 0,
			last_read_flags: None,
			read_ex_overreport: 0,
			scatters: HashMap::new(),
			scatters_closed: Vec::new(),
			next_scatter: 0x5c00
		}
	}

	/// Returns the range of `memory` backing `[address, address + size)`, clamped to the mapped part.
	fn mapped(&self, pid: u32, address: u64, size: u32) -> Option<std::ops::Range<usize>> {
		if pid != FAKE_PID {
			return None
		}

		let start = usize::try_from(address.checked_sub(MODULE_BASE)?).ok()?;
		if start >= self.memory.len() {
			return None
		}
		let end = (start + size as usize).min(self.memory.len());

		Some(start .. end)
	}

	fn read_into(&self, pid: u32, address: u64, buffer: &mut [u8]) -> usize {
		match self.mapped(pid, address, buffer.len() as u32) {
			None => 0,
			Some(range) => {
				let len = range.len();
				buffer[.. len].copy_from_slice(&self.memory[range]);
				len
			}
		}
	}

	fn write_from(&mut self, pid: u32, address: u64, data: &[u8]) -> bool {
		match self.mapped(pid, address, data.len() as u32) {
			Some(range) if range.len() == data.len() => {
				self.memory[range].copy_from_slice(data);
				true
			}
			_ => false
		}
	}
}

thread_local! {
	static STATE: RefCell<FakeState> = RefCell::new(FakeState::new());
}

pub fn with_state<R>(fun: impl FnOnce(&mut FakeState) -> R) -> R {
	STATE.with(|state| fun(&mut state.borrow_mut()))
}

/// Loaded library backed by the fake functions.
pub fn library() -> Arc<VmmLibrary> {
	library_from(FakeSymbols::complete())
}

pub fn library_from(symbols: FakeSymbols) -> Arc<VmmLibrary> {
	unsafe {
		let functions = VmmFunctions::resolve(&symbols).expect("fake symbols are complete");
		VmmLibrary::from_functions(functions)
	}
}

pub struct FakeSymbols(HashMap<&'static str, *const c_void>);
impl FakeSymbols {
	pub fn complete() -> Self {
		let mut map: HashMap<&'static str, *const c_void> = HashMap::new();
		map.insert("VMMDLL_Initialize", fake_initialize as InitializeFn as *const c_void);
		map.insert("VMMDLL_Close", fake_close as CloseFn as *const c_void);
		map.insert("VMMDLL_CloseAll", fake_close_all as CloseAllFn as *const c_void);
		map.insert("VMMDLL_PidGetFromName", fake_pid_get_from_name as PidGetFromNameFn as *const c_void);
		map.insert(
			"VMMDLL_Map_GetModuleFromNameU",
			fake_get_module_from_name as MapGetModuleFromNameFn as *const c_void
		);
		map.insert(
			"VMMDLL_ProcessGetProcAddressU",
			fake_get_proc_address as ProcessGetProcAddressFn as *const c_void
		);
		map.insert("VMMDLL_MemRead", fake_mem_read as MemReadFn as *const c_void);
		map.insert("VMMDLL_MemWrite", fake_mem_write as MemWriteFn as *const c_void);
		map.insert("VMMDLL_MemReadEx", fake_mem_read_ex as MemReadExFn as *const c_void);
		map.insert("VMMDLL_MemFree", fake_mem_free as MemFreeFn as *const c_void);
		map.insert(
			"VMMDLL_Scatter_Initialize",
			fake_scatter_initialize as ScatterInitializeFn as *const c_void
		);
		map.insert("VMMDLL_Scatter_Prepare", fake_scatter_prepare as ScatterPrepareFn as *const c_void);
		map.insert(
			"VMMDLL_Scatter_PrepareEx",
			fake_scatter_prepare_ex as ScatterPrepareExFn as *const c_void
		);
		map.insert(
			"VMMDLL_Scatter_PrepareWrite",
			fake_scatter_prepare_write as ScatterPrepareWriteFn as *const c_void
		);
		map.insert("VMMDLL_Scatter_Execute", fake_scatter_execute as ScatterExecuteFn as *const c_void);
		map.insert(
			"VMMDLL_Scatter_ExecuteRead",
			fake_scatter_execute_read as ScatterExecuteFn as *const c_void
		);
		map.insert("VMMDLL_Scatter_Read", fake_scatter_read as ScatterReadFn as *const c_void);
		map.insert("VMMDLL_Scatter_Clear", fake_scatter_clear as ScatterClearFn as *const c_void);
		map.insert(
			"VMMDLL_Scatter_CloseHandle",
			fake_scatter_close_handle as ScatterCloseHandleFn as *const c_void
		);

		FakeSymbols(map)
	}

	pub fn without(mut self, name: &str) -> Self {
		self.0.remove(name);
		self
	}
}
impl SymbolSource for FakeSymbols {
	fn symbol(&self, name: &CStr) -> Option<*const c_void> {
		self.0.get(name.to_str().ok()?).copied()
	}
}

unsafe fn string_arg<'a>(ptr: *const c_char) -> &'a str {
	if ptr.is_null() {
		return ""
	}

	CStr::from_ptr(ptr).to_str().unwrap_or("")
}

fn to_bool(value: bool) -> BOOL {
	if value { TRUE } else { FALSE }
}

unsafe extern "C" fn fake_initialize(argc: u32, argv: *mut *mut c_char) -> RawVmmHandle {
	let args: Vec<String> = (0 .. argc as usize)
		.map(|i| string_arg(*argv.add(i)).to_string())
		.collect();

	let fail = args.iter().any(|a| a == FAIL_ARG);
	with_state(|state| state.last_argv = args);

	if fail {
		std::ptr::null_mut()
	} else {
		FAKE_VMM as RawVmmHandle
	}
}

unsafe extern "C" fn fake_close(vmm: RawVmmHandle) {
	with_state(|state| state.closed.push(vmm as usize));
}

unsafe extern "C" fn fake_close_all() {
	with_state(|state| state.close_all_calls += 1);
}

unsafe extern "C" fn fake_pid_get_from_name(vmm: RawVmmHandle, name: *const c_char, pid: *mut u32) -> BOOL {
	if vmm as usize != FAKE_VMM || !string_arg(name).eq_ignore_ascii_case(FAKE_PROCESS) {
		return FALSE
	}

	*pid = FAKE_PID;
	TRUE
}

#[repr(C)]
struct FakeModule {
	entry: ModuleEntry,
	// keep the strings the entry points into alive
	#[allow(dead_code)]
	text: CString,
	#[allow(dead_code)]
	full_name: CString
}

unsafe extern "C" fn fake_get_module_from_name(
	vmm: RawVmmHandle,
	pid: u32,
	module_name: *const c_char,
	entry: *mut *mut ModuleEntry,
	_flags: u32
) -> BOOL {
	if vmm as usize != FAKE_VMM || pid != FAKE_PID || !string_arg(module_name).eq_ignore_ascii_case(FAKE_PROCESS) {
		return FALSE
	}

	let text = CString::new(FAKE_PROCESS).unwrap();
	let full_name = CString::new(FAKE_MODULE_PATH).unwrap();
	let module = Box::new(FakeModule {
		entry: ModuleEntry {
			va_base: MODULE_BASE,
			va_entry: MODULE_ENTRY,
			image_size: MODULE_SIZE as u32,
			wow64: FALSE,
			text: text.as_ptr(),
			_reserved3: 0,
			_reserved4: 0,
			full_name: full_name.as_ptr(),
			module_type: VMMDLL_MODULE_TP_NORMAL,
			file_size_raw: 0x1800,
			section_count: 5,
			eat_count: 1,
			iat_count: 42,
			_reserved2: 0,
			_reserved1: [0; 2]
		},
		text,
		full_name
	});

	*entry = Box::into_raw(module) as *mut ModuleEntry;
	TRUE
}

unsafe extern "C" fn fake_mem_free(memory: *mut c_void) {
	if memory.is_null() {
		return
	}

	drop(Box::from_raw(memory as *mut FakeModule));
	with_state(|state| state.freed += 1);
}

unsafe extern "C" fn fake_get_proc_address(
	vmm: RawVmmHandle,
	pid: u32,
	module_name: *const c_char,
	function_name: *const c_char
) -> u64 {
	let found = vmm as usize == FAKE_VMM
		&& pid == FAKE_PID
		&& string_arg(module_name).eq_ignore_ascii_case(FAKE_PROCESS)
		&& string_arg(function_name) == FAKE_EXPORT;

	if found { EXPORT_ADDRESS } else { 0 }
}

unsafe extern "C" fn fake_mem_read(vmm: RawVmmHandle, pid: u32, address: u64, buffer: *mut u8, size: u32) -> BOOL {
	let buffer = std::slice::from_raw_parts_mut(buffer, size as usize);

	with_state(|state| {
		let complete = vmm as usize == FAKE_VMM && state.mapped(pid, address, size).map(|r| r.len()) == Some(size as usize);
		if complete {
			state.read_into(pid, address, buffer);
		}

		to_bool(complete)
	})
}

unsafe extern "C" fn fake_mem_write(vmm: RawVmmHandle, pid: u32, address: u64, data: *const u8, size: u32) -> BOOL {
	let data = std::slice::from_raw_parts(data, size as usize);

	with_state(|state| to_bool(vmm as usize == FAKE_VMM && state.write_from(pid, address, data)))
}

unsafe extern "C" fn fake_mem_read_ex(
	vmm: RawVmmHandle,
	pid: u32,
	address: u64,
	buffer: *mut u8,
	size: u32,
	bytes_read: *mut u32,
	flags: u64
) -> BOOL {
	let buffer = std::slice::from_raw_parts_mut(buffer, size as usize);

	let (read, overreport) = with_state(|state| {
		state.last_read_flags = Some(flags);
		if vmm as usize != FAKE_VMM {
			return (0, 0)
		}

		let read = state.read_into(pid, address, buffer);
		let read = if flags & VMMDLL_FLAG_ZEROPAD_ON_FAIL != 0 {
			buffer[read ..].fill(0);
			buffer.len()
		} else {
			read
		};

		(read, state.read_ex_overreport)
	});

	if !bytes_read.is_null() {
		*bytes_read = read as u32 + overreport;
	}

	to_bool(read == size as usize)
}

fn with_scatter<R>(scatter: RawScatterHandle, default: R, fun: impl FnOnce(&mut FakeScatter) -> R) -> R {
	with_state(|state| match state.scatters.get_mut(&(scatter as usize)) {
		None => default,
		Some(s) => fun(s)
	})
}

unsafe extern "C" fn fake_scatter_initialize(vmm: RawVmmHandle, pid: u32, flags: u32) -> RawScatterHandle {
	if vmm as usize != FAKE_VMM || pid != FAKE_PID {
		return std::ptr::null_mut()
	}

	with_state(|state| {
		let id = state.next_scatter;
		state.next_scatter += 1;
		state.scatters.insert(
			id,
			FakeScatter {
				pid,
				flags,
				..Default::default()
			}
		);

		id as RawScatterHandle
	})
}

unsafe extern "C" fn fake_scatter_prepare(scatter: RawScatterHandle, address: u64, size: u32) -> BOOL {
	if address == REJECTED_ADDRESS {
		return FALSE
	}

	with_scatter(scatter, FALSE, |s| {
		s.prepared.push(PreparedRead {
			address,
			size,
			buffer: std::ptr::null_mut(),
			bytes_read: std::ptr::null_mut()
		});

		TRUE
	})
}

unsafe extern "C" fn fake_scatter_prepare_ex(
	scatter: RawScatterHandle,
	address: u64,
	size: u32,
	buffer: *mut u8,
	bytes_read: *mut u32
) -> BOOL {
	if address == REJECTED_ADDRESS {
		return FALSE
	}

	with_scatter(scatter, FALSE, |s| {
		s.prepared.push(PreparedRead {
			address,
			size,
			buffer,
			bytes_read
		});

		TRUE
	})
}

unsafe extern "C" fn fake_scatter_prepare_write(
	scatter: RawScatterHandle,
	address: u64,
	data: *const u8,
	size: u32
) -> BOOL {
	if address == REJECTED_ADDRESS {
		return FALSE
	}

	let data = std::slice::from_raw_parts(data, size as usize).to_vec();

	with_scatter(scatter, FALSE, |s| {
		s.writes.push((address, data));
		TRUE
	})
}

fn execute(scatter: RawScatterHandle, with_writes: bool) -> BOOL {
	with_state(|state| {
		let Some(mut s) = state.scatters.remove(&(scatter as usize)) else {
			return FALSE
		};
		if s.failing {
			state.scatters.insert(scatter as usize, s);
			return FALSE
		}

		if with_writes {
			for (address, data) in s.writes.drain(..) {
				state.write_from(s.pid, address, &data);
			}
		}

		for prepared in s.prepared.iter() {
			if prepared.buffer.is_null() {
				continue
			}

			let buffer = unsafe { std::slice::from_raw_parts_mut(prepared.buffer, prepared.size as usize) };
			let read = state.read_into(s.pid, prepared.address, buffer);
			if !prepared.bytes_read.is_null() {
				unsafe {
					*prepared.bytes_read = read as u32;
				}
			}
		}
		s.executed = true;

		state.scatters.insert(scatter as usize, s);
		TRUE
	})
}

unsafe extern "C" fn fake_scatter_execute(scatter: RawScatterHandle) -> BOOL {
	execute(scatter, true)
}

unsafe extern "C" fn fake_scatter_execute_read(scatter: RawScatterHandle) -> BOOL {
	execute(scatter, false)
}

unsafe extern "C" fn fake_scatter_read(
	scatter: RawScatterHandle,
	address: u64,
	size: u32,
	buffer: *mut u8,
	bytes_read: *mut u32
) -> BOOL {
	let buffer = std::slice::from_raw_parts_mut(buffer, size as usize);

	let read = with_state(|state| {
		let Some(s) = state.scatters.get(&(scatter as usize)) else {
			return None
		};
		let covered = s.executed
			&& s.prepared.iter().any(|p| p.address <= address && address + size as u64 <= p.address + p.size as u64);
		if !covered {
			return None
		}

		Some(state.read_into(s.pid, address, buffer))
	});

	if let Some(read) = read {
		if !bytes_read.is_null() {
			*bytes_read = read as u32;
		}
	}

	to_bool(read.is_some())
}

unsafe extern "C" fn fake_scatter_clear(scatter: RawScatterHandle, pid: u32, flags: u32) -> BOOL {
	with_scatter(scatter, FALSE, |s| {
		if s.failing {
			return FALSE
		}

		s.pid = pid;
		s.flags = flags;
		s.prepared.clear();
		s.writes.clear();
		s.executed = false;
		s.clears += 1;

		TRUE
	})
}

unsafe extern "C" fn fake_scatter_close_handle(scatter: RawScatterHandle) {
	with_state(|state| {
		state.scatters.remove(&(scatter as usize));
		state.scatters_closed.push(scatter as usize);
	});
}
