use anyhow::Context;

use vmmdll::prelude::{InitArgs, MemoryAccess, Vmm, VmmLibrary};

fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
		.format_timestamp(None)
		.init();

	// simple cli parse
	let (device, process_name, module_name) = {
		let mut it = std::env::args().skip(1);

		let device = it.next().unwrap_or_else(|| "fpga".to_string());
		let process_name = it.next().unwrap_or_else(|| "explorer.exe".to_string());
		let module_name = it.next().unwrap_or_else(|| process_name.clone());

		(device, process_name, module_name)
	};
	log::info!("device: {}", device);

	// leechcore and vmm are expected in ./lib unless VMMDLL_LIBRARY_DIR says otherwise
	let library = VmmLibrary::load_default().context("could not load the native libraries")?;
	let vmm = Vmm::initialize(library, &InitArgs::new().device(device)).context("could not initialize vmm")?;

	let process = vmm.process_by_name(&process_name)?;
	println!("{} pid: {}", process_name, process.pid());

	let module = process.module(&module_name)?;
	println!("{}", module);
	println!("\ttype: {:?}, wow64: {}", module.module_type, module.wow64);
	println!(
		"\tsections: {}, exports: {}, imports: {}",
		module.section_count, module.eat_count, module.iat_count
	);

	let header = process.read_vec(module.base, 16).context("could not read module header")?;
	println!("\t[0x{}]: {:02x?}", module.base, header);

	Ok(())
}
