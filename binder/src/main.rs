use std::path::PathBuf;
use std::process::ExitCode;

use binder::Driver;
use log::{error, info};

fn main() -> ExitCode {
	env_logger::init();

	let seeds: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
	if seeds.is_empty() {
		eprintln!("usage: binder <path> [<path>...]");
		return ExitCode::from(1);
	}

	for seed in &seeds {
		info!("accepted seed path {}", seed.display());
	}

	let mut driver = Driver::new(seeds);
	if let Err(e) = driver.run() {
		error!("scan terminated: {}", e);
		return ExitCode::from(1);
	}

	ExitCode::SUCCESS
}
