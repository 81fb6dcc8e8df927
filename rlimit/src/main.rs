//! Raises `RLIMIT_MEMLOCK` to infinity, drops privileges back to the
//! real group and user IDs, then execs the named program with its
//! remaining arguments.
//!
//! This is the setuid-root helper a resident locker like `binder` is
//! meant to be launched through: it grants the memlock headroom the
//! scan needs, then gives up root before the untrusted (from its own
//! point of view) target program ever runs.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

fn main() {
	env_logger::init();

	let args: Vec<String> = std::env::args().collect();
	if args.len() < 2 {
		eprintln!("usage: rlimit <program> [args...]");
		std::process::exit(1);
	}

	let limit = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	if unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &limit) } != 0 {
		log::error!("setrlimit(RLIMIT_MEMLOCK) failed: {}", std::io::Error::last_os_error());
		std::process::exit(2);
	}

	// Drop group privileges before user privileges: once the uid is no
	// longer root, a process can no longer change its gid back.
	let real_gid = unsafe { libc::getgid() };
	if unsafe { libc::setgid(real_gid) } != 0 {
		log::error!("setgid failed: {}", std::io::Error::last_os_error());
		std::process::exit(3);
	}

	let real_uid = unsafe { libc::getuid() };
	if unsafe { libc::setuid(real_uid) } != 0 {
		log::error!("setuid failed: {}", std::io::Error::last_os_error());
		std::process::exit(4);
	}

	let program = CString::new(std::ffi::OsStr::new(&args[1]).as_bytes()).expect("program name");
	let exec_args: Vec<CString> = args[1..]
		.iter()
		.map(|a| CString::new(std::ffi::OsStr::new(a).as_bytes()).expect("argument"))
		.collect();
	let mut argv: Vec<*const libc::c_char> = exec_args.iter().map(|a| a.as_ptr()).collect();
	argv.push(std::ptr::null());

	unsafe {
		libc::execvp(program.as_ptr(), argv.as_ptr());
	}

	// execvp only returns on failure.
	log::error!("exec of {} failed: {}", args[1], std::io::Error::last_os_error());
	std::process::exit(5);
}
