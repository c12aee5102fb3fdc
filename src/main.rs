#![deny(rust_2018_idioms, warnings)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
	clippy::cast_precision_loss,
	clippy::default_trait_access,
	clippy::float_cmp,
	clippy::module_name_repetitions,
	clippy::too_many_lines,
)]

mod config;
mod exec;
mod status;

mod memory;
mod vm_stat;

use std::io::Write;


fn main() -> Result<(), Error> {
	init_tracing()?;

	let config = config::Config::load()?;


	let stdout = std::io::stdout();
	let mut stdout = stdout.lock();


	let exec: Box<dyn exec::Exec> = match &config.ssh {
		Some(ssh) => {
			tracing::info!(hostname = &*ssh.hostname, "reading memory statistics over ssh");
			Box::new(exec::Remote(connect(&ssh.hostname, &ssh.username, Some(config.command_timeout_ms))?))
		},
		None => Box::new(exec::Local::new(config.command_timeout())),
	};


	let total = exec::sysctl_hw_memsize::run(&*exec)?;
	tracing::debug!(total, "read total physical memory");


	let mut status = status::Status::new(config.warning_threshold);

	if config.output == config::Output::Text {
		stdout.write_all(status::PLACEHOLDER.as_bytes())?;
		stdout.flush()?;
	}


	loop {
		let now = std::time::SystemTime::now();


		match refresh(&*exec, total, config.pressure) {
			Ok((snapshot, pressure_percent)) => match config.output {
				config::Output::Text => {
					let line = status.render(snapshot.usage_percent, pressure_percent);
					write!(stdout, "\r\x1B[K{line}")?;
				},

				config::Output::Json => {
					serde_json::to_writer(&mut stdout, &Reading { snapshot: &snapshot, display_pressure_percent: pressure_percent })?;
					writeln!(stdout)?;
				},
			},

			// The previous line stays on screen until the next successful refresh.
			Err(err) => tracing::warn!(error = ?err, "skipping refresh"),
		}

		stdout.flush()?;


		let next = now + config.interval();
		let now = std::time::SystemTime::now();
		if let Ok(sleep_for) = next.duration_since(now) {
			std::thread::sleep(sleep_for);
		}
	}
}

/// Returns the snapshot and the pressure to display, which depends on `pressure`.
fn refresh(exec: &dyn exec::Exec, total: u64, pressure: config::Pressure) -> Result<(memory::MemorySnapshot, f64), memory::Error> {
	let raw = exec::vm_stat::run(exec)?;
	let vm_stat = vm_stat::VmStat::parse(&raw, total)?;
	if !vm_stat.other.is_empty() {
		tracing::trace!(counters = ?vm_stat.other, "unrecognized vm_stat counters");
	}

	let snapshot = memory::MemorySnapshot::derive(&vm_stat)?;

	let pressure_percent = match pressure {
		config::Pressure::Derived => snapshot.pressure_percent,

		config::Pressure::System => match exec::memory_pressure::get_system_pressure(exec) {
			Ok(Some(pressure_percent)) => pressure_percent,

			Ok(None) => {
				tracing::debug!("memory_pressure output has no system-wide free percentage, using derived pressure");
				snapshot.pressure_percent
			},

			Err(err) => {
				tracing::debug!(error = ?err, "could not run memory_pressure, using derived pressure");
				snapshot.pressure_percent
			},
		},
	};

	Ok((snapshot, pressure_percent))
}

/// One line of JSON output. `display_pressure_percent` is the figure the status line shows.
#[derive(Debug, serde_derive::Serialize)]
struct Reading<'a> {
	#[serde(flatten)]
	snapshot: &'a memory::MemorySnapshot,
	display_pressure_percent: f64,
}

struct Error(Box<dyn std::error::Error>, backtrace::Backtrace);

impl std::fmt::Debug for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "{}", self.0)?;

		let mut source = self.0.source();
		while let Some(err) = source {
			writeln!(f, "caused by: {err}")?;
			source = err.source();
		}

		writeln!(f)?;

		writeln!(f, "{:?}", self.1)?;

		Ok(())
	}
}

impl<E> From<E> for Error where E: Into<Box<dyn std::error::Error>> {
	fn from(err: E) -> Self {
		Error(err.into(), Default::default())
	}
}

fn init_tracing() -> Result<(), Error> {
	let filter =
		tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new("vmstat_dashboard=info"))?;

	// stdout belongs to the dashboard
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

	let use_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
	let result = if use_json { builder.json().try_init() } else { builder.try_init() };
	result.map_err(|err| err as Box<dyn std::error::Error>)?;

	Ok(())
}

fn connect(hostname: &str, username: &str, timeout_ms: Option<u32>) -> Result<ssh2::Session, Error> {
	let conn = std::net::TcpStream::connect(hostname)?;

	let mut session = ssh2::Session::new()?;
	session.set_tcp_stream(conn);
	if let Some(timeout_ms) = timeout_ms {
		session.set_timeout(timeout_ms);
	}

	session.handshake()?;
	session.userauth_agent(username)?;

	Ok(session)
}

#[cfg(test)]
mod tests {
	use crate::exec::tests::FakeExec;

	const VM_STAT: &str = "\
Mach Virtual Memory Statistics: (page size of 4096 bytes)
Pages free:                                   7.
Pages active:                               100.
Pages inactive:                              50.
Pages speculative:                            0.
Pages wired down:                            20.
Pages purgeable:                              5.
File-backed pages:                            5.
Pages occupied by compressor:                10.
Pages borrowed:                               3.
";

	#[test]
	fn refresh_derived_pressure() {
		let exec = FakeExec::default().with("/usr/bin/vm_stat", VM_STAT);
		let (snapshot, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::Derived).unwrap();
		assert_eq!(snapshot.used, 696_320);
		assert_eq!(snapshot.app, 573_440);
		assert_eq!(pressure_percent, snapshot.pressure_percent);
	}

	#[test]
	fn refresh_system_pressure() {
		let exec =
			FakeExec::default()
			.with("/usr/bin/vm_stat", VM_STAT)
			.with("/usr/bin/memory_pressure", "System-wide memory free percentage: 75%\n");
		let (_, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::System).unwrap();
		assert!((pressure_percent - 0.25).abs() < 1e-12);
	}

	#[test]
	fn refresh_system_pressure_falls_back_to_derived() {
		let exec = FakeExec::default().with("/usr/bin/vm_stat", VM_STAT);
		let (snapshot, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::System).unwrap();
		assert_eq!(pressure_percent, snapshot.pressure_percent);

		let exec =
			FakeExec::default()
			.with("/usr/bin/vm_stat", VM_STAT)
			.with("/usr/bin/memory_pressure", "The system has 1000000 bytes\n");
		let (snapshot, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::System).unwrap();
		assert_eq!(pressure_percent, snapshot.pressure_percent);
	}

	#[test]
	fn refresh_failures() {
		match super::refresh(&FakeExec::default(), 1_000_000, crate::config::Pressure::Derived) {
			Err(crate::memory::Error::IoFailure(_)) => (),
			result => panic!("unexpected result {:?}", result),
		}

		let exec = FakeExec::default().with("/usr/bin/vm_stat", VM_STAT);
		match super::refresh(&exec, 0, crate::config::Pressure::Derived) {
			Err(crate::memory::Error::InvalidInput(_)) => (),
			result => panic!("unexpected result {:?}", result),
		}
	}

	#[test]
	fn reading_json() {
		let exec = FakeExec::default().with("/usr/bin/vm_stat", VM_STAT);
		let (snapshot, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::Derived).unwrap();
		let json = serde_json::to_value(&super::Reading { snapshot: &snapshot, display_pressure_percent: pressure_percent }).unwrap();
		assert_eq!(json["used"], 696_320);
		assert_eq!(json["free"], 303_680);
		assert_eq!(json["cache"], 40960);
		assert_eq!(json["display_pressure_percent"], json["pressure_percent"]);
		assert!(json.get("pagesBorrowed").is_none());
		assert!(json.get("snapshot").is_none());
	}

	#[test]
	fn reading_json_carries_system_pressure() {
		let exec =
			FakeExec::default()
			.with("/usr/bin/vm_stat", VM_STAT)
			.with("/usr/bin/memory_pressure", "System-wide memory free percentage: 10%\n");
		let (snapshot, pressure_percent) = super::refresh(&exec, 1_000_000, crate::config::Pressure::System).unwrap();
		let json = serde_json::to_value(&super::Reading { snapshot: &snapshot, display_pressure_percent: pressure_percent }).unwrap();
		assert!((json["display_pressure_percent"].as_f64().unwrap() - 0.9).abs() < 1e-12);
		assert!((json["pressure_percent"].as_f64().unwrap() - 0.12288).abs() < 1e-12);
	}

	#[test]
	fn tracing_init() {
		super::init_tracing().unwrap();
	}
}
