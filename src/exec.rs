pub(crate) trait Exec {
	fn exec(&self, command: &str) -> std::io::Result<Vec<u8>>;
}

#[derive(Debug)]
pub(crate) struct Local {
	timeout: std::time::Duration,
}

impl Local {
	pub(crate) fn new(timeout: std::time::Duration) -> Self {
		Local {
			timeout,
		}
	}
}

impl Exec for Local {
	fn exec(&self, command: &str) -> std::io::Result<Vec<u8>> {
		let mut child =
			std::process::Command::new("/bin/sh")
			.arg("-c")
			.arg(command)
			.stdin(std::process::Stdio::null())
			.stdout(std::process::Stdio::piped())
			.stderr(std::process::Stdio::null())
			.spawn()?;

		let mut stdout = child.stdout.take().ok_or_else(|| std::io::Error::other("child has no stdout"))?;
		let reader = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
			let mut result = vec![];
			let _ = std::io::Read::read_to_end(&mut stdout, &mut result)?;
			Ok(result)
		});

		let deadline = std::time::Instant::now() + self.timeout;
		let status = loop {
			match child.try_wait() {
				Ok(Some(status)) => break status,
				Ok(None) => (),
				Err(err) => {
					let _ = child.kill();
					let _ = child.wait();
					return Err(err);
				},
			}

			if std::time::Instant::now() >= deadline {
				tracing::debug!(command, timeout = ?self.timeout, "killing hung command");
				// The reader thread is left detached. It ends once nothing holds the pipe open anymore.
				let _ = child.kill();
				let _ = child.wait();
				return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, format!("{:?} did not finish in {:?}", command, self.timeout)));
			}

			std::thread::sleep(std::time::Duration::from_millis(10));
		};

		let stdout = reader.join().map_err(|_| std::io::Error::other("stdout reader panicked"))??;

		if !status.success() {
			return Err(std::io::Error::other(format!("{command:?} exited with {status}")));
		}

		Ok(stdout)
	}
}

pub(crate) struct Remote(pub(crate) ssh2::Session);

impl Exec for Remote {
	fn exec(&self, command: &str) -> std::io::Result<Vec<u8>> {
		let mut channel = self.0.channel_session()?;
		channel.exec(command)?;

		let mut result = vec![];
		let _ = std::io::Read::read_to_end(&mut channel, &mut result)?;

		channel.wait_close()?;
		let exit_status = channel.exit_status()?;
		if exit_status != 0 {
			return Err(std::io::Error::other(format!("{command:?} exited with status {exit_status}")));
		}

		Ok(result)
	}
}

pub(crate) mod memory_pressure {
	const PREFIX: &str = "System-wide memory free percentage:";

	/// Returns the system-wide pressure as a fraction, ie one minus the free fraction that `memory_pressure` reports.
	pub(crate) fn get_system_pressure(exec: &dyn super::Exec) -> Result<Option<f64>, crate::memory::Error> {
		let output = exec.exec("/usr/bin/memory_pressure")?;
		let output = String::from_utf8(output).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
		Ok(parse(&output))
	}

	fn parse(output: &str) -> Option<f64> {
		output.lines().find_map(|line| {
			let index = line.find(PREFIX)?;
			let value = line[(index + PREFIX.len())..].trim().trim_end_matches('%');
			let free_percent: u8 = value.parse().ok()?;
			if free_percent > 100 {
				return None;
			}

			Some(f64::from(100 - free_percent) / 100.)
		})
	}

	#[cfg(test)]
	mod tests {
		#[test]
		fn parse() {
			let output = "\
The system has 17179869184 (4194304 pages with a page size of 4096).

Stats:
Pages free: 11853
Pages purgeable: 13186

Swap I/O:
Swapins: 106733
Swapouts: 162302

System-wide memory free percentage: 64%
";
			let pressure = super::parse(output).unwrap();
			assert!((pressure - 0.36).abs() < 1e-12);

			assert_eq!(super::parse("Stats:\nPages free: 11853\n"), None);
			assert_eq!(super::parse("System-wide memory free percentage: lots\n"), None);
			assert_eq!(super::parse("System-wide memory free percentage: 101%\n"), None);
		}
	}
}

pub(crate) mod sysctl_hw_memsize {
	pub(crate) fn run(exec: &dyn super::Exec) -> Result<u64, crate::memory::Error> {
		let output = exec.exec("/usr/sbin/sysctl -n hw.memsize")?;
		let output = String::from_utf8(output).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
		let total = output.trim().parse().map_err(|err| crate::memory::Error::InvalidInput(format!("hw.memsize {:?} is not a number: {}", output.trim(), err)))?;
		if total == 0 {
			return Err(crate::memory::Error::InvalidInput("hw.memsize is zero".to_owned()));
		}
		Ok(total)
	}
}

pub(crate) mod vm_stat {
	pub(crate) fn run(exec: &dyn super::Exec) -> Result<Vec<u8>, crate::memory::Error> {
		let output = exec.exec("/usr/bin/vm_stat")?;
		Ok(output)
	}
}
