#[derive(Debug, serde_derive::Deserialize)]
#[serde(default)]
pub(crate) struct Config {
	pub(crate) interval_ms: u64,
	pub(crate) command_timeout_ms: u32,
	pub(crate) warning_threshold: f64,
	pub(crate) output: Output,
	pub(crate) pressure: Pressure,
	pub(crate) ssh: Option<Ssh>,
}

impl Config {
	pub(crate) fn load() -> Result<Self, crate::Error> {
		let mut path = dirs::config_dir().ok_or("config dir not defined")?;
		path.push("vmstat-dashboard");
		path.push("config.yaml");
		Self::load_from(&path)
	}

	fn load_from(path: &std::path::Path) -> Result<Self, crate::Error> {
		let f = match std::fs::File::open(path) {
			Ok(f) => f,
			Err(ref err) if err.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "config file not found, using defaults");
				return Ok(Default::default());
			},
			Err(err) => return Err(err.into()),
		};
		let result: Self = serde_yaml::from_reader(f)?;
		if result.interval_ms == 0 {
			return Err("interval_ms must be positive".into());
		}
		Ok(result)
	}

	pub(crate) fn interval(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.interval_ms)
	}

	pub(crate) fn command_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.command_timeout_ms.into())
	}
}

impl Default for Config {
	fn default() -> Self {
		Config {
			interval_ms: 5000,
			command_timeout_ms: 5000,
			warning_threshold: 85.,
			output: Output::Text,
			pressure: Pressure::Derived,
			ssh: None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, serde_derive::Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Output {
	Text,
	Json,
}

#[derive(Clone, Copy, Debug, PartialEq, serde_derive::Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Pressure {
	/// Wired and compressed memory as a fraction of total memory.
	Derived,

	/// The system-wide figure from `memory_pressure`.
	System,
}

#[derive(Debug, serde_derive::Deserialize)]
pub(crate) struct Ssh {
	pub(crate) hostname: String,
	pub(crate) username: String,
}
