pub(crate) const PLACEHOLDER: &str = "RAM: ...";

#[derive(Debug)]
pub(crate) struct Status {
	warning_threshold: f64,
	highlighted: bool,
}

impl Status {
	/// `warning_threshold` is in percent, ie 85. for 85%.
	pub(crate) fn new(warning_threshold: f64) -> Self {
		Status {
			warning_threshold,
			highlighted: false,
		}
	}

	pub(crate) fn render(&mut self, usage_percent: f64, pressure_percent: f64) -> String {
		let usage_percent = usage_percent * 100.;
		let pressure_percent = pressure_percent * 100.;

		let highlighted = usage_percent >= self.warning_threshold;
		if highlighted != self.highlighted {
			if highlighted {
				tracing::warn!(usage_percent, threshold = self.warning_threshold, "memory usage crossed the warning threshold");
			}
			else {
				tracing::info!(usage_percent, threshold = self.warning_threshold, "memory usage back under the warning threshold, restored");
			}
			self.highlighted = highlighted;
		}

		let color = get_color(highlighted);
		format!("\x1B[{color}mRAM: {usage_percent:.2}% | Pressure: {pressure_percent:.0}%\x1B[0m")
	}
}

fn get_color(highlighted: bool) -> &'static str {
	if highlighted {
		"1;37;41"
	}
	else {
		"0;37"
	}
}
