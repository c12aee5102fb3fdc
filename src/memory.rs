#[derive(Debug)]
pub(crate) enum Error {
	IoFailure(std::io::Error),
	InvalidInput(String),
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::IoFailure(_) => f.write_str("could not read memory statistics"),
			Error::InvalidInput(message) => write!(f, "invalid input: {message}"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::IoFailure(err) => Some(err),
			Error::InvalidInput(_) => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::IoFailure(err)
	}
}

/// Byte counts are computed with saturating arithmetic. In particular `used` is clamped at zero
/// when purgeable and file-backed pages outnumber the resident ones, and `app` and `free` are
/// clamped likewise. The two ratios are not clamped.
#[derive(Clone, Copy, Debug, PartialEq, serde_derive::Serialize)]
pub(crate) struct MemorySnapshot {
	pub(crate) total: u64,
	pub(crate) used: u64,
	pub(crate) free: u64,
	pub(crate) active: u64,
	pub(crate) inactive: u64,
	pub(crate) wired: u64,
	pub(crate) compressed: u64,
	pub(crate) app: u64,
	pub(crate) cache: u64,
	pub(crate) usage_percent: f64,
	pub(crate) pressure_percent: f64,
}

impl MemorySnapshot {
	pub(crate) fn derive(vm_stat: &crate::vm_stat::VmStat) -> Result<Self, Error> {
		let total = vm_stat.total;
		if total == 0 {
			return Err(Error::InvalidInput("total physical memory is zero".to_owned()));
		}

		let bytes = |pages: u64| pages.saturating_mul(vm_stat.page_size);

		let active = bytes(vm_stat.pages_active);
		let inactive = bytes(vm_stat.pages_inactive);
		let speculative = bytes(vm_stat.pages_speculative);
		let wired = bytes(vm_stat.pages_wired_down);
		let compressed = bytes(vm_stat.pages_occupied_by_compressor);
		let file_backed = bytes(vm_stat.file_backed_pages);
		let purgeable = bytes(vm_stat.pages_purgeable);

		let resident = active.saturating_add(inactive).saturating_add(speculative).saturating_add(wired).saturating_add(compressed);
		let cache = purgeable.saturating_add(file_backed);
		let non_reclaimable = wired.saturating_add(compressed);

		let used = resident.saturating_sub(cache);
		let free = total.saturating_sub(used);
		let app = used.saturating_sub(non_reclaimable);

		let usage_percent = used as f64 / total as f64;
		let pressure_percent = non_reclaimable as f64 / total as f64;

		Ok(MemorySnapshot {
			total,
			used,
			free,
			active,
			inactive,
			wired,
			compressed,
			app,
			cache,
			usage_percent,
			pressure_percent,
		})
	}
}
