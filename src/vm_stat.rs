const DEFAULT_PAGE_SIZE: u64 = 4096;

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct VmStat {
	pub(crate) total: u64,
	pub(crate) page_size: u64,

	pub(crate) pages_active: u64,
	pub(crate) pages_inactive: u64,
	pub(crate) pages_wired_down: u64,
	pub(crate) pages_speculative: u64,
	pub(crate) pages_occupied_by_compressor: u64,
	pub(crate) file_backed_pages: u64,
	pub(crate) pages_purgeable: u64,

	/// Counters with labels not in the table below, keyed by normalized label.
	pub(crate) other: std::collections::BTreeMap<String, u64>,
}

impl VmStat {
	pub(crate) fn parse(raw: &[u8], total: u64) -> Result<Self, crate::memory::Error> {
		let text = std::str::from_utf8(raw).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;

		let mut result = VmStat {
			total,
			page_size: DEFAULT_PAGE_SIZE,
			..Default::default()
		};

		let mut lines = text.lines();

		if let Some(header) = lines.next() {
			if let Some(page_size) = parse_page_size(header) {
				result.page_size = page_size;
			}
		}

		for line in lines {
			let Some((label, value)) = parse_counter(line) else {
				continue;
			};

			let field = match &*label {
				"pagesActive" => &mut result.pages_active,
				"pagesInactive" => &mut result.pages_inactive,
				"pagesWiredDown" => &mut result.pages_wired_down,
				"pagesSpeculative" => &mut result.pages_speculative,
				"pagesOccupiedByCompressor" => &mut result.pages_occupied_by_compressor,
				"fileBackedPages" => &mut result.file_backed_pages,
				"pagesPurgeable" => &mut result.pages_purgeable,
				_ => {
					let _ = result.other.insert(label, value);
					continue;
				},
			};
			*field = value;
		}

		Ok(result)
	}
}

fn parse_page_size(header: &str) -> Option<u64> {
	let header = header.to_lowercase();
	header.match_indices("page").find_map(|(index, _)| parse_page_size_at(&header[index..]))
}

/// Matches `page size of <N> bytes` at the start of `s`, with exactly one whitespace character between words.
fn parse_page_size_at(s: &str) -> Option<u64> {
	let s = s.strip_prefix("page")?;
	let s = strip_whitespace_char(s)?.strip_prefix("size")?;
	let s = strip_whitespace_char(s)?.strip_prefix("of")?;
	let s = strip_whitespace_char(s)?;
	let digits_len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
	let (digits, s) = s.split_at(digits_len);
	let _ = strip_whitespace_char(s)?.strip_prefix("bytes")?;

	let page_size: u64 = digits.parse().ok()?;
	if page_size > 0 {
		Some(page_size)
	}
	else {
		None
	}
}

fn strip_whitespace_char(s: &str) -> Option<&str> {
	let mut chars = s.chars();
	if chars.next()?.is_whitespace() {
		Some(chars.as_str())
	}
	else {
		None
	}
}

fn parse_counter(line: &str) -> Option<(String, u64)> {
	let index = line.find(':')?;
	let label = normalize_label(&line[..index]);
	if label.is_empty() {
		return None;
	}

	let value = line[(index + 1)..].trim().trim_end_matches('.');
	let value = value.parse().ok()?;

	Some((label, value))
}

pub(crate) fn normalize_label(raw: &str) -> String {
	let label = raw.trim().to_lowercase().replace('"', "").replace(['_', '-'], " ");

	let mut result = String::with_capacity(label.len());
	for (i, word) in label.split_whitespace().enumerate() {
		if i == 0 {
			result.push_str(word);
			continue;
		}

		let mut chars = word.chars();
		if let Some(first) = chars.next() {
			result.extend(first.to_uppercase());
			result.push_str(chars.as_str());
		}
	}
	result
}
