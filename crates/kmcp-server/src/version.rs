// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"kmcp-server version: {}\n\
		 Platform:            {}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn version_info_names_the_package() {
		let info = format_version_info();
		assert!(info.starts_with("kmcp-server version: "));
		assert!(info.contains(env!("CARGO_PKG_VERSION")));
	}
}
