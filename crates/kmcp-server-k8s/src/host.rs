// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host sanitization for log output.

use std::net::IpAddr;

const REDACTED_IP: &str = "[redacted-ip]";

/// Replace an IP address in an API server host with a placeholder.
///
/// Hostnames pass through unchanged. The scheme and port are preserved so the
/// value still identifies which endpoint was used.
pub fn sanitize_host(host: &str) -> String {
	let host = host.trim();
	if host.is_empty() {
		return "<empty>".to_string();
	}

	let (scheme, rest) = match host.find("://") {
		Some(idx) => (&host[..idx + 3], &host[idx + 3..]),
		None => ("", host),
	};
	let (authority, path) = match rest.find('/') {
		Some(idx) => (&rest[..idx], &rest[idx..]),
		None => (rest, ""),
	};

	let (addr, port) = split_port(authority);
	let bare = addr.trim_start_matches('[').trim_end_matches(']');
	if bare.parse::<IpAddr>().is_ok() {
		format!("{scheme}{REDACTED_IP}{port}{path}")
	} else {
		host.to_string()
	}
}

fn split_port(authority: &str) -> (&str, &str) {
	if authority.starts_with('[') {
		// Bracketed IPv6, optionally followed by a port.
		return match authority.find(']') {
			Some(end) => (&authority[..=end], &authority[end + 1..]),
			None => (authority, ""),
		};
	}
	// A bare IPv6 address has more than one colon and no port.
	if authority.matches(':').count() == 1 {
		if let Some(idx) = authority.rfind(':') {
			return (&authority[..idx], &authority[idx..]);
		}
	}
	(authority, "")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_host_is_marked() {
		assert_eq!(sanitize_host(""), "<empty>");
		assert_eq!(sanitize_host("   "), "<empty>");
	}

	#[test]
	fn hostnames_pass_through() {
		assert_eq!(
			sanitize_host("https://api.prod.example.com:6443"),
			"https://api.prod.example.com:6443"
		);
		assert_eq!(sanitize_host("kubernetes.default.svc"), "kubernetes.default.svc");
	}

	#[test]
	fn ipv4_is_redacted_keeping_scheme_and_port() {
		assert_eq!(
			sanitize_host("https://10.0.0.12:6443"),
			"https://[redacted-ip]:6443"
		);
		assert_eq!(sanitize_host("192.168.1.1"), "[redacted-ip]");
	}

	#[test]
	fn ipv6_is_redacted() {
		assert_eq!(
			sanitize_host("https://[fd00::1]:6443"),
			"https://[redacted-ip]:6443"
		);
		assert_eq!(sanitize_host("fd00::1"), "[redacted-ip]");
	}

	#[test]
	fn path_is_preserved() {
		assert_eq!(
			sanitize_host("https://172.16.0.5:443/k8s/clusters/c-1"),
			"https://[redacted-ip]:443/k8s/clusters/c-1"
		);
	}
}
