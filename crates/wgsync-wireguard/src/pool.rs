// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::Ipv4Net;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::{debug, instrument, warn};
use wgsync_state::PersistentState;

use crate::error::AllocError;

/// Bounded range of peer addresses inside the WireGuard subnet.
///
/// Allocation is a forward scan from the state's cursor. Addresses released
/// by removed nodes are never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
	subnet: Ipv4Net,
	server: Ipv4Addr,
	start: Ipv4Addr,
	end: Ipv4Addr,
}

impl AddressPool {
	pub fn new(
		subnet: Ipv4Net,
		server: Ipv4Addr,
		start: Ipv4Addr,
		end: Ipv4Addr,
	) -> Result<Self, AllocError> {
		let subnet = subnet.trunc();
		let (first, last) = usable_range(&subnet);
		let in_range = |ip: Ipv4Addr| first <= ip && ip <= last;

		if !in_range(server) {
			return Err(AllocError::InvalidPool(format!(
				"server address {server} is not a usable host in {subnet}"
			)));
		}
		if !in_range(start) {
			return Err(AllocError::InvalidPool(format!(
				"pool start {start} is not a usable host in {subnet}"
			)));
		}
		if !in_range(end) {
			return Err(AllocError::InvalidPool(format!(
				"pool end {end} is not a usable host in {subnet}"
			)));
		}
		if start > end {
			return Err(AllocError::InvalidPool(format!(
				"pool start {start} is after pool end {end}"
			)));
		}

		Ok(Self {
			subnet,
			server,
			start,
			end,
		})
	}

	/// Pool running from `start` to the last usable host of `subnet`.
	pub fn to_subnet_end(
		subnet: Ipv4Net,
		server: Ipv4Addr,
		start: Ipv4Addr,
	) -> Result<Self, AllocError> {
		let (_, last) = usable_range(&subnet.trunc());
		Self::new(subnet, server, start, last)
	}

	pub fn subnet(&self) -> Ipv4Net {
		self.subnet
	}

	pub fn server(&self) -> Ipv4Addr {
		self.server
	}

	pub fn start(&self) -> Ipv4Addr {
		self.start
	}

	pub fn end(&self) -> Ipv4Addr {
		self.end
	}

	/// Smallest address after the cursor (or from `start` if unset or below
	/// it) that is neither the server nor already assigned.
	///
	/// Does not update the cursor; the caller records the result on commit.
	#[instrument(skip(self, state), fields(start = %self.start, end = %self.end))]
	pub fn allocate(&self, state: &PersistentState) -> Result<Ipv4Addr, AllocError> {
		let start = u32::from(self.start);
		let end = u32::from(self.end);
		let server = u32::from(self.server);

		let mut candidate = match state.last_allocated {
			Some(last) => u32::from(last).checked_add(1),
			None => Some(start),
		}
		.map(|c| c.max(start));

		let used: HashSet<u32> = state
			.processed_nodes
			.values()
			.map(|ip| u32::from(*ip))
			.collect();

		while let Some(c) = candidate {
			if c > end {
				break;
			}
			if c != server && !used.contains(&c) {
				let address = Ipv4Addr::from(c);
				debug!(%address, "allocated peer address");
				return Ok(address);
			}
			candidate = c.checked_add(1);
		}

		warn!(used = used.len(), "address pool exhausted");
		Err(AllocError::PoolExhausted {
			start: self.start,
			end: self.end,
		})
	}
}

/// First and last assignable host. Network and broadcast addresses are
/// excluded except on /31 and /32 where every address is a host.
fn usable_range(subnet: &Ipv4Net) -> (Ipv4Addr, Ipv4Addr) {
	let network = u32::from(subnet.network());
	let broadcast = u32::from(subnet.broadcast());
	if subnet.prefix_len() >= 31 {
		(Ipv4Addr::from(network), Ipv4Addr::from(broadcast))
	} else {
		(Ipv4Addr::from(network + 1), Ipv4Addr::from(broadcast - 1))
	}
}
