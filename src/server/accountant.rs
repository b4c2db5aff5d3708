//! The Connection Accountant (spec.md §2/§4.1/§5): tracks the global
//! connection count and a per-remote-IP count for admission control,
//! following SPEC_FULL.md's direction to wrap the counters in "a small
//! object whose mutator methods are the only code path that adjusts them"
//! (spec.md §9) and the teacher crate's `dashmap`-backed counters in
//! `server/failed_logins.rs` for the per-key mutex-free concurrent map
//! idiom.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

/// The outcome of admitting a new connection: whether it's accepted, and
/// if so the 1-based per-IP sequence number assigned to it (used as
/// `Session::connection_id`, spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted { connection_id: u32 },
    /// `global_count > max_connection` (spec.md §4.1).
    GlobalLimitExceeded,
    /// `connection_id > max_user_connection` (spec.md §4.1, evaluated
    /// pre-login against the server-wide default per SPEC_FULL.md's Open
    /// Question resolution).
    PerIpLimitExceeded,
}

/// Tracks the global and per-IP connection counts. `admit` increments
/// both before checking limits (spec.md §4.1: "Admission is checked
/// after incrementing"); `release` decrements both exactly once per
/// session close (spec.md §3 invariant).
#[derive(Debug, Default)]
pub struct ConnectionAccountant {
    global: AtomicU32,
    per_ip: DashMap<IpAddr, u32>,
}

impl ConnectionAccountant {
    pub fn new() -> Self {
        ConnectionAccountant::default()
    }

    /// Admits a new connection from `ip`, checking `max_connection`
    /// (global) and `max_user_connection` (per-IP, pre-login default).
    pub fn admit(&self, ip: IpAddr, max_connection: u32, max_user_connection: u32) -> Admission {
        let global_count = self.global.fetch_add(1, Ordering::SeqCst) + 1;
        let connection_id = {
            let mut entry = self.per_ip.entry(ip).or_insert(0);
            *entry += 1;
            *entry
        };

        if global_count > max_connection {
            Admission::GlobalLimitExceeded
        } else if connection_id > max_user_connection {
            Admission::PerIpLimitExceeded
        } else {
            Admission::Accepted { connection_id }
        }
    }

    /// Releases one connection slot for `ip`. Must be called exactly once
    /// per session that was counted by `admit`, regardless of how the
    /// session ended (spec.md §3 invariant 1).
    pub fn release(&self, ip: IpAddr) {
        self.global.fetch_sub(1, Ordering::SeqCst);
        if let Some(mut entry) = self.per_ip.get_mut(&ip) {
            *entry = entry.saturating_sub(1);
        }
    }

    #[cfg(test)]
    pub fn global_count(&self) -> u32 {
        self.global.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn per_ip_count(&self, ip: IpAddr) -> u32 {
        self.per_ip.get(&ip).map(|e| *e).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn admits_within_limits_and_assigns_sequence_numbers() {
        let acc = ConnectionAccountant::new();
        assert_eq!(acc.admit(ip(), 10, 5), Admission::Accepted { connection_id: 1 });
        assert_eq!(acc.admit(ip(), 10, 5), Admission::Accepted { connection_id: 2 });
    }

    #[test]
    fn rejects_past_global_limit() {
        let acc = ConnectionAccountant::new();
        assert_eq!(acc.admit(ip(), 1, 5), Admission::Accepted { connection_id: 1 });
        assert_eq!(acc.admit(ip(), 1, 5), Admission::GlobalLimitExceeded);
    }

    #[test]
    fn rejects_past_per_ip_limit() {
        let acc = ConnectionAccountant::new();
        assert_eq!(acc.admit(ip(), 10, 1), Admission::Accepted { connection_id: 1 });
        assert_eq!(acc.admit(ip(), 10, 1), Admission::PerIpLimitExceeded);
    }

    #[test]
    fn release_restores_counts_to_zero() {
        let acc = ConnectionAccountant::new();
        acc.admit(ip(), 10, 10);
        acc.admit(ip(), 10, 10);
        acc.release(ip());
        acc.release(ip());
        assert_eq!(acc.global_count(), 0);
        assert_eq!(acc.per_ip_count(ip()), 0);
    }

    #[test]
    fn limit_equal_to_count_is_still_admitted() {
        let acc = ConnectionAccountant::new();
        assert!(matches!(acc.admit(ip(), 1, 1), Admission::Accepted { .. }));
    }
}
