//! Domain readiness gate for certificate issuance.
use std::fmt;
use std::io;
use std::net::{IpAddr, ToSocketAddrs as _};

use thiserror::Error;

/// Name resolution used by the readiness gate.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to its addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not resolve.
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// [`Resolver`] backed by the operating system's resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let mut addrs: Vec<IpAddr> = (host, 0).to_socket_addrs()?.map(|a| a.ip()).collect();
        addrs.sort_unstable();
        addrs.dedup();
        Ok(addrs)
    }
}

/// Why a domain is not ready for certificate issuance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    /// The name did not resolve at all.
    #[error("{domain} does not resolve: {reason}")]
    Unresolved {
        /// Domain that was looked up.
        domain: String,
        /// Resolver message.
        reason: String,
    },

    /// The name resolves, but not to this host.
    #[error("{domain} resolves to {} which is not this host ({})", AddrList(.resolved), AddrList(.host))]
    NotThisHost {
        /// Domain that was looked up.
        domain: String,
        /// Addresses the domain resolved to.
        resolved: Vec<IpAddr>,
        /// Addresses of this host.
        host: Vec<IpAddr>,
    },
}

/// Comma-separated address list for messages.
struct AddrList<'a>(&'a [IpAddr]);

impl fmt::Display for AddrList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{addr}")?;
        }
        Ok(())
    }
}

/// Whether `addr` can be reached from the internet as-is.
///
/// Private, carrier-grade NAT, loopback, link-local and unspecified
/// addresses (and their IPv6 counterparts) are not.
///
/// ```
/// use bench_setup::dns::is_public;
///
/// assert!(is_public(&"54.210.1.2".parse().unwrap()));
/// assert!(!is_public(&"172.31.5.10".parse().unwrap()));
/// assert!(!is_public(&"fe80::1".parse().unwrap()));
/// ```
#[must_use]
pub fn is_public(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            let shared = a == 100 && (b & 0xc0) == 64;
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || shared)
        }
        IpAddr::V6(v6) => {
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_unique_local()
                || v6.is_unicast_link_local())
        }
    }
}

/// Check that `domain` resolves to one of `host_addrs`.
///
/// A host behind 1:1 NAT only sees its private addresses, so when none of
/// `host_addrs` is [public](is_public) (or the list is empty) resolving at
/// all is enough.
///
/// # Errors
///
/// Returns the [`GateFailure`] describing why the domain is not ready.
pub fn check_domain(
    resolver: &dyn Resolver,
    domain: &str,
    host_addrs: &[IpAddr],
) -> Result<(), GateFailure> {
    let resolved = resolver
        .resolve(domain)
        .map_err(|e| GateFailure::Unresolved {
            domain: domain.to_string(),
            reason: e.to_string(),
        })?;
    if resolved.is_empty() {
        return Err(GateFailure::Unresolved {
            domain: domain.to_string(),
            reason: "no addresses".to_string(),
        });
    }
    if resolved.iter().any(|a| host_addrs.contains(a)) || !host_addrs.iter().any(is_public) {
        Ok(())
    } else {
        Err(GateFailure::NotThisHost {
            domain: domain.to_string(),
            resolved,
            host: host_addrs.to_vec(),
        })
    }
}
