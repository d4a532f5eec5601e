use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("'{0}' is not an IP address")]
    Address(String),

    #[error("'{0}' is not a valid prefix length")]
    Prefix(String),

    #[error("'{0}' has host bits set")]
    HostBits(String),
}

/// An IPv4 or IPv6 network. A bare address is a /32 or /128 network.
///
/// Parsing is strict: `10.0.0.0/24` is a network, `10.0.0.5/24` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkRange {
    addr: IpAddr,
    prefix: u8,
}

impl NetworkRange {
    /// IPv4-mapped IPv6 networks (`::ffff:a.b.c.d/96` and narrower) are stored
    /// as the IPv4 network they cover, matching how probe addresses are
    /// canonicalized in [`NetworkRange::contains`].
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, RangeParseError> {
        if prefix > width(&addr) {
            return Err(RangeParseError::Prefix(prefix.to_string()));
        }
        if bits(&addr) & !netmask(prefix, width(&addr)) != 0 {
            return Err(RangeParseError::HostBits(format!("{}/{}", addr, prefix)));
        }

        let (addr, prefix) = match addr {
            IpAddr::V6(v6) if prefix >= MAPPED_PREFIX => match v6.to_ipv4_mapped() {
                Some(v4) => (IpAddr::V4(v4), prefix - MAPPED_PREFIX),
                None => (addr, prefix),
            },
            _ => (addr, prefix),
        };
        Ok(Self { addr, prefix })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    /// True if `ip` falls inside this network. Addresses of the other family
    /// never match; IPv4-mapped IPv6 addresses are treated as IPv4.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        if self.addr.is_ipv4() != ip.is_ipv4() {
            return false;
        }
        bits(&ip) & netmask(self.prefix, width(&ip)) == bits(&self.addr)
    }
}

impl FromStr for NetworkRange {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_str, prefix_str) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr: IpAddr = addr_str
            .parse()
            .map_err(|_| RangeParseError::Address(addr_str.to_string()))?;

        let prefix = match prefix_str {
            None => width(&addr),
            Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => p
                .parse::<u8>()
                .map_err(|_| RangeParseError::Prefix(p.to_string()))?,
            Some(p) => return Err(RangeParseError::Prefix(p.to_string())),
        };

        Self::new(addr, prefix)
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

// Length of the `::ffff:0:0/96` prefix that marks an IPv4-mapped address
const MAPPED_PREFIX: u8 = 96;

fn width(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

fn netmask(prefix: u8, width: u8) -> u128 {
    if prefix == 0 {
        return 0;
    }
    let all = if width == 128 { u128::MAX } else { (1u128 << width) - 1 };
    (u128::MAX << (width - prefix)) & all
}
