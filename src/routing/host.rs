//! Host header → subdomain extraction.
//!
//! # Design Decisions
//! - The subdomain is everything before the first `.`
//! - A host is accepted only if `subdomain + "." + root` reproduces it
//!   byte-for-byte, which rejects sibling domains, nested subdomains and
//!   explicit ports
//! - Comparison is exact; no case folding

/// Returns the routing key for `host` if it is a direct subdomain of `root_domain`.
pub fn subdomain_of<'a>(host: &'a str, root_domain: &str) -> Option<&'a str> {
    let subdomain = host.split('.').next().unwrap_or(host);
    let rest = &host[subdomain.len()..];

    // rest must be exactly ".{root_domain}"
    let matches = rest
        .strip_prefix('.')
        .is_some_and(|suffix| suffix == root_domain);

    matches.then_some(subdomain)
}
