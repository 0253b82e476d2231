use url::{Host, Url};
use crate::error::{AppError, Result};

/// Checks that `raw` is a full http(s) URL with a usable host and returns
/// the normalized form. Nothing downstream runs on an `Err`.
pub fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidUrl("URL is empty".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(AppError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidUrl("URL contains whitespace".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| AppError::InvalidUrl(format!("Invalid URL format: {}", e)))?;

    // Credentials would travel on to the screenshot service and the prompt
    if !url.username().is_empty() || url.password().is_some() {
        return Err(AppError::InvalidUrl(
            "Invalid URL format: credentials in URLs are not accepted".to_string(),
        ));
    }

    match url.host() {
        Some(Host::Domain(domain)) if is_acceptable_domain(domain) => Ok(url),
        Some(Host::Ipv4(_)) if is_dotted_quad(raw_host(trimmed)) => Ok(url),
        Some(Host::Ipv4(addr)) => Err(AppError::InvalidUrl(format!(
            "Invalid URL format: '{}' is not a dotted-quad IPv4 address (parsed as {})",
            raw_host(trimmed),
            addr
        ))),
        Some(Host::Domain(domain)) => Err(AppError::InvalidUrl(format!(
            "Invalid URL format: '{}' is not a valid host name",
            domain
        ))),
        Some(Host::Ipv6(_)) => Err(AppError::InvalidUrl(
            "Invalid URL format: IPv6 hosts are not supported".to_string(),
        )),
        None => Err(AppError::InvalidUrl("URL has no host".to_string())),
    }
}

/// Host exactly as typed. The URL parser rewrites numeric shorthands such as
/// `12345` or `0x7f.1` into IPv4 addresses, so the check has to see the input.
fn raw_host(input: &str) -> &str {
    let after_scheme = input.split_once("://").map_or(input, |(_, rest)| rest);
    let authority = after_scheme
        .split(['/', '\\', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host_port.split(':').next().unwrap_or_default()
}

/// Four decimal octets, 0-255, without leading zeros (which some parsers
/// read as octal).
fn is_dotted_quad(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            (1..=3).contains(&octet.len())
                && octet.chars().all(|c| c.is_ascii_digit())
                && (octet.len() == 1 || !octet.starts_with('0'))
                && octet.parse::<u8>().is_ok()
        })
}

fn is_acceptable_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }

    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let (tld, rest) = match labels.split_last() {
        Some(split) => split,
        None => return false,
    };

    (2..=63).contains(&tld.len())
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && rest.iter().all(|label| is_dns_label(label))
}

fn is_dns_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}
