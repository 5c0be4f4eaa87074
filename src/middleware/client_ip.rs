use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{Extensions, HeaderMap},
};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Best-effort client address.
///
/// Proxy headers win over the socket peer: first hop of `X-Forwarded-For`,
/// then `X-Real-IP`, then the `ConnectInfo` address axum records when the
/// app is served with `into_make_service_with_connect_info`. Empty when none
/// of them is available.
pub fn real_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or(forwarded);
        return strip_brackets(first.trim()).to_string();
    }

    if let Some(real) = header_str(headers, X_REAL_IP) {
        return strip_brackets(real.trim()).to_string();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn strip_brackets(ip: &str) -> &str {
    let ip = ip.strip_prefix('[').unwrap_or(ip);
    ip.strip_suffix(']').unwrap_or(ip)
}
