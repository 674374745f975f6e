//! Flag spelling normalization between GCC-style and MSVC-style drivers.

use super::ToolchainPlatform;

/// GCC/Clang spelling and its MSVC equivalent.
const EQUIVALENTS: &[(&str, &str)] = &[
    ("-O0", "/Od"),
    ("-O1", "/O1"),
    ("-O2", "/O2"),
    ("-O3", "/Ox"),
    ("-Os", "/Os"),
    ("-g", "/Zi"),
    ("-w", "/W0"),
    ("-Wall", "/W3"),
    ("-Wextra", "/W4"),
    ("-Werror", "/WX"),
    ("-fexceptions", "/EHsc"),
    ("-fno-exceptions", "/EHs-c-"),
    ("-fno-rtti", "/GR-"),
    ("-flto", "/GL"),
    ("-fopenmp", "/openmp"),
    ("-finput-charset=UTF-8", "/utf-8"),
];

/// Prefixed options whose value carries over unchanged.
const VALUE_PREFIXES: &[char] = &['D', 'U', 'I'];

/// Rewrite `flag` into the spelling `platform` expects.
///
/// Bare flags (`O2`, `DNDEBUG`) get the platform's option prefix. Flags
/// without a known equivalent are passed through unchanged.
pub fn normalize_flag(flag: &str, platform: ToolchainPlatform) -> String {
    let flag = flag.trim();
    if flag.is_empty() {
        return String::new();
    }

    if !flag.starts_with('-') && !flag.starts_with('/') {
        let prefix = if platform.is_msvc_style() { '/' } else { '-' };
        return normalize_flag(&format!("{}{}", prefix, flag), platform);
    }

    if platform.is_msvc_style() {
        to_msvc(flag)
    } else {
        to_gnu(flag)
    }
}

fn to_msvc(flag: &str) -> String {
    if flag.starts_with('/') {
        return flag.to_string();
    }
    if let Some((_, msvc)) = EQUIVALENTS.iter().find(|(gnu, _)| *gnu == flag) {
        return msvc.to_string();
    }
    if let Some(std) = flag.strip_prefix("-std=") {
        let std = std.replace("gnu", "c");
        return match std.as_str() {
            "c++2b" | "c++23" | "c++2c" | "c++26" => "/std:c++latest".to_string(),
            _ => format!("/std:{}", std),
        };
    }
    if has_value_prefix(flag) {
        return format!("/{}", &flag[1..]);
    }

    tracing::debug!("no MSVC equivalent for `{}`, passing it through", flag);
    flag.to_string()
}

fn to_gnu(flag: &str) -> String {
    if flag.starts_with('-') {
        return flag.to_string();
    }
    if let Some((gnu, _)) = EQUIVALENTS.iter().find(|(_, msvc)| *msvc == flag) {
        return gnu.to_string();
    }
    if let Some(std) = flag.strip_prefix("/std:") {
        return match std {
            "c++latest" => "-std=c++23".to_string(),
            _ => format!("-std={}", std),
        };
    }
    if has_value_prefix(flag) {
        return format!("-{}", &flag[1..]);
    }

    tracing::debug!("no GCC equivalent for `{}`, passing it through", flag);
    flag.to_string()
}

fn has_value_prefix(flag: &str) -> bool {
    let mut chars = flag.chars().skip(1);
    matches!(chars.next(), Some(c) if VALUE_PREFIXES.contains(&c)) && chars.next().is_some()
}
