//! Toolchain detection functions.

use std::path::Path;

use anyhow::Result;
use which::which;

use crate::util::config::Config;

use super::{GccToolchain, MsvcToolchain, Toolchain, ToolchainPlatform};

/// Build the toolchain profile for a configuration.
///
/// The family comes from `build.toolchain` when set, otherwise from the
/// configured compiler's name, otherwise from PATH. Tool names are taken
/// from the configuration, then the `CXX`/`AR` environment variables, then
/// the family defaults.
pub fn detect_toolchain(config: &Config) -> Result<Box<dyn Toolchain>> {
    let cxx_override = config
        .build
        .cc
        .clone()
        .or_else(|| std::env::var("CXX").ok().filter(|s| !s.is_empty()));
    let ar_override = config
        .build
        .ar
        .clone()
        .or_else(|| std::env::var("AR").ok().filter(|s| !s.is_empty()));

    let platform = match config.toolchain()? {
        Some(platform) => platform,
        None => match cxx_override.as_deref().and_then(family_from_name) {
            Some(platform) => platform,
            None => detect_platform(),
        },
    };

    let toolchain: Box<dyn Toolchain> = match platform {
        ToolchainPlatform::Msvc => {
            let cl = cxx_override.unwrap_or_else(|| "cl".to_string());
            let lib = ar_override.unwrap_or_else(|| "lib".to_string());
            let link = config.build.linker.clone().unwrap_or_else(|| "link".to_string());
            Box::new(MsvcToolchain::new(cl, lib, link))
        }
        family => {
            let default_cxx = match family {
                ToolchainPlatform::Clang => "clang++",
                _ => "g++",
            };
            let cxx = cxx_override.unwrap_or_else(|| default_cxx.to_string());
            let ar = ar_override.unwrap_or_else(|| "ar".to_string());
            let ld = config.build.linker.clone().unwrap_or_else(|| cxx.clone());
            Box::new(GccToolchain::new(cxx, ar, ld, family))
        }
    };

    tracing::debug!(
        "using {} toolchain: cxx={}, ar={}, ld={}",
        toolchain.platform(),
        toolchain.compiler().display(),
        toolchain.archiver().display(),
        toolchain.linker().display()
    );

    Ok(toolchain)
}

/// Pick a compiler family from the compilers found on PATH.
///
/// On Windows MSVC is preferred when `cl` is available.
pub fn detect_platform() -> ToolchainPlatform {
    if cfg!(windows) && which("cl").is_ok() {
        return ToolchainPlatform::Msvc;
    }

    for (program, platform) in [
        ("g++", ToolchainPlatform::Gcc),
        ("clang++", ToolchainPlatform::Clang),
        ("c++", ToolchainPlatform::Gcc),
        ("cl", ToolchainPlatform::Msvc),
    ] {
        if let Ok(path) = which(program) {
            tracing::debug!("found {} at {}", program, path.display());
            return platform;
        }
    }

    let fallback = if cfg!(windows) {
        ToolchainPlatform::Msvc
    } else {
        ToolchainPlatform::Gcc
    };
    tracing::warn!(
        "no C++ compiler found on PATH, assuming {}",
        fallback.as_str()
    );
    fallback
}

/// Name of the host platform as used by `[platform.<name>]` tables.
pub fn host_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Infer the family from a compiler binary name.
fn family_from_name(program: &str) -> Option<ToolchainPlatform> {
    let name = Path::new(program)
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name == "cl" || name == "clang-cl" {
        Some(ToolchainPlatform::Msvc)
    } else if name.contains("clang") {
        Some(ToolchainPlatform::Clang)
    } else if name.contains("gcc") || name.contains("g++") {
        Some(ToolchainPlatform::Gcc)
    } else {
        None
    }
}
