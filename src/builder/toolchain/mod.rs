//! Toolchain abstraction for C/C++ compilers.
//!
//! A toolchain is the formatting profile of a compiler family: flag syntax,
//! file naming and the command templates written into the ninja file. It
//! never runs anything itself.
//!
//! Toolchain selection priority:
//! 1. `--toolchain` on the command line
//! 2. `build.toolchain` in `.anvil/config.toml` or `~/.anvil/config.toml`
//! 3. Auto-detection (searching PATH for common compilers)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod detect;
mod flags;
mod gcc;
mod msvc;

pub use detect::{detect_platform, detect_toolchain, host_platform};
pub use flags::normalize_flag;
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;

/// Link mode for executables and shared libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Executable,
    SharedLib,
}

/// A command to execute, with program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "g++", "cl")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Program followed by its arguments.
    pub fn to_argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_argv().join(" "))
    }
}

/// The platform/family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlatform {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Microsoft Visual C++
    Msvc,
}

impl ToolchainPlatform {
    /// Get the platform name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::Msvc => "msvc",
        }
    }

    /// Whether the family takes MSVC-style `/flag` options.
    pub fn is_msvc_style(&self) -> bool {
        matches!(self, ToolchainPlatform::Msvc)
    }
}

impl fmt::Display for ToolchainPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolchainPlatform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" | "gnu" => Ok(ToolchainPlatform::Gcc),
            "clang" | "llvm" => Ok(ToolchainPlatform::Clang),
            "msvc" | "cl" => Ok(ToolchainPlatform::Msvc),
            _ => anyhow::bail!(
                "unknown toolchain `{}`, expected one of: gcc, clang, msvc",
                s
            ),
        }
    }
}

/// Trait for toolchain implementations.
///
/// Rule templates use the ninja variables `$cxx`, `$ar`, `$ld`, `$cflags`,
/// `$lflags` and `$module_dir`, which the ninja writer defines.
pub trait Toolchain: Send + Sync {
    /// Get the toolchain platform.
    fn platform(&self) -> ToolchainPlatform;

    /// Get the C++ compiler path.
    fn compiler(&self) -> &Path;

    /// Get the archiver path.
    fn archiver(&self) -> &Path;

    /// Get the linker (or linking driver) path.
    fn linker(&self) -> &Path;

    /// Format an include directory flag.
    fn include_flag(&self, dir: &str) -> String;

    /// Command template for compiling a regular source.
    fn compile_rule(&self) -> String;

    /// Command template for compiling a module interface.
    fn module_compile_rule(&self) -> String;

    /// Command template for creating a static library.
    fn archive_rule(&self) -> String;

    /// Command template for linking.
    fn link_rule(&self, mode: LinkMode) -> String;

    /// A concrete compile command, as recorded in compile_commands.json.
    fn compile_command(
        &self,
        source: &str,
        output: &str,
        flags: &[String],
        module_dir: Option<&str>,
    ) -> CommandSpec;

    /// Get the object file extension.
    fn object_extension(&self) -> &str;

    /// Get the static library extension.
    fn static_lib_extension(&self) -> &str;

    /// Get the shared library extension.
    fn shared_lib_extension(&self) -> &str;

    /// Get the executable extension.
    fn exe_extension(&self) -> &str;

    /// Get the static library prefix (e.g., "lib" on Unix).
    fn static_lib_prefix(&self) -> &str;

    /// Get the shared library prefix.
    fn shared_lib_prefix(&self) -> &str;

    /// Rewrite a flag into this toolchain's spelling.
    fn normalize_flag(&self, flag: &str) -> String {
        normalize_flag(flag, self.platform())
    }

    /// Include flags followed by normalized compiler flags.
    fn compile_flags(&self, include: &[String], libflags: &[String]) -> Vec<String> {
        include
            .iter()
            .map(|dir| self.include_flag(dir))
            .chain(
                libflags
                    .iter()
                    .map(|f| self.normalize_flag(f))
                    .filter(|f| !f.is_empty()),
            )
            .collect()
    }

    /// File name of the static library for `name`.
    fn static_lib_name(&self, name: &str) -> String {
        format!(
            "{}{}{}",
            self.static_lib_prefix(),
            name,
            self.static_lib_extension()
        )
    }

    /// File name of the shared library for `name`.
    fn shared_lib_name(&self, name: &str) -> String {
        format!(
            "{}{}{}",
            self.shared_lib_prefix(),
            name,
            self.shared_lib_extension()
        )
    }

    /// File name of the executable for `name`.
    fn exe_name(&self, name: &str) -> String {
        format!("{}{}", name, self.exe_extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("gcc".parse::<ToolchainPlatform>().unwrap(), ToolchainPlatform::Gcc);
        assert_eq!("MSVC".parse::<ToolchainPlatform>().unwrap(), ToolchainPlatform::Msvc);
        assert!("tcc".parse::<ToolchainPlatform>().is_err());
    }

    #[test]
    fn test_compile_flags_prefix_includes() {
        let gcc = GccToolchain::new("g++", "ar", "g++", ToolchainPlatform::Gcc);
        let flags = gcc.compile_flags(
            &["inc".to_string(), "deps/core/inc".to_string()],
            &["/O2".to_string(), "DNDEBUG".to_string()],
        );
        assert_eq!(flags, vec!["-Iinc", "-Ideps/core/inc", "-O2", "-DNDEBUG"]);

        let msvc = MsvcToolchain::new("cl", "lib", "link");
        let flags = msvc.compile_flags(&["inc".to_string()], &["-g".to_string()]);
        assert_eq!(flags, vec!["/Iinc", "/Zi"]);
    }

    #[test]
    fn test_artifact_names() {
        let gcc = GccToolchain::new("g++", "ar", "g++", ToolchainPlatform::Gcc);
        assert_eq!(gcc.static_lib_name("core"), "libcore.a");

        let msvc = MsvcToolchain::new("cl", "lib", "link");
        assert_eq!(msvc.static_lib_name("core"), "core.lib");
        assert_eq!(msvc.shared_lib_name("core"), "core.dll");
        assert_eq!(msvc.exe_name("app"), "app.exe");
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("g++").arg("-c").args(["a.cpp", "-o", "a.o"]);
        assert_eq!(cmd.to_string(), "g++ -c a.cpp -o a.o");
    }
}
