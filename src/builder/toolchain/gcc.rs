//! GCC/Clang toolchain implementation.

use std::path::{Path, PathBuf};

use super::{CommandSpec, LinkMode, Toolchain, ToolchainPlatform};

/// GCC/Clang toolchain (Unix-like systems).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// Path to the C++ compiler
    pub cxx: PathBuf,
    /// Path to the archiver
    pub ar: PathBuf,
    /// Path to the linking driver
    pub ld: PathBuf,
    /// Compiler family (gcc or clang)
    pub family: ToolchainPlatform,
}

impl GccToolchain {
    /// Create a new GCC-style toolchain.
    pub fn new(
        cxx: impl Into<PathBuf>,
        ar: impl Into<PathBuf>,
        ld: impl Into<PathBuf>,
        family: ToolchainPlatform,
    ) -> Self {
        GccToolchain {
            cxx: cxx.into(),
            ar: ar.into(),
            ld: ld.into(),
            family,
        }
    }
}

impl Toolchain for GccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        self.family
    }

    fn compiler(&self) -> &Path {
        &self.cxx
    }

    fn archiver(&self) -> &Path {
        &self.ar
    }

    fn linker(&self) -> &Path {
        &self.ld
    }

    fn include_flag(&self, dir: &str) -> String {
        format!("-I{}", dir)
    }

    fn compile_rule(&self) -> String {
        "$cxx -c $in -o $out $cflags".to_string()
    }

    fn module_compile_rule(&self) -> String {
        "$cxx -std=c++20 -fmodules-ts -c $in -o $out -fmodule-output=$module_dir $cflags"
            .to_string()
    }

    fn archive_rule(&self) -> String {
        "$ar rcs $out $in".to_string()
    }

    fn link_rule(&self, mode: LinkMode) -> String {
        match mode {
            LinkMode::Executable => "$ld $in -o $out $lflags".to_string(),
            LinkMode::SharedLib => "$ld -shared $in -o $out $lflags".to_string(),
        }
    }

    fn compile_command(
        &self,
        source: &str,
        output: &str,
        flags: &[String],
        module_dir: Option<&str>,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cxx);

        if let Some(dir) = module_dir {
            cmd = cmd.args(["-std=c++20", "-fmodules-ts"]);
            cmd = cmd.args(["-c", source, "-o", output]);
            cmd = cmd.arg(format!("-fmodule-output={}", dir));
        } else {
            cmd = cmd.args(["-c", source, "-o", output]);
        }

        cmd.args(flags.iter().cloned())
    }

    fn object_extension(&self) -> &str {
        ".o"
    }

    fn static_lib_extension(&self) -> &str {
        ".a"
    }

    fn shared_lib_extension(&self) -> &str {
        if cfg!(target_os = "macos") {
            ".dylib"
        } else if cfg!(windows) {
            ".dll"
        } else {
            ".so"
        }
    }

    fn exe_extension(&self) -> &str {
        if cfg!(windows) {
            ".exe"
        } else {
            ""
        }
    }

    fn static_lib_prefix(&self) -> &str {
        "lib"
    }

    fn shared_lib_prefix(&self) -> &str {
        if cfg!(windows) {
            ""
        } else {
            "lib"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcc() -> GccToolchain {
        GccToolchain::new("g++", "ar", "g++", ToolchainPlatform::Gcc)
    }

    #[test]
    fn test_gcc_compile_command() {
        let cmd = gcc().compile_command(
            "src/a.cpp",
            "build/debug/library/core/a.o",
            &["-Iinc".to_string(), "-O2".to_string()],
            None,
        );

        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert_eq!(
            cmd.args,
            vec!["-c", "src/a.cpp", "-o", "build/debug/library/core/a.o", "-Iinc", "-O2"]
        );
    }

    #[test]
    fn test_gcc_module_compile_command() {
        let cmd = gcc().compile_command("src/m.cppm", "m.o", &[], Some("build/modules"));
        assert!(cmd.args.contains(&"-fmodules-ts".to_string()));
        assert!(cmd.args.contains(&"-fmodule-output=build/modules".to_string()));
    }

    #[test]
    fn test_gcc_rules() {
        let tc = gcc();
        assert_eq!(tc.archive_rule(), "$ar rcs $out $in");
        assert!(tc.link_rule(LinkMode::SharedLib).contains("-shared"));
        assert_eq!(tc.include_flag("inc"), "-Iinc");
        assert_eq!(tc.object_extension(), ".o");
    }
}
