//! MSVC toolchain implementation.

use std::path::{Path, PathBuf};

use super::{CommandSpec, LinkMode, Toolchain, ToolchainPlatform};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler)
    pub cl: PathBuf,
    /// Path to lib.exe (librarian)
    pub lib: PathBuf,
    /// Path to link.exe (linker)
    pub link: PathBuf,
}

impl MsvcToolchain {
    /// Create a new MSVC toolchain.
    pub fn new(cl: impl Into<PathBuf>, lib: impl Into<PathBuf>, link: impl Into<PathBuf>) -> Self {
        MsvcToolchain {
            cl: cl.into(),
            lib: lib.into(),
            link: link.into(),
        }
    }
}

impl Toolchain for MsvcToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Msvc
    }

    fn compiler(&self) -> &Path {
        &self.cl
    }

    fn archiver(&self) -> &Path {
        &self.lib
    }

    fn linker(&self) -> &Path {
        &self.link
    }

    fn include_flag(&self, dir: &str) -> String {
        format!("/I{}", dir)
    }

    fn compile_rule(&self) -> String {
        "$cxx /nologo /c $in /Fo$out /ifcSearchDir $module_dir $cflags".to_string()
    }

    fn module_compile_rule(&self) -> String {
        "$cxx /nologo /std:c++20 /c /interface $in /Fo$out /ifcOutput $module_dir/ /ifcSearchDir $module_dir $cflags"
            .to_string()
    }

    fn archive_rule(&self) -> String {
        "$ar /nologo /OUT:$out $in".to_string()
    }

    fn link_rule(&self, mode: LinkMode) -> String {
        match mode {
            LinkMode::Executable => "$ld /nologo $in /OUT:$out $lflags".to_string(),
            LinkMode::SharedLib => "$ld /nologo /DLL $in /OUT:$out $lflags".to_string(),
        }
    }

    fn compile_command(
        &self,
        source: &str,
        output: &str,
        flags: &[String],
        module_dir: Option<&str>,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cl).arg("/nologo");

        if let Some(dir) = module_dir {
            cmd = cmd.args(["/std:c++20", "/c", "/interface", source]);
            cmd = cmd.arg(format!("/Fo{}", output));
            cmd = cmd.args(["/ifcOutput".to_string(), format!("{}/", dir)]);
        } else {
            cmd = cmd.args(["/c", source]);
            cmd = cmd.arg(format!("/Fo{}", output));
        }

        cmd.args(flags.iter().cloned())
    }

    fn object_extension(&self) -> &str {
        ".obj"
    }

    fn static_lib_extension(&self) -> &str {
        ".lib"
    }

    fn shared_lib_extension(&self) -> &str {
        ".dll"
    }

    fn exe_extension(&self) -> &str {
        ".exe"
    }

    fn static_lib_prefix(&self) -> &str {
        ""
    }

    fn shared_lib_prefix(&self) -> &str {
        ""
    }
}
