//! Subprocess invocation of the TL (Zig) compiler (spec.md §4.6).

use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::error::ToolError;

/// Invokes `zig build-exe <source> -femit-bin=<output> -O ReleaseFast` and
/// waits for it to finish. The release-optimised flag is unconditional:
/// the supported subset has no debug build mode (spec.md §4.6 step 4).
pub fn compile(zig_path: &Path, source_path: &Path, output_path: &Path) -> Result<(), ToolError> {
    let output = Command::new(zig_path)
        .arg("build-exe")
        .arg(source_path)
        .arg(format!("-femit-bin={}", output_path.display()))
        .arg("-O")
        .arg("ReleaseFast")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::ToolchainNotFound { path: zig_path.to_owned(), source })?;

    if !output.status.success() {
        return Err(ToolError::CompilerFailed {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Spawns the emitted binary, forwarding its standard streams, and
/// returns its exit code (spec.md §4.6 step 6, §6 "Exit code").
pub fn run(binary_path: &Path) -> Result<i32, ToolError> {
    let status = Command::new(binary_path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| ToolError::Io { path: binary_path.to_owned(), source })?;
    Ok(status.code().unwrap_or(1))
}

/// Spawns the emitted binary and captures its standard output instead of
/// forwarding it, for the fixture-diffing test runner (spec.md §4.7/§8).
pub fn run_captured(binary_path: &Path) -> Result<(i32, String), ToolError> {
    let output = Command::new(binary_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| ToolError::Io { path: binary_path.to_owned(), source })?;
    Ok((output.status.code().unwrap_or(1), String::from_utf8_lossy(&output.stdout).into_owned()))
}
