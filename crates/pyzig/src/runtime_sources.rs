//! The hand-written Zig Runtime Value Library (spec.md §4.5), embedded at
//! compile time and written byte-for-byte into every scratch build
//! directory before the TL compiler runs. These files are never
//! templated or regenerated per program (spec.md §4.5, "compiled once;
//! linked into every output binary").

use std::{fs, path::Path};

use crate::error::ToolError;

const FILES: &[(&str, &str)] = &[
    ("pyobject.zig", include_str!("../../../runtime/pyobject.zig")),
    ("pystring.zig", include_str!("../../../runtime/pystring.zig")),
    ("pylist.zig", include_str!("../../../runtime/pylist.zig")),
    ("pydict.zig", include_str!("../../../runtime/pydict.zig")),
    ("pytuple.zig", include_str!("../../../runtime/pytuple.zig")),
    ("json.zig", include_str!("../../../runtime/json.zig")),
    ("http.zig", include_str!("../../../runtime/http.zig")),
    ("runtime.zig", include_str!("../../../runtime/runtime.zig")),
];

/// Writes every runtime source file into `dir`, alongside the scratch
/// `.zig` file that `@import("runtime.zig")`s them.
pub fn write_into(dir: &Path) -> Result<(), ToolError> {
    for (name, contents) in FILES {
        let path = dir.join(name);
        fs::write(&path, contents).map_err(|source| ToolError::Io { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_every_runtime_file() {
        let dir = std::env::temp_dir().join("pyzig-runtime-sources-test");
        let _ = fs::create_dir_all(&dir);
        write_into(&dir).unwrap();
        for (name, _) in FILES {
            assert!(dir.join(name).is_file(), "{name} was not written");
        }
    }
}
