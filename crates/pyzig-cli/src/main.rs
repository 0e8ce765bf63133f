use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use pyzig::{BuildConfig, Mode};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("build") => {
            let Some(file) = args.get(1) else {
                eprintln!("usage: pyzig build <file> [<out>]");
                return ExitCode::FAILURE;
            };
            run_compile(file, args.get(2).map(PathBuf::from), Mode::Build)
        }
        Some("run") => {
            let Some(file) = args.get(1) else {
                eprintln!("usage: pyzig run <file>");
                return ExitCode::FAILURE;
            };
            run_compile(file, None, Mode::Run)
        }
        Some("test") => {
            let dir = args.get(1).map_or_else(|| Path::new("tests/fixtures").to_owned(), PathBuf::from);
            run_test_suite(&dir)
        }
        Some(file) => run_compile(file, None, Mode::Run),
        None => {
            eprintln!("usage: pyzig <file> | pyzig build <file> [<out>] | pyzig run <file> | pyzig test [<dir>]");
            ExitCode::FAILURE
        }
    }
}

fn run_compile(file: &str, output_path: Option<PathBuf>, mode: Mode) -> ExitCode {
    let config = BuildConfig {
        source_path: PathBuf::from(file),
        output_path,
        mode,
        cache_dir: BuildConfig::default_cache_dir(),
        zig_path: BuildConfig::default_zig_path(),
    };

    match pyzig::compile(&config) {
        Ok(outcome) => {
            if let Some(code) = outcome.exit_code {
                exit_code_from(code)
            } else {
                eprintln!("compiled {} -> {}", file, outcome.output_path.display());
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// The "language-agnostic test runner" spec.md §6 defers to: every
/// `<name>.py` under `dir` with a sibling `<name>.expected` is compiled and
/// run, and its stdout is diffed against the fixture (spec.md §8).
fn run_test_suite(dir: &Path) -> ExitCode {
    let fixtures = match discover_fixtures(dir) {
        Ok(fixtures) => fixtures,
        Err(err) => {
            eprintln!("error: could not read test directory {}: {err}", dir.display());
            return ExitCode::FAILURE;
        }
    };

    if fixtures.is_empty() {
        eprintln!("no test fixtures found under {}", dir.display());
        return ExitCode::FAILURE;
    }

    let mut passed = 0;
    let mut failed = 0;
    for fixture in &fixtures {
        match run_fixture(fixture) {
            Ok(()) => {
                passed += 1;
                eprintln!("ok   {}", fixture.display());
            }
            Err(reason) => {
                failed += 1;
                eprintln!("FAIL {}: {reason}", fixture.display());
            }
        }
    }

    eprintln!("{passed} passed, {failed} failed");
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn discover_fixtures(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut fixtures = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "py") && path.with_extension("expected").is_file() {
            fixtures.push(path);
        }
    }
    fixtures.sort();
    Ok(fixtures)
}

fn run_fixture(source_path: &Path) -> Result<(), String> {
    let expected_path = source_path.with_extension("expected");
    let expected = fs::read_to_string(&expected_path).map_err(|err| format!("reading {}: {err}", expected_path.display()))?;

    let config = BuildConfig {
        source_path: source_path.to_owned(),
        output_path: None,
        mode: Mode::Build,
        cache_dir: BuildConfig::default_cache_dir(),
        zig_path: BuildConfig::default_zig_path(),
    };
    let outcome = pyzig::compile(&config).map_err(|err| err.to_string())?;
    let (code, stdout) = pyzig::toolchain::run_captured(&outcome.output_path).map_err(|err| err.to_string())?;
    if code != 0 {
        return Err(format!("exited with status {code}"));
    }
    if stdout != expected {
        return Err(format!("stdout mismatch:\n--- expected ---\n{expected}\n--- actual ---\n{stdout}"));
    }
    Ok(())
}

fn exit_code_from(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
