//! End-to-end scenarios from spec.md §8's "concrete end-to-end scenarios",
//! run through the full `build_tl_source` pipeline (lexer through emitter)
//! without invoking the TL compiler. Expectations live in a JSON fixture so
//! the scenario table is data, not a wall of near-identical `#[test]` fns.

use serde::Deserialize;

#[derive(Deserialize)]
struct Scenario {
    name: String,
    source: String,
    must_contain: Vec<String>,
}

#[test]
fn emitted_source_matches_golden_scenarios() {
    let raw = include_str!("fixtures/scenarios.json");
    let scenarios: Vec<Scenario> = serde_json::from_str(raw).expect("fixture is valid JSON");
    assert!(!scenarios.is_empty());

    for scenario in &scenarios {
        let emitted = pyzig::orchestrator::build_tl_source(scenario.source.as_bytes())
            .unwrap_or_else(|err| panic!("scenario {:?} failed to compile: {err}", scenario.name));
        for needle in &scenario.must_contain {
            assert!(
                emitted.contains(needle.as_str()),
                "scenario {:?}: expected emitted source to contain {needle:?}, got:\n{emitted}",
                scenario.name,
            );
        }
    }
}

#[test]
fn compile_is_deterministic() {
    let source = b"def f(n):\n    return n\nprint(f(7))\n";
    let first = pyzig::orchestrator::build_tl_source(source).unwrap();
    let second = pyzig::orchestrator::build_tl_source(source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unsupported_syntax_is_rejected_with_a_span() {
    let result = pyzig::orchestrator::build_tl_source(b"with open('a') as a:\n    pass\n");
    assert!(result.is_err());
}
