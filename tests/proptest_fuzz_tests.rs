//! Property-based fuzzing tests for the FigLang scanner, parser and evaluator
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. The scanner and parser never panic on arbitrary input
//! 2. The evaluator fails with errors, not panics, on nonsense programs
//! 3. Well-formed programs produce the results the language defines

use figlang::lexer::tokenize;
use figlang::parser::parse_source;
use figlang::{BufferedConsole, CapturedOutput, EvaluatorConfig, FigEvaluator, Value};
use proptest::prelude::*;

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Generate random strings that might break the scanner
fn arbitrary_source_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x00-\x7F]{0,500}").unwrap()
}

/// Generate token soup built from FigLang words and symbols
fn fig_like_string() -> impl Strategy<Value = String> {
    prop::collection::vec(fig_token(), 0..60).prop_map(|tokens| tokens.join(" "))
}

/// Words and symbols that drive the parser into its statement forms
fn fig_token() -> impl Strategy<Value = String> {
    prop_oneof![
        // Statement keywords
        Just("say".to_string()),
        Just("if".to_string()),
        Just("but if".to_string()),
        Just("otherwise".to_string()),
        Just("given".to_string()),
        Just("whenever".to_string()),
        Just("every".to_string()),
        Just("times".to_string()),
        Just("changes".to_string()),
        Just("reacts to".to_string()),
        Just("require".to_string()),
        Just("to be".to_string()),
        Just("never goes".to_string()),
        Just("can be".to_string()),
        Just("becomes".to_string()),
        Just("start with".to_string()),
        Just("keep above".to_string()),
        Just("zone called".to_string()),
        Just("do".to_string()),
        Just("check that".to_string()),
        Just("table".to_string()),
        Just("has".to_string()),
        Just("is".to_string()),
        Just("a group of".to_string()),
        // Condition words
        Just("above".to_string()),
        Just("below".to_string()),
        Just("between".to_string()),
        Just("at least".to_string()),
        Just("not".to_string()),
        Just("empty".to_string()),
        Just("probably".to_string()),
        Just("maybe".to_string()),
        Just("and".to_string()),
        Just("or".to_string()),
        // Symbols
        Just(":".to_string()),
        Just(",".to_string()),
        Just("|".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("+".to_string()),
        Just("-".to_string()),
        Just("*".to_string()),
        Just("/".to_string()),
        Just("->".to_string()),
        Just("\n".to_string()),
        // Numbers
        (0i64..10i64).prop_map(|n| n.to_string()),
        (0.0f64..10.0f64).prop_map(|f| format!("{:.2}", f)),
        // Strings
        r#""[a-zA-Z0-9 ]{0,12}""#.prop_map(|s| s),
        // Identifiers
        prop_oneof![Just("x"), Just("y"), Just("z"), Just("it")].prop_map(String::from),
        // Comments
        "--[^\n]{0,20}".prop_map(|s| s),
    ]
}

/// A small left-to-right arithmetic chain and the value it must produce
fn arithmetic_chain() -> impl Strategy<Value = (String, i64)> {
    let first = 0i64..100;
    let rest = prop::collection::vec((prop_oneof![Just('+'), Just('-'), Just('*')], 0i64..100), 0..6);
    (first, rest).prop_map(|(first, rest)| {
        let mut source = format!("say {}", first);
        let mut expected = first;
        for (op, n) in rest {
            source.push_str(&format!(" {} {}", op, n));
            expected = match op {
                '+' => expected + n,
                '-' => expected - n,
                _ => expected * n,
            };
        }
        (source, expected)
    })
}

fn sandboxed() -> (FigEvaluator, CapturedOutput) {
    let console = BufferedConsole::new();
    let output = console.output();
    let config = EvaluatorConfig {
        max_until_iterations: 100,
        max_block_depth: 16,
        ..EvaluatorConfig::default()
    };
    let evaluator = FigEvaluator::new()
        .with_console(console)
        .with_seed(1)
        .with_config(config.without_sleep());
    (evaluator, output)
}

// =============================================================================
// FRONT END
// =============================================================================

proptest! {
    #[test]
    fn scanner_never_panics(source in arbitrary_source_string()) {
        let _ = tokenize(&source);
    }

    #[test]
    fn scanner_handles_unicode(source in "\\PC{0,100}") {
        let _ = tokenize(&source);
    }

    #[test]
    fn scanner_always_ends_with_eof(source in fig_like_string()) {
        if let Ok(tokens) = tokenize(&source) {
            prop_assert!(tokens.last().is_some_and(|t| t.kind == figlang::TokenKind::Eof));
        }
    }

    #[test]
    fn parser_never_panics(source in arbitrary_source_string()) {
        let _ = parse_source(&source);
    }

    #[test]
    fn parser_never_panics_on_fig_tokens(source in fig_like_string()) {
        let _ = parse_source(&source);
    }

    #[test]
    fn parser_handles_deep_nesting(depth in 1usize..30) {
        let source = format!("say {}7{}", "(".repeat(depth), ")".repeat(depth));
        prop_assert!(parse_source(&source).is_ok());

        let list = format!("say {}1{}", "[".repeat(depth), "]".repeat(depth));
        prop_assert!(parse_source(&list).is_ok());
    }

    #[test]
    fn parser_rejects_unclosed_lists(depth in 1usize..30) {
        let source = format!("say {}1", "[".repeat(depth));
        prop_assert!(parse_source(&source).is_err());
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

proptest! {
    #[test]
    fn evaluator_never_panics_on_fig_tokens(source in fig_like_string()) {
        let (mut evaluator, _) = sandboxed();
        let _ = evaluator.run_source(&source);
    }

    #[test]
    fn arithmetic_is_left_to_right((source, expected) in arithmetic_chain()) {
        let (mut evaluator, output) = sandboxed();
        evaluator.run_source(&source).unwrap();
        prop_assert_eq!(output.lines(), vec![expected.to_string()]);
    }

    #[test]
    fn seeded_runs_are_deterministic(seed in any::<u64>()) {
        let source = "repeat 5 times: say random number between 1 and 100\nsay shuffled [1, 2, 3, 4, 5]";
        let run = |seed: u64| {
            let console = BufferedConsole::new();
            let output = console.output();
            let mut evaluator = FigEvaluator::new().with_console(console).with_seed(seed);
            evaluator.run_source(source).unwrap();
            output.lines()
        };
        prop_assert_eq!(run(seed), run(seed));
    }

    #[test]
    fn text_is_said_verbatim(text in "[a-zA-Z0-9 ,.!?]{0,40}") {
        let (mut evaluator, output) = sandboxed();
        evaluator.run_source(&format!("say \"{}\"", text)).unwrap();
        prop_assert_eq!(output.lines(), vec![text]);
    }

    #[test]
    fn repeat_runs_its_body_n_times(n in 0usize..40) {
        let (mut evaluator, output) = sandboxed();
        evaluator.run_source(&format!("repeat {} times: say \"tick\"", n)).unwrap();
        prop_assert_eq!(output.lines().len(), n);
    }

    #[test]
    fn limits_clamp_every_assignment(value in -1000i64..1000) {
        let (mut evaluator, _) = sandboxed();
        let source = format!("speed is never goes below 0 or above 100\nspeed is {}", value);
        evaluator.run_source(&source).unwrap();
        prop_assert_eq!(evaluator.value("speed"), Some(&Value::Int(value.clamp(0, 100))));
    }

    #[test]
    fn history_records_every_assignment(values in prop::collection::vec(0i64..50, 1..20)) {
        let (mut evaluator, _) = sandboxed();
        let source: Vec<String> = values.iter().map(|v| format!("score is {}", v)).collect();
        evaluator.run_source(&source.join("\n")).unwrap();
        let expected: Vec<Value> = values.iter().copied().map(Value::Int).collect();
        prop_assert_eq!(evaluator.variable("score").unwrap().history(), expected.as_slice());
    }
}

// =============================================================================
// REGRESSIONS
// =============================================================================

#[test]
fn regression_empty_input() {
    let program = parse_source("").unwrap();
    assert!(program.statements.is_empty());
}

#[test]
fn regression_only_whitespace_and_comments() {
    let program = parse_source("   \n\t\n-- nothing here\n").unwrap();
    assert!(program.statements.is_empty());
}

#[test]
fn regression_dangling_colon() {
    let (mut evaluator, _) = sandboxed();
    assert!(evaluator.run_source("repeat 2 times:").is_ok());
}

#[test]
fn regression_ten_thousand_parens() {
    let source = format!("say {}1{}", "(".repeat(10_000), ")".repeat(10_000));
    let err = parse_source(&source).unwrap_err();
    assert!(err.is_syntax());

    let (mut evaluator, _) = sandboxed();
    assert!(evaluator.run_source(&source).is_err());
}
