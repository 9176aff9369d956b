/// Remembered values, plain files, log export and libraries
use std::fs;
use std::path::{Path, PathBuf};

use figlang::error::ErrorCategory;
use figlang::{BufferedConsole, CapturedOutput, Error, EvaluatorConfig, FigEvaluator, Value};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "figlang_it_{}_{}",
        tag,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn evaluator(memory_dir: &Path) -> (FigEvaluator, CapturedOutput) {
    let console = BufferedConsole::new();
    let output = console.output();
    let config = EvaluatorConfig {
        memory_dir: memory_dir.to_path_buf(),
        ..EvaluatorConfig::default()
    };
    let evaluator = FigEvaluator::new()
        .with_console(console)
        .with_config(config.without_sleep());
    (evaluator, output)
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

#[test]
fn test_remember_survives_between_runs() {
    let dir = scratch_dir("remember");

    let (mut first, out) = evaluator(&dir);
    first
        .run_source("score is 42\nremember score as \"best\"")
        .unwrap();
    assert_eq!(out.lines(), vec!["  [remember] saved 'score' as 'best'"]);

    let (mut second, out) = evaluator(&dir);
    second
        .run_source("recall \"best\" -> score\nsay score + 1")
        .unwrap();
    assert_eq!(
        out.lines(),
        vec!["  [recall] loaded 'best' into 'score'", "43"]
    );
    assert_eq!(second.value("score"), Some(&Value::Int(42)));
}

#[test]
fn test_remembered_lists_keep_their_shape() {
    let dir = scratch_dir("lists");
    let (mut ev, _) = evaluator(&dir);
    ev.run_source("basket is [1, \"two\", true]\nremember basket as \"basket\"\nrecall \"basket\" -> copy")
        .unwrap();
    assert_eq!(ev.value("copy"), ev.value("basket"));
}

#[test]
fn test_forget_and_missing_memories() {
    let dir = scratch_dir("forget");
    let (mut ev, out) = evaluator(&dir);
    ev.run_source(
        "score is 1\nremember score as \"tmp\"\nforget \"tmp\"\nforget \"tmp\"\nrecall \"tmp\" -> score",
    )
    .unwrap();
    assert_eq!(
        out.lines(),
        vec![
            "  [remember] saved 'score' as 'tmp'",
            "  [forget] deleted 'tmp'",
            "FigLang: no memory for 'tmp'",
            "FigLang: no memory for 'tmp'",
        ]
    );
    assert_eq!(ev.value("score"), Some(&Value::Int(1)));
}

#[test]
fn test_remember_undefined_does_nothing() {
    let dir = scratch_dir("undefined");
    let (mut ev, out) = evaluator(&dir);
    ev.run_source("remember ghost as \"ghost\"").unwrap();
    assert!(out.lines().is_empty());
    assert!(!dir.join(".figlang_ghost.json").exists());
}

#[test]
fn test_file_statements() {
    let dir = scratch_dir("files");
    let notes = dir.join("notes.txt");
    let listing = dir.join("list.txt");
    let source = format!(
        "write \"alpha\" to {notes}\nread {notes} -> content\n\
         append \"beta\" to {listing}\nappend \"gamma\" to {listing}\n\
         lines of {listing} -> rows\nsay content\nsay rows",
        notes = quoted(&notes),
        listing = quoted(&listing),
    );

    let (mut ev, out) = evaluator(&dir);
    ev.run_source(&source).unwrap();
    let lines = out.lines();
    assert_eq!(lines[0], format!("  [file] wrote to '{}'", notes.display()));
    assert_eq!(lines[1], format!("  [file] appended to '{}'", listing.display()));
    assert_eq!(&lines[3..], &["alpha".to_string(), "[beta, gamma]".to_string()]);
    assert_eq!(fs::read_to_string(&listing).unwrap(), "beta\ngamma\n");
}

#[test]
fn test_missing_file_is_a_file_error() {
    let dir = scratch_dir("missing");
    let source = format!("read {} -> content", quoted(&dir.join("absent.txt")));
    let (mut ev, _) = evaluator(&dir);
    let err = ev.run_source(&source).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::File);
}

#[test]
fn test_logs_are_collected_and_saved() {
    let dir = scratch_dir("logs");
    let log_file = dir.join("run.log");
    let source = format!(
        "log \"started\"\nlog \"careful\" with level warning\nsave logs to {}",
        quoted(&log_file)
    );

    let (mut ev, out) = evaluator(&dir);
    ev.run_source(&source).unwrap();
    let lines = out.lines();
    assert!(lines[0].starts_with("  ["));
    assert!(lines[0].ends_with("] started"));
    assert!(lines[1].ends_with("] WARNING: careful"));
    assert_eq!(
        lines[2],
        format!("  [log] saved 2 entries to '{}'", log_file.display())
    );

    let saved = fs::read_to_string(&log_file).unwrap();
    assert_eq!(saved.lines().count(), 2);
    assert_eq!(ev.state().logs.len(), 2);
}

#[test]
fn test_use_loads_library_next_to_the_program() {
    let dir = scratch_dir("use");
    fs::create_dir_all(dir.join("libs")).unwrap();
    fs::write(
        dir.join("libs").join("helpers.fig"),
        "greeting is \"hi from lib\"\nzone called greet: say greeting\n",
    )
    .unwrap();
    let main = dir.join("main.fig");
    fs::write(&main, "use \"helpers\"\ndo greet\n").unwrap();

    let (mut ev, out) = evaluator(&dir);
    ev.run_file(&main).unwrap();
    assert_eq!(out.lines(), vec!["hi from lib"]);
    assert_eq!(ev.value("greeting"), Some(&Value::text("hi from lib")));
}

#[test]
fn test_use_searches_library_dirs() {
    let dir = scratch_dir("libdirs");
    let shared = dir.join("shared");
    fs::create_dir_all(&shared).unwrap();
    fs::write(shared.join("units.fig"), "factor is 3\n").unwrap();

    let console = BufferedConsole::new();
    let output = console.output();
    let config = EvaluatorConfig {
        memory_dir: dir.clone(),
        library_dirs: vec![shared],
        ..EvaluatorConfig::default()
    };
    let mut ev = FigEvaluator::new().with_console(console).with_config(config);
    ev.run_source("use \"units.fig\"\nsay factor * 2").unwrap();
    assert_eq!(output.lines(), vec!["6"]);
}

#[test]
fn test_use_missing_library() {
    let dir = scratch_dir("nolib");
    let (mut ev, _) = evaluator(&dir);
    let err = ev.run_source("use \"nowhere_to_be_found\"").unwrap_err();
    assert!(
        matches!(&err, Error::FileNotFound { path } if path == "nowhere_to_be_found.fig"),
        "{:?}",
        err
    );
}

#[test]
fn test_memory_keys_cannot_leave_the_memory_dir() {
    let dir = scratch_dir("escape");
    let (mut ev, out) = evaluator(&dir.join("inner"));
    let err = ev
        .run_source("score is 1\nremember score as \"../outside\"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Value);
    assert_eq!(err.to_string(), "'../outside' is not a valid memory name");
    assert!(out.lines().is_empty());
    assert!(!dir.join(".figlang_outside.json").exists());
}
