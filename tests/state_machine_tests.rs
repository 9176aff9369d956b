/// State variables: declared states, transitions and reactions to them
use figlang::error::ErrorCategory;
use figlang::{BufferedConsole, CapturedOutput, FigEvaluator, Value};

fn evaluator() -> (FigEvaluator, CapturedOutput) {
    let console = BufferedConsole::new();
    let output = console.output();
    (FigEvaluator::new().with_console(console).with_seed(9), output)
}

const TRAFFIC_LIGHT: &str = "\
light can be red, green, yellow
light can go from red to green
light can go from green to yellow
light can go from yellow to red
";

#[test]
fn test_state_declaration_starts_empty() {
    let (mut ev, out) = evaluator();
    ev.run_source("light can be red, green, yellow\nsay light").unwrap();
    assert_eq!(out.lines(), vec!["nothing"]);
    assert_eq!(
        ev.state().states.get("light"),
        Some(&vec!["red".to_string(), "green".to_string(), "yellow".to_string()])
    );
}

#[test]
fn test_following_declared_transitions() {
    let (mut ev, out) = evaluator();
    let source = format!(
        "{}light starts as red\nlight becomes green\nlight becomes yellow\nsay light",
        TRAFFIC_LIGHT
    );
    ev.run_source(&source).unwrap();
    assert_eq!(out.lines(), vec!["yellow"]);
    assert_eq!(ev.value("light"), Some(&Value::text("yellow")));
    assert_eq!(
        ev.variable("light").unwrap().history(),
        &[
            Value::Null,
            Value::text("red"),
            Value::text("green"),
            Value::text("yellow")
        ]
    );
}

#[test]
fn test_illegal_transition_is_rejected() {
    let (mut ev, _) = evaluator();
    let source = format!("{}light starts as red\nlight becomes yellow", TRAFFIC_LIGHT);
    let err = ev.run_source(&source).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Value);
    assert_eq!(err.to_string(), "'light' cannot go from 'red' to 'yellow'");
    assert_eq!(ev.value("light"), Some(&Value::text("red")));
}

#[test]
fn test_undeclared_state_is_rejected() {
    let (mut ev, _) = evaluator();
    let err = ev
        .run_source("light can be red, green\nlight starts as blue")
        .unwrap_err();
    assert_eq!(err.to_string(), "'blue' is not valid for 'light'");

    let (mut ev, _) = evaluator();
    let err = ev
        .run_source("light can be red, green\nlight starts as red\nlight becomes blue")
        .unwrap_err();
    assert_eq!(err.to_string(), "'blue' is not valid for 'light'");
}

#[test]
fn test_without_transitions_any_declared_state_is_reachable() {
    let (mut ev, _) = evaluator();
    ev.run_source("door can be open, closed\ndoor starts as open\ndoor becomes closed\ndoor becomes open")
        .unwrap();
    assert_eq!(ev.value("door"), Some(&Value::text("open")));
}

#[test]
fn test_state_names_compare_as_text() {
    let (mut ev, out) = evaluator();
    let source = format!(
        "whenever light is green: say \"go\"\n{}light starts as red\nlight becomes green",
        TRAFFIC_LIGHT
    );
    ev.run_source(&source).unwrap();
    assert_eq!(out.lines(), vec!["go"]);
}

#[test]
fn test_state_changes_fire_hooks() {
    let (mut ev, out) = evaluator();
    let source = format!(
        "watch light\n{}light starts as red\nlight becomes green",
        TRAFFIC_LIGHT
    );
    ev.run_source(&source).unwrap();
    assert_eq!(
        out.lines(),
        vec![
            "  [watch] now watching 'light'",
            "  [watch] light changed: nothing -> red",
            "  [watch] light changed: red -> green",
        ]
    );
}

#[test]
fn test_debug_reports_state_changes() {
    let (mut ev, out) = evaluator();
    ev.run_source("door can be open, closed\ndoor starts as open\ndebug on\ndoor becomes closed")
        .unwrap();
    assert!(out
        .lines()
        .contains(&"  [state] door: open -> closed".to_string()));
}

#[test]
fn test_explain_shows_states() {
    let (mut ev, out) = evaluator();
    let source = format!("{}light starts as red\nexplain light", TRAFFIC_LIGHT);
    ev.run_source(&source).unwrap();
    let lines = out.lines();
    assert!(lines.contains(&"  current state   : red".to_string()), "{:?}", lines);
    assert!(lines.contains(&"  possible states : red, green, yellow".to_string()));
}

#[test]
fn test_roles_are_recorded() {
    let (mut ev, out) = evaluator();
    ev.run_source("role admin has: say \"can do anything\"").unwrap();
    assert!(out.lines().is_empty());
    assert!(ev.state().roles.contains_key("admin"));
}
