/// Reactive behaviour: whenever, every, reacts to, linked, watch and require
use figlang::error::ErrorCategory;
use figlang::parser::Certainty;
use figlang::{BufferedConsole, CapturedOutput, Error, EvaluatorConfig, FigEvaluator, Value};

fn evaluator(seed: u64) -> (FigEvaluator, CapturedOutput) {
    let console = BufferedConsole::new();
    let output = console.output();
    let evaluator = FigEvaluator::new()
        .with_console(console)
        .with_seed(seed)
        .with_config(EvaluatorConfig::default().without_sleep());
    (evaluator, output)
}

fn lines(source: &str) -> Vec<String> {
    let (mut ev, out) = evaluator(3);
    ev.run_source(source).unwrap();
    out.lines()
}

#[test]
fn test_whenever_fires_on_each_matching_assignment() {
    let source = "\
whenever temp is above 30: say \"hot\"
temp is 25
temp is 35
temp is 40
temp is 10";
    assert_eq!(lines(source), vec!["hot", "hot"]);
}

#[test]
fn test_whenever_is_checked_after_any_assignment() {
    let source = "\
whenever temp is above 30: say \"still hot\"
temp is 35
other is 1";
    assert_eq!(lines(source), vec!["still hot", "still hot"]);
}

#[test]
fn test_whenever_registered_late_sees_only_later_assignments() {
    let source = "\
temp is 50
whenever temp is above 30: say \"hot\"
say \"registered\"";
    assert_eq!(lines(source), vec!["registered"]);
}

#[test]
fn test_every_n_changes() {
    let source = "\
every 2 times score changes: say \"two more\"
score is 1
score is 2
score is 3
score is 4
score is 5";
    assert_eq!(lines(source), vec!["two more", "two more"]);
}

#[test]
fn test_reactions_follow_dependencies() {
    let source = "\
price is 2
qty is 3
bill reacts to price and qty: say price * qty
price is 5
qty is 4
other is 9";
    assert_eq!(lines(source), vec!["15", "20"]);
}

#[test]
fn test_linked_variables() {
    let source = "\
left is 1
right is 1
left and right are linked: say \"sync\"
left is 2";
    assert_eq!(lines(source), vec!["sync"]);
}

#[test]
fn test_trend_conditions() {
    let source = "\
whenever temp keeps going up: say \"rising\"
whenever temp keeps going down: say \"falling\"
temp is 1
temp is 2
temp is 3
temp is 2";
    assert_eq!(lines(source), vec!["rising", "rising", "falling"]);
}

#[test]
fn test_hits_and_changes() {
    let source = "\
whenever score hits 10: say \"target\"
score is 5
score is 10";
    assert_eq!(lines(source), vec!["target"]);

    let source = "\
whenever score changes: say \"changed\"
score is 5
score is 5
score is 6";
    assert_eq!(lines(source), vec!["changed"]);
}

#[test]
fn test_watch_and_unwatch() {
    let source = "\
score is 1
watch score
score is 2
score is 2
unwatch score
score is 3";
    assert_eq!(
        lines(source),
        vec![
            "  [watch] now watching 'score'",
            "  [watch] score changed: 1 -> 2",
            "  [watch] stopped watching 'score'",
        ]
    );
}

#[test]
fn test_require_stops_the_program() {
    let (mut ev, out) = evaluator(1);
    let err = ev
        .run_source("require stock to be positive\nstock is 3\nsay stock\nstock is -1\nsay \"unreachable\"")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Value);
    assert_eq!(err.to_string(), "'stock' must be above 0, got -1");
    assert_eq!(out.lines(), vec!["3"]);
}

#[test]
fn test_require_several_constraints() {
    let (mut ev, _) = evaluator(1);
    let err = ev
        .run_source("require label to be not empty and not \"none\"\nlabel is \"none\"")
        .unwrap_err();
    assert_eq!(err.to_string(), "'label' must not be none, got none");

    let (mut ev, _) = evaluator(1);
    let err = ev
        .run_source("require label to be not empty\nlabel is empty")
        .unwrap_err();
    assert_eq!(err.to_string(), "'label' must not be empty");
}

#[test]
fn test_require_does_not_check_loop_variables() {
    let source = "\
require it to be below 2
count from 1 to 3: say it";
    assert_eq!(lines(source), vec!["1", "2", "3"]);
}

#[test]
fn test_limits_apply_before_hooks() {
    let source = "\
volume is 5
volume never goes above 10
watch volume
volume is 50";
    assert_eq!(
        lines(source),
        vec![
            "  [watch] now watching 'volume'",
            "  [watch] volume changed: 5 -> 10",
        ]
    );
}

#[test]
fn test_self_triggering_whenever_hits_recursion_bound() {
    let (mut ev, _) = evaluator(1);
    let err = ev
        .run_source("whenever n is above 0: n is n + 1\nn is 1")
        .unwrap_err();
    assert!(matches!(err, Error::RecursionLimit { depth: 64 }));
}

#[test]
fn test_certainty_is_recorded_on_assignment() {
    let (mut ev, _) = evaluator(1);
    ev.run_source("forecast is probably \"rain\"\nchance is maybe 3")
        .unwrap();
    assert_eq!(
        ev.variable("forecast").unwrap().certainty,
        Certainty::Probably
    );
    assert_eq!(ev.variable("chance").unwrap().certainty, Certainty::Maybe);
    assert_eq!(ev.value("chance"), Some(&Value::Int(3)));
}

fn qualified_hits(qualifier: &str, seed: u64) -> i64 {
    let (mut ev, _) = evaluator(seed);
    let source = format!(
        "mark is 5\ntally is 0\nrepeat 1000 times: given mark is {} 5: tally is tally + 1",
        qualifier
    );
    ev.run_source(&source).unwrap();
    match ev.value("tally") {
        Some(Value::Int(n)) => *n,
        other => panic!("unexpected tally {:?}", other),
    }
}

#[test]
fn test_qualified_conditions_hold_at_their_rate() {
    let probably = qualified_hits("probably", 17);
    assert!((720..=880).contains(&probably), "probably held {} times", probably);

    let maybe = qualified_hits("maybe", 17);
    assert!((420..=580).contains(&maybe), "maybe held {} times", maybe);

    assert_eq!(qualified_hits("definitely", 17), 1000);
}

#[test]
fn test_qualified_false_condition_never_holds() {
    let (mut ev, _) = evaluator(5);
    ev.run_source("mark is 5\ntally is 0\nrepeat 200 times: given mark is probably 6: tally is tally + 1")
        .unwrap();
    assert_eq!(ev.value("tally"), Some(&Value::Int(0)));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let source = "\
repeat 5 times: say random number between 1 and 1000
say random item from [\"a\", \"b\", \"c\"]
say shuffled [1, 2, 3, 4]";
    assert_eq!(lines(source), lines(source));
}

#[test]
fn test_snapshots_restore_variables() {
    let source = "\
score is 1
take snapshot \"start\"
score is 9
restore snapshot \"start\"
say score
restore snapshot \"missing\"";
    assert_eq!(
        lines(source),
        vec![
            "  [snapshot] saved 'start'",
            "  [snapshot] restored 'start'",
            "1",
            "FigLang: snapshot 'missing' not found",
        ]
    );
}

#[test]
fn test_debug_traces_assignments() {
    let out = lines("debug on\nscore is 1\ndebug off\nscore is 2");
    assert_eq!(out[0], "  [debug] on");
    assert!(out.contains(&"  [assign] score = 1".to_string()));
    assert!(!out.contains(&"  [assign] score = 2".to_string()));
    assert_eq!(out.last().map(String::as_str), Some("  [debug] off"));
}

#[test]
fn test_explain_reports_history() {
    let out = lines("score is 1\nscore is 4\nexplain score");
    assert!(out.contains(&"  current value   : 4".to_string()), "{:?}", out);
    assert!(out.contains(&"  history         : [1, 4]".to_string()));
    assert!(out.contains(&"  trend           : going up".to_string()));
    assert!(out.contains(&"  previous value  : 1".to_string()));
}
