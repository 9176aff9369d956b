/// End-to-end tests for the core language
/// Demonstrates: Scanner → Parser → Evaluator working together
use figlang::error::ErrorCategory;
use figlang::{
    BufferedConsole, CapturedOutput, Error, EvaluatorConfig, FigEvaluator, FigParser, FigScanner,
    Value,
};

fn run(source: &str) -> (FigEvaluator, CapturedOutput) {
    let console = BufferedConsole::new();
    let output = console.output();
    let mut evaluator = FigEvaluator::new()
        .with_console(console)
        .with_seed(11)
        .with_config(EvaluatorConfig::default().without_sleep());
    evaluator.run_source(source).unwrap();
    (evaluator, output)
}

fn lines(source: &str) -> Vec<String> {
    run(source).1.lines()
}

fn run_err(source: &str) -> Error {
    let mut evaluator = FigEvaluator::new()
        .with_console(BufferedConsole::new())
        .with_config(EvaluatorConfig::default().without_sleep());
    evaluator.run_source(source).unwrap_err()
}

#[test]
fn test_pipeline_stages_by_hand() {
    let source = "price is 40\nsay price + 2";

    // Lex
    let mut scanner = FigScanner::new(source);
    let tokens = scanner.scan_tokens().unwrap();

    // Parse
    let mut parser = FigParser::new(tokens);
    let program = parser.parse().unwrap();
    assert_eq!(program.statements.len(), 2);

    // Evaluate
    let console = BufferedConsole::new();
    let output = console.output();
    let mut evaluator = FigEvaluator::new().with_console(console);
    evaluator.run(&program).unwrap();

    assert_eq!(output.lines(), vec!["42"]);
}

#[test]
fn test_arithmetic_is_left_to_right() {
    assert_eq!(lines("say 2 + 3 * 4"), vec!["20"]);
    assert_eq!(lines("say 10 - 4 - 3"), vec!["3"]);
    assert_eq!(lines("say 7 / 2"), vec!["3.5"]);
}

#[test]
fn test_and_joins_text() {
    assert_eq!(lines("name is \"Ada\"\nsay \"Hi \" and name"), vec!["Hi Ada"]);
}

#[test]
fn test_if_but_if_otherwise() {
    let program = "\
rank is 2
if rank is above 3: say \"big\"
but if rank is above 1: say \"medium\"
otherwise: say \"small\"";
    assert_eq!(lines(program), vec!["medium"]);

    assert_eq!(
        lines("rank is 0\nif rank is above 3: say \"big\" otherwise: say \"small\""),
        vec!["small"]
    );
}

#[test]
fn test_given_runs_only_when_true() {
    let out = lines("n is 4\ngiven n is at least 4: say \"yes\"\ngiven n is below 4: say \"no\"");
    assert_eq!(out, vec!["yes"]);
}

#[test]
fn test_loops() {
    assert_eq!(lines("repeat 3 times: say \"hi\""), vec!["hi", "hi", "hi"]);
    assert_eq!(lines("count from 2 to 4: say it"), vec!["2", "3", "4"]);
    assert_eq!(
        lines("items is [1, 2, 3]\nfor each n in items: say n * 10"),
        vec!["10", "20", "30"]
    );
    assert_eq!(
        lines("n is 0\nuntil n is at least 3: n is n + 1\nsay n"),
        vec!["3"]
    );
}

#[test]
fn test_for_each_over_single_value_does_nothing() {
    assert!(lines("word is \"abc\"\nfor each c in word: say c").is_empty());
}

#[test]
fn test_number_formats() {
    assert_eq!(lines("say 1234567 formatted"), vec!["1,234,567"]);
    assert_eq!(lines("say 0.25 as percentage"), vec!["25%"]);
    assert_eq!(lines("say 255 in hexadecimal"), vec!["FF"]);
    assert_eq!(lines("say 5 in binary"), vec!["101"]);
    assert_eq!(lines("say 3.14159 rounded to 2"), vec!["3.14"]);
}

#[test]
fn test_unit_conversion_and_percent() {
    assert_eq!(lines("say 100 celsius in fahrenheit"), vec!["212"]);
    assert_eq!(lines("say 2 hours in minutes"), vec!["120"]);
    assert_eq!(lines("say 20 percent of 50"), vec!["10"]);
}

#[test]
fn test_math_helpers() {
    assert_eq!(lines("say half of 7"), vec!["3.5"]);
    assert_eq!(lines("say square of 9"), vec!["81"]);
    assert_eq!(lines("say round 2.5"), vec!["2"]);
    assert_eq!(lines("say round 3.5"), vec!["4"]);
}

#[test]
fn test_text_operations() {
    let source = "\
word is \"figlang\"
say length of word
say first 3 letters of word
say last 4 letters of word
say word in uppercase
say word capitalized
say word without \"lang\"
say word repeated 2 times";
    assert_eq!(
        lines(source),
        vec!["7", "fig", "lang", "FIGLANG", "Figlang", "fig", "figlangfiglang"]
    );
}

#[test]
fn test_collection_queries() {
    let source = "\
scores is [4, 9, 2]
say average of scores
say total of scores
say sorted scores
say reversed scores
say highest of scores
say lowest of scores";
    assert_eq!(lines(source), vec!["5", "15", "[2, 4, 9]", "[2, 9, 4]", "9", "2"]);
}

#[test]
fn test_variable_memory() {
    let source = "\
temp is 10
temp is 30
temp is 20
say previous value of temp
say history of temp
say highest of temp
say lowest of temp";
    assert_eq!(lines(source), vec!["30", "[10, 30, 20]", "30", "10"]);
}

#[test]
fn test_data_pipeline() {
    assert_eq!(
        lines("start with [5, 1, 8, 3], keep above 2, double each, sorted, say each"),
        vec!["6", "10", "16"]
    );
    assert_eq!(
        lines("start with [1, 2, 3], keep only the ones below 3, reversed, say each"),
        vec!["2", "1"]
    );
}

#[test]
fn test_zones_and_aliases() {
    let source = "\
zone called greet: say \"hello\"
do greet
do greet again
alias \"shout\" means say \"HEY\"
do shout
dog is \"rex\"
dog shout";
    assert_eq!(lines(source), vec!["hello", "hello", "HEY", "HEY"]);
}

#[test]
fn test_unknown_zone_is_a_name_error() {
    let err = run_err("do nowhere");
    assert_eq!(err.category(), ErrorCategory::Name);
}

#[test]
fn test_clamp_and_chains() {
    assert_eq!(lines("rank is 150\nclamp rank between 0 and 100 then say"), vec!["100"]);
    assert_eq!(
        lines("name is \"  ada lovelace \"\nclean name then capitalize then say"),
        vec!["Ada Lovelace"]
    );
    let (ev, _) = run("name is \" Bob \"\nclean name then uppercase");
    assert_eq!(ev.value("name"), Some(&Value::text("BOB")));
}

#[test]
fn test_limits_clamp_assignments() {
    let source = "\
speed is 50
speed is never goes below 0 or above 120
speed is 200
say speed
speed is -5
say speed";
    assert_eq!(lines(source), vec!["120", "0"]);
}

#[test]
fn test_assume_only_fills_gaps() {
    assert_eq!(lines("assume rank is 5 unless defined\nsay rank"), vec!["5"]);
    assert_eq!(
        lines("rank is 1\nassume rank is 5 unless defined\nsay rank"),
        vec!["1"]
    );
}

#[test]
fn test_groups_collect_items() {
    let source = "\
team is a group of people
add \"ada\" to team
add \"bob\" to team
say team";
    assert_eq!(lines(source), vec!["[ada, bob]"]);
    assert_eq!(run_err("add 1 to nobody").category(), ErrorCategory::Name);
}

#[test]
fn test_maps_and_fields() {
    let source = "\
person has:
name is \"Ada\"
age is 36

say name of person
say person";
    assert_eq!(lines(source), vec!["Ada", "{age: 36, name: Ada}"]);
}

#[test]
fn test_tables() {
    let source = "\
table scores:
ada | 90
bob | 75

say row 1 of scores
say column 2 of scores
show scores sorted by 2";
    assert_eq!(
        lines(source),
        vec!["[ada, 90]", "[90, 75]", "  bob | 75", "  ada | 90"]
    );
}

#[test]
fn test_show_styles() {
    assert_eq!(
        lines("fruits is [\"apple\", \"pear\"]\nshow fruits as list"),
        vec!["  1. apple", "  2. pear"]
    );
    assert_eq!(lines("show 5"), vec!["5"]);
}

#[test]
fn test_try_falls_back() {
    assert_eq!(
        lines("try to say 1 / 0 but if it fails say \"recovered\""),
        vec!["recovered"]
    );
    assert!(lines("try to say missing").is_empty());
}

#[test]
fn test_check_that_reports() {
    assert_eq!(
        lines("rank is 5\ncheck that rank is above 3"),
        vec!["  ✓ rank is above 3"]
    );
    assert_eq!(
        lines("rank is 1\ncheck that rank is above 3"),
        vec!["  ✗ FAILED: rank is above 3"]
    );
}

#[test]
fn test_validate() {
    assert_eq!(
        lines("validate email \"ada@example.com\""),
        vec!["  validate email \"ada@example.com\": true"]
    );
    assert_eq!(
        lines("validate url \"not a url\""),
        vec!["  validate url \"not a url\": false"]
    );
}

#[test]
fn test_conditions_with_validation_and_text() {
    let source = "\
mail is \"a@b.io\"
given mail is valid email: say \"mail ok\"
word is \"figlang\"
given word starts with \"fig\": say \"prefix ok\"
given word contains \"lang\": say \"contains ok\"
given word is not empty: say \"not empty\"";
    assert_eq!(
        lines(source),
        vec!["mail ok", "prefix ok", "contains ok", "not empty"]
    );
}

#[test]
fn test_between_and_logical_conditions() {
    let source = "\
n is 5
given n is between 1 and 10: say \"inside\"
given n is above 1 and n is below 3: say \"narrow\"
given n is above 9 or n is below 6: say \"either\"";
    assert_eq!(lines(source), vec!["inside", "either"]);
}

#[test]
fn test_ask_stores_typed_answer() {
    let console = BufferedConsole::with_input(["36"]);
    let output = console.output();
    let mut evaluator = FigEvaluator::new().with_console(console);
    evaluator
        .run_source("ask \"Age?\" -> age\nsay age + 1")
        .unwrap();
    assert_eq!(evaluator.value("age"), Some(&Value::Int(36)));
    assert_eq!(output.lines(), vec!["Age? ", "37"]);
}

#[test]
fn test_listen_retries_until_valid() {
    let console = BufferedConsole::with_input(["lots", "12"]);
    let output = console.output();
    let mut evaluator = FigEvaluator::new().with_console(console);
    evaluator.run_source("listen for number -> n").unwrap();
    assert_eq!(evaluator.value("n"), Some(&Value::Int(12)));
    assert!(output
        .lines()
        .contains(&"  Please enter a valid number.".to_string()));
}

#[test]
fn test_listen_yes_or_no() {
    let console = BufferedConsole::with_input(["maybe", "y"]);
    let mut evaluator = FigEvaluator::new().with_console(console);
    evaluator.run_source("listen for yes or no -> answer").unwrap();
    assert_eq!(evaluator.value("answer"), Some(&Value::Bool(true)));
}

#[test]
fn test_closed_input_is_an_error() {
    let mut evaluator = FigEvaluator::new().with_console(BufferedConsole::new());
    let err = evaluator.run_source("ask \"Name?\" -> name").unwrap_err();
    assert!(matches!(err, Error::InputClosed));
}

#[test]
fn test_say_with_context_uses_annotations() {
    let source = "\
weight is 12
weight described as \"net\" measured in \"kg\" owned by \"Ada\"
say weight with context";
    assert_eq!(lines(source), vec!["weight (Ada's) [net]: 12 kg"]);
}

#[test]
fn test_compare_reports_difference() {
    let out = lines("low is 100\nhigh is 150\ncompare low and high");
    assert!(out.contains(&"  difference: +50".to_string()), "{:?}", out);
}

#[test]
fn test_wait_and_after_without_sleeping() {
    assert_eq!(lines("wait 2 seconds\nafter 5 seconds: say \"later\""), vec!["later"]);
    let err = run_err("wait -1");
    assert_eq!(err.category(), ErrorCategory::Value);
}

#[test]
fn test_measure_time_sets_elapsed() {
    let (ev, out) = run("measure time: say \"work\"");
    assert_eq!(out.lines(), vec!["work"]);
    assert!(matches!(ev.value("elapsed_time"), Some(Value::Float(_))));
}

#[test]
fn test_errors() {
    assert!(matches!(run_err("say 1 / 0"), Error::DivisionByZero));
    assert_eq!(run_err("say missing").category(), ErrorCategory::Name);
    assert_eq!(run_err("say \"a\" - 1").category(), ErrorCategory::Type);
}

#[test]
fn test_syntax_error_reports_line() {
    let err = run_err("say 1\nsay 2\nif : say 3");
    assert!(err.is_syntax());
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_comments_are_ignored() {
    assert_eq!(lines("-- a note\nsay 1 -- trailing"), vec!["1"]);
}

#[test]
fn test_huge_repetition_is_a_value_error() {
    let huge = i64::MAX;
    for source in [
        format!("say \"ab\" * {}", huge),
        format!("word is \"ab\"\nsay word repeated {} times", huge),
        format!("say [1, 2, 3] * {}", huge),
    ] {
        let err = run_err(&source);
        assert_eq!(err.category(), ErrorCategory::Value, "{}", source);
        assert!(err.to_string().contains("too large to repeat"), "{}", err);
    }

    let source = format!("try to say \"ab\" * {} but if it fails say \"too big\"", huge);
    assert_eq!(lines(&source), vec!["too big"]);
}

#[test]
fn test_late_limits_keep_the_assigned_value() {
    let source = "\
speed is 150
speed never goes above 100
say history of speed
speed is 130
say history of speed";
    assert_eq!(lines(source), vec!["[150]", "[150, 100]"]);
}
