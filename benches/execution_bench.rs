use criterion::{black_box, criterion_group, criterion_main, Criterion};
use figlang::{BufferedConsole, Evaluator, EvaluatorConfig, Parser, Scanner};

const SIMPLE: &str = r#"
price is 40
tax is 2
say price + tax
"#;

const REACTIVE: &str = r#"
watch score
whenever score is above 50: say "halfway"
every 10 times score changes: say "ten more"
score never goes above 90
score is 0
count from 1 to 100: score is score + 1
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize simple program", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new(black_box(SIMPLE));
            scanner.scan_tokens().unwrap()
        })
    });
}

fn parser_benchmark(c: &mut Criterion) {
    c.bench_function("parse reactive program", |b| {
        b.iter(|| {
            let tokens = Scanner::new(black_box(REACTIVE)).scan_tokens().unwrap();
            Parser::new(tokens).parse().unwrap()
        })
    });
}

fn evaluator_benchmark(c: &mut Criterion) {
    let program = Parser::new(Scanner::new(REACTIVE).scan_tokens().unwrap())
        .parse()
        .unwrap();

    c.bench_function("run reactive program", |b| {
        b.iter(|| {
            let mut evaluator = Evaluator::new()
                .with_console(BufferedConsole::new())
                .with_config(EvaluatorConfig::default().without_sleep());
            evaluator.run(black_box(&program)).unwrap()
        })
    });
}

criterion_group!(benches, lexer_benchmark, parser_benchmark, evaluator_benchmark);
criterion_main!(benches);
