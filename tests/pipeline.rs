use std::collections::HashSet;

use tolc::generator;
use tolc::io::Reader;
use tolc::lexer::Lexer;
use tolc::parser::Parser;
use tolc::static_analysis::static_analysis;

fn compile(filename: &str, input: &str) -> String {
    let reader = Reader::new(filename.to_string(), input.as_bytes().to_vec());
    let tokens = Lexer::new(reader).tokenize().unwrap();
    let program = Parser::new(tokens).parse().unwrap();
    static_analysis(&program).unwrap();
    generator::generate(&program)
}

/// Every label referenced anywhere in the stream must also be defined in it,
/// exactly once. This is the whole contract toward the downstream resolver.
fn assert_labels_resolve(output: &str) {
    let mut defined = HashSet::new();
    let mut referenced = HashSet::new();

    for line in output.lines() {
        if let Some(label) = line.strip_prefix('.').and_then(|l| l.strip_suffix(':')) {
            assert!(defined.insert(label.to_string()), "duplicate label {}", label);
            continue;
        }

        if line.starts_with('#') || line.starts_with('%') {
            continue;
        }

        for word in line.split_whitespace().skip(1) {
            if word.len() == 4 && word.starts_with('l') {
                referenced.insert(word.to_string());
            }
        }
    }

    assert!(!referenced.is_empty());
    for label in &referenced {
        assert!(defined.contains(label), "undefined label {}", label);
    }
}

const PLAYGROUND: &str = r#"# playground program
var greeting = "hello\n";
var limit = 10;

function add(a, b) {
    return a + b;
}

function sum_below(n) {
    var total = 0;
    for (var i = 0; i < n; let i = i + 1) {
        if ((i % 3) == 0) {
            continue;
        }
        if (i == 9) {
            break;
        }
        let total = total + i;
    }
    return total;
}

function main() {
    var message = &greeting;
    var x = sum_below(limit);
    while (x > 5) {
        let x = x - 1;
    }
    if (x && true) {
        return x;
    } else {
        return add(x, 0);
    }
}
"#;

#[test]
fn compiles_a_full_program() {
    let output = compile("demo", PLAYGROUND);

    // string data is hex encoded and 0 terminated
    assert!(output.contains("68 65 6C 6C 6F 0A 00\n"));

    // one section per global and function
    assert!(output.contains("## GlobalVar \"greeting\"\n"));
    assert!(output.contains("## GlobalVar \"limit\"\n"));
    assert!(output.contains("## Function \"add\"\n"));
    assert!(output.contains("## Function \"sum_below\"\n"));
    assert!(output.contains("## Function \"main\"\n"));

    // entry call and operating system exit
    assert_eq!(output.matches("# Call main").count(), 1);
    assert!(output.ends_with("mov_ebx_eax\nmov_eax_imm 01 00 00 00\nint_80\n"));

    assert_labels_resolve(&output);
}

#[test]
fn lexer_errors_carry_the_position() {
    let reader = Reader::new("bad.src".to_string(), b"@".to_vec());
    let err = Lexer::new(reader).tokenize().unwrap_err();
    assert_eq!(err.to_string(), "bad.src:1:1: invalid character: @");
}

#[test]
fn parser_errors_name_found_and_expected() {
    let reader = Reader::new("bad.src".to_string(), b"function main() { return 1 + 2 + 3; }".to_vec());
    let tokens = Lexer::new(reader).tokenize().unwrap();
    let err = Parser::new(tokens).parse().unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad.src:1:31 - invalid token: +, expected: ;"
    );
}

#[test]
fn missing_main_is_a_whole_program_error() {
    let reader = Reader::new("bad.src".to_string(), b"function f() { return 0; }".to_vec());
    let tokens = Lexer::new(reader).tokenize().unwrap();
    let program = Parser::new(tokens).parse().unwrap();
    let err = static_analysis(&program).unwrap_err();
    assert_eq!(err.to_string(), "bad.src: missing main function");
}
