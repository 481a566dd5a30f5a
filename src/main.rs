use anyhow::Context;
use clap::Parser as ClapParser;
use log::debug;
use std::io::{Read, Write};
use tolc::generator;
use tolc::io::Reader;
use tolc::lexer::{Lexer, LexerError};
use tolc::parser::Parser;
use tolc::static_analysis::static_analysis;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file. Reads from standard input when omitted.
    input: Option<String>,

    /// Output file. Defaults to standard output.
    #[arg(short, long = "out-file")]
    output: Option<String>,

    /// Stop after reading: dump every input byte with its position.
    #[arg(long, conflicts_with = "only_lex")]
    only_io: bool,

    /// Stop after lexing: dump every token with its position.
    #[arg(long)]
    only_lex: bool,
}

fn mode_only_io(reader: &mut Reader) -> String {
    let mut out = String::new();
    loop {
        let pos = reader.position().clone();
        let Some(c) = reader.read() else {
            break;
        };

        let v = if (32..127).contains(&c) { c as char } else { '?' };
        out.push_str(&format!("{}: {} ({})\n", pos, v, c));
    }
    out
}

fn mode_only_lex(reader: Reader) -> Result<String, LexerError> {
    let mut out = String::new();
    for token in Lexer::new(reader).tokenize()? {
        out.push_str(&format!("{}: {:?}\n", token.pos, token.payload));
    }
    Ok(out)
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        // usage and flag errors exit 1, --help and --version exit 0
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            std::process::exit(code);
        }
    };

    let (filename, input) = match &args.input {
        Some(path) => {
            let input = std::fs::read(path)
                .with_context(|| format!("unable to open input file {:?}", path))?;
            (path.clone(), input)
        }
        None => {
            let mut input = Vec::new();
            std::io::stdin()
                .read_to_end(&mut input)
                .context("unable to read standard input")?;
            ("interactive".to_string(), input)
        }
    };

    let mut reader = Reader::new(filename, input);

    let output = if args.only_io {
        mode_only_io(&mut reader)
    } else if args.only_lex {
        mode_only_lex(reader)?
    } else {
        let tokens = Lexer::new(reader).tokenize()?;
        debug!("lexed {} tokens", tokens.len());

        let program = Parser::new(tokens).parse()?;
        debug!(
            "parsed {} global variables and {} functions",
            program.globalvars.len(),
            program.functions.len()
        );

        static_analysis(&program)?;
        generator::generate(&program)
    };

    match &args.output {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("unable to open output file {:?}", path))?,
        None => std::io::stdout()
            .write_all(output.as_bytes())
            .context("unable to write to standard output")?,
    }

    Ok(())
}
