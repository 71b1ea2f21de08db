use clap::{Parser, Subcommand};
use stacklex_grammars::{ecmascript, Grammar, GrammarError};
use stacklex_lexer::{KindSet, RuleTable, Token, TokenKind, Transition};
use std::path::Path;
use std::sync::Once;

#[derive(Parser, Debug)]
#[command(name = "stacklex")]
#[command(about = "stacklex: state-stack driven lexical analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tokens of a source file
    Tokens {
        /// Input file
        path: String,

        /// Grammar name or extension; detected from the path when omitted
        #[arg(short, long)]
        grammar: Option<Grammar>,

        /// Also print whitespace, newline and comment tokens
        #[arg(long)]
        all: bool,

        /// Print tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a source file tokenizes without errors
    Check {
        /// Input file
        path: String,

        /// Grammar name or extension; detected from the path when omitted
        #[arg(short, long)]
        grammar: Option<Grammar>,
    },

    /// List the rules of a grammar
    Rules {
        /// Grammar name or extension
        grammar: Grammar,
    },
}

static TRACING_INIT: Once = Once::new();

/// Install a subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=stacklex_lexer=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Tokens {
            path,
            grammar,
            all,
            json,
        } => cmd_tokens(&path, grammar, all, json),
        Command::Check { path, grammar } => cmd_check(&path, grammar),
        Command::Rules { grammar } => cmd_rules(grammar),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn resolve_grammar(path: &str, grammar: Option<Grammar>) -> Grammar {
    match grammar.or_else(|| Grammar::from_path(Path::new(path))) {
        Some(grammar) => grammar,
        None => {
            eprintln!("error: cannot tell the grammar of {path}; pass --grammar");
            std::process::exit(1);
        }
    }
}

fn fail(err: &GrammarError, source: &str) -> ! {
    eprintln!("error: {err}");
    if let GrammarError::Syntax(e) = err {
        eprintln!("{}", e.caret(source));
    }
    std::process::exit(1);
}

/// Tokenize `source`, entering `REGEXP` for ECMAScript whenever a `/` or
/// `/=` stands where an operand is expected.
fn scan(grammar: Grammar, source: &str, name: &str, all: bool) -> Result<Vec<Token>, GrammarError> {
    let mut lexer = grammar.lexer(source, name)?;
    if all {
        lexer.set_skip(KindSet::EMPTY);
    }

    let mut tokens = Vec::new();
    let mut after_operand = false;
    loop {
        if grammar == Grammar::Ecmascript && !after_operand && starts_regexp(lexer.peek()?) {
            lexer.push_state(ecmascript::REGEXP)?;
        }
        let Some(token) = lexer.next_token()? else {
            break;
        };
        if !KindSet::TRIVIA.contains(token.kind) {
            after_operand = ends_operand(&token);
        }
        tokens.push(token);
    }
    Ok(tokens)
}

fn starts_regexp(next: Option<Token>) -> bool {
    next.is_some_and(|t| t.is(TokenKind::Punctuator) && (t.lexeme == "/" || t.lexeme == "/="))
}

/// Whether a `/` right after `token` divides rather than starts a regexp.
fn ends_operand(token: &Token) -> bool {
    match token.kind {
        TokenKind::Identifier
        | TokenKind::Number
        | TokenKind::String
        | TokenKind::Regexp
        | TokenKind::TemplateDelimiter => true,
        TokenKind::Keyword => matches!(
            token.lexeme.as_str(),
            "this" | "super" | "true" | "false" | "null"
        ),
        TokenKind::Punctuator => matches!(token.lexeme.as_str(), ")" | "]" | "}" | "++" | "--"),
        _ => false,
    }
}

fn cmd_tokens(path: &str, grammar: Option<Grammar>, all: bool, json: bool) {
    let source = read_source(path);
    let grammar = resolve_grammar(path, grammar);

    let tokens = match scan(grammar, &source, path, all) {
        Ok(tokens) => tokens,
        Err(e) => fail(&e, &source),
    };

    if json {
        match serde_json::to_string_pretty(&tokens) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: serializing tokens: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    for token in &tokens {
        println!(
            "{}:{}\t{}\t{}\t{:?}",
            token.loc.line, token.loc.column, token.state, token.kind, token.lexeme
        );
    }
}

fn cmd_check(path: &str, grammar: Option<Grammar>) {
    let source = read_source(path);
    let grammar = resolve_grammar(path, grammar);

    match scan(grammar, &source, path, false) {
        Ok(tokens) => eprintln!("OK: {path} ({} tokens, {grammar})", tokens.len()),
        Err(e) => fail(&e, &source),
    }
}

fn cmd_rules(grammar: Grammar) {
    let table = match grammar.table() {
        Ok(table) => table,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    for line in describe_rules(&table) {
        println!("{line}");
    }
    let keywords: Vec<_> = table.keywords().collect();
    if !keywords.is_empty() {
        println!("keywords: {}", keywords.join(" "));
    }
}

/// One line per rule: name, kind, eligible states, transition, pattern.
fn describe_rules(table: &RuleTable) -> Vec<String> {
    table
        .rules()
        .iter()
        .map(|rule| {
            let states: Vec<&str> = table
                .states()
                .iter()
                .filter(|def| {
                    table
                        .state_id(&def.name)
                        .is_some_and(|id| rule.mask.contains(id))
                })
                .map(|def| &*def.name)
                .collect();
            let transition = match rule.transition {
                Transition::None => String::new(),
                Transition::Push(id) => format!("push {}", table.state_name(id)),
                Transition::Pop => "pop".to_string(),
            };
            format!(
                "{:<20} {:<18} {:<28} {:<18} {}",
                rule.name,
                rule.kind.name(),
                states.join(","),
                transition,
                rule.source
            )
        })
        .collect()
}
