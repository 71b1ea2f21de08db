//! BNF-like grammar covering BNF, EBNF, ANTLR and yacc/lex sources.
//!
//! Embedded code (`{ ... }` actions, yacc `%{ ... %}` prologues) is scanned
//! through the balanced `ACTION` state: its text comes out as
//! [`TokenKind::ActionCode`] runs split at brackets, strings and comments, and
//! the `}` that closes the block is reported as
//! [`TokenKind::InterpolationEnd`].

use stacklex_lexer::{LexerOptions, RuleSpec, RuleTable, TableError, TokenKind};

use crate::common;

/// `.ebnf` shares the table: EBNF repetition braces (`{ digit }`) come out as
/// an action block, so their contents are [`TokenKind::ActionCode`].
pub const EXTENSIONS: &[&str] = &["bnf", "ebnf", "g4", "y", "l"];

pub const ACTION: &str = "ACTION";

const STRING: &str = r#""(?:[^"\\\n\r]|\\[^\n\r])*"|'(?:[^'\\\n\r]|\\[^\n\r])*'"#;

pub const KEYWORDS: &[&str] = &[
    "grammar", "lexer", "parser", "fragment", "import", "options", "tokens", "channels",
    "mode", "returns", "locals", "throws", "catch", "finally",
];

pub const PUNCTUATORS: &[&str] = &[
    "::=", ":", "|", ";", "->", "=", "+=", "*", "+", "?", "(", ")", "[", "]", ".", "..",
    "~", "!", ",", "^", "#",
];

pub(crate) fn table() -> Result<RuleTable, TableError> {
    RuleTable::builder("DEFAULT")
        .balanced_state(ACTION)
        .state(common::COMMENT)
        .define("name", "[A-Za-z_](?:[A-Za-z0-9_]|-[A-Za-z0-9_])*")
        .rules(common::trivia(&["DEFAULT"]))
        .rule(common::line_comment(&["DEFAULT", ACTION]))
        .rules(common::block_comment(&["DEFAULT", ACTION]))
        .rule(RuleSpec::regex(
            "ebnf-comment",
            r"\(\*(?:[^*]|\*+[^*)])*\*+\)",
            TokenKind::Comment,
        ))
        .rule(RuleSpec::regex("nonterminal", r"<[^<>\n\r]+>", TokenKind::Nonterminal))
        .rule(RuleSpec::regex(
            "directive",
            r"%%|%{name}|@{name}(?:::{name})?",
            TokenKind::Directive,
        ))
        .rule(
            RuleSpec::literal("prologue-open", "%{", TokenKind::Directive)
                .push(ACTION),
        )
        .rule(
            RuleSpec::literal("prologue-close", "%}", TokenKind::Directive)
                .within(&[ACTION])
                .pop(),
        )
        .rule(RuleSpec::regex("string", STRING, TokenKind::String).within(&["DEFAULT", ACTION]))
        .rule(RuleSpec::regex(
            "char-class",
            r"\[(?:[^\]\\\s]|\\[^\n\r])+\]",
            TokenKind::CharClass,
        ))
        .rule(RuleSpec::regex("identifier", "{name}", TokenKind::Identifier))
        .rule(RuleSpec::regex("number", "[0-9]+", TokenKind::Number))
        .rule(
            RuleSpec::literal("action-open", "{", TokenKind::InterpolationStart)
                .push(ACTION),
        )
        .rule(
            RuleSpec::regex("action-code", r#"[^{}()\[\]"'/%]+"#, TokenKind::ActionCode)
                .within(&[ACTION]),
        )
        .rule(RuleSpec::literal("action-slash", "/", TokenKind::ActionCode).within(&[ACTION]))
        .rule(RuleSpec::literal("action-percent", "%", TokenKind::ActionCode).within(&[ACTION]))
        .punctuators(PUNCTUATORS)
        .punctuators_within(&["{", "}", "(", ")", "[", "]"], &[ACTION])
        .keywords(KEYWORDS)
        .build()
}

pub fn options() -> LexerOptions {
    LexerOptions::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::testing::pairs;
    use crate::{Grammar, GrammarError};
    use pretty_assertions::assert_eq;
    use stacklex_lexer::{ErrorKind, SyntaxError, Token};

    fn lex(source: &str) -> Vec<Token> {
        Grammar::Bnf.tokenize(source, "test.g4").unwrap()
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match Grammar::Bnf.tokenize(source, "test.g4") {
            Err(GrammarError::Syntax(e)) => e,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_bnf_production() {
        assert_eq!(
            pairs(&lex(r#"<expr> ::= <term> | <expr> "+" <term>"#)),
            vec![
                (TokenKind::Nonterminal, "<expr>"),
                (TokenKind::Punctuator, "::="),
                (TokenKind::Nonterminal, "<term>"),
                (TokenKind::Punctuator, "|"),
                (TokenKind::Nonterminal, "<expr>"),
                (TokenKind::String, r#""+""#),
                (TokenKind::Nonterminal, "<term>"),
            ]
        );
    }

    #[test]
    fn test_ebnf() {
        assert_eq!(
            pairs(&lex(r#"(* digits *) digit-excluding-zero = "1" | "2" ;"#)),
            vec![
                (TokenKind::Identifier, "digit-excluding-zero"),
                (TokenKind::Punctuator, "="),
                (TokenKind::String, r#""1""#),
                (TokenKind::Punctuator, "|"),
                (TokenKind::String, r#""2""#),
                (TokenKind::Punctuator, ";"),
            ]
        );
    }

    #[test]
    fn test_ebnf_repetition_reads_as_action() {
        assert_eq!(
            pairs(&lex("digits = digit { digit } ;")),
            vec![
                (TokenKind::Identifier, "digits"),
                (TokenKind::Punctuator, "="),
                (TokenKind::Identifier, "digit"),
                (TokenKind::InterpolationStart, "{"),
                (TokenKind::ActionCode, " digit "),
                (TokenKind::InterpolationEnd, "}"),
                (TokenKind::Punctuator, ";"),
            ]
        );
    }

    #[test]
    fn test_antlr_rules() {
        let source = "grammar Expr;\nexpr : expr ('*'|'/') expr | INT ;\nINT : [0-9]+ -> skip ;";
        let tokens = lex(source);
        assert_eq!(
            pairs(&tokens[..3]),
            vec![
                (TokenKind::Keyword, "grammar"),
                (TokenKind::Identifier, "Expr"),
                (TokenKind::Punctuator, ";"),
            ]
        );
        assert_eq!(
            pairs(&tokens[tokens.len() - 6..]),
            vec![
                (TokenKind::Punctuator, ":"),
                (TokenKind::CharClass, "[0-9]"),
                (TokenKind::Punctuator, "+"),
                (TokenKind::Punctuator, "->"),
                (TokenKind::Identifier, "skip"),
                (TokenKind::Punctuator, ";"),
            ]
        );
        assert!(tokens.iter().any(|t| t.kind == TokenKind::String && t.lexeme == "'/'"));
    }

    #[test]
    fn test_action_with_nested_braces() {
        let tokens = lex("stmt : ID { if (x) { y(); } } ;");
        assert_eq!(
            pairs(&tokens),
            vec![
                (TokenKind::Identifier, "stmt"),
                (TokenKind::Punctuator, ":"),
                (TokenKind::Identifier, "ID"),
                (TokenKind::InterpolationStart, "{"),
                (TokenKind::ActionCode, " if "),
                (TokenKind::Punctuator, "("),
                (TokenKind::ActionCode, "x"),
                (TokenKind::Punctuator, ")"),
                (TokenKind::ActionCode, " "),
                (TokenKind::Punctuator, "{"),
                (TokenKind::ActionCode, " y"),
                (TokenKind::Punctuator, "("),
                (TokenKind::Punctuator, ")"),
                (TokenKind::ActionCode, "; "),
                (TokenKind::Punctuator, "}"),
                (TokenKind::ActionCode, " "),
                (TokenKind::InterpolationEnd, "}"),
                (TokenKind::Punctuator, ";"),
            ]
        );
        assert_eq!(&*tokens[16].state, ACTION);
        assert_eq!(&*tokens[17].state, "DEFAULT");
    }

    #[test]
    fn test_action_strings_and_comments_hide_braces() {
        assert_eq!(
            pairs(&lex(r#"{ s = "}"; /* } */ c = '{'; }"#)),
            vec![
                (TokenKind::InterpolationStart, "{"),
                (TokenKind::ActionCode, " s = "),
                (TokenKind::String, r#""}""#),
                (TokenKind::ActionCode, "; "),
                (TokenKind::ActionCode, " c = "),
                (TokenKind::String, "'{'"),
                (TokenKind::ActionCode, "; "),
                (TokenKind::InterpolationEnd, "}"),
            ]
        );
    }

    #[test]
    fn test_yacc_sections() {
        let source = "%{\n#include <ctype.h>\n%}\n%token NUM\n%%\nexp : NUM { $$ = $1 % 2; } ;\n%%\n";
        assert_eq!(
            pairs(&lex(source)),
            vec![
                (TokenKind::Directive, "%{"),
                (TokenKind::ActionCode, "\n#include <ctype.h>\n"),
                (TokenKind::Directive, "%}"),
                (TokenKind::Directive, "%token"),
                (TokenKind::Identifier, "NUM"),
                (TokenKind::Directive, "%%"),
                (TokenKind::Identifier, "exp"),
                (TokenKind::Punctuator, ":"),
                (TokenKind::Identifier, "NUM"),
                (TokenKind::InterpolationStart, "{"),
                (TokenKind::ActionCode, " $$ = $1 "),
                (TokenKind::ActionCode, "%"),
                (TokenKind::ActionCode, " 2; "),
                (TokenKind::InterpolationEnd, "}"),
                (TokenKind::Punctuator, ";"),
                (TokenKind::Directive, "%%"),
            ]
        );
    }

    #[test]
    fn test_antlr_named_action() {
        let tokens = lex("@parser::header { import x; }");
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].lexeme, "@parser::header");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::InterpolationEnd));
    }

    #[test]
    fn test_char_class_escapes() {
        assert_eq!(
            pairs(&lex(r"ESC : [\]\\] ;")),
            vec![
                (TokenKind::Identifier, "ESC"),
                (TokenKind::Punctuator, ":"),
                (TokenKind::CharClass, r"[\]\\]"),
                (TokenKind::Punctuator, ";"),
            ]
        );
    }

    #[test]
    fn test_unterminated_action() {
        let err = syntax_error("rule : { foo(");
        assert_eq!(err.kind, ErrorKind::UnterminatedConstruct);
        assert_eq!(err.location.column, 13);
    }

    #[test]
    fn test_mismatched_action_brackets() {
        let err = syntax_error("{ ( ] }");
        assert_eq!(err.kind, ErrorKind::BalancerMismatch);
        assert_eq!(err.location.column, 3);
    }
}
