use logos::Logos;

use crate::config::ConfigError;

/// Tokens of a post-processor option string, e.g.
/// `--no-comments --precision 4 --preamble "G17\nG90"`

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
pub enum ArgToken {
    #[regex(r"--[A-Za-z][A-Za-z0-9-]*", |lex| lex.slice()[2..].to_string())]
    Option(String),

    #[token("=")]
    Equals,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(&lex.slice()[1..lex.slice().len() - 1]))]
    #[regex(r"'[^']*'", |lex| lex.slice()[1..lex.slice().len() - 1].to_string())]
    Quoted(String),

    #[regex(r#"[^ \t\r\n\f"'=-][^ \t\r\n\f"'=]*"#, |lex| lex.slice().to_string())]
    Word(String),
}

/// Only `\"` and `\\` are escapes inside double quotes; anything else,
/// `\n` included, is kept verbatim.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next)) if next == '"' || next == '\\' => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Lex the option string into tokens
pub fn lex(input: &str) -> Result<Vec<(ArgToken, logos::Span)>, ConfigError> {
    ArgToken::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(ConfigError::InvalidToken {
                text: input[span.clone()].to_string(),
                span,
            }),
        })
        .collect()
}
