//! Post-processor configuration
//!
//! CAM front ends hand the post-processor a single option string such as
//! `--no-header --precision 4 --preamble "G17\nG90"`. [`Config::parse`]
//! validates the whole string up front; nothing is emitted from a
//! configuration that failed to parse.

use std::ops::Range;

use ariadne::{Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::units::OutputUnits;

pub mod lexer;

use lexer::ArgToken;

pub type Span = Range<usize>;

/// Decimals beyond this are noise in an f64
pub const MAX_PRECISION: usize = 15;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown option --{name}")]
    UnknownOption { name: String, span: Span },

    #[error("option --{name} expects a value")]
    MissingValue { name: String, span: Span },

    #[error("option --{name} does not take a value")]
    UnexpectedValue { name: String, span: Span },

    #[error("invalid value {value:?} for --{name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: &'static str,
        span: Span,
    },

    #[error("unexpected argument {text:?}")]
    UnexpectedArgument { text: String, span: Span },

    #[error("unreadable option text {text:?} (unterminated quote?)")]
    InvalidToken { text: String, span: Span },
}

impl ConfigError {
    pub fn span(&self) -> Span {
        match self {
            ConfigError::UnknownOption { span, .. }
            | ConfigError::MissingValue { span, .. }
            | ConfigError::UnexpectedValue { span, .. }
            | ConfigError::InvalidValue { span, .. }
            | ConfigError::UnexpectedArgument { span, .. }
            | ConfigError::InvalidToken { span, .. } => span.clone(),
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            ConfigError::UnknownOption { .. } => "not a recognized option",
            ConfigError::MissingValue { .. } => "needs a value after it",
            ConfigError::UnexpectedValue { .. } => "this flag is on/off only",
            ConfigError::InvalidValue { reason, .. } => *reason,
            ConfigError::UnexpectedArgument { .. } => "options must start with --",
            ConfigError::InvalidToken { .. } => "cannot be read",
        }
    }

    /// Human-readable report pointing into the option string
    pub fn report(&self, options: &str) -> String {
        let span = self.span();
        let mut buffer = Vec::new();
        let written = Report::build(ReportKind::Error, "options", span.start)
            .with_config(ariadne::Config::default().with_color(false))
            .with_message(self.to_string())
            .with_label(Label::new(("options", span)).with_message(self.hint()))
            .finish()
            .write(("options", Source::from(options.to_string())), &mut buffer);

        match written {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub header: bool,
    pub comments: bool,
    pub line_numbers: bool,
    /// Show the program before it is written
    pub show_editor: bool,
    /// Decimal digits of lengths, feeds and angles
    pub precision: usize,
    pub preamble: String,
    pub postamble: String,
    pub line_start: u32,
    pub line_increment: u32,
    /// Used unless the preamble selects units itself
    pub units: OutputUnits,
    /// Preset name or policy file
    pub dialect: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header: true,
            comments: true,
            line_numbers: true,
            show_editor: false,
            precision: 3,
            preamble: String::new(),
            postamble: "M5\nM2\n".to_string(),
            line_start: 10,
            line_increment: 10,
            units: OutputUnits::Metric,
            dialect: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `options`
    pub fn parse(options: &str) -> Result<Self, ConfigError> {
        Self::default().with_options(options)
    }

    pub fn with_options(self, options: &str) -> Result<Self, ConfigError> {
        let tokens = lexer::lex(options)?;
        OptionParser::new(tokens).apply(self)
    }
}

struct OptionParser {
    tokens: Vec<(ArgToken, Span)>,
    position: usize,
}

impl OptionParser {
    fn new(tokens: Vec<(ArgToken, Span)>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn apply(mut self, mut config: Config) -> Result<Config, ConfigError> {
        while let Some((token, span)) = self.advance() {
            match token {
                ArgToken::Option(name) => self.apply_option(&mut config, name, span)?,
                ArgToken::Equals => {
                    return Err(ConfigError::UnexpectedArgument {
                        text: "=".to_string(),
                        span,
                    })
                }
                ArgToken::Quoted(text) | ArgToken::Word(text) => {
                    return Err(ConfigError::UnexpectedArgument { text, span })
                }
            }
        }
        Ok(config)
    }

    fn apply_option(
        &mut self,
        config: &mut Config,
        name: String,
        span: Span,
    ) -> Result<(), ConfigError> {
        match name.as_str() {
            "header" | "no-header" => {
                self.no_value(&name, &span)?;
                config.header = name == "header";
            }
            "comments" | "no-comments" => {
                self.no_value(&name, &span)?;
                config.comments = name == "comments";
            }
            "line-numbers" | "no-line-numbers" => {
                self.no_value(&name, &span)?;
                config.line_numbers = name == "line-numbers";
            }
            "show-editor" | "no-show-editor" => {
                self.no_value(&name, &span)?;
                config.show_editor = name == "show-editor";
            }
            "metric" | "inches" => {
                self.no_value(&name, &span)?;
                config.units = if name == "metric" {
                    OutputUnits::Metric
                } else {
                    OutputUnits::Imperial
                };
            }
            "precision" => {
                let (value, value_span) = self.value(&name, &span)?;
                let precision: usize = parse_number(&name, value.clone(), value_span.clone())?;
                if precision > MAX_PRECISION {
                    return Err(ConfigError::InvalidValue {
                        name,
                        value,
                        reason: "at most 15 decimals",
                        span: value_span,
                    });
                }
                config.precision = precision;
            }
            "line-start" => {
                let (value, value_span) = self.value(&name, &span)?;
                config.line_start = parse_number(&name, value, value_span)?;
            }
            "line-increment" => {
                let (value, value_span) = self.value(&name, &span)?;
                let increment: u32 = parse_number(&name, value.clone(), value_span.clone())?;
                if increment == 0 {
                    return Err(ConfigError::InvalidValue {
                        name,
                        value,
                        reason: "line numbers must increase",
                        span: value_span,
                    });
                }
                config.line_increment = increment;
            }
            "preamble" => {
                let (value, _) = self.value(&name, &span)?;
                config.preamble = expand_newlines(&value);
            }
            "postamble" => {
                let (value, _) = self.value(&name, &span)?;
                config.postamble = expand_newlines(&value);
            }
            "dialect" => {
                let (value, _) = self.value(&name, &span)?;
                config.dialect = Some(value);
            }
            _ => return Err(ConfigError::UnknownOption { name, span }),
        }
        Ok(())
    }

    fn peek(&self) -> Option<&ArgToken> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(ArgToken, Span)> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn no_value(&self, name: &str, span: &Span) -> Result<(), ConfigError> {
        match self.peek() {
            Some(ArgToken::Equals) => Err(ConfigError::UnexpectedValue {
                name: name.to_string(),
                span: span.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Value of `--name value` or `--name=value`
    fn value(&mut self, name: &str, span: &Span) -> Result<(String, Span), ConfigError> {
        if self.peek() == Some(&ArgToken::Equals) {
            self.advance();
        }
        match self.tokens.get(self.position).cloned() {
            Some((ArgToken::Word(text), value_span)) | Some((ArgToken::Quoted(text), value_span)) => {
                self.position += 1;
                Ok((text, value_span))
            }
            _ => Err(ConfigError::MissingValue {
                name: name.to_string(),
                span: span.clone(),
            }),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &str,
    value: String,
    span: Span,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value,
        reason: "expected a whole number",
        span,
    })
}

/// Option strings cannot carry raw newlines; `\n` stands in for them
fn expand_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}
