//! Named-parameter SQL templates
//!
//! Template files use `:name` placeholders. On load they are rewritten to
//! PostgreSQL positional parameters (`$1`, `$2`, ...) and checked against the
//! parameter set their `TemplateKind` declares.
//!
//! Placeholders are not recognized inside string literals (including
//! `E'...'` escape strings), quoted identifiers, dollar-quoted bodies or
//! comments. `::` casts are left alone and `\:` produces a literal colon.
//!
//! A template holds exactly one statement, since it runs as a prepared
//! statement. A trailing `;` is allowed.

use std::path::PathBuf;

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use thiserror::Error;

use crate::schema::{Aggregation, TimeWindow};

/// Template errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {template} has an unterminated {construct} starting at byte {offset}")]
    Unterminated {
        template: TemplateKind,
        construct: &'static str,
        offset: usize,
    },

    #[error("Template {template} has a second statement at byte {offset}; templates must hold one statement")]
    MultipleStatements { template: TemplateKind, offset: usize },

    #[error("Template {template} uses unknown parameter ':{name}'")]
    UnknownParameter { template: TemplateKind, name: String },

    #[error("Template {template} does not use required parameter ':{name}'")]
    MissingParameter {
        template: TemplateKind,
        name: &'static str,
    },

    #[error("Template {template} needs a value for ':{name}'")]
    MissingArgument {
        template: TemplateKind,
        name: &'static str,
    },
}

/// Parameters a template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateParam {
    StartTime,
    EndTime,
    Aggregation,
}

impl TemplateParam {
    pub fn name(&self) -> &'static str {
        match self {
            TemplateParam::StartTime => "start_time",
            TemplateParam::EndTime => "end_time",
            TemplateParam::Aggregation => "aggregation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start_time" => Some(TemplateParam::StartTime),
            "end_time" => Some(TemplateParam::EndTime),
            "aggregation" => Some(TemplateParam::Aggregation),
            _ => None,
        }
    }
}

const WINDOW_PARAMS: &[TemplateParam] = &[TemplateParam::StartTime, TemplateParam::EndTime];

const AGGREGATE_PARAMS: &[TemplateParam] = &[
    TemplateParam::StartTime,
    TemplateParam::EndTime,
    TemplateParam::Aggregation,
];

/// The recompute queries the maintenance jobs depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Repopulates imputed raw bars in a window
    BackfillFactStockBars,
    /// Candle-style OHLC aggregation
    AggStockBarsCandles,
    /// Generic aggregation
    AggStockBars,
    /// Aggregation over backfilled data
    AggBackfillStockBars,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::BackfillFactStockBars,
        TemplateKind::AggStockBarsCandles,
        TemplateKind::AggStockBars,
        TemplateKind::AggBackfillStockBars,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TemplateKind::BackfillFactStockBars => "backfill_fact_stock_bars",
            TemplateKind::AggStockBarsCandles => "agg_stock_bars_candles",
            TemplateKind::AggStockBars => "agg_stock_bars",
            TemplateKind::AggBackfillStockBars => "agg_backfill_stock_bars",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.name())
    }

    /// Every parameter the template must reference, and the only ones it may
    pub fn parameters(&self) -> &'static [TemplateParam] {
        match self {
            TemplateKind::BackfillFactStockBars => WINDOW_PARAMS,
            TemplateKind::AggStockBarsCandles
            | TemplateKind::AggStockBars
            | TemplateKind::AggBackfillStockBars => AGGREGATE_PARAMS,
        }
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Values bound to a template's parameters
#[derive(Debug, Clone, Copy)]
pub struct TemplateArgs<'a> {
    pub window: TimeWindow,
    pub aggregation: Option<&'a Aggregation>,
}

/// A parsed template ready for binding
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    kind: TemplateKind,
    sql: String,
    /// Parameter bound to `$n` is `params[n - 1]`
    params: Vec<TemplateParam>,
}

impl SqlTemplate {
    /// Rewrite `:name` placeholders and validate them against `kind`
    pub fn parse(kind: TemplateKind, text: &str) -> Result<Self, TemplateError> {
        let (sql, names) = rewrite_placeholders(kind, text)?;

        let mut params = Vec::with_capacity(names.len());
        for name in names {
            let param = TemplateParam::from_name(&name)
                .filter(|p| kind.parameters().contains(p))
                .ok_or_else(|| TemplateError::UnknownParameter {
                    template: kind,
                    name: name.clone(),
                })?;
            params.push(param);
        }

        if let Some(missing) = kind.parameters().iter().find(|p| !params.contains(p)) {
            return Err(TemplateError::MissingParameter {
                template: kind,
                name: missing.name(),
            });
        }

        Ok(Self { kind, sql, params })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// The rewritten SQL with positional parameters
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[TemplateParam] {
        &self.params
    }

    /// Bind `args` to the template's positional parameters
    pub fn bind<'q>(
        &'q self,
        args: &TemplateArgs<'q>,
    ) -> Result<Query<'q, Postgres, PgArguments>, TemplateError> {
        let mut query = sqlx::query(&self.sql);

        for param in &self.params {
            query = match param {
                TemplateParam::StartTime => query.bind(args.window.start()),
                TemplateParam::EndTime => query.bind(args.window.end()),
                TemplateParam::Aggregation => {
                    let aggregation =
                        args.aggregation
                            .ok_or_else(|| TemplateError::MissingArgument {
                                template: self.kind,
                                name: param.name(),
                            })?;
                    query.bind(aggregation.as_str())
                }
            };
        }

        Ok(query)
    }
}

/// Rewrite placeholders, returning the SQL and parameter names in `$n` order
fn rewrite_placeholders(
    kind: TemplateKind,
    text: &str,
) -> Result<(String, Vec<String>), TemplateError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;
    // Set once a top-level `;` has been seen
    let mut terminated = false;

    let unterminated = |construct: &'static str, offset: usize| TemplateError::Unterminated {
        template: kind,
        construct,
        offset,
    };

    while i < bytes.len() {
        if terminated && !is_trivia(bytes, i) {
            return Err(TemplateError::MultipleStatements {
                template: kind,
                offset: i,
            });
        }

        match bytes[i] {
            b';' => {
                terminated = true;
                out.push(';');
                i += 1;
            }
            b'\'' | b'"' => {
                let quote = bytes[i];
                let backslash_escapes = quote == b'\'' && is_escape_string_prefix(bytes, i);
                let end = find_closing_quote(bytes, i + 1, quote, backslash_escapes).ok_or_else(|| {
                    unterminated(
                        if quote == b'\'' { "string literal" } else { "quoted identifier" },
                        i,
                    )
                })?;
                out.push_str(&text[i..=end]);
                i = end + 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = text[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
                out.push_str(&text[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = text[i + 2..]
                    .find("*/")
                    .map(|n| i + 2 + n + 2)
                    .ok_or_else(|| unterminated("block comment", i))?;
                out.push_str(&text[i..end]);
                i = end;
            }
            b'$' => match dollar_tag(bytes, i) {
                Some(tag_end) => {
                    let tag = &text[i..tag_end];
                    let close = text[tag_end..]
                        .find(tag)
                        .map(|n| tag_end + n + tag.len())
                        .ok_or_else(|| unterminated("dollar-quoted string", i))?;
                    out.push_str(&text[i..close]);
                    i = close;
                }
                None => {
                    out.push('$');
                    i += 1;
                }
            },
            b'\\' if bytes.get(i + 1) == Some(&b':') => {
                out.push(':');
                i += 2;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                out.push_str("::");
                i += 2;
            }
            b':' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_continue(bytes[end]) {
                    end += 1;
                }
                let name = &text[start..end];
                let position = match names.iter().position(|n| n == name) {
                    Some(idx) => idx + 1,
                    None => {
                        names.push(name.to_string());
                        names.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
                i = end;
            }
            _ => {
                // Copy the whole UTF-8 character
                let ch_len = text[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                out.push_str(&text[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    Ok((out, names))
}

/// Whitespace, a comment or a further `;`, all allowed after the statement ends
fn is_trivia(bytes: &[u8], i: usize) -> bool {
    match bytes[i] {
        b';' => true,
        b'-' => bytes.get(i + 1) == Some(&b'-'),
        b'/' => bytes.get(i + 1) == Some(&b'*'),
        b => b.is_ascii_whitespace(),
    }
}

/// True if the quote at `i` opens an `E'...'` escape string
fn is_escape_string_prefix(bytes: &[u8], i: usize) -> bool {
    i >= 1
        && matches!(bytes[i - 1], b'E' | b'e')
        && (i < 2 || !is_ident_continue(bytes[i - 2]))
}

/// Index of the closing quote, treating a doubled quote as an escape, and
/// also a backslash-escaped character when `backslash_escapes` is set
fn find_closing_quote(
    bytes: &[u8],
    mut i: usize,
    quote: u8,
    backslash_escapes: bool,
) -> Option<usize> {
    while i < bytes.len() {
        if backslash_escapes && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

/// If a dollar-quote tag (`$$` or `$tag$`) starts at `i`, the index after it
fn dollar_tag(bytes: &[u8], i: usize) -> Option<usize> {
    let mut j = i + 1;
    if bytes.get(j).is_some_and(|b| b.is_ascii_digit()) {
        // Positional parameter such as $1, not a tag
        return None;
    }
    while j < bytes.len() && is_ident_continue(bytes[j]) {
        j += 1;
    }
    (bytes.get(j) == Some(&b'$')).then_some(j + 1)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
