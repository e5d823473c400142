//! Source position tracking shared by diagnostics, source-info and the
//! navigator. The concrete lexer/parser that produces [`Span`] values is an
//! external collaborator (see crate-level docs); this module only owns the
//! position type and its diagnostic rendering.
use colored::Colorize;

/// A half-open `(line, column)` → `(line, column)` range within a single
/// source string, zero-indexed.
#[derive(Default, Debug, Clone, Eq)]
pub struct Span {
    pub start: (usize, usize),
    pub end: (usize, usize),
    pub source: String,
}

impl Span {
    pub fn new(start: (usize, usize), end: (usize, usize), source: impl Into<String>) -> Span {
        Span {
            start,
            end,
            source: source.into(),
        }
    }

    /// Render a caret-pointing diagnostic snippet for this span, matching
    /// the teacher's `why_lib::lexer::token::Span::to_string` rendering.
    pub fn to_string(&self, msg: impl ToString) -> String {
        let Span { start, end, source } = self;

        if source.is_empty() {
            return format!("<no source> |^--- {}", msg.to_string());
        }

        let lines = source.lines().collect::<Vec<_>>();
        let line = start.0.min(lines.len().saturating_sub(1));
        let line_str = lines.get(line).copied().unwrap_or("");

        let left_margin = format!("{}", end.0 + 1).len();
        let left_margin_fill: String = vec![' '; left_margin].into_iter().collect();

        let split_at = start.1.min(line_str.len());
        let (left, right) = line_str.split_at(split_at);
        let right = right.to_string().red().to_string();

        let mut error_string = format!(
            "{left_margin_fill} |\n{line_no} |{left}{right}",
            line_no = line + 1
        );

        let left_padding_fill: String = vec![' '; start.1].into_iter().collect();
        error_string = format!(
            "{error_string}\n{left_margin_fill} |{left_padding_fill}^--- {}",
            msg.to_string()
        );

        error_string
    }

    /// Merge two spans into one covering range, taking this span's start and
    /// `other`'s end.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            source: self.source.clone(),
        }
    }
}

impl PartialEq<Span> for Span {
    fn eq(&self, _other: &Span) -> bool {
        // Span identity is not semantically relevant to AST/value equality,
        // same rationale as why_lib::lexer::token::Span.
        true
    }
}

/// `(line, column)` within a source string, zero-indexed.
pub type Position = (usize, usize);
