use crate::error::Error;
use crate::syntax::Span;

/// A user-facing error report about one dfn.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Report a failed dfn at the span of its definition.
    pub fn from_error(err: &Error, span: Span) -> Self {
        let diag = Self::error(err.to_string(), span).with_note(format!("kind: {}", err.kind()));
        match help_for(err) {
            Some(help) => diag.with_help(help.to_string()),
            None => diag,
        }
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        let mut out = Vec::new();
        if self.write(filename, source, &mut out).is_ok() {
            eprint!("{}", String::from_utf8_lossy(&out));
        } else {
            eprintln!("error: {}", self.message);
        }
    }

    /// Render without colors into `out`.
    pub fn write(
        &self,
        filename: &str,
        source: &str,
        out: &mut impl std::io::Write,
    ) -> std::io::Result<()> {
        use ariadne::{Color, Config, Label, Report, ReportKind, Source};

        // ariadne counts characters, spans count bytes.
        let range = char_range(source, self.span);
        let mut report = Report::build(ReportKind::Error, filename, range.start)
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(&self.message)
                    .with_color(Color::Red),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish().write((filename, Source::from(source)), out)
    }
}

fn help_for(err: &Error) -> Option<&'static str> {
    match err {
        Error::UnsupportedTrig { .. } => Some("rewrite with 1○ or 2○"),
        Error::UnsupportedInnerProduct { .. } => Some("express the product with +.×"),
        Error::UnsupportedReduce { .. } => Some("reduce with + ∧ ⌈ ⌊ ∨ or ×"),
        Error::IllegalIdentifier(_) => Some("rename the variable"),
        Error::MissingAdjoint(_) => Some(
            "the construct has no derivative rule; \
             keep it away from the differentiated arguments",
        ),
        Error::ParserFailed { .. } => Some("check the parser path in ada.toml or pass --parser"),
        _ => None,
    }
}

fn char_range(source: &str, span: Span) -> std::ops::Range<usize> {
    let to_chars = |byte: usize| {
        let byte = byte.min(source.len());
        source
            .char_indices()
            .take_while(|(i, _)| *i < byte)
            .count()
    };
    to_chars(span.start as usize)..to_chars(span.end as usize)
}
