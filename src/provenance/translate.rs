//! Loader error translation
//!
//! The bulk loader reports problems as
//! `<origin>: line <N>, column <C>[, item <I>] >>> <reason>` where `N` is the
//! derived line in the working table it was given. Anything else is a broken
//! contract and aborts the run.

use super::ProvenanceIndex;
use crate::config::ImportConfig;
use crate::error::{ImportError, TokenError};
use import_types::{Condition, EntityKind, Ordinal, Severity};

/// A well-formed loader error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorToken {
    pub origin: String,
    pub line: Ordinal,
    pub column: usize,
    pub item: Option<usize>,
    /// Reason text, trimmed, line breaks removed
    pub reason: String,
}

/// Outcome of parsing one loader error string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedToken {
    WellFormed(ErrorToken),
    Malformed(TokenError),
}

impl ParsedToken {
    pub fn into_result(self) -> Result<ErrorToken, TokenError> {
        match self {
            ParsedToken::WellFormed(token) => Ok(token),
            ParsedToken::Malformed(err) => Err(err),
        }
    }
}

/// Parse a loader error string
pub fn parse_token(text: &str) -> ParsedToken {
    match parse_inner(text) {
        Ok(token) => ParsedToken::WellFormed(token),
        Err(err) => ParsedToken::Malformed(err),
    }
}

fn parse_inner(text: &str) -> Result<ErrorToken, TokenError> {
    let (origin, rest) = text
        .split_once(':')
        .ok_or_else(|| TokenError::MissingOrigin(text.to_string()))?;
    let origin = origin.trim();
    if origin.is_empty() {
        return Err(TokenError::MissingOrigin(text.to_string()));
    }

    let (position, reason) = rest
        .split_once(">>>")
        .ok_or_else(|| TokenError::MissingReason(text.to_string()))?;

    let bad_position = || TokenError::BadPosition {
        position: position.trim().to_string(),
        text: text.to_string(),
    };
    let mut parts = position.split(',').map(str::trim);
    let line = labelled_number(parts.next(), "line").ok_or_else(bad_position)?;
    let column = labelled_number(parts.next(), "column").ok_or_else(bad_position)?;
    let item = match parts.next() {
        Some(part) => Some(labelled_number(Some(part), "item").ok_or_else(bad_position)?),
        None => None,
    };
    if parts.next().is_some() {
        return Err(bad_position());
    }

    Ok(ErrorToken {
        origin: origin.to_string(),
        line,
        column,
        item,
        reason: reason.trim().replace(['\n', '\r'], ""),
    })
}

fn labelled_number(part: Option<&str>, label: &str) -> Option<usize> {
    part?.strip_prefix(label)?.trim().parse().ok()
}

/// Split a reason into severity, embedded kind tag and message
///
/// `W:<Rentable>:text` is a warning about a rentable; untagged text is an
/// error.
pub fn split_reason(reason: &str) -> (Severity, Option<EntityKind>, &str) {
    let (severity, rest) = if let Some(rest) = reason.strip_prefix("E:") {
        (Severity::Error, rest)
    } else if let Some(rest) = reason.strip_prefix("W:") {
        (Severity::Warning, rest)
    } else {
        return (Severity::Error, None, reason);
    };

    let tagged = rest
        .strip_prefix('<')
        .and_then(|r| r.split_once(">:"))
        .and_then(|(tag, msg)| tag.parse::<EntityKind>().ok().map(|kind| (kind, msg)));
    match tagged {
        Some((kind, msg)) => (severity, Some(kind), msg),
        None => (severity, None, rest),
    }
}

/// What one loader error turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Matched a skip signature; logged and dropped
    Skipped,
    /// A person insert collided with an existing person
    DuplicatePerson { source: Ordinal, token: ErrorToken },
    /// A condition against one source row
    Row { source: Ordinal, condition: Condition },
}

/// Resolves loader errors of one table against the provenance index
pub struct ErrorTranslator<'a> {
    config: &'a ImportConfig,
    provenance: &'a ProvenanceIndex,
}

impl<'a> ErrorTranslator<'a> {
    pub fn new(config: &'a ImportConfig, provenance: &'a ProvenanceIndex) -> Self {
        Self { config, provenance }
    }

    pub fn translate(&self, kind: EntityKind, raw: &str) -> Result<Translation, ImportError> {
        if kind == EntityKind::Person && raw.contains(self.config.duplicate_person_signature.as_str()) {
            let token = parse_token(raw).into_result()?;
            let source = self.provenance.resolve(kind, token.line, token.item)?;
            return Ok(Translation::DuplicatePerson { source, token });
        }

        if self.config.is_skippable(raw) {
            tracing::info!(%kind, message = raw, "skipping existing record");
            return Ok(Translation::Skipped);
        }

        let token = parse_token(raw).into_result()?;
        let source = self.provenance.resolve(kind, token.line, token.item)?;
        let (severity, tagged, message) = split_reason(&token.reason);
        let condition = Condition {
            severity,
            kind: tagged.unwrap_or(kind),
            message: message.to_string(),
        };
        tracing::debug!(%kind, line = token.line, source, "loader error resolved");
        Ok(Translation::Row { source, condition })
    }

    /// Translate every error of one load, stopping at the first fatal one
    pub fn translate_all<I, S>(&self, kind: EntityKind, errors: I) -> Result<Vec<Translation>, ImportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        errors
            .into_iter()
            .map(|raw| self.translate(kind, raw.as_ref()))
            .collect()
    }
}
