//! Error taxonomy for corpus loading, session start and the API surface.
//!
//! Only load-time failures are engine errors. A sparse corpus is never an error: the
//! engine degrades (placeholder distractors, shorter question sets) and logs.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExamError {
  /// No `level_{n}.json` exists for the requested level.
  #[error("corpus for level {level} not found: {}", path.display())]
  DataNotFound { level: u8, path: PathBuf },

  /// A required field is missing (or empty, for `hanzi`).
  #[error("level {level}: missing required field '{field}'")]
  SchemaError { level: u8, field: String },

  /// The corpus file is not valid JSON.
  #[error("level {level}: malformed corpus data: {message}")]
  MalformedData { level: u8, message: String },

  #[error("level {0} is outside the supported range 1-9")]
  InvalidLevel(u8),

  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ExamError {
  /// Corpus-not-found is reported separately from generic initialisation failures.
  pub fn is_not_found(&self) -> bool {
    matches!(self, ExamError::DataNotFound { .. })
  }

  /// Stable machine-readable name used in API error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      ExamError::DataNotFound { .. } => "data_not_found",
      ExamError::SchemaError { .. } => "schema_error",
      ExamError::MalformedData { .. } => "malformed_data",
      ExamError::InvalidLevel(_) => "invalid_level",
      ExamError::Io { .. } => "io",
    }
  }
}

/// Failures surfaced by HTTP and WebSocket handlers.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Exam(#[from] ExamError),

  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("unknown question: {0}")]
  UnknownQuestion(String),

  /// The blocking session-construction task panicked or was cancelled.
  #[error("session task failed: {0}")]
  Task(String),
}

impl ApiError {
  pub fn kind(&self) -> &'static str {
    match self {
      ApiError::Exam(e) => e.kind(),
      ApiError::UnknownSession(_) => "unknown_session",
      ApiError::UnknownQuestion(_) => "unknown_question",
      ApiError::Task(_) => "internal",
    }
  }

  /// Not-found of any kind: missing corpus, session or question.
  pub fn is_not_found(&self) -> bool {
    match self {
      ApiError::Exam(e) => e.is_not_found(),
      ApiError::UnknownSession(_) | ApiError::UnknownQuestion(_) => true,
      ApiError::Task(_) => false,
    }
  }

  pub fn is_client_error(&self) -> bool {
    matches!(self, ApiError::Exam(ExamError::InvalidLevel(_)))
  }
}
