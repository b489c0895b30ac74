//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Questions go out without their correct answer; answers come back by id.

use serde::{Deserialize, Serialize};

use crate::domain::{Question, QuestionKind, TestResult};

/// `practice` uses the configured short length, `exam` the per-level table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamMode {
    #[default]
    Practice,
    Exam,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartSession {
        #[serde(flatten)]
        request: StartIn,
    },
    NextQuestion {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    SubmitAnswer {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "questionId")]
        question_id: String,
        answer: String,
    },
    Hint {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "questionId")]
        question_id: String,
    },
    Result {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    EndSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    SessionStarted {
        session: SessionOut,
    },
    Question {
        #[serde(flatten)]
        next: NextOut,
    },
    AnswerResult {
        #[serde(flatten)]
        answer: AnswerOut,
    },
    Hint {
        text: String,
    },
    Result {
        result: TestResult,
    },
    SessionEnded {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Error {
        message: String,
        kind: String,
    },
}

/// Question as delivered to a candidate.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub level: u8,
}

pub fn to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        kind: q.kind,
        prompt: q.prompt.clone(),
        options: q.options.clone(),
        level: q.level,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct StartIn {
    pub level: u8,
    #[serde(default)]
    pub mode: ExamMode,
    /// Overrides the mode's question count.
    pub count: Option<usize>,
    /// Reproducible sampling.
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub level: u8,
    pub description: String,
    pub mode: ExamMode,
    pub requested: usize,
    #[serde(rename = "questionCount")]
    pub question_count: usize,
}

#[derive(Debug, Serialize)]
pub struct NextOut {
    pub question: Option<QuestionOut>,
    pub remaining: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub correct: bool,
    /// False for writing prompts, which are recorded but not scored.
    pub graded: bool,
    pub expected: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HintQuery {
    #[serde(rename = "questionId")]
    pub question_id: String,
}

#[derive(Debug, Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub kind: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub sessions: usize,
}
