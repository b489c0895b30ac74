//! Core behaviours shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting sessions (mode → question count, level description)
//!   - Serving questions in order
//!   - Scoring answers, with 1-based option numbers accepted for multiple choice
//!   - Hints, results and teardown

use tracing::{info, instrument};

use crate::domain::{is_valid_level, level_description, Grade, Question, QuestionKind, TestResult};
use crate::error::{ApiError, ExamError};
use crate::protocol::{to_out, AnswerOut, ExamMode, HintOut, NextOut, SessionOut, StartIn};
use crate::state::AppState;
use crate::util::{fill_template, trunc_for_log};

const MSG_CORRECT: &str = "Correct.";
const MSG_INCORRECT: &str = "Incorrect. The answer was: {answer}";
const MSG_UNGRADED: &str = "Response recorded. Writing is self-assessed; compare it with the prompt: {hint}";

#[instrument(level = "info", skip(state), fields(level = req.level, mode = ?req.mode))]
pub async fn start_session(state: &AppState, req: StartIn) -> Result<SessionOut, ApiError> {
  if !is_valid_level(req.level) {
    return Err(ExamError::InvalidLevel(req.level).into());
  }
  let requested = req.count.unwrap_or(match req.mode {
    ExamMode::Practice => state.config.practice_questions,
    ExamMode::Exam => state.config.exam_length(req.level),
  });
  let (session_id, question_count) = state.create_session(req.level, requested, req.seed).await?;
  Ok(SessionOut {
    session_id,
    level: req.level,
    description: level_description(req.level).to_string(),
    mode: req.mode,
    requested,
    question_count,
  })
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn next_question(state: &AppState, session_id: &str) -> Result<NextOut, ApiError> {
  state
    .with_session(session_id, |s| {
      let question = s.next_question().map(to_out);
      NextOut { question, remaining: s.remaining() }
    })
    .await
}

/// Map a 1-based option number to its text. Literal option text wins.
pub fn resolve_answer<'q>(question: &'q Question, answer: &'q str) -> &'q str {
  let answer = answer.trim();
  if question.kind != QuestionKind::MultipleChoice || question.options.iter().any(|o| o == answer) {
    return answer;
  }
  match answer.parse::<usize>() {
    Ok(n) if (1..=question.options.len()).contains(&n) => &question.options[n - 1],
    _ => answer,
  }
}

#[instrument(level = "info", skip(state, answer), fields(%session_id, %question_id, answer_len = answer.len()))]
pub async fn submit_answer(
  state: &AppState,
  session_id: &str,
  question_id: &str,
  answer: &str,
) -> Result<AnswerOut, ApiError> {
  state
    .with_session(session_id, |s| -> Result<AnswerOut, ApiError> {
      let question = s
        .question(question_id)
        .cloned()
        .ok_or_else(|| ApiError::UnknownQuestion(question_id.to_string()))?;
      let response = resolve_answer(&question, answer);
      let grade = s.submit_answer(&question, response);
      info!(target: "exam", %session_id, %question_id, ?grade, response = %trunc_for_log(response, 40), "Answer submitted");

      let message = match grade {
        Grade::Correct => MSG_CORRECT.to_string(),
        Grade::Incorrect => fill_template(MSG_INCORRECT, &[("answer", &question.correct_answer)]),
        Grade::Ungraded => fill_template(MSG_UNGRADED, &[("hint", question.hint.as_deref().unwrap_or(""))]),
      };
      Ok(AnswerOut {
        correct: grade.is_correct(),
        graded: grade != Grade::Ungraded,
        expected: question.correct_answer.clone(),
        message,
      })
    })
    .await?
}

#[instrument(level = "info", skip(state), fields(%session_id, %question_id))]
pub async fn get_hint(state: &AppState, session_id: &str, question_id: &str) -> Result<HintOut, ApiError> {
  state
    .with_session(session_id, |s| -> Result<HintOut, ApiError> {
      let question = s
        .question(question_id)
        .ok_or_else(|| ApiError::UnknownQuestion(question_id.to_string()))?;
      let text = match &question.hint {
        Some(h) if question.kind == QuestionKind::MultipleChoice => format!("Radical: {}", h),
        Some(h) => h.clone(),
        None => s.radical_hint(question),
      };
      Ok(HintOut { text })
    })
    .await?
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn get_result(state: &AppState, session_id: &str) -> Result<TestResult, ApiError> {
  let (result, phase) = state.with_session(session_id, |s| (s.calculate_result(), s.phase())).await?;
  info!(target: "exam", %session_id, ?phase, score = result.score, passed = result.passed, "Result served");
  Ok(result)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn end_session(state: &AppState, session_id: &str) -> Result<(), ApiError> {
  state.remove_session(session_id).await
}
