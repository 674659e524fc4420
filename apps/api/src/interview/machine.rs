//! One interviewer step per inbound user message.
//!
//! Order of checks:
//! 1. voice + conclusion answered → end, silently
//! 2. stage budget used up → advance (voice into `end` is silent)
//! 3. end / ending / turn cap → one closing message (text) or nothing (voice)
//! 4. otherwise ask the next stage question

use std::sync::Arc;

use tracing::{debug, info};

use crate::interview::prompts::{stage_prompt, FINAL_SUFFIX, INTERVIEWER_SYSTEM};
use crate::interview::session::{InterviewMode, InterviewSession};
use crate::interview::stages::{Advance, Stage, TransitionTable};
use crate::interview::voice::post_process;
use crate::llm_client::{ChatMessage, LanguageModel, LlmError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The interviewer said something; the session may still have ended.
    Reply(String),
    /// The session ended without a further message.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    None,
    Advanced(Stage),
    /// Voice sessions end without a closing message.
    EndedSilently,
}

#[derive(Clone)]
pub struct InterviewMachine {
    llm: Arc<dyn LanguageModel>,
    table: TransitionTable,
}

impl InterviewMachine {
    pub fn new(llm: Arc<dyn LanguageModel>, table: TransitionTable) -> Self {
        Self { llm, table }
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn end(session: &mut InterviewSession) {
        session.stage = Stage::End;
        session.ending = true;
    }

    /// Steps 1 and 2.
    pub(crate) fn apply_transition(&self, session: &mut InterviewSession) -> Transition {
        let voice = session.mode == InterviewMode::Voice;
        if voice && session.stage == Stage::Conclusion && session.stage_turn >= 1 {
            Self::end(session);
            return Transition::EndedSilently;
        }
        match self.table.advance(session.stage, session.stage_turn) {
            Advance::To(next) => {
                info!(
                    session_id = %session.id,
                    from = session.stage.as_str(),
                    to = next.as_str(),
                    turn = session.turn,
                    "stage transition"
                );
                if next == Stage::End {
                    Self::end(session);
                    if voice {
                        return Transition::EndedSilently;
                    }
                } else {
                    session.stage = next;
                }
                session.stage_turn = 0;
                Transition::Advanced(next)
            }
            Advance::Stay | Advance::Rejected(_) => Transition::None,
        }
    }

    async fn ask(&self, session: &InterviewSession, prompt: String) -> Result<String, LlmError> {
        let mut messages = session.window(self.table.history_window).to_vec();
        messages.push(ChatMessage::user(prompt));
        self.llm.converse(INTERVIEWER_SYSTEM, &messages).await
    }

    /// Runs one step. On LLM failure the session is left unchanged apart from
    /// any stage transition already applied.
    pub async fn step(&self, session: &mut InterviewSession) -> Result<StepOutcome, LlmError> {
        if session.stage == Stage::End {
            return Ok(StepOutcome::Ended);
        }
        if self.apply_transition(session) == Transition::EndedSilently {
            return Ok(StepOutcome::Ended);
        }

        if session.stage == Stage::End || session.ending || session.turn >= self.table.max_turns {
            if session.mode == InterviewMode::Voice {
                Self::end(session);
                return Ok(StepOutcome::Ended);
            }
            let prompt = format!(
                "{}{FINAL_SUFFIX}",
                stage_prompt(Stage::Conclusion, &session.context, session.mode)
            );
            let reply = self.ask(session, prompt).await?;
            session.messages.push(ChatMessage::assistant(reply.clone()));
            Self::end(session);
            return Ok(StepOutcome::Reply(reply));
        }

        let prompt = stage_prompt(session.stage, &session.context, session.mode);
        let mut reply = self.ask(session, prompt).await?;
        if session.mode == InterviewMode::Voice {
            reply = post_process(&reply, session.stage);
        }
        session.messages.push(ChatMessage::assistant(reply.clone()));
        session.turn += 1;
        session.stage_turn += 1;
        debug!(
            session_id = %session.id,
            stage = session.stage.as_str(),
            turn = session.turn,
            stage_turn = session.stage_turn,
            "interviewer turn"
        );
        Ok(StepOutcome::Reply(reply))
    }
}
