//! Session lifecycle: load, step, evaluate on `end`, store.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::evaluation::{evaluate, persist, Feedback, InterviewRepository};
use crate::interview::machine::{InterviewMachine, StepOutcome};
use crate::interview::session::{InterviewContext, InterviewMode, InterviewSession};
use crate::interview::session_store::SessionStore;
use crate::interview::speech::SpeechService;
use crate::interview::stages::Stage;
use crate::interview::voice::within_cooldown;
use crate::llm_client::LanguageModel;

/// Public view of a session after a step.
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub session_id: Uuid,
    pub mode: InterviewMode,
    pub stage: Stage,
    pub turn: u32,
    pub message: Option<String>,
    pub finished: bool,
    pub feedback: Option<Feedback>,
}

impl TurnView {
    fn of(session: &InterviewSession, message: Option<String>) -> Self {
        TurnView {
            session_id: session.id,
            mode: session.mode,
            stage: session.stage,
            turn: session.turn,
            message,
            finished: session.is_finished(),
            feedback: session.feedback.clone(),
        }
    }
}

#[derive(Debug)]
pub enum AudioTurn {
    /// Arrived inside the echo cooldown; nothing happened.
    Discarded,
    Spoken {
        view: TurnView,
        transcript: String,
        /// Empty when the session ended silently.
        audio: Bytes,
    },
}

#[derive(Clone)]
pub struct InterviewService {
    machine: InterviewMachine,
    llm: Arc<dyn LanguageModel>,
    store: Arc<dyn SessionStore>,
    repo: Arc<dyn InterviewRepository>,
    speech: Option<Arc<dyn SpeechService>>,
    cooldown_secs: f64,
}

fn llm_failure(e: impl std::fmt::Display) -> AppError {
    AppError::Llm(format!("Interviewer generation failed: {e}"))
}

impl InterviewService {
    pub fn new(
        machine: InterviewMachine,
        llm: Arc<dyn LanguageModel>,
        store: Arc<dyn SessionStore>,
        repo: Arc<dyn InterviewRepository>,
        speech: Option<Arc<dyn SpeechService>>,
        cooldown_secs: f64,
    ) -> Self {
        Self {
            machine,
            llm,
            store,
            repo,
            speech,
            cooldown_secs,
        }
    }

    async fn load(&self, id: Uuid) -> Result<InterviewSession, AppError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Interview session {id} not found")))
    }

    /// Evaluates and persists exactly once, the first time the session is seen at `end`.
    async fn finish_if_ended(&self, session: &mut InterviewSession) {
        if session.stage != Stage::End || session.feedback.is_some() {
            return;
        }
        let window = self.machine.table().evaluation_window;
        let feedback = evaluate(self.llm.as_ref(), session, window).await;
        info!(
            session_id = %session.id,
            score = feedback.score,
            verdict = %feedback.verdict,
            "interview evaluated"
        );
        persist(self.repo.as_ref(), session, &feedback).await;
        session.feedback = Some(feedback);
    }

    async fn run_step(&self, session: &mut InterviewSession) -> Result<Option<String>, AppError> {
        let outcome = self.machine.step(session).await.map_err(llm_failure)?;
        self.finish_if_ended(session).await;
        Ok(match outcome {
            StepOutcome::Reply(text) => Some(text),
            StepOutcome::Ended => None,
        })
    }

    pub async fn create(
        &self,
        mode: InterviewMode,
        context: InterviewContext,
    ) -> Result<TurnView, AppError> {
        if mode == InterviewMode::Voice && self.speech.is_none() {
            return Err(AppError::Unavailable(
                "Voice interviews require a speech service".to_string(),
            ));
        }
        let mut session = InterviewSession::new(mode, context);
        let opening = self.run_step(&mut session).await?;
        self.store.put(&session).await?;
        info!(
            session_id = %session.id,
            mode = ?mode,
            profile = self.machine.table().name,
            "interview started"
        );
        Ok(TurnView::of(&session, opening))
    }

    pub async fn message(&self, id: Uuid, text: &str) -> Result<TurnView, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message text must not be empty".to_string()));
        }
        let mut session = self.load(id).await?;
        if session.stage == Stage::End {
            return Err(AppError::Conflict(format!("Interview session {id} has ended")));
        }
        session.add_user_message(text);
        let reply = self.run_step(&mut session).await?;
        self.store.put(&session).await?;
        Ok(TurnView::of(&session, reply))
    }

    pub async fn audio(&self, id: Uuid, audio: Bytes, content_type: &str) -> Result<AudioTurn, AppError> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Speech service is not configured".to_string()))?;
        if audio.is_empty() {
            return Err(AppError::Validation("Audio body is empty".to_string()));
        }
        let mut session = self.load(id).await?;
        if session.mode != InterviewMode::Voice {
            return Err(AppError::Validation(format!(
                "Interview session {id} is not a voice session"
            )));
        }
        if session.stage == Stage::End {
            return Err(AppError::Conflict(format!("Interview session {id} has ended")));
        }
        if within_cooldown(session.last_audio_sent_at, Utc::now(), self.cooldown_secs) {
            info!(session_id = %id, "audio inside playback cooldown, discarded");
            return Ok(AudioTurn::Discarded);
        }

        let transcript = speech
            .transcribe(audio, content_type)
            .await
            .map_err(|e| AppError::Upstream(format!("transcription: {e}")))?;
        if transcript.is_empty() {
            warn!(session_id = %id, "empty transcript, discarded");
            return Ok(AudioTurn::Discarded);
        }
        session.add_user_message(&transcript);
        let reply = self.run_step(&mut session).await?;

        let audio = match &reply {
            Some(text) => {
                let bytes = speech
                    .synthesize(text)
                    .await
                    .map_err(|e| AppError::Upstream(format!("synthesis: {e}")))?;
                session.last_audio_sent_at = Some(Utc::now());
                bytes
            }
            None => Bytes::new(),
        };
        self.store.put(&session).await?;
        Ok(AudioTurn::Spoken {
            view: TurnView::of(&session, reply),
            transcript,
            audio,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<TurnView, AppError> {
        let session = self.load(id).await?;
        let last = session.last_interviewer_message().map(str::to_string);
        Ok(TurnView::of(&session, last))
    }

    /// Drops the session without evaluating it.
    pub async fn discard(&self, id: Uuid) -> Result<(), AppError> {
        let session = self.load(id).await?;
        self.store.delete(id).await?;
        info!(session_id = %id, stage = session.stage.as_str(), turn = session.turn, "interview discarded");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::harness;
    use super::*;
    use crate::interview::speech::testing::FakeSpeech;
    use crate::interview::stages::TransitionTable;
    use crate::llm_client::testing::ScriptedLlm;

    const VERDICT: &str = r#"{"score": 72, "verdict": "Hired", "summary": "Solid"}"#;

    fn context() -> InterviewContext {
        InterviewContext {
            user_id: Some(Uuid::new_v4()),
            job_id: Some("113.0".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_returns_opening_message() {
        let h = harness(
            TransitionTable::standard(),
            ScriptedLlm::repeating("Welcome! Tell me about yourself."),
            FakeSpeech::default(),
        );
        let view = h.service.create(InterviewMode::Text, context()).await.unwrap();
        assert_eq!(view.stage, Stage::Intro);
        assert_eq!(view.turn, 1);
        assert_eq!(view.message.as_deref(), Some("Welcome! Tell me about yourself."));
        assert!(!view.finished);
    }

    #[tokio::test]
    async fn test_discarded_session_is_gone_and_not_persisted() {
        let h = harness(
            TransitionTable::standard(),
            ScriptedLlm::repeating("Welcome!"),
            FakeSpeech::default(),
        );
        let id = h.service.create(InterviewMode::Text, context()).await.unwrap().session_id;

        h.service.discard(id).await.unwrap();

        assert!(matches!(h.service.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(h.service.discard(id).await, Err(AppError::NotFound(_))));
        assert!(h.repo.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_session_evaluates_once_and_persists() {
        let llm = ScriptedLlm::new(vec!["Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Bye", VERDICT]);
        let h = harness(TransitionTable::compact(), llm, FakeSpeech::default());
        let id = h.service.create(InterviewMode::Text, context()).await.unwrap().session_id;

        let mut last = None;
        for _ in 0..10 {
            let view = h.service.message(id, "an answer").await.unwrap();
            let done = view.finished;
            last = Some(view);
            if done {
                break;
            }
        }
        let last = last.unwrap();
        assert!(last.finished);
        assert_eq!(last.message.as_deref(), Some("Bye"));
        assert_eq!(last.feedback.unwrap().score, 72);

        let saved = h.repo.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].job_id, None);

        let err = h.service.message(id, "hello?").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(h.llm.call_count(), 8);
    }

    #[tokio::test]
    async fn test_anonymous_session_is_not_persisted() {
        let llm = ScriptedLlm::new(vec!["Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Bye", VERDICT]);
        let h = harness(TransitionTable::compact(), llm, FakeSpeech::default());
        let id = h
            .service
            .create(InterviewMode::Text, InterviewContext::default())
            .await
            .unwrap()
            .session_id;
        for _ in 0..10 {
            if h.service.message(id, "answer").await.unwrap().finished {
                break;
            }
        }
        assert!(h.service.get(id).await.unwrap().finished);
        assert!(h.repo.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audio_turn_and_cooldown() {
        let h = harness(
            TransitionTable::standard(),
            ScriptedLlm::repeating("What did you build?"),
            FakeSpeech::hearing("I built a compiler"),
        );
        let id = h.service.create(InterviewMode::Voice, context()).await.unwrap().session_id;

        let first = h
            .service
            .audio(id, Bytes::from_static(b"RIFF"), "audio/wav")
            .await
            .unwrap();
        match first {
            AudioTurn::Spoken { view, transcript, audio } => {
                assert_eq!(transcript, "I built a compiler");
                assert_eq!(view.turn, 2);
                assert_eq!(&audio[..], b"What did you build?");
            }
            AudioTurn::Discarded => panic!("first chunk must be processed"),
        }

        let echo = h
            .service
            .audio(id, Bytes::from_static(b"RIFF"), "audio/wav")
            .await
            .unwrap();
        assert!(matches!(echo, AudioTurn::Discarded));
        assert_eq!(h.speech.synthesized.lock().unwrap().len(), 1);
        assert_eq!(h.service.get(id).await.unwrap().turn, 2);
    }

    #[tokio::test]
    async fn test_audio_rejected_for_text_session() {
        let h = harness(
            TransitionTable::standard(),
            ScriptedLlm::repeating("Hi"),
            FakeSpeech::hearing("hello"),
        );
        let id = h.service.create(InterviewMode::Text, context()).await.unwrap().session_id;
        let err = h
            .service
            .audio(id, Bytes::from_static(b"RIFF"), "audio/wav")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness(
            TransitionTable::standard(),
            ScriptedLlm::repeating("Hi"),
            FakeSpeech::default(),
        );
        let err = h.service.message(Uuid::new_v4(), "hi").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
