use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::activity::source::GithubActivitySource;
use crate::activity::store::PgFingerprintRepository;
use crate::activity::ActivityDetector;
use crate::cache::{Cache, CacheBackend, RedisCache};
use crate::config::{Config, SessionBackend};
use crate::daily::curator::{Curator, LlmCurator};
use crate::daily::hot_skills::LlmHotSkillAdvisor;
use crate::daily::job::Enrichment;
use crate::daily::mailer::{HttpMailer, Mailer};
use crate::daily::snapshot::PgSnapshotRepository;
use crate::daily::{DailyJob, Notifier};
use crate::interview::evaluation::PgInterviewRepository;
use crate::interview::session_store::{InMemorySessionStore, RedisSessionStore, SessionStore};
use crate::interview::speech::{HttpSpeechService, SpeechService};
use crate::interview::{InterviewMachine, InterviewService, TransitionTable};
use crate::llm_client::{LanguageModel, LlmClient};
use crate::matching::embedder::HttpEmbedder;
use crate::matching::vector_index::PineconeIndex;
use crate::matching::MatchEngine;
use crate::practice::store::PgPracticeRepository;
use crate::practice::PracticeService;
use crate::profile::ingest::PdfTextExtractor;
use crate::profile::store::PgProfileRepository;
use crate::profile::{ProfileStore, QuizMaker, ResumeIngestor};
use crate::saved_jobs::store::PgSavedJobRepository;
use crate::saved_jobs::SavedJobService;
use crate::storage::S3ObjectStore;
use crate::strategy::{LlmApplicationWriter, LlmRoadmapGenerator, RoadmapGenerator};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: Cache,
    pub profiles: ProfileStore,
    pub engine: MatchEngine,
    pub roadmaps: Arc<dyn RoadmapGenerator>,
    pub detector: ActivityDetector,
    pub daily: DailyJob,
    pub notifier: Notifier,
    pub interviews: InterviewService,
    pub practice: PracticeService,
    pub resumes: ResumeIngestor,
    pub quizzes: QuizMaker,
    pub saved_jobs: SavedJobService,
}

impl AppState {
    /// Wires every component from its backing clients. Nothing here touches the network.
    pub fn build(
        config: Config,
        db: PgPool,
        redis: redis::Client,
        s3: aws_sdk_s3::Client,
    ) -> Result<Self> {
        let redis: Arc<dyn CacheBackend> = Arc::new(RedisCache::new(redis));
        let cache = Cache::new(redis.clone());

        let llm: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));

        let engine = MatchEngine::new(
            Arc::new(HttpEmbedder::new(
                config.embedding_api_url.clone(),
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
            )),
            Arc::new(PineconeIndex::new(
                config.vector_index_host.clone(),
                config.vector_index_api_key.clone(),
            )),
        );

        let profiles = ProfileStore::new(Arc::new(PgProfileRepository::new(db.clone())), cache.clone());
        let roadmaps: Arc<dyn RoadmapGenerator> = Arc::new(LlmRoadmapGenerator::new(llm.clone()));

        let detector = ActivityDetector::new(
            Arc::new(GithubActivitySource::new(config.github_token.clone())),
            llm.clone(),
            Arc::new(PgFingerprintRepository::new(db.clone())),
            profiles.clone(),
            cache.clone(),
        );

        let daily = DailyJob::new(
            profiles.clone(),
            engine.clone(),
            Enrichment {
                roadmaps: roadmaps.clone(),
                applications: Arc::new(LlmApplicationWriter::new(llm.clone())),
                hot_skills: Arc::new(LlmHotSkillAdvisor::new(llm.clone())),
            },
            Arc::new(PgSnapshotRepository::new(db.clone())),
            cache.clone(),
            config.max_roadmaps,
            config.daily_job_concurrency,
        );

        let mailer: Option<Arc<dyn Mailer>> = config
            .mail
            .clone()
            .map(|mail| Arc::new(HttpMailer::new(mail)) as Arc<dyn Mailer>);
        let curator: Arc<dyn Curator> = Arc::new(LlmCurator::new(llm.clone()));
        let saved_jobs = SavedJobService::new(
            Arc::new(PgSavedJobRepository::new(db.clone())),
            daily.clone(),
            profiles.clone(),
            llm.clone(),
        );
        let notifier = Notifier::new(profiles.clone(), daily.clone(), Some(curator), mailer);

        let table = TransitionTable::by_name(&config.interview_profile)?;
        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Redis => Arc::new(RedisSessionStore::new(redis)),
            SessionBackend::Memory => Arc::new(InMemorySessionStore::default()),
        };
        let speech: Option<Arc<dyn SpeechService>> = config
            .speech
            .clone()
            .map(|speech| Arc::new(HttpSpeechService::new(speech)) as Arc<dyn SpeechService>);
        info!(
            profile = table.name,
            backend = ?config.session_backend,
            voice = speech.is_some(),
            "interview service configured"
        );
        let interviews = InterviewService::new(
            InterviewMachine::new(llm.clone(), table),
            llm.clone(),
            sessions,
            Arc::new(PgInterviewRepository::new(db.clone())),
            speech,
            config.audio_cooldown_secs,
        );

        let quizzes = QuizMaker::new(llm.clone(), profiles.clone());

        let practice = PracticeService::new(Arc::new(PgPracticeRepository::new(db)), cache.clone());

        let resumes = ResumeIngestor::new(
            Arc::new(PdfTextExtractor),
            llm,
            Arc::new(S3ObjectStore::new(
                s3,
                config.s3_bucket.clone(),
                config.s3_endpoint.clone(),
            )),
            profiles.clone(),
            engine.clone(),
        );

        Ok(AppState {
            config,
            cache,
            profiles,
            engine,
            roadmaps,
            detector,
            daily,
            notifier,
            interviews,
            practice,
            resumes,
            quizzes,
            saved_jobs,
        })
    }
}
