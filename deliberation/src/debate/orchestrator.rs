//! Debate orchestrator: runs one board session end to end.
//!
//! A single task sequences enrichment, the turn loop, voting and the report,
//! emitting [`DebateEvent`]s as it goes. Provider failures, malformed
//! structured output and collaborator outages are absorbed here; only
//! [`DebateError`] ends a run early.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use super::contradiction::{ContradictionDetector, ContradictionVerdict};
use super::guardrails::StopReason;
use super::scheduler::TurnScheduler;
use super::state::{DebatePhase, DebateSession, TranscriptEntry, TranscriptRole};
use super::turn::Turn;
use crate::agent::{Agent, GenerateError, Roster};
use crate::config::DebateConfig;
use crate::context::{CompanyProfile, ContextAssembler, Enrichment, TurnContext};
use crate::enrichment::{
    clean_search_query, search_query_messages, search_summary_prompt, website_summary_prompt,
    Enricher, NoopEnricher,
};
use crate::error::DebateError;
use crate::events::{DebateEvent, EventSink};
use crate::memory::{memory_block, ArgumentCompactor, InMemoryStore, MemoryRecord, MemoryStore};
use crate::persistence::{DebateRecord, NullPersister, Persister, StoredRole};
use crate::report::ReportSynthesizer;
use crate::text::truncate_chars;
use crate::voting::{Vote, VoteTally, VotingEngine, VotingOptions, ABSTAIN};

/// Characters of each recent entry shown to the moderator when interjecting.
const INTERJECTION_ENTRY_CHARS: usize = 100;

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub memory: Arc<dyn MemoryStore>,
    pub enricher: Arc<dyn Enricher>,
    pub persister: Arc<dyn Persister>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            memory: Arc::new(InMemoryStore::new()),
            enricher: Arc::new(NoopEnricher),
            persister: Arc::new(NullPersister),
        }
    }
}

impl Collaborators {
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_persister(mut self, persister: Arc<dyn Persister>) -> Self {
        self.persister = persister;
        self
    }
}

/// Input for one session.
#[derive(Debug, Clone, Default)]
pub struct DebateRequest {
    pub topic: String,
    pub company: CompanyProfile,
    /// Earlier conversation, replayed ahead of the topic.
    pub history: Vec<TranscriptEntry>,
    pub image_base64: Option<String>,
}

impl DebateRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn with_company(mut self, company: CompanyProfile) -> Self {
        self.company = company;
        self
    }

    pub fn with_history(mut self, history: Vec<TranscriptEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.image_base64 = Some(image_base64.into());
        self
    }
}

/// Result of a completed session.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub session: DebateSession,
    pub options: VotingOptions,
    pub votes: Vec<Vote>,
    pub tally: VoteTally,
    pub winner: Option<String>,
    pub stop_reason: StopReason,
    pub report: Option<String>,
}

impl DebateOutcome {
    pub fn to_record(&self) -> DebateRecord {
        DebateRecord {
            version: DebateRecord::CURRENT_VERSION,
            session: self.session.clone(),
            options: self.options.labels().to_vec(),
            votes: self.votes.clone(),
            winner: self.winner.clone(),
            stop_reason: self.stop_reason.to_string(),
            report: self.report.clone(),
            recorded_at: chrono::Utc::now(),
        }
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] winner={} | {} votes | {} debater turns | session={}",
            self.stop_reason,
            self.winner.as_deref().unwrap_or(ABSTAIN),
            self.tally.total(),
            self.session.debater_turns(),
            self.session.id
        )
    }
}

struct VotingRound {
    options: VotingOptions,
    votes: Vec<Vote>,
    tally: VoteTally,
    winner: Option<String>,
}

/// Drives a board session from enrichment to the final report.
pub struct DebateOrchestrator {
    roster: Roster,
    collaborators: Collaborators,
    config: DebateConfig,
    today: Option<NaiveDate>,
}

impl DebateOrchestrator {
    pub fn new(roster: Roster, collaborators: Collaborators, config: DebateConfig) -> Self {
        Self {
            roster,
            collaborators,
            config,
            today: None,
        }
    }

    /// Pin the date used in prompts and the report.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Run on a spawned task and hand back the event stream.
    pub fn stream(self, request: DebateRequest) -> ReceiverStream<DebateEvent> {
        let (sink, events) = EventSink::channel(self.config.event_buffer);
        tokio::spawn(async move {
            if let Err(e) = self.run(request, &sink).await {
                debug!(error = %e, "debate task finished early");
            }
        });
        events
    }

    /// Run one session, emitting events into `sink`.
    ///
    /// A fatal failure is reported as an `error` event followed by
    /// `end{reason: "error"}` before being returned.
    pub async fn run(
        &self,
        request: DebateRequest,
        sink: &EventSink,
    ) -> Result<DebateOutcome, DebateError> {
        let mut session = DebateSession::new(&request.topic);
        session.company = request.company.clone();
        info!(session = %session.id, topic = %session.topic, debaters = self.roster.len(), "debate starting");

        match self.execute(&request, &mut session, sink).await {
            Ok(outcome) => {
                info!("{}", outcome.summary_line());
                Ok(outcome)
            }
            Err(e) => {
                if !session.phase.is_terminal() {
                    let _ = session.transition(DebatePhase::Ended, "aborted");
                }
                if e.is_reportable() {
                    error!(session = %session.id, error = %e, "debate failed");
                    let _ = sink.emit(DebateEvent::error(e.to_string())).await;
                    let _ = sink.emit(DebateEvent::end("error")).await;
                } else {
                    info!(session = %session.id, "event consumer gone, stopping debate");
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &DebateRequest,
        session: &mut DebateSession,
        sink: &EventSink,
    ) -> Result<DebateOutcome, DebateError> {
        self.config.validate()?;

        for entry in &request.history {
            session.push(entry.clone());
        }
        session.push(TranscriptEntry::user(&request.topic));
        self.persist(StoredRole::User, &request.topic, None).await;

        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let date = today.format("%Y-%m-%d").to_string();

        let enrichment = self.enrich(request, &date, sink).await?;
        session.enrichment = enrichment.clone();
        let assembler = ContextAssembler::new(
            request.company.clone(),
            enrichment,
            self.config.language.clone(),
        )
        .with_date(today);
        session.transition(DebatePhase::Debating, "enrichment complete")?;

        let stop_reason = self.debate(session, &assembler, sink).await?;
        session.transition(DebatePhase::Voting, &stop_reason.to_string())?;

        let round = self.vote(session, &assembler, sink).await?;
        session.transition(DebatePhase::Reporting, "votes tallied")?;

        let report = self.report(session, &date, sink).await?;
        session.transition(DebatePhase::Ended, "report delivered")?;
        sink.emit(DebateEvent::end(stop_reason.to_string())).await?;

        Ok(DebateOutcome {
            session: session.clone(),
            options: round.options,
            votes: round.votes,
            tally: round.tally,
            winner: round.winner,
            stop_reason,
            report,
        })
    }

    async fn enrich(
        &self,
        request: &DebateRequest,
        date: &str,
        sink: &EventSink,
    ) -> Result<Enrichment, DebateError> {
        let mut enrichment = Enrichment::default();
        let toggles = &self.config.enrichment;
        let enricher = &self.collaborators.enricher;
        let moderator = self.roster.moderator();

        if toggles.image && enricher.is_enabled() {
            if let Some(image) = request.image_base64.as_deref().filter(|i| !i.trim().is_empty()) {
                sink.emit(DebateEvent::system_typing()).await?;
                sink.emit(DebateEvent::system("🔍 Analyzing image...")).await?;
                let description = enricher.describe_image(image).await;
                let message = format!("📸 Image Analysis:\n{}", description);
                self.persist(StoredRole::System, &message, None).await;
                sink.emit(DebateEvent::system(message)).await?;
                enrichment.image = description;
            }
        }

        if toggles.website && enricher.is_enabled() {
            if let Some(url) = request.company.website() {
                sink.emit(DebateEvent::system_typing()).await?;
                sink.emit(DebateEvent::system(format!("🌐 Analyzing website: {}", url)))
                    .await?;
                let raw = enricher.fetch_website(url).await;
                let summary = match moderator.prompt(&website_summary_prompt(&raw)).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        warn!(url, error = %e, "website summary failed");
                        "Could not analyze website.".to_string()
                    }
                };
                self.persist(StoredRole::System, &summary, None).await;
                sink.emit(DebateEvent::system(summary.clone())).await?;
                enrichment.website = summary;
            }
        }

        if toggles.web_search && enricher.is_enabled() {
            if let Some(searcher) = self.roster.debater(0) {
                sink.emit(DebateEvent::system_typing()).await?;
                let messages = search_query_messages(&request.topic, &request.company, date);
                let query = match searcher.generate(&messages).await {
                    Ok(raw) => clean_search_query(&raw),
                    Err(e) => {
                        warn!(agent = searcher.name(), error = %e, "search query generation failed, using topic");
                        request.topic.clone()
                    }
                };
                debug!(query = %query, "running web search");
                let raw = enricher.web_search(&query).await;
                let summary = match moderator
                    .prompt(&search_summary_prompt(&request.topic, &raw))
                    .await
                {
                    Ok(summary) => summary,
                    Err(e) => {
                        warn!(error = %e, "search summary failed");
                        "Could not complete research.".to_string()
                    }
                };
                self.persist(StoredRole::System, &summary, None).await;
                sink.emit(DebateEvent::system(summary.clone())).await?;
                enrichment.search = summary;
            }
        }

        if toggles.memory_recall {
            match self.collaborators.memory.search(&request.topic).await {
                Ok(records) => {
                    debug!(recalled = records.len(), "past decisions recalled");
                    enrichment.memory = memory_block(&records);
                }
                Err(e) => warn!(error = %e, "memory recall failed"),
            }
        }

        Ok(enrichment)
    }

    async fn debate(
        &self,
        session: &mut DebateSession,
        assembler: &ContextAssembler,
        sink: &EventSink,
    ) -> Result<StopReason, DebateError> {
        let moderator = self.roster.moderator();
        let mut scheduler = TurnScheduler::new(self.roster.debater_names(), &self.config.scheduler);
        let mut compactor = ArgumentCompactor::new(self.config.compactor.clone());
        let detector = ContradictionDetector::new(self.config.contradiction_window);

        loop {
            let idx = match scheduler.next_speaker() {
                Ok(idx) => idx,
                Err(reason) => {
                    info!(
                        reason = %reason,
                        iterations = scheduler.elapsed(),
                        successful = scheduler.successful_turns(),
                        "debate phase over"
                    );
                    return Ok(reason);
                }
            };
            let debater = self
                .roster
                .debater(idx)
                .ok_or_else(|| anyhow!("scheduler selected unknown debater index {}", idx))?;
            let name = debater.name();

            sink.emit(DebateEvent::typing(name)).await?;
            pause(self.config.pacing.turn_delay_ms).await;

            let messages = {
                let (previous_speaker, previous_message) = session.previous_message();
                assembler.turn_messages(&TurnContext {
                    agent: debater,
                    topic: &session.topic,
                    previous_speaker,
                    previous_message,
                    arguments: compactor.replayable(),
                })
            };

            let turn = match generate_turn(debater, &messages).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(agent = name, iteration = scheduler.elapsed(), error = %e, "debater turn failed, passing");
                    sink.emit(DebateEvent::agent(
                        name,
                        format!("⚠️ {} unavailable: {}", name, e),
                        None,
                    ))
                    .await?;
                    session.record_pass(name);
                    let routing = scheduler.record_failure();
                    debug!(?routing, "advancing after failed turn");
                    continue;
                }
            };

            sink.emit(DebateEvent::agent(name, turn.text.clone(), Some(turn.confidence)))
                .await?;
            self.persist(StoredRole::Assistant, &turn.text, Some(name)).await;

            let prior = session.prior_statements(name, detector.window()).to_vec();
            session.record_turn(name, &turn.text);
            scheduler.record_success();
            info!(
                agent = name,
                iteration = scheduler.elapsed(),
                confidence = turn.confidence,
                spoken = session.speak_count(name),
                "debater spoke"
            );

            if let ContradictionVerdict::Contradiction(reason) =
                detector.check(moderator, name, &prior, &turn.text).await
            {
                let note = ContradictionDetector::note(name, &reason);
                info!(agent = name, reason = %reason, "contradiction detected");
                self.persist(StoredRole::System, &note, None).await;
                session.push(TranscriptEntry::system_about(name, note.clone()));
                sink.emit(DebateEvent::system(note)).await?;
            }

            let summary = compactor.compact(moderator, name, &turn.text).await.to_string();
            session.summaries.push(summary);

            if scheduler.should_interject() {
                session.transition(
                    DebatePhase::ModeratorInterjection,
                    &format!("{} successful turns", scheduler.successful_turns()),
                )?;
                self.interject(session, sink).await?;
                session.transition(DebatePhase::Debating, "interjection complete")?;
            }

            let routing = scheduler.route_after(&turn.text);
            debug!(?routing, next = scheduler.name(routing.index()).unwrap_or_default(), "next speaker routed");
        }
    }

    async fn interject(&self, session: &mut DebateSession, sink: &EventSink) -> Result<(), DebateError> {
        let moderator = self.roster.moderator();
        sink.emit(DebateEvent::typing(moderator.name())).await?;
        pause(self.config.pacing.moderator_delay_ms).await;

        let prompt = interjection_prompt(
            moderator,
            &session.topic,
            &session.company,
            session.recent_entries(self.config.scheduler.interjection_window),
        );
        match moderator.prompt(&prompt).await {
            Ok(text) => {
                let text = text.trim();
                self.persist(StoredRole::Assistant, text, Some(moderator.name())).await;
                session.push(TranscriptEntry::moderator(moderator.name(), text));
                sink.emit(DebateEvent::agent(moderator.name(), format!("⚖️ {}", text), None))
                    .await?;
                info!(moderator = moderator.name(), "moderator interjected");
            }
            Err(e) => warn!(moderator = moderator.name(), error = %e, "moderator interjection skipped"),
        }
        Ok(())
    }

    async fn vote(
        &self,
        session: &mut DebateSession,
        assembler: &ContextAssembler,
        sink: &EventSink,
    ) -> Result<VotingRound, DebateError> {
        let moderator = self.roster.moderator();
        let engine = VotingEngine::new(self.config.voting.clone());

        sink.emit(DebateEvent::system_typing()).await?;
        pause(self.config.pacing.moderator_delay_ms).await;
        sink.emit(DebateEvent::system("🏁 Debate over. Determining the voting options..."))
            .await?;

        let options = engine.extract_options(moderator, session).await;
        let announcement = format!("🎯 Voting options: {}", options.joined());
        self.persist(StoredRole::System, &announcement, None).await;
        session.push(TranscriptEntry::system(announcement.clone()));
        sink.emit(DebateEvent::system(announcement)).await?;

        let votes = engine
            .collect_votes(self.roster.debaters(), &assembler.company_block(), session, &options)
            .await;
        let tally = VoteTally::from_votes(&votes);
        let winner = tally.winner(&options).map(str::to_string);
        info!(
            winner = winner.as_deref().unwrap_or(ABSTAIN),
            outcome = %tally.outcome(&options),
            tally = %tally.to_json(),
            "votes tallied"
        );

        let record = MemoryRecord::new(
            session.topic.clone(),
            winner.clone().unwrap_or_else(|| ABSTAIN.to_string()),
            format!("Votes: {}", tally.to_json()),
        );
        if let Err(e) = self.collaborators.memory.save(record).await {
            warn!(error = %e, "saving decision to memory failed");
        }

        let votes_json = serde_json::to_string(&votes).context("serializing vote results")?;
        self.persist(StoredRole::VoteResults, &votes_json, None).await;
        sink.emit(DebateEvent::VoteResults {
            votes: votes.clone(),
        })
        .await?;

        Ok(VotingRound {
            options,
            votes,
            tally,
            winner,
        })
    }

    async fn report(
        &self,
        session: &mut DebateSession,
        date: &str,
        sink: &EventSink,
    ) -> Result<Option<String>, DebateError> {
        sink.emit(DebateEvent::system_typing()).await?;
        sink.emit(DebateEvent::system("📋 Preparing the final decision report..."))
            .await?;

        let synthesizer = ReportSynthesizer::new();
        match synthesizer
            .synthesize(self.roster.moderator(), session, date)
            .await
        {
            Ok(report) => {
                self.persist(StoredRole::System, &report, None).await;
                session.push(TranscriptEntry::system(report.clone()));
                sink.emit(DebateEvent::system(report.clone())).await?;
                Ok(Some(report))
            }
            Err(e) => {
                sink.emit(DebateEvent::system(ReportSynthesizer::failure_message(&e)))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn persist(&self, role: StoredRole, content: &str, agent_name: Option<&str>) {
        if let Err(e) = self
            .collaborators
            .persister
            .persist(role, content, agent_name)
            .await
        {
            warn!(role = %role, error = %e, "persisting message failed");
        }
    }
}

/// Generate and clean one debater turn. Blank cleaned text counts as a failure.
async fn generate_turn(
    debater: &Agent,
    messages: &[crate::agent::ChatMessage],
) -> Result<Turn, GenerateError> {
    let raw = debater.generate(messages).await?;
    let turn = Turn::parse(debater.name(), &raw);
    if turn.is_empty() {
        return Err(GenerateError::Empty);
    }
    Ok(turn)
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Prompt steering the debate back toward a decision.
pub fn interjection_prompt(
    moderator: &Agent,
    topic: &str,
    company: &CompanyProfile,
    recent: &[TranscriptEntry],
) -> String {
    let recent_lines: Vec<String> = recent
        .iter()
        .filter(|e| e.role != TranscriptRole::System)
        .map(|e| format!("- {}...", truncate_chars(&e.content, INTERJECTION_ENTRY_CHARS)))
        .collect();

    format!(
        "YOU ARE: {} ({})\n\
         MAIN TOPIC: {}\n\
         COMPANY: {}\n\n\
         RECENT DISCUSSION:\n{}\n\n\
         YOUR TASK:\n\
         1. Drive the discussion toward a DECISION.\n\
         2. If the debate is stuck, offer a new perspective.\n\
         3. If it has drifted, firmly steer it back to the main topic ({}).\n\
         4. Do not make suggestions unrelated to the topic.\n\n\
         TONE: professional, decisive, solution-oriented. Bridge the sides.\n\n\
         FORMAT: summarize and redirect in 3-4 sentences.",
        moderator.name(),
        moderator.persona(),
        topic,
        company.headline(),
        recent_lines.join("\n"),
        topic
    )
}
