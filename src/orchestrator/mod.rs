//! Query orchestrator: decision, retrieval, synthesis.
//!
//! Answers one user question against a set of registered knowledge sources
//! in three strictly ordered phases:
//!
//! 1. **Decision** — one router call per source, in parallel, asking the
//!    language model whether that source is needed and with what intent.
//! 2. **Retrieval** — one engine query per needed source, in parallel.
//! 3. **Synthesis** — a single completion over the question plus every
//!    non-empty retrieved section.
//!
//! Each fan-out phase runs its jobs on OS threads and collects results over
//! an mpsc channel with a per-phase deadline. A job that misses the deadline
//! is abandoned: its thread finishes in the background and its late result is
//! discarded when the channel is dropped. Per-source failures degrade (a
//! failed decision means "not needed", a timed-out retrieval contributes
//! nothing); only the final synthesis call surfaces its failure to the
//! caller, as text rather than an error.

use crate::config::OrchestratorConfig;
use crate::llm::prompts::{
    ROUTER_SYSTEM_PROMPT, SYNTHESIS_SYSTEM_PROMPT, build_decision_prompt, build_synthesis_prompt,
};
use crate::llm::LlmProvider;
use crate::models::{
    PerformanceMetrics, RetrievalReport, RetrievalRequest, RouterDecision, SearchResult,
};
use crate::retrieval::RetrievalEngine;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// A named, described corpus with its retrieval engine.
///
/// The description is what the router model sees when deciding whether the
/// source is needed; write it for the model, not for humans.
pub struct KnowledgeSource {
    name: String,
    description: String,
    engine: RetrievalEngine,
}

impl KnowledgeSource {
    /// Creates a knowledge source.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        engine: RetrievalEngine,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            engine,
        }
    }

    /// The source name, used in logs and synthesis section headers.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The router-facing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The retrieval engine over this source's corpus.
    #[must_use]
    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }
}

/// Orchestrates the decision, retrieval, and synthesis phases.
pub struct QueryOrchestrator {
    sources: Vec<Arc<KnowledgeSource>>,
    llm: Arc<dyn LlmProvider>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    /// Creates an orchestrator with no sources registered.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: OrchestratorConfig) -> Self {
        Self {
            sources: Vec::new(),
            llm,
            config,
        }
    }

    /// Registers a knowledge source.
    #[must_use]
    pub fn with_source(mut self, source: KnowledgeSource) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Number of registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Answers a question about `subject_id`.
    pub fn answer(&self, user_query: &str, subject_id: &str) -> String {
        self.answer_with_metrics(user_query, subject_id).0
    }

    /// Answers a question and reports per-phase timings and counters.
    pub fn answer_with_metrics(
        &self,
        user_query: &str,
        subject_id: &str,
    ) -> (String, PerformanceMetrics) {
        let span = tracing::info_span!("orchestrator.answer", subject = subject_id);
        let _enter = span.enter();
        let mut perf = PerformanceMetrics {
            sources_considered: self.sources.len(),
            ..PerformanceMetrics::default()
        };

        // Phase 1: decision
        let start = Instant::now();
        let decisions = self.decide(user_query, subject_id);
        perf.decision_ms = elapsed_ms(start);

        let needed: Vec<(Arc<KnowledgeSource>, RouterDecision)> = self
            .sources
            .iter()
            .zip(decisions)
            .filter(|(_, decision)| decision.is_needed)
            .map(|(source, decision)| (Arc::clone(source), decision))
            .collect();
        perf.sources_needed = needed.len();
        tracing::debug!(
            considered = perf.sources_considered,
            needed = perf.sources_needed,
            "decision phase complete"
        );

        // Phase 2: retrieval
        let start = Instant::now();
        let retrievals = self.retrieve(&needed, user_query);
        perf.retrieval_ms = elapsed_ms(start);

        let mut sections: Vec<(String, String)> = Vec::new();
        for ((source, _), (results, report)) in needed.iter().zip(retrievals) {
            perf.retrieval.merge(&report);
            if results.is_empty() {
                continue;
            }
            sections.push((source.name.clone(), render_section(&results)));
        }
        perf.sources_contributing = sections.len();

        // Phase 3: synthesis
        let start = Instant::now();
        let answer = self.synthesize(user_query, subject_id, &sections);
        perf.synthesis_ms = elapsed_ms(start);

        metrics::counter!("orchestrator_answers_total").increment(1);
        metrics::histogram!("orchestrator_decision_ms").record(perf.decision_ms as f64);
        metrics::histogram!("orchestrator_retrieval_ms").record(perf.retrieval_ms as f64);
        metrics::histogram!("orchestrator_synthesis_ms").record(perf.synthesis_ms as f64);

        (answer, perf)
    }

    /// Phase 1: one router call per source with a shared deadline.
    ///
    /// The returned vector is index-aligned with `self.sources`. A call that
    /// fails or misses the deadline yields [`RouterDecision::not_needed`].
    fn decide(&self, user_query: &str, subject_id: &str) -> Vec<RouterDecision> {
        let jobs: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let llm = Arc::clone(&self.llm);
                let source = Arc::clone(source);
                let prompt = build_decision_prompt(
                    &source.name,
                    &source.description,
                    user_query,
                    subject_id,
                );
                move || match llm.complete_with_system(ROUTER_SYSTEM_PROMPT, &prompt) {
                    Ok(response) => RouterDecision::from_response(&source.name, &response),
                    Err(err) => {
                        tracing::warn!(
                            source = source.name.as_str(),
                            error = %err,
                            "router call failed, treating source as not needed"
                        );
                        RouterDecision::not_needed()
                    },
                }
            })
            .collect();

        fan_out(jobs, Duration::from_millis(self.config.decision_timeout_ms))
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    tracing::warn!(
                        source = self.sources[i].name.as_str(),
                        "router decision missed the phase deadline"
                    );
                    metrics::counter!("orchestrator_phase_timeouts_total", "phase" => "decision")
                        .increment(1);
                    RouterDecision::not_needed()
                })
            })
            .collect()
    }

    /// Phase 2: one engine query per needed source with a shared deadline.
    ///
    /// Index-aligned with `needed`. A timed-out query contributes an empty
    /// result set.
    fn retrieve(
        &self,
        needed: &[(Arc<KnowledgeSource>, RouterDecision)],
        user_query: &str,
    ) -> Vec<(Vec<SearchResult>, RetrievalReport)> {
        let jobs: Vec<_> = needed
            .iter()
            .map(|(source, decision)| {
                let source = Arc::clone(source);
                let request = RetrievalRequest::new(
                    decision.intent.unwrap_or_default(),
                    user_query,
                    self.config.default_k,
                )
                .with_entities(decision.entities.clone())
                .with_context_hints(decision.context_hints.clone());
                move || source.engine.query(&request)
            })
            .collect();

        fan_out(jobs, Duration::from_millis(self.config.retrieval_timeout_ms))
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    tracing::warn!(
                        source = needed[i].0.name.as_str(),
                        "retrieval missed the phase deadline"
                    );
                    metrics::counter!("orchestrator_phase_timeouts_total", "phase" => "retrieval")
                        .increment(1);
                    (Vec::new(), RetrievalReport::default())
                })
            })
            .collect()
    }

    /// Phase 3: a single synthesis completion under its own deadline.
    ///
    /// Failures come back as the answer text. The user sees what went wrong;
    /// the caller never has to handle an error path.
    fn synthesize(
        &self,
        user_query: &str,
        subject_id: &str,
        sections: &[(String, String)],
    ) -> String {
        let prompt = build_synthesis_prompt(user_query, subject_id, sections);
        let llm = Arc::clone(&self.llm);
        let job = move || match llm.complete_with_system(SYNTHESIS_SYSTEM_PROMPT, &prompt) {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(error = %err, "synthesis call failed");
                err.to_string()
            },
        };

        fan_out(
            vec![job],
            Duration::from_millis(self.config.synthesis_timeout_ms),
        )
        .pop()
        .flatten()
        .unwrap_or_else(|| {
            tracing::error!("synthesis call missed its deadline");
            metrics::counter!("orchestrator_phase_timeouts_total", "phase" => "synthesis")
                .increment(1);
            crate::Error::OperationFailed {
                operation: "synthesis".to_string(),
                cause: format!(
                    "no response within {} ms",
                    self.config.synthesis_timeout_ms
                ),
            }
            .to_string()
        })
    }
}

/// Formats one source's results as a synthesis section body.
fn render_section(results: &[SearchResult]) -> String {
    let mut body = String::new();
    for result in results {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str("## ");
        body.push_str(&result.title);
        body.push('\n');
        body.push_str(&result.content);
    }
    body
}

/// Runs jobs on OS threads and collects their results with a deadline.
///
/// Returns a vector index-aligned with `jobs`; a `None` slot means that job
/// did not finish in time. Late threads complete in the background and their
/// sends fail harmlessly once the receiver is dropped.
fn fan_out<T, F>(jobs: Vec<F>, timeout: Duration) -> Vec<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let count = jobs.len();
    let (tx, rx) = mpsc::channel::<(usize, T)>();
    for (index, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        thread::spawn(move || {
            let result = job();
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let deadline = Instant::now() + timeout;
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
    let mut received = 0;
    while received < count {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok((index, value)) => {
                slots[index] = Some(value);
                received += 1;
            },
            Err(_) => break,
        }
    }
    slots
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
