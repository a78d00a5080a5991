//! The round protocol that turns an unreliable oracle into a complete
//! section mapping.
//!
//! ```text
//! AwaitingTitle ──title resolved──▶ AwaitingBulk ──▶ ResolvingMissing ──▶ Complete
//!       │ (5 attempts)                 (1 call)       (3 per required,        │
//!       ▼                                              1 per optional)       ▼
//!     Failed ◀──────────── required section still missing ─────────────── Failed
//! ```
//!
//! Every call is awaited in sequence; a run owns its state and nothing
//! is shared across runs. Oracle errors never escape: each one is logged and
//! spends one attempt of the current round's budget.

use crate::config::SummaryConfig;
use crate::error::{GenerationFailure, OracleError};
use crate::oracle::{Oracle, PromptPart};
use crate::output::{Round, SectionMap, SummaryResult, TokenAccounting};
use crate::parser::SectionParser;
use crate::pipeline::retry::{retry_until, RetryPolicy};
use crate::prompts::build_prompt;
use crate::progress::ProgressCallback;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives one summary run against an [`Oracle`].
pub struct SummaryOrchestrator<'a> {
    oracle: &'a dyn Oracle,
    config: &'a SummaryConfig,
    parser: SectionParser<'a>,
    content: PromptPart,
}

/// Result of a single oracle call plus parse.
struct AttemptOutcome {
    /// Input tokens, when the count succeeded.
    tokens: Option<u64>,
    reply: Result<SectionMap, OracleError>,
}

/// Mutable state of one run.
#[derive(Default)]
struct RunState {
    sections: SectionMap,
    tokens: TokenAccounting,
    oracle_calls: u32,
}

impl RunState {
    /// Account for an attempt and merge the wanted sections it resolved.
    /// Returns true once every wanted section is present.
    fn absorb(
        &mut self,
        round: &Round,
        attempt: u32,
        outcome: &AttemptOutcome,
        wanted: &[&str],
        progress: Option<&ProgressCallback>,
    ) -> bool {
        if let Some(tokens) = outcome.tokens {
            self.tokens.record(round, tokens);
        }
        self.oracle_calls += 1;

        let parsed = match &outcome.reply {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{} attempt {} failed: {}", round, attempt, e);
                if let Some(cb) = progress {
                    cb.on_attempt_failed(round, attempt, &e.to_string());
                }
                return false;
            }
        };

        for name in wanted {
            if self.sections.contains_key(*name) {
                continue;
            }
            if let Some(value) = parsed.get(*name) {
                debug!("Resolved '{}' in {}", name, round);
                self.sections.insert((*name).to_string(), value.clone());
                if let Some(cb) = progress {
                    cb.on_section_resolved(name);
                }
            }
        }

        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|name| !self.sections.contains_key(*name))
            .collect();
        if missing.is_empty() {
            return true;
        }
        let reason = format!("missing section(s): {}", missing.join(", "));
        warn!("{} attempt {}: {}", round, attempt, reason);
        if let Some(cb) = progress {
            cb.on_attempt_failed(round, attempt, &reason);
        }
        false
    }
}

impl<'a> SummaryOrchestrator<'a> {
    /// `content` is the paper as the oracle sees it; it leads every prompt.
    pub fn new(oracle: &'a dyn Oracle, config: &'a SummaryConfig, content: PromptPart) -> Self {
        Self {
            oracle,
            config,
            parser: SectionParser::new(&config.registry),
            content,
        }
    }

    /// Run the protocol to completion.
    ///
    /// # Errors
    /// [`GenerationFailure::TitleUnresolved`] if the title round exhausts
    /// its attempts (no further calls are made), or
    /// [`GenerationFailure::RequiredSectionsUnresolved`] if a required section
    /// is still missing after its retries.
    pub async fn run(&self) -> Result<SummaryResult, GenerationFailure> {
        let registry = &self.config.registry;
        let progress = self.config.progress_callback.as_ref();
        let mut state = RunState::default();

        // ── AwaitingTitle ────────────────────────────────────────────────
        let title = registry.title().name.as_str();
        let title_prompt = build_prompt(registry, None, true);
        info!("Title round: up to {} attempts", self.config.title_attempts);
        let resolved = self
            .round(&mut state, Round::Title, &title_prompt, &[title], self.config.title_attempts)
            .await;
        if !resolved {
            warn!(
                "Title unresolved after {} attempts; giving up",
                self.config.title_attempts
            );
            if let Some(cb) = progress {
                cb.on_generation_complete(state.sections.len(), false);
            }
            return Err(GenerationFailure::TitleUnresolved {
                attempts: self.config.title_attempts,
            });
        }

        // ── AwaitingBulk ─────────────────────────────────────────────────
        let needed = registry.needed(self.config.summary_mode);
        let needed_names: Vec<&str> = needed.iter().map(|s| s.name.as_str()).collect();
        if needed_names.is_empty() {
            debug!("No sections needed beyond the title");
        } else {
            info!("Bulk round: {} section(s)", needed_names.len());
            let prompt = build_prompt(registry, Some(needed_names.as_slice()), false);
            self.round(&mut state, Round::Bulk, &prompt, &needed_names, 1)
                .await;
        }

        // ── ResolvingMissing ─────────────────────────────────────────────
        let missing: Vec<_> = needed
            .iter()
            .filter(|s| !state.sections.contains_key(&s.name))
            .collect();
        if !missing.is_empty() {
            info!("Resolving {} missing section(s) individually", missing.len());
        }
        for spec in missing {
            let attempts = self.config.attempts_for(spec.required);
            let name = spec.name.as_str();
            let prompt = build_prompt(registry, Some(std::slice::from_ref(&name)), false);
            let resolved = self
                .round(&mut state, Round::Section(spec.name.clone()), &prompt, &[name], attempts)
                .await;
            if !resolved {
                warn!(
                    "'{}' unresolved after {} attempt(s) ({})",
                    name,
                    attempts,
                    if spec.required { "required" } else { "optional" }
                );
            }
        }

        // ── Terminal check ───────────────────────────────────────────────
        let final_missing: Vec<String> = needed
            .iter()
            .filter(|s| s.required && !state.sections.contains_key(&s.name))
            .map(|s| s.name.clone())
            .collect();
        let success = final_missing.is_empty();

        info!(
            "Generation {}: {} section(s) resolved in {} call(s), {} input tokens",
            if success { "complete" } else { "failed" },
            state.sections.len(),
            state.oracle_calls,
            state.tokens.total()
        );
        if let Some(cb) = progress {
            cb.on_generation_complete(state.sections.len(), success);
        }

        if !success {
            return Err(GenerationFailure::RequiredSectionsUnresolved {
                missing: final_missing,
            });
        }

        Ok(SummaryResult {
            model: self.oracle.model().to_string(),
            sections: state.sections,
            token_info: state.tokens,
            oracle_calls: state.oracle_calls,
        })
    }

    /// One round: up to `max_attempts` calls with the same prompt, until
    /// every `wanted` section is resolved.
    async fn round(
        &self,
        state: &mut RunState,
        round: Round,
        prompt: &str,
        wanted: &[&str],
        max_attempts: u32,
    ) -> bool {
        let policy = RetryPolicy::new(max_attempts, self.config.retry_backoff_ms);
        let parts = [self.content.clone(), PromptPart::text(prompt)];
        let progress = self.config.progress_callback.as_ref();
        let round_ref = &round;
        let parts_ref = &parts[..];

        retry_until(
            &policy,
            move |attempt| self.attempt(round_ref, parts_ref, wanted, attempt, max_attempts),
            |attempt, outcome| state.absorb(round_ref, attempt, outcome, wanted, progress),
        )
        .await
        .is_some()
    }

    async fn attempt(
        &self,
        round: &Round,
        parts: &[PromptPart],
        expected: &[&str],
        attempt: u32,
        max_attempts: u32,
    ) -> AttemptOutcome {
        debug!("{} attempt {}/{}", round, attempt, max_attempts);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_attempt_start(round, attempt, max_attempts);
        }

        // Counting is bookkeeping only; a failed count never blocks generation.
        let tokens = match self.with_timeout(self.oracle.count_tokens(parts)).await {
            Ok(tokens) => {
                debug!("{}: {} input tokens", round, tokens);
                Some(tokens)
            }
            Err(e) => {
                warn!("{}: token count unavailable: {}", round, e);
                None
            }
        };

        let reply = self
            .with_timeout(self.oracle.generate(parts))
            .await
            .map(|text| self.parser.parse(&text, Some(expected)));

        AttemptOutcome { tokens, reply }
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = Result<T, OracleError>>,
    ) -> Result<T, OracleError> {
        let secs = self.config.api_timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .unwrap_or(Err(OracleError::Timeout { secs }))
    }
}
