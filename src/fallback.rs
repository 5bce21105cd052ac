//! Per-query fallback orchestration.
//!
//! One query runs through an explicit state machine: local retrieval first,
//! then, depending on the result count, the configured threshold, and the
//! caller's flags, an optional web attempt, a merge, or a degraded path.
//! The decision table is pure (`decide`, `merge_ranked`) so it can be tested
//! without touching either retrieval channel; given the same local count,
//! threshold, flags, and web outcome, the orchestrator always lands in the
//! same terminal state.

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::FallbackConfig;
use crate::core::errors::RagError;
use crate::retrieval::{SearchResult, SemanticRetriever, SourceTag, WebRetriever};

/// Which retrieval channels a query was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRoute {
    LocalOnly,
    WebOnly,
    LocalThenWeb,
    None,
}

/// The signal that produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FallbackSignal {
    LocalAboveThreshold { count: usize, threshold: usize },
    LocalBelowThreshold { count: usize, threshold: usize },
    CallerForcedFallback,
    FallbackDisabled { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FallbackDecision {
    pub route: FallbackRoute,
    pub signal: FallbackSignal,
}

/// Terminal state of the query, surfaced in the final answer for
/// transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    LocalSatisfied,
    WebMerged,
    DegradedLocal,
    Empty,
}

/// Caller-controlled routing flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Allow the web channel when local retrieval is insufficient.
    pub use_fallback: bool,
    /// Attempt the web channel even when local retrieval satisfies the
    /// threshold. Implies fallback permission.
    pub force_web: bool,
}

/// Assembled context plus how we got there.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackOutcome {
    pub mode: SourceMode,
    pub decision: FallbackDecision,
    pub context: Vec<SearchResult>,
}

/// Routing decision from local result count, threshold, and caller flags.
/// Pure; no I/O, no randomness.
pub fn decide(local_count: usize, threshold: usize, opts: QueryOptions) -> FallbackDecision {
    if opts.force_web {
        return FallbackDecision {
            route: if local_count == 0 {
                FallbackRoute::WebOnly
            } else {
                FallbackRoute::LocalThenWeb
            },
            signal: FallbackSignal::CallerForcedFallback,
        };
    }

    if local_count >= threshold {
        return FallbackDecision {
            route: FallbackRoute::LocalOnly,
            signal: FallbackSignal::LocalAboveThreshold {
                count: local_count,
                threshold,
            },
        };
    }

    if opts.use_fallback {
        FallbackDecision {
            route: if local_count == 0 {
                FallbackRoute::WebOnly
            } else {
                FallbackRoute::LocalThenWeb
            },
            signal: FallbackSignal::LocalBelowThreshold {
                count: local_count,
                threshold,
            },
        }
    } else {
        FallbackDecision {
            route: FallbackRoute::None,
            signal: FallbackSignal::FallbackDisabled { count: local_count },
        }
    }
}

/// Merge the two channels into one descending ranking. Local results are
/// ranked with `local_boost` added to their score so grounded content
/// outranks web snippets of similar relevance; reported scores are left
/// untouched. The sort is stable, so exact ties keep local-before-web and
/// channel-internal order.
pub fn merge_ranked(
    local: Vec<SearchResult>,
    web: Vec<SearchResult>,
    local_boost: f32,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = local.into_iter().chain(web).collect();
    merged.sort_by(|a, b| {
        let a_rank = effective_score(a, local_boost);
        let b_rank = effective_score(b, local_boost);
        b_rank
            .partial_cmp(&a_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged
}

fn effective_score(result: &SearchResult, local_boost: f32) -> f32 {
    match result.source {
        SourceTag::Local => result.score + local_boost,
        SourceTag::Web => result.score,
    }
}

/// Runs the state machine for one query.
///
/// The two retrieval calls are sequential by design: the web channel is
/// only consulted after the local results have been evaluated. The web
/// attempt is bounded by the retriever's timeout, so total latency never
/// exceeds local search time plus that timeout.
pub struct FallbackOrchestrator {
    retriever: Arc<SemanticRetriever>,
    web: WebRetriever,
    config: FallbackConfig,
}

impl FallbackOrchestrator {
    pub fn new(
        retriever: Arc<SemanticRetriever>,
        web: WebRetriever,
        config: FallbackConfig,
    ) -> Self {
        Self {
            retriever,
            web,
            config,
        }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    pub async fn run(
        &self,
        query: &str,
        k: usize,
        opts: QueryOptions,
    ) -> Result<FallbackOutcome, RagError> {
        let local = self.retriever.retrieve(query, k).await?;
        let decision = decide(local.len(), self.config.min_local_results, opts);

        tracing::debug!(
            "Fallback decision for query: route={:?} signal={:?}",
            decision.route,
            decision.signal
        );

        let outcome = match decision.route {
            FallbackRoute::LocalOnly => FallbackOutcome {
                mode: SourceMode::LocalSatisfied,
                decision,
                context: local,
            },
            FallbackRoute::WebOnly | FallbackRoute::LocalThenWeb => {
                let web = self
                    .web
                    .retrieve(query, self.config.web_max_results)
                    .await;

                if web.is_empty() {
                    if local.is_empty() {
                        FallbackOutcome {
                            mode: SourceMode::Empty,
                            decision,
                            context: Vec::new(),
                        }
                    } else {
                        FallbackOutcome {
                            mode: SourceMode::DegradedLocal,
                            decision,
                            context: local,
                        }
                    }
                } else {
                    FallbackOutcome {
                        mode: SourceMode::WebMerged,
                        decision,
                        context: merge_ranked(local, web, self.config.local_boost),
                    }
                }
            }
            FallbackRoute::None => {
                if local.is_empty() {
                    FallbackOutcome {
                        mode: SourceMode::Empty,
                        decision,
                        context: Vec::new(),
                    }
                } else {
                    FallbackOutcome {
                        mode: SourceMode::DegradedLocal,
                        decision,
                        context: local,
                    }
                }
            }
        };

        tracing::info!(
            "Query resolved: mode={:?} context_len={}",
            outcome.mode,
            outcome.context.len()
        );
        Ok(outcome)
    }
}
