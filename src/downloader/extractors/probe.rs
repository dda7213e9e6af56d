// Probe engine - runs the profile chain until one extraction succeeds
//
// Profiles are awaited strictly one after another. The first success
// wins; a terminal error (private, removed, unavailable) stops early.
// Only the last error is classified and reported.

use std::sync::Arc;

use super::diagnostics::{diagnose, is_terminal};
use super::traits::{MediaExtractor, ProbeChain};
use crate::downloader::models::{ProbeFailure, ProbeOutcome};

pub struct ProbeEngine {
    extractor: Arc<dyn MediaExtractor>,
    chain: ProbeChain,
}

impl ProbeEngine {
    pub fn new(extractor: Arc<dyn MediaExtractor>, chain: ProbeChain) -> Self {
        Self { extractor, chain }
    }

    pub fn chain(&self) -> &ProbeChain {
        &self.chain
    }

    /// Probe `url` with each profile in order
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let mut last_error: Option<String> = None;

        for profile in self.chain.profiles() {
            tracing::debug!(
                "[{}] Trying profile '{}' for {}",
                self.extractor.name(),
                profile.name,
                url
            );

            match self.extractor.probe(url, &profile.options).await {
                Ok(metadata) => {
                    tracing::info!("Probe succeeded with profile '{}'", profile.name);
                    return ProbeOutcome::Success {
                        metadata,
                        profile: profile.name,
                    };
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::debug!("Profile '{}' failed: {}", profile.name, message);
                    let stop = is_terminal(&message);
                    last_error = Some(message);
                    if stop {
                        tracing::info!("Terminal error, skipping remaining profiles");
                        break;
                    }
                }
            }
        }

        let message = last_error.unwrap_or_else(|| "No probe profiles configured".to_string());
        let diagnosis = diagnose(&message);
        tracing::warn!("Probe failed ({}): {}", diagnosis.kind, message);

        ProbeOutcome::Failure(ProbeFailure {
            kind: diagnosis.kind,
            message,
            suggestion: Some(diagnosis.suggestion.to_string()),
            help: Some(diagnosis.help.to_string()),
        })
    }
}
