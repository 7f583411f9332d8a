// Ordered fallback over extraction profiles
//
// One loop shared by every orchestrator operation: try each profile in order,
// stop at the first success, log and swallow everything else. Only running out
// of profiles is reported to the caller.

use std::future::Future;

use super::diagnostics::{diagnose_error, FailureReason};
use super::errors::{ExtractionError, FailureKind, ResolveError};
use super::profiles::ExtractionProfile;

/// Tagged result of one attempt
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// The resolver itself failed
    Failed(ResolveError),
    /// The resolver produced a file that failed content validation
    Invalid(String),
}

pub struct Cascade {
    operation: &'static str,
    profiles: Vec<ExtractionProfile>,
}

impl Cascade {
    /// Ranks are assigned here from the list order, starting at 1
    pub fn new(operation: &'static str, profiles: Vec<ExtractionProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.rank = i + 1;
                p
            })
            .collect();
        Self {
            operation,
            profiles,
        }
    }

    pub fn profiles(&self) -> &[ExtractionProfile] {
        &self.profiles
    }

    pub async fn run<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T, ExtractionError>
    where
        F: FnMut(ExtractionProfile) -> Fut,
        Fut: Future<Output = AttemptOutcome<T>>,
    {
        let mut transport_failures = 0;
        let mut validation_failures = 0;
        let mut last_error = String::from("no profiles configured");

        for profile in &self.profiles {
            tracing::debug!(
                operation = self.operation,
                profile = profile.name,
                rank = profile.rank,
                url,
                "Trying profile"
            );

            let (message, reason) = match attempt(profile.clone()).await {
                AttemptOutcome::Success(value) => {
                    tracing::info!(
                        operation = self.operation,
                        profile = profile.name,
                        rank = profile.rank,
                        url,
                        "Profile succeeded"
                    );
                    return Ok(value);
                }
                AttemptOutcome::Failed(err) => {
                    if err.is_transport() {
                        transport_failures += 1;
                    }
                    let message = err.to_string();
                    let reason = diagnose_error(&message).unwrap_or(FailureReason::Unknown);
                    (message, reason)
                }
                AttemptOutcome::Invalid(why) => {
                    validation_failures += 1;
                    (why, FailureReason::InvalidContent)
                }
            };

            tracing::warn!(
                operation = self.operation,
                profile = profile.name,
                rank = profile.rank,
                url,
                reason = reason.description(),
                retryable = reason.is_retryable(),
                permanent = reason.is_permanent(),
                error = %message,
                "Profile failed"
            );
            last_error = message;
        }

        let attempts = self.profiles.len();
        let kind = if attempts > 0 && transport_failures == attempts {
            FailureKind::Transport
        } else if attempts > 0 && validation_failures == attempts {
            FailureKind::Validation
        } else {
            FailureKind::NotFound
        };

        let err = ExtractionError {
            operation: self.operation,
            kind,
            attempts,
            last_error,
        };
        tracing::error!(url, kind = %kind, "{}", err);
        Err(err)
    }
}
