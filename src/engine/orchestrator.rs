use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::config::DEFAULT_BACKEND_TIMEOUT_SECS;
use crate::kb::KnowledgeBase;
use crate::models::{
    AuditMetadata, AuditReport, ClinicalFacts, GeneratedPass, SourceDocument,
};
use crate::reasoning::{GeneratedReview, GroundedReasoningAdapter};

use super::confidence::{calibrate_flags, gate_flags};
use super::grounding::validate_flags;
use super::guardrails::apply_guardrails;
use super::matcher::ConflictMatcher;
use super::merge::assemble_report;

/// Runs one audit end to end: both producers concurrently, then the
/// sequential validate, guardrail, gate, calibrate, merge chain.
///
/// `run_audit` is infallible. Whatever happens to the generative pass,
/// the caller gets a report carrying at least the deterministic findings.
pub struct SafetyAuditor {
    kb: Arc<KnowledgeBase>,
    adapter: Option<Arc<GroundedReasoningAdapter>>,
    backend_timeout_secs: u64,
}

impl SafetyAuditor {
    pub fn new(kb: Arc<KnowledgeBase>, adapter: GroundedReasoningAdapter) -> Self {
        Self {
            kb,
            adapter: Some(Arc::new(adapter)),
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }

    /// Audit with the rule table alone, no generative backend.
    pub fn deterministic_only(kb: Arc<KnowledgeBase>) -> Self {
        Self {
            kb,
            adapter: None,
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }

    pub fn with_backend_timeout(mut self, secs: u64) -> Self {
        self.backend_timeout_secs = secs;
        self
    }

    pub async fn run_audit(
        &self,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
    ) -> AuditReport {
        let started = Instant::now();

        let matcher_task = {
            let kb = Arc::clone(&self.kb);
            let facts = facts.clone();
            let documents = documents.to_vec();
            tokio::task::spawn_blocking(move || {
                ConflictMatcher::new(kb).match_facts(&facts, &documents)
            })
        };

        let (matcher_outcome, (review, pass)) =
            tokio::join!(matcher_task, self.generated_pass(facts, documents));

        let deterministic = match matcher_outcome {
            Ok(flags) => validate_flags(flags, documents),
            Err(err) => {
                tracing::error!(error = %err, "Conflict matcher task failed");
                Vec::new()
            }
        };

        let generated = calibrate_flags(gate_flags(apply_guardrails(validate_flags(
            review.flags,
            documents,
        ))));

        let metadata = AuditMetadata {
            encounter_id: Uuid::new_v4(),
            created_at: Utc::now().naive_utc(),
            kb_version: self.kb.version().to_string(),
            model: self.adapter.as_ref().map(|a| a.model_name().to_string()),
            engine_duration_ms: started.elapsed().as_millis() as u64,
            generated_pass: pass,
        };

        let report = assemble_report(
            facts,
            deterministic,
            generated,
            review.missing_info_questions,
            metadata,
        );

        tracing::info!(
            patient_id = %report.patient_id,
            flag_count = report.flags.len(),
            duration_ms = report.metadata.engine_duration_ms,
            pass = pass.as_str(),
            "Safety audit complete"
        );

        report
    }

    async fn generated_pass(
        &self,
        facts: &ClinicalFacts,
        documents: &[SourceDocument],
    ) -> (GeneratedReview, GeneratedPass) {
        let Some(adapter) = &self.adapter else {
            return (GeneratedReview::empty(), GeneratedPass::Disabled);
        };

        let adapter = Arc::clone(adapter);
        let facts = facts.clone();
        let documents = documents.to_vec();
        // The backend client is blocking; keep it off the async workers.
        let task = tokio::task::spawn_blocking(move || adapter.analyze(&facts, &documents));

        match tokio::time::timeout(Duration::from_secs(self.backend_timeout_secs), task).await {
            Ok(Ok(Ok(review))) => (review, GeneratedPass::Completed),
            Ok(Ok(Err(err))) => {
                tracing::warn!(error = %err, "Generative pass unavailable, auditing without it");
                (GeneratedReview::empty(), GeneratedPass::Degraded)
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "Generative pass task failed");
                (GeneratedReview::empty(), GeneratedPass::Degraded)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.backend_timeout_secs,
                    "Generative pass timed out, auditing without it"
                );
                (GeneratedReview::empty(), GeneratedPass::Degraded)
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::MockBackend;

    fn kb() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::builtin().expect("bundled tables must load"))
    }

    fn facts() -> ClinicalFacts {
        ClinicalFacts {
            patient_id: "pt-1".into(),
            age: Some(70),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deterministic_only_auditor_reports_disabled_pass() {
        let report = SafetyAuditor::deterministic_only(kb())
            .run_audit(&facts(), &[])
            .await;

        assert_eq!(report.metadata.generated_pass, GeneratedPass::Disabled);
        assert!(report.metadata.model.is_none());
        assert!(report.summary.contains("disabled"));
    }

    #[tokio::test]
    async fn completed_pass_records_the_model() {
        let adapter = GroundedReasoningAdapter::new(
            Box::new(MockBackend::new(r#"{"flags": []}"#)),
            "medgemma:4b",
        );
        let report = SafetyAuditor::new(kb(), adapter)
            .run_audit(&facts(), &[])
            .await;

        assert_eq!(report.metadata.generated_pass, GeneratedPass::Completed);
        assert_eq!(report.metadata.model.as_deref(), Some("medgemma:4b"));
        assert_eq!(report.summary, "Safety audit complete. No safety flags identified.");
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_the_pass() {
        let adapter =
            GroundedReasoningAdapter::new(Box::new(MockBackend::unreachable()), "medgemma:4b");
        let report = SafetyAuditor::new(kb(), adapter)
            .run_audit(&facts(), &[])
            .await;

        assert_eq!(report.metadata.generated_pass, GeneratedPass::Degraded);
        assert!(report.summary.contains("unavailable"));
    }
}
