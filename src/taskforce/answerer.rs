//! Answerer: final-answer extraction and self-checking.
//!
//! After the inner execution loop drains the plan, the answerer turns the
//! accumulated subtask results into a single tentative answer graded by
//! confidence and uniqueness, and can then audit that answer against the
//! results. Both stages feed the orchestrator's quality gate; neither makes
//! accept/reject decisions itself.

use crate::taskforce::client_wrapper::ClientWrapper;
use crate::taskforce::config::EngineConfig;
use crate::taskforce::error::EngineError;
use crate::taskforce::ledger::TaskLedger;
use crate::taskforce::llm_gateway::LLMGateway;
use crate::taskforce::prompts;
use crate::taskforce::protocol;
use std::sync::Arc;

/// Answer extractor over the run's subtask results.
pub struct Answerer {
    gateway: LLMGateway,
}

impl Answerer {
    /// Create an answerer over the given client.
    pub fn new(client: Arc<dyn ClientWrapper>, config: &EngineConfig) -> Self {
        Self {
            gateway: LLMGateway::new(client, config.role_timeout),
        }
    }

    /// Extract a tentative answer with confidence and uniqueness grades and
    /// record it on the ledger.
    ///
    /// Missing tags fall to their documented defaults: the whole response as
    /// the answer, `low` confidence, `unclear` uniqueness.
    pub async fn extract_final_answer(&self, ledger: &mut TaskLedger) -> Result<(), EngineError> {
        let prompt = prompts::build_final_answer_prompt(ledger);

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("answerer_extract_final_answer", reply.record);

        let (answer, confidence, uniqueness) = protocol::parse_final_answer(&reply.final_output);
        log::info!(
            "Tentative answer extracted (confidence: {}, uniqueness: {})",
            confidence,
            uniqueness
        );
        ledger.set_tentative_answer(answer, confidence, uniqueness);
        Ok(())
    }

    /// Audit the tentative answer against the subtask results.
    ///
    /// Returns `(passed, analysis)`. The verdict is `true` only for an
    /// explicit `yes`; the analysis is the checker's full reasoning and feeds
    /// the reflection prompt on rejection.
    pub async fn self_check(&self, ledger: &mut TaskLedger) -> Result<(bool, String), EngineError> {
        let prompt = prompts::build_self_check_prompt(ledger);

        let reply = self.gateway.run(&prompt).await?;
        ledger.append_trajectory("answerer_self_check", reply.record);

        Ok(protocol::parse_self_check(&reply.final_output))
    }
}
