//! Per-query flow: route, synthesize, then record the exchange.

use serde::Serialize;

use super::synthesizer::AnswerSynthesizer;
use crate::context::{ConversationWindow, Role};
use crate::core::errors::GenerationServiceError;
use crate::router::{GroundingContext, RetrievalRouter, RouteState};

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub answer: String,
    pub grounding: GroundingContext,
    pub route: Vec<RouteState>,
}

#[derive(Clone)]
pub struct ProductAssistant {
    router: RetrievalRouter,
    synthesizer: AnswerSynthesizer,
}

impl ProductAssistant {
    pub fn new(router: RetrievalRouter, synthesizer: AnswerSynthesizer) -> Self {
        Self {
            router,
            synthesizer,
        }
    }

    /// Answers `query` against `window`. Turns are only recorded once an
    /// answer was generated, so a failed call leaves the history untouched.
    pub async fn ask(
        &self,
        window: &mut ConversationWindow,
        query: &str,
    ) -> Result<AssistantReply, GenerationServiceError> {
        let outcome = self.router.route(query).await;
        let history = window.render_for_grounding();

        let answer = self
            .synthesizer
            .synthesize(query, &history, &outcome.grounding.render())
            .await?;

        window.append(Role::User, query);
        window.append(Role::Assistant, answer.clone());

        Ok(AssistantReply {
            answer,
            grounding: outcome.grounding,
            route: outcome.states,
        })
    }
}
