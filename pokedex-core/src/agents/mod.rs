//! The three agents and the language-model seam they share.
//!
//! - [`SupervisorAgent`] classifies a message and extracts Pokemon names
//! - [`ResearchAgent`] looks a Pokemon up and writes detail lines
//! - [`ExpertAgent`] produces a battle verdict from two records
//!
//! Every model call goes through [`LanguageModel`] and asks for one typed
//! result via a forced tool call, so tests can swap in
//! [`MockModel`](crate::testing::MockModel).

mod expert;
mod researcher;
mod supervisor;

pub use expert::{ExpertAgent, VerdictDraft};
pub use researcher::{ResearchAgent, ResearchContext, ResearchNotes};
pub use supervisor::{
    extract_candidate_names, normalize_names, DispatchResult, Reflection, SupervisorAgent,
    SupervisorDecision, MAX_POKEMON_NAMES,
};

use async_trait::async_trait;
use claude::{Claude, Message, Request, Response, StructuredOutput};

/// A completion service: request in, response out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: Request) -> Result<Response, claude::Error>;
}

#[async_trait]
impl LanguageModel for Claude {
    async fn complete(&self, request: Request) -> Result<Response, claude::Error> {
        Claude::complete(self, request).await
    }
}

/// Generation settings shared by the agents.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Overrides the client's model when set.
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: Some(0.2),
        }
    }
}

/// Ask the model for a single structured result of type `T`.
pub(crate) async fn ask<T: StructuredOutput>(
    model: &dyn LanguageModel,
    settings: &AgentSettings,
    system: &str,
    prompt: String,
) -> Result<T, claude::Error> {
    let mut request = Request::new(vec![Message::user(prompt)])
        .with_system(system)
        .with_max_tokens(settings.max_tokens)
        .with_structured_output::<T>();
    if let Some(model_name) = &settings.model {
        request = request.with_model(model_name.clone());
    }
    if let Some(temperature) = settings.temperature {
        request = request.with_temperature(temperature);
    }

    let response = model.complete(request).await?;
    response.parse_output::<T>()
}
