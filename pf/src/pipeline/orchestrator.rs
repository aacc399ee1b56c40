//! Pipeline orchestrator - drives one build through the stage machine

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{PipelineError, PipelineModels, generate_plan, render_section};
use crate::domain::{PipelineStage, ProductData, SliceCollection};
use crate::llm::LlmClient;
use crate::state::StateManager;

/// Builds pages against one backend and one state manager
#[derive(Clone)]
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    models: PipelineModels,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, state: StateManager, models: PipelineModels) -> Self {
        Self { llm, state, models }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Run a full build for `product`
    ///
    /// idle/completed/error → thinking (plan) → generating (sections in
    /// order) → completed. Any backend failure moves the run to `error`
    /// with the slices rendered so far kept. Returns the final collection.
    pub async fn build(&self, product: &ProductData) -> Result<SliceCollection, PipelineError> {
        debug!(name = %product.name, "build: called");
        product.validate().map_err(|msg| {
            debug!(%msg, "build: validation failed");
            PipelineError::Validation(msg)
        })?;

        self.state.begin_run(product.clone()).await?;
        info!(name = %product.name, "Build started");

        let plan = match generate_plan(self.llm.as_ref(), &self.models.plan, product).await {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(e).await),
        };

        self.state.set_stage(PipelineStage::Generating).await?;

        let total = plan.sections.len();
        for (index, section) in plan.sections.iter().enumerate() {
            debug!(index, total, title = %section.title, "build: rendering section");
            let slice = match render_section(self.llm.as_ref(), &self.models, section, product).await {
                Ok(slice) => slice,
                Err(e) => {
                    warn!(index, total, error = %e, "Section failed");
                    return Err(self.fail(e).await);
                }
            };
            self.state.append(slice).await?;
            info!(done = index + 1, total, "Section rendered");
        }

        self.state.set_stage(PipelineStage::Completed).await?;
        info!(slices = total, "Build completed");
        Ok(self.state.slices().await?)
    }

    /// Record `error` on the session and hand it back
    async fn fail(&self, error: PipelineError) -> PipelineError {
        if let Err(e) = self.state.record_failure(error.to_string()).await {
            warn!(error = %e, "Failed to record pipeline failure");
        }
        error
    }
}
