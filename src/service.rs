// PromptDeck: Tool service
//
// Orchestrates one generation: validate, load the tool, generate (with
// fallback), record the run and bump usage. Also fronts the catalog and
// ledger for the HTTP layer.

use crate::error::{AppError, Result};
use crate::generation::{GenerationClient, GenerationRequest};
use crate::metrics::Metrics;
use crate::model::{CategorySummary, GenerationInput, NewRun, NewTool, Run, RunStatus, Tool};
use crate::provider::{find_model, is_valid_model_id};
use crate::store::{RunFilter, Store, ToolFilter, ToolPage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A tool id as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ToolRef {
    Id(i64),
    Text(String),
}

impl ToolRef {
    pub fn resolve(&self) -> Result<i64> {
        match self {
            ToolRef::Id(id) => Ok(*id),
            ToolRef::Text(raw) => raw.trim().parse().map_err(|_| {
                AppError::validation(format!("toolId must be a number, got {:?}", raw))
            }),
        }
    }
}

impl From<i64> for ToolRef {
    fn from(id: i64) -> Self {
        ToolRef::Id(id)
    }
}

/// Body of a generate call. Caller-held settings travel per request only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub tool_id: Option<ToolRef>,
    pub input: Option<GenerationInput>,
    #[serde(alias = "model")]
    pub model_id: Option<String>,
    #[serde(alias = "apiKey")]
    pub caller_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub run_id: i64,
    pub output_text: String,
}

pub struct ToolService {
    store: Arc<Store>,
    generator: Arc<GenerationClient>,
    metrics: Metrics,
    default_model: String,
}

impl ToolService {
    pub fn new(
        store: Arc<Store>,
        generator: Arc<GenerationClient>,
        metrics: Metrics,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            generator,
            metrics,
            default_model: default_model.into(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn has_key(&self) -> bool {
        self.generator.has_configured_key()
    }

    /// Run a store call on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| AppError::Unavailable(format!("storage task failed: {}", e)))?
    }

    // ----- Catalog -----

    pub async fn list_categories(&self) -> Result<Vec<CategorySummary>> {
        self.with_store(|s| s.list_categories()).await
    }

    pub async fn list_tools(&self, filter: ToolFilter) -> Result<ToolPage> {
        self.with_store(move |s| s.list_tools(&filter)).await
    }

    pub async fn get_tool(&self, id: i64) -> Result<Tool> {
        self.with_store(move |s| s.get_tool(id)).await
    }

    pub async fn create_tool(&self, new: NewTool) -> Result<Tool> {
        self.with_store(move |s| s.create_tool(&new)).await
    }

    // ----- Ledger -----

    pub async fn list_runs(&self, filter: RunFilter) -> Result<Vec<Run>> {
        self.with_store(move |s| s.list_runs(&filter)).await
    }

    pub async fn delete_run(&self, id: i64) -> Result<()> {
        self.with_store(move |s| s.delete_run(id)).await
    }

    pub async fn delete_all_runs(&self) -> Result<usize> {
        self.with_store(|s| s.delete_all_runs()).await
    }

    // ----- Generation -----

    /// Generate text for a tool and record the run.
    ///
    /// Remote failures never surface here; they degrade to placeholder text.
    /// Errors are validation, a missing tool, or storage failure.
    pub async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse> {
        let tool_id = req
            .tool_id
            .as_ref()
            .ok_or_else(|| AppError::validation("toolId is required"))?
            .resolve()?;
        let input = req
            .input
            .ok_or_else(|| AppError::validation("input is required"))?;
        if input.text.trim().is_empty() {
            return Err(AppError::validation("input.text is required"));
        }

        let model = req
            .model_id
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        if !is_valid_model_id(model) {
            return Err(AppError::validation(format!(
                "modelId {:?} may only contain letters, digits, '.', '_' and '-'",
                model
            )));
        }

        let tool = self.get_tool(tool_id).await?;
        if find_model(model).is_none() {
            tracing::debug!(model = %model, "Model not in the known list, passing through");
        }

        let generation = self
            .generator
            .generate(GenerationRequest {
                tool_name: &tool.name,
                tool_description: &tool.description,
                input: &input,
                model,
                caller_key: req.caller_key.as_deref(),
                custom_template: tool.template(),
            })
            .await;
        self.metrics.record_generation(model, &generation).await;
        let placeholder = generation.is_stub();
        let elapsed_ms = generation.elapsed.as_millis() as u64;

        let run = NewRun {
            tool_id: tool.id,
            input,
            output_text: generation.text,
            status: RunStatus::Success,
            error_message: None,
        };
        let (run_id, run) = self
            .with_store(move |s| s.record_run(&run).map(|id| (id, run)))
            .await
            .map_err(|e| {
                tracing::error!(tool_id = tool.id, error = %e, "Failed to record run");
                e
            })?;
        self.metrics.record_run().await;

        tracing::info!(
            run_id = run_id,
            tool_id = tool.id,
            model = %model,
            placeholder = placeholder,
            elapsed_ms = elapsed_ms,
            "Generation complete"
        );

        Ok(GenerateResponse {
            run_id,
            output_text: run.output_text,
        })
    }
}
