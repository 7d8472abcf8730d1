// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider registry and per-call provider selection.

use std::collections::HashMap;
use std::sync::Arc;

use memora_config::model::LlmConfig;
use memora_core::{
    ChatEnvelope, ChatMessage, ChatOptions, ChatProvider, ChatStream, MemoraError, PluginAdapter,
};
use strum::Display;
use tracing::info;

/// Provider used when neither the call nor the configuration names one.
pub const BUILTIN_DEFAULT_PROVIDER: &str = "openai";

/// Which rule selected the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RouteSource {
    /// Named in the call's options.
    Explicit,
    /// `llm.default_provider` (or `MEMORA_LLM_DEFAULT_PROVIDER`).
    Configured,
    /// [`BUILTIN_DEFAULT_PROVIDER`].
    Builtin,
}

/// Outcome of provider resolution for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub provider: String,
    /// Model forwarded to the provider, if any was named or configured.
    pub model: Option<String>,
    pub source: RouteSource,
}

/// Name-keyed registry of chat providers.
pub struct LlmRouter {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
    config: LlmConfig,
}

impl LlmRouter {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            providers: HashMap::new(),
            config,
        }
    }

    /// Registers `provider` under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            info!(provider = name.as_str(), "replaced registered LLM provider");
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Selects the provider for a call.
    ///
    /// Priority order:
    /// 1. `options.provider`
    /// 2. Configured `llm.default_provider`
    /// 3. [`BUILTIN_DEFAULT_PROVIDER`]
    ///
    /// The model is `options.model`, else the configured `llm.default_model`.
    pub fn route(&self, options: &ChatOptions) -> Result<RoutingDecision, MemoraError> {
        let (provider, source) = if let Some(name) = &options.provider {
            (name.clone(), RouteSource::Explicit)
        } else if let Some(name) = &self.config.default_provider {
            (name.clone(), RouteSource::Configured)
        } else {
            (BUILTIN_DEFAULT_PROVIDER.to_string(), RouteSource::Builtin)
        };

        if !self.providers.contains_key(&provider) {
            return Err(MemoraError::UnknownProvider {
                name: provider,
                valid: self.provider_names(),
            });
        }

        let model = options
            .model
            .clone()
            .or_else(|| self.config.default_model.clone());
        Ok(RoutingDecision {
            provider,
            model,
            source,
        })
    }

    /// Routes and sends a completion request.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Result<ChatEnvelope, MemoraError> {
        let (provider, options, _) = self.resolve(options)?;
        provider.chat(messages, &options).await
    }

    /// Routes and opens a streaming completion.
    pub async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        options: &ChatOptions,
    ) -> Result<ChatStream, MemoraError> {
        let (provider, options, _) = self.resolve(options)?;
        provider.stream_chat(messages, &options).await
    }

    /// Resolves the provider and the options it receives: the chosen
    /// provider name and model filled in, everything else passed through.
    pub fn resolve(
        &self,
        options: &ChatOptions,
    ) -> Result<(Arc<dyn ChatProvider>, ChatOptions, RoutingDecision), MemoraError> {
        let decision = self.route(options)?;
        let provider = self
            .providers
            .get(&decision.provider)
            .cloned()
            .ok_or_else(|| MemoraError::UnknownProvider {
                name: decision.provider.clone(),
                valid: self.provider_names(),
            })?;
        info!(
            provider = decision.provider.as_str(),
            model = decision.model.as_deref().unwrap_or("default"),
            source = %decision.source,
            "routing LLM request"
        );
        let resolved = ChatOptions {
            provider: Some(decision.provider.clone()),
            model: decision.model.clone(),
            ..options.clone()
        };
        Ok((provider, resolved, decision))
    }
}
