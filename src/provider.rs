//!
//! Upstream model routing.
//!
//! A read-only table mapping client-facing model names (`gpt-4o`, `o3-mini`,
//! ...) to the upstream model identifier, the upstream environment it is
//! served from, its [`ModelFamily`] and whether the upstream can stream it.
//! Built once at startup and shared behind an `Arc`.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::tools::ModelFamily;

/* --- constants ------------------------------------------------------------------------------- */

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "gpt4o";

/// `(alias, upstream id)` pairs; every upstream id is also its own alias.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gpt-3.5", "gpt35"),
    ("gpt-4", "gpt4"),
    ("gpt-4-turbo", "gpt4turbo"),
    ("gpt-4o", "gpt4o"),
    ("gpt-4o-mini", "gpt4o"),
    ("gpt-4o-latest", "gpt4olatest"),
    ("o1-preview", "gpto1preview"),
    ("o1-mini", "gpto1mini"),
    ("o1mini", "gpto1mini"),
    ("o1", "gpto1"),
    ("o3-mini", "gpto3mini"),
    ("o3mini", "gpto3mini"),
    ("o3", "gpto3"),
    ("o4-mini", "gpto4mini"),
];

/// `(upstream id, environment, upstream streams it)`
const UPSTREAM_MODELS: &[(&str, Environment, bool)] = &[
    ("gpt35", Environment::Prod, true),
    ("gpt35large", Environment::Prod, true),
    ("gpt4", Environment::Prod, true),
    ("gpt4large", Environment::Prod, true),
    ("gpt4turbo", Environment::Prod, true),
    ("gpt4o", Environment::Prod, true),
    ("gpt4olatest", Environment::Prod, true),
    ("gpto1preview", Environment::Prod, true),
    ("gpto1mini", Environment::Dev, true),
    ("gpto1", Environment::Dev, true),
    ("gpto3mini", Environment::Dev, true),
    ("gpto3", Environment::Dev, false),
    ("gpto4mini", Environment::Dev, false),
    ("gpt41", Environment::Dev, false),
    ("gpt41mini", Environment::Dev, false),
    ("gpt41nano", Environment::Dev, false),
    ("gemini25pro", Environment::Dev, false),
    ("gemini25flash", Environment::Dev, false),
    ("claudeopus4", Environment::Dev, false),
    ("claudesonnet4", Environment::Dev, false),
    ("claudesonnet37", Environment::Dev, false),
    ("claudesonnet35v2", Environment::Dev, false),
];

/* --- types ----------------------------------------------------------------------------------- */

///
/// Upstream deployment a model is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Dev,
}

///
/// Where and how a client-facing model name is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    /** identifier sent upstream */
    pub upstream_id: String,
    /** deployment serving the model */
    pub environment: Environment,
    /** provider family, decides the tool strategy */
    pub family: ModelFamily,
    /** false: `stream: true` is answered with emulated streaming */
    pub streams: bool,
}

///
/// Immutable alias table.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    routes: HashMap<String, ModelRoute>,
    upstream_ids: Vec<String>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl ModelRegistry {
    ///
    /// Registry with the built-in model table.
    pub fn builtin() -> Self {
        let mut registry = Self { routes: HashMap::new(), upstream_ids: Vec::new() };
        for (upstream_id, environment, streams) in UPSTREAM_MODELS {
            registry.insert(upstream_id, ModelRoute::new(upstream_id, *environment, *streams));
        }
        for (alias, upstream_id) in MODEL_ALIASES {
            if let Some(route) = registry.routes.get(*upstream_id).cloned() {
                registry.routes.insert(alias.to_string(), route);
            }
        }
        registry
    }

    fn insert(&mut self, upstream_id: &str, route: ModelRoute) {
        self.upstream_ids.push(upstream_id.to_string());
        self.routes.insert(upstream_id.to_string(), route);
    }

    ///
    /// Resolves a client-facing model name.
    ///
    /// # Arguments
    ///  * `requested` - model field of the request; `None` selects [`DEFAULT_MODEL`]
    ///
    /// # Returns
    ///  * the route, or `UnknownModel`
    pub fn resolve(&self, requested: Option<&str>) -> Result<&ModelRoute> {
        let name = requested.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(DEFAULT_MODEL);
        self.routes
            .get(name)
            .or_else(|| self.routes.get(&name.to_ascii_lowercase()))
            .ok_or_else(|| BridgeError::UnknownModel(name.to_string()))
    }

    /// Upstream model ids in table order, for the models listing.
    pub fn upstream_ids(&self) -> &[String] {
        &self.upstream_ids
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelRoute {
    pub fn new(upstream_id: &str, environment: Environment, streams: bool) -> Self {
        Self {
            upstream_id: upstream_id.to_string(),
            environment,
            family: ModelFamily::from_model_id(upstream_id),
            streams,
        }
    }
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_alias() {
        let registry = ModelRegistry::builtin();
        let route = registry.resolve(Some("gpt-4o")).unwrap();
        assert_eq!(route.upstream_id, "gpt4o");
        assert_eq!(route.environment, Environment::Prod);
        assert_eq!(route.family, ModelFamily::OpenAI);
        assert!(route.streams);
    }

    #[test]
    fn test_resolve_default_model() {
        let registry = ModelRegistry::builtin();
        assert_eq!(registry.resolve(None).unwrap().upstream_id, DEFAULT_MODEL);
        assert_eq!(registry.resolve(Some("  ")).unwrap().upstream_id, DEFAULT_MODEL);
    }

    #[test]
    fn test_families_and_streaming() {
        let registry = ModelRegistry::builtin();
        let gemini = registry.resolve(Some("gemini25pro")).unwrap();
        assert_eq!(gemini.family, ModelFamily::Google);
        assert!(!gemini.streams);
        let claude = registry.resolve(Some("claudesonnet4")).unwrap();
        assert_eq!(claude.family, ModelFamily::Anthropic);
        assert_eq!(claude.environment, Environment::Dev);
        assert_eq!(registry.resolve(Some("o3-mini")).unwrap().upstream_id, "gpto3mini");
    }

    #[test]
    fn test_unknown_model() {
        let err = ModelRegistry::builtin().resolve(Some("llama-70b")).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownModel(ref m) if m == "llama-70b"));
    }

    #[test]
    fn test_upstream_ids_unique() {
        let registry = ModelRegistry::builtin();
        let ids = registry.upstream_ids();
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }
}
