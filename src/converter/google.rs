//!
//! Google (Gemini) function-call wire types.
//!
//! The upstream gateway offers no native tool definitions for this family, so
//! only the decode direction exists.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::Deserialize;
use serde_json::Value;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Gemini `functionCall` entry: `{name, args}`, optionally with an id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoogleFunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "arguments")]
    pub args: Value,
}
