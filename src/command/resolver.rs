//! Intent resolution - turns the model's chosen app and arguments into a validated Action
//!
//! The model's answer is untrusted. Arguments are merged over the
//! deterministic slots, filtered to the app's schema, normalised and checked
//! for required fields and enumerated values.

use crate::actions::catalog::{spec_for, AppSpec};
use crate::core::error::{Result, RunnerError};
use crate::core::types::{Action, AppId, Params};
use crate::llm::context::{transport_code, InstructionContext};

/// Outcome of resolving one argument set, kept for logging
#[derive(Debug, Clone)]
pub struct IntentResolution {
    pub action: Action,
    /// Keys that were supplied but are not part of the app's schema
    pub dropped: Vec<String>,
    /// Values rewritten by friendly enum mapping, as (key, from, to)
    pub normalized: Vec<(String, String, String)>,
}

/// Validates arguments for an app against the catalog
pub struct IntentResolver<'a> {
    context: &'a InstructionContext,
}

impl<'a> IntentResolver<'a> {
    pub fn new(context: &'a InstructionContext) -> Self {
        Self { context }
    }

    /// Merge slots with model arguments and validate them for `app`
    pub fn resolve(&self, app: AppId, model_args: &Params) -> Result<IntentResolution> {
        let spec = spec_for(app);

        let mut merged = self.context.merged_slots();
        merged.extend(model_args.clone());

        let mut params = Params::new();
        let mut dropped = Vec::new();
        let mut normalized = Vec::new();

        for (key, value) in merged {
            let value = value.trim().to_string();
            let Some(param) = spec.param(&key) else {
                if model_args.contains_key(&key) {
                    dropped.push(key);
                }
                continue;
            };
            if value.is_empty() {
                continue;
            }

            if param.values.is_empty() {
                params.insert(key, value);
                continue;
            }

            let mapped = friendly_enum_value(&key, &value, param.values);
            match mapped {
                Some(v) => {
                    if v != value {
                        normalized.push((key.clone(), value.clone(), v.to_string()));
                    }
                    params.insert(key, v.to_string());
                }
                None => {
                    return Err(RunnerError::Classification(format!(
                        "Parameter '{}' for {} must be one of {:?}, got '{}'",
                        key, app, param.values, value
                    )));
                }
            }
        }

        check_required(&spec, &params)?;

        Ok(IntentResolution {
            action: Action { app, params },
            dropped,
            normalized,
        })
    }
}

/// Match a value against an enum, trying synonyms and case-insensitive matches
fn friendly_enum_value(key: &str, value: &str, allowed: &'static [&'static str]) -> Option<&'static str> {
    if let Some(exact) = allowed.iter().find(|a| **a == value) {
        return Some(*exact);
    }
    if let Some(folded) = allowed.iter().find(|a| a.eq_ignore_ascii_case(value)) {
        return Some(*folded);
    }
    if key == "transport" {
        if let Some(code) = transport_code(value) {
            return allowed.iter().find(|a| **a == code).copied();
        }
    }
    None
}

fn check_required(spec: &AppSpec, params: &Params) -> Result<()> {
    let missing: Vec<&str> = spec
        .required_params()
        .filter(|p| !params.contains_key(p.name))
        .map(|p| p.name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RunnerError::Classification(format!(
            "Missing required arguments for {}: {}",
            spec.app,
            missing.join(", ")
        )))
    }
}
