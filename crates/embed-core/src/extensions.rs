//! Extension loader
//!
//! Command groups are registered in a static table instead of being
//! discovered on disk. The loader activates each entry against a shared
//! context, isolating failures (returned errors and panics alike) so one
//! broken entry never stops the others, and keeps a report of what loaded.
//!
//! Activation order is deterministic: plain modules sorted by name, then
//! grouped modules sorted by name. Entries whose name starts with
//! [`RESERVED_PREFIX`] are helpers and are never activated.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::error::Error;

/// Names starting with this character mark non-loadable helpers.
pub const RESERVED_PREFIX: char = '_';

/// Why an extension refused to activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationError(pub String);

impl ActivationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ActivationError {}

/// Activation hook of one extension.
pub type ActivateFn<C> = fn(&mut C) -> Result<(), ActivationError>;

/// Whether an entry is a single module or a group activated as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Module,
    Group,
}

/// One row of a static registration table
pub struct ExtensionEntry<C> {
    pub name: &'static str,
    pub kind: ExtensionKind,
    pub activate: ActivateFn<C>,
}

impl<C> ExtensionEntry<C> {
    pub const fn module(name: &'static str, activate: ActivateFn<C>) -> Self {
        Self {
            name,
            kind: ExtensionKind::Module,
            activate,
        }
    }

    pub const fn group(name: &'static str, activate: ActivateFn<C>) -> Self {
        Self {
            name,
            kind: ExtensionKind::Group,
            activate,
        }
    }
}

/// Outcome of activating one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionOutcome {
    Loaded,
    Failed(String),
}

/// (name, outcome) pair; recomputed on every load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub outcome: ExtensionOutcome,
}

/// Activates registration tables and records the results
#[derive(Debug, Default)]
pub struct ExtensionLoader {
    loaded: Vec<String>,
    failed: Vec<(String, String)>,
}

impl ExtensionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate every loadable entry of `entries` against `ctx`, qualifying
    /// names as `group.name`. Returns how many activated successfully.
    pub fn load_group<C>(&mut self, group: &str, entries: &[ExtensionEntry<C>], ctx: &mut C) -> usize {
        let mut ordered: Vec<&ExtensionEntry<C>> = entries
            .iter()
            .filter(|e| !e.name.starts_with(RESERVED_PREFIX))
            .collect();
        ordered.sort_by_key(|e| (e.kind == ExtensionKind::Group, e.name));

        let mut count = 0;
        for entry in ordered {
            let qualified = format!("{}.{}", group, entry.name);
            match activate(entry, ctx) {
                Ok(()) => {
                    debug!(extension = %qualified, "Extension loaded");
                    self.loaded.push(qualified);
                    count += 1;
                }
                Err(reason) => {
                    error!("Failed to load extension {}: {}", qualified, reason);
                    self.failed.push((qualified, reason));
                }
            }
        }
        count
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    pub fn failed(&self) -> &[(String, String)] {
        &self.failed
    }

    /// Failures as typed errors, for callers that report them individually.
    pub fn errors(&self) -> Vec<Error> {
        self.failed
            .iter()
            .map(|(name, reason)| Error::ExtensionActivation {
                name: name.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    pub fn descriptors(&self) -> Vec<ExtensionDescriptor> {
        let loaded = self.loaded.iter().map(|name| ExtensionDescriptor {
            name: name.clone(),
            outcome: ExtensionOutcome::Loaded,
        });
        let failed = self.failed.iter().map(|(name, reason)| ExtensionDescriptor {
            name: name.clone(),
            outcome: ExtensionOutcome::Failed(reason.clone()),
        });
        loaded.chain(failed).collect()
    }

    /// `"loaded: N"`, plus `", failed: M"` when anything failed.
    pub fn summary(&self) -> String {
        let mut summary = format!("loaded: {}", self.loaded.len());
        if !self.failed.is_empty() {
            summary.push_str(&format!(", failed: {}", self.failed.len()));
        }
        summary
    }
}

fn activate<C>(entry: &ExtensionEntry<C>, ctx: &mut C) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| (entry.activate)(ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ctx {
        activated: Vec<&'static str>,
    }

    fn alpha(ctx: &mut Ctx) -> Result<(), ActivationError> {
        ctx.activated.push("alpha");
        Ok(())
    }

    fn beta(_: &mut Ctx) -> Result<(), ActivationError> {
        Err(ActivationError::new("missing dependency"))
    }

    fn gamma(ctx: &mut Ctx) -> Result<(), ActivationError> {
        ctx.activated.push("gamma");
        Ok(())
    }

    fn exploding(ctx: &mut Ctx) -> Result<(), ActivationError> {
        ctx.activated.push("exploding");
        panic!("boom");
    }

    fn tools(ctx: &mut Ctx) -> Result<(), ActivationError> {
        ctx.activated.push("tools");
        Ok(())
    }

    fn helper(ctx: &mut Ctx) -> Result<(), ActivationError> {
        ctx.activated.push("_helper");
        Ok(())
    }

    #[test]
    fn test_failure_is_isolated() {
        let entries = [
            ExtensionEntry::module("alpha", alpha),
            ExtensionEntry::module("beta", beta),
            ExtensionEntry::module("gamma", gamma),
        ];
        let mut ctx = Ctx::default();
        let mut loader = ExtensionLoader::new();

        let count = loader.load_group("commands", &entries, &mut ctx);

        assert_eq!(count, 2);
        assert_eq!(loader.loaded(), ["commands.alpha", "commands.gamma"]);
        assert_eq!(loader.failed().len(), 1);
        assert_eq!(loader.failed()[0].0, "commands.beta");
        assert_eq!(loader.failed()[0].1, "missing dependency");
        assert_eq!(ctx.activated, vec!["alpha", "gamma"]);
        assert_eq!(loader.summary(), "loaded: 2, failed: 1");
    }

    #[test]
    fn test_panicking_activation_is_isolated() {
        let entries = [
            ExtensionEntry::module("a", alpha),
            ExtensionEntry::module("b", exploding),
            ExtensionEntry::module("c", gamma),
        ];
        let mut ctx = Ctx::default();
        let mut loader = ExtensionLoader::new();

        assert_eq!(loader.load_group("commands", &entries, &mut ctx), 2);
        assert_eq!(loader.failed()[0].0, "commands.b");
        assert_eq!(loader.failed()[0].1, "panicked: boom");
        assert_eq!(ctx.activated, vec!["alpha", "exploding", "gamma"]);
    }

    #[test]
    fn test_order_is_sorted_modules_then_groups() {
        let entries = [
            ExtensionEntry::group("tools", tools),
            ExtensionEntry::module("gamma", gamma),
            ExtensionEntry::module("alpha", alpha),
        ];
        let mut ctx = Ctx::default();
        let mut loader = ExtensionLoader::new();
        loader.load_group("commands", &entries, &mut ctx);

        assert_eq!(ctx.activated, vec!["alpha", "gamma", "tools"]);
    }

    #[test]
    fn test_reserved_prefix_is_skipped() {
        let entries = [
            ExtensionEntry::module("_helper", helper),
            ExtensionEntry::module("alpha", alpha),
        ];
        let mut ctx = Ctx::default();
        let mut loader = ExtensionLoader::new();

        assert_eq!(loader.load_group("commands", &entries, &mut ctx), 1);
        assert_eq!(ctx.activated, vec!["alpha"]);
        assert_eq!(loader.summary(), "loaded: 1");
    }

    #[test]
    fn test_descriptors_and_errors() {
        let entries = [
            ExtensionEntry::module("alpha", alpha),
            ExtensionEntry::module("beta", beta),
        ];
        let mut loader = ExtensionLoader::new();
        loader.load_group("commands", &entries, &mut Ctx::default());

        assert_eq!(
            loader.descriptors(),
            vec![
                ExtensionDescriptor {
                    name: "commands.alpha".to_string(),
                    outcome: ExtensionOutcome::Loaded,
                },
                ExtensionDescriptor {
                    name: "commands.beta".to_string(),
                    outcome: ExtensionOutcome::Failed("missing dependency".to_string()),
                },
            ]
        );
        assert_eq!(
            loader.errors()[0].to_string(),
            "Extension 'commands.beta' failed to activate: missing dependency"
        );
    }

    #[test]
    fn test_empty_table() {
        let entries: [ExtensionEntry<Ctx>; 0] = [];
        let mut loader = ExtensionLoader::new();
        assert_eq!(loader.load_group("commands", &entries, &mut Ctx::default()), 0);
        assert_eq!(loader.summary(), "loaded: 0");
    }
}
