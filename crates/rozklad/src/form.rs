#![forbid(unsafe_code)]

//! Named select fields with one-directional dependency edges.
//!
//! When a parent's value changes, each dependent is reset: its value is
//! cleared, its dependency key is recomputed from the parents' current
//! values, and its cached options are dropped. The reset flows down the
//! graph; a dependent never touches its parents. Edges that would close a
//! cycle are rejected when added.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Instant;

use rozklad_core::event::Event;
use rozklad_select::{
    CacheKey, FetchRequest, FetchResponse, LoadOutcome, SelectAction, SelectController,
    SelectValue,
};

/// Error from a form operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// No field with this name.
    UnknownField(String),
    /// A field with this name already exists.
    DuplicateField(String),
    /// A field was listed as its own parent.
    SelfDependency(String),
    /// The edge `parent -> child` would close a cycle.
    Cycle { parent: String, child: String },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "unknown field: {name}"),
            Self::DuplicateField(name) => write!(f, "duplicate field: {name}"),
            Self::SelfDependency(name) => write!(f, "field {name} cannot depend on itself"),
            Self::Cycle { parent, child } => {
                write!(f, "dependency {parent} -> {child} would create a cycle")
            }
        }
    }
}

impl std::error::Error for FormError {}

/// Result of routing an event or update into a form.
#[derive(Debug, Default, PartialEq)]
pub struct FormUpdate {
    /// What the target field reported.
    pub action: Option<SelectAction>,
    /// Fetches to run, for the target or for reset dependents.
    pub requests: Vec<FetchRequest>,
    /// Dependents that were reset, in cascade order.
    pub reset: Vec<String>,
}

/// A set of select fields and their dependency edges.
#[derive(Debug, Default)]
pub struct Form {
    fields: BTreeMap<String, SelectController>,
    /// child -> parents, in declaration order.
    parents: BTreeMap<String, Vec<String>>,
}

impl Form {
    /// Empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, keyed by its name.
    pub fn add_field(&mut self, field: SelectController) -> Result<(), FormError> {
        let name = field.name().to_string();
        if self.fields.contains_key(&name) {
            return Err(FormError::DuplicateField(name));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Builder form of [`add_field`](Self::add_field).
    pub fn with_field(mut self, field: SelectController) -> Result<Self, FormError> {
        self.add_field(field)?;
        Ok(self)
    }

    /// Declare that `child`'s options depend on `parents`' values.
    ///
    /// Replaces any earlier parents of `child` and sets its dependency key
    /// from the parents' current values. Returns a fetch request if `child`
    /// is open and needs reloading.
    pub fn add_dependency(
        &mut self,
        child: &str,
        parents: &[&str],
    ) -> Result<Option<FetchRequest>, FormError> {
        self.require(child)?;
        for &parent in parents {
            self.require(parent)?;
            if parent == child {
                return Err(FormError::SelfDependency(child.to_string()));
            }
            if self.reaches(child, parent) {
                return Err(FormError::Cycle {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }
        self.parents.insert(
            child.to_string(),
            parents.iter().map(|p| (*p).to_string()).collect(),
        );
        let key = self.key_for(child);
        tracing::debug!(field = child, ?parents, key = ?key, "dependency declared");
        Ok(self
            .fields
            .get_mut(child)
            .and_then(|field| field.set_dependency(key)))
    }

    /// Field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SelectController> {
        self.fields.get(name)
    }

    /// Mutable field access that bypasses the cascade.
    ///
    /// Use [`update`](Self::update) for changes that should reset dependents.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut SelectController> {
        self.fields.get_mut(name)
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    /// Current value of a field.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&SelectValue> {
        self.fields.get(name).map(SelectController::value)
    }

    /// Every field's value as JSON, keyed by name.
    #[must_use]
    pub fn values_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value().to_json()))
            .collect()
    }

    /// Parents of a field.
    #[must_use]
    pub fn parents_of(&self, name: &str) -> &[String] {
        self.parents.get(name).map_or(&[], Vec::as_slice)
    }

    /// Direct dependents of a field, in name order.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.iter().any(|p| p == name))
            .map(|(child, _)| child.as_str())
            .collect()
    }

    /// Dependency key `child` would get from its parents right now.
    ///
    /// `None` if it has no parents or any parent is empty.
    #[must_use]
    pub fn key_for(&self, child: &str) -> Option<CacheKey> {
        let parents = self.parents.get(child)?;
        let mut parts = Vec::new();
        for parent in parents {
            let ids = self.fields.get(parent)?.value().ids();
            if ids.is_empty() {
                return None;
            }
            parts.extend(ids.into_iter().map(|id| id.as_str().to_string()));
        }
        Some(CacheKey::compound(parts))
    }

    /// Open a field. Returns the fetch to run, if any.
    pub fn open(&mut self, name: &str) -> Result<Option<FetchRequest>, FormError> {
        Ok(self.get_mut(name)?.open())
    }

    /// Run `f` on a field, then reset dependents if its value changed.
    pub fn update<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut SelectController) -> R,
    ) -> Result<(R, FormUpdate), FormError> {
        let field = self.get_mut(name)?;
        let before = field.value().clone();
        let out = f(field);
        let mut update = FormUpdate::default();
        if field.value() != &before {
            self.cascade(name, &mut update);
        }
        Ok((out, update))
    }

    /// Route an input event to a field and cascade any value change.
    pub fn handle_event(
        &mut self,
        name: &str,
        event: &Event,
        now: Instant,
    ) -> Result<FormUpdate, FormError> {
        let (action, mut update) = self.update(name, |field| field.handle_event(event, now))?;
        if let Some(SelectAction::Fetch(request)) = &action {
            update.requests.insert(0, request.clone());
        }
        update.action = action;
        Ok(update)
    }

    /// Settle pending search text on every field.
    pub fn tick(&mut self, now: Instant) {
        for field in self.fields.values_mut() {
            field.tick(now);
        }
    }

    /// Deliver a fetch response to the field that issued it.
    pub fn complete_fetch(&mut self, response: FetchResponse) -> Result<LoadOutcome, FormError> {
        let name = response.field.clone();
        Ok(self.get_mut(&name)?.complete_fetch(response))
    }

    fn cascade(&mut self, changed: &str, update: &mut FormUpdate) {
        let mut queue = VecDeque::from([changed.to_string()]);
        while let Some(parent) = queue.pop_front() {
            let children: Vec<String> = self
                .dependents_of(&parent)
                .into_iter()
                .map(str::to_string)
                .collect();
            for child in children {
                let key = self.key_for(&child);
                let Some(field) = self.fields.get_mut(&child) else {
                    continue;
                };
                let had_value = !field.value().is_empty();
                field.clear();
                if let Some(request) = field.set_dependency(key.clone()) {
                    update.requests.push(request);
                }
                tracing::debug!(
                    field = %child,
                    parent = %parent,
                    key = ?key,
                    "dependent field reset"
                );
                update.reset.push(child.clone());
                if had_value {
                    queue.push_back(child);
                }
            }
        }
    }

    /// `true` if `to` is reachable from `from` along parent -> child edges.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from.to_string()];
        let mut seen = std::collections::BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node.clone()) {
                continue;
            }
            stack.extend(self.dependents_of(&node).into_iter().map(str::to_string));
        }
        false
    }

    fn require(&self, name: &str) -> Result<(), FormError> {
        if self.fields.contains_key(name) {
            Ok(())
        } else {
            Err(FormError::UnknownField(name.to_string()))
        }
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut SelectController, FormError> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }
}
