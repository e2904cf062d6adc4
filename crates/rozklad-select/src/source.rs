#![forbid(unsafe_code)]

//! Option data sources and lazy loading state.
//!
//! A field's options come either from a static list or from a remote fetch
//! that runs when the field is first opened. Remote loading is sans-IO: the
//! source hands out a [`FetchRequest`], the host performs the call however
//! it likes, and feeds the result back as a [`FetchResponse`].
//!
//! # Invariants
//!
//! 1. At most one request per dependency key is in flight; asking to load
//!    again while it is pending yields no new request.
//! 2. A response is applied only if it answers the newest request *and* its
//!    key still equals the current dependency. Anything else is stale and
//!    discarded without touching options or status.
//! 3. A dependency change drops the loaded options and reverts the status
//!    to `Unloaded`, even if the previous set had loaded.
//! 4. A failed fetch never clears anything the host has already committed;
//!    it only records `LoadStatus::Error`.

use std::fmt;

use serde_json::{Map, Value};

use crate::option::{Normalizer, SelectOption};

// ---------------------------------------------------------------------------
// Keys and requests
// ---------------------------------------------------------------------------

/// The dependency value a loaded option set was produced for.
///
/// Compound keys (lesson + lesson type) keep their parts separately, so
/// `["1", "12"]` and `["11", "2"]` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    /// Single-part key.
    pub fn new(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    /// Multi-part key.
    pub fn compound<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Parts in order.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("_"))
    }
}

/// Identifier of one issued fetch, unique per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// A fetch the host must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Request identifier, echoed back in the response.
    pub id: RequestId,
    /// Name of the field that asked.
    pub field: String,
    /// Dependency the request was issued for.
    pub dependency: Option<CacheKey>,
    /// Static parameters configured on the source.
    pub params: Map<String, Value>,
}

impl FetchRequest {
    /// Wrap a fetch result as the response to this request.
    #[must_use]
    pub fn respond(&self, result: Result<Value, FetchError>) -> FetchResponse {
        FetchResponse {
            request: self.id,
            field: self.field.clone(),
            dependency: self.dependency.clone(),
            result,
        }
    }
}

/// Result of a fetch, delivered back to the source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// The request this answers.
    pub request: RequestId,
    /// Field the request belonged to.
    pub field: String,
    /// Dependency the request was issued for.
    pub dependency: Option<CacheKey>,
    /// Raw payload (array or `{data: array}`) or the failure.
    pub result: Result<Value, FetchError>,
}

/// A blocking fetch implementation supplied by the host.
///
/// Implemented for closures so call sites can pass
/// `|req: &FetchRequest| client.get(...)` directly.
pub trait OptionFetcher: Send + Sync {
    /// Perform the request and return the raw payload.
    fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError>;
}

impl<F> OptionFetcher for F
where
    F: Fn(&FetchRequest) -> Result<Value, FetchError> + Send + Sync,
{
    fn fetch(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        self(request)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure while loading options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure (connection refused, reset, DNS).
    Network(String),
    /// Non-success HTTP status.
    Status { code: u16, message: String },
    /// Payload was neither an array nor a `{data: array}` envelope.
    UnexpectedShape(String),
    /// Payload could not be decoded.
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Status { code, message } => write!(f, "server responded {code}: {message}"),
            Self::UnexpectedShape(what) => write!(f, "unexpected response shape: {what}"),
            Self::Decode(msg) => write!(f, "could not decode response: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Extract the record array from a payload.
///
/// Accepts a bare array, `{"data": [...]}`, or `{"data": null}` (empty).
pub fn parse_envelope(payload: Value) -> Result<Vec<Value>, FetchError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(FetchError::UnexpectedShape(format!(
                "`data` is {}",
                json_kind(&other)
            ))),
            None => Err(FetchError::UnexpectedShape(
                "object without `data` array".to_string(),
            )),
        },
        other => Err(FetchError::UnexpectedShape(json_kind(&other).to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Load state
// ---------------------------------------------------------------------------

/// Where a field's option set is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Nothing loaded for the current dependency.
    #[default]
    Unloaded,
    /// A request for the current dependency is in flight.
    Loading,
    /// Options for `cache_key` are present.
    Loaded,
    /// The last request for the current dependency failed.
    Error(FetchError),
}

/// Load status plus the key the status refers to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadState {
    /// Lifecycle status.
    pub status: LoadStatus,
    /// Dependency the loaded (or loading) set belongs to.
    pub cache_key: Option<CacheKey>,
}

impl LoadState {
    /// Whether options are present.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    /// Whether a request is pending.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// The stored failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            LoadStatus::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// What happened when a response was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Options replaced; `count` options after normalization.
    Loaded { count: usize },
    /// The fetch failed; status is now `Error`.
    Failed(FetchError),
    /// The response was for an outdated request or dependency and was dropped.
    Stale,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: RequestId,
    key: Option<CacheKey>,
}

// ---------------------------------------------------------------------------
// DataSource
// ---------------------------------------------------------------------------

/// Where a field's options come from.
#[derive(Debug, Clone)]
pub enum OptionSource {
    /// Fixed list, available immediately.
    Static(Vec<SelectOption>),
    /// Fetched on demand and normalized.
    Remote {
        /// Record projection for this endpoint.
        normalizer: Normalizer,
        /// Parameters passed through to every request.
        params: Map<String, Value>,
    },
}

impl OptionSource {
    /// Remote source with no extra parameters.
    #[must_use]
    pub fn remote(normalizer: Normalizer) -> Self {
        Self::Remote {
            normalizer,
            params: Map::new(),
        }
    }
}

/// Owns a field's option set and its loading lifecycle.
#[derive(Debug, Clone)]
pub struct DataSource {
    source: OptionSource,
    options: Vec<SelectOption>,
    state: LoadState,
    dependency: Option<CacheKey>,
    in_flight: Option<InFlight>,
    next_request: u64,
    /// Bumped whenever `options` changes.
    generation: u64,
}

impl DataSource {
    /// Create a data source. Static options are normalized and loaded at once.
    #[must_use]
    pub fn new(source: OptionSource) -> Self {
        let (options, status) = match &source {
            OptionSource::Static(opts) => (crate::option::normalize(opts), LoadStatus::Loaded),
            OptionSource::Remote { .. } => (Vec::new(), LoadStatus::Unloaded),
        };
        Self {
            source,
            options,
            state: LoadState {
                status,
                cache_key: None,
            },
            dependency: None,
            in_flight: None,
            next_request: 0,
            generation: 0,
        }
    }

    /// Whether options are fetched remotely.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self.source, OptionSource::Remote { .. })
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Current dependency key.
    #[must_use]
    pub fn dependency(&self) -> Option<&CacheKey> {
        self.dependency.as_ref()
    }

    /// Counter bumped on every option-set change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a request is currently outstanding (for any key).
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether opening the field should fetch.
    #[must_use]
    pub fn needs_load(&self) -> bool {
        if !self.is_remote() {
            return false;
        }
        !(self.state.is_loaded() && self.state.cache_key == self.dependency)
    }

    /// Replace a static option list. No-op for remote sources.
    pub fn set_static_options(&mut self, options: Vec<SelectOption>) {
        if let OptionSource::Static(stored) = &mut self.source {
            self.options = crate::option::normalize(&options);
            *stored = options;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Record a new dependency value.
    ///
    /// Returns `true` if it differed from the previous one, in which case
    /// the cached options are dropped and the status reverts to `Unloaded`.
    /// An in-flight request for the old value is left to complete and will
    /// be discarded as stale.
    pub fn set_dependency(&mut self, key: Option<CacheKey>) -> bool {
        if self.dependency == key {
            return false;
        }
        self.dependency = key;
        if self.is_remote() {
            self.state = LoadState::default();
            if !self.options.is_empty() {
                self.options.clear();
                self.generation = self.generation.wrapping_add(1);
            }
        }
        true
    }

    /// Issue a request if one is needed and none is pending for the current key.
    pub fn begin_load(&mut self, field: &str) -> Option<FetchRequest> {
        if !self.needs_load() {
            return None;
        }
        if let Some(pending) = &self.in_flight
            && pending.key == self.dependency
        {
            // Same key still pending: show the spinner, do not re-issue.
            self.state.status = LoadStatus::Loading;
            self.state.cache_key = self.dependency.clone();
            return None;
        }
        let OptionSource::Remote { params, .. } = &self.source else {
            return None;
        };

        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.in_flight = Some(InFlight {
            id,
            key: self.dependency.clone(),
        });
        self.state = LoadState {
            status: LoadStatus::Loading,
            cache_key: self.dependency.clone(),
        };
        rozklad_core::debug!(
            field,
            request = id.0,
            key = ?self.dependency.as_ref().map(ToString::to_string),
            "issuing option fetch"
        );
        Some(FetchRequest {
            id,
            field: field.to_string(),
            dependency: self.dependency.clone(),
            params: params.clone(),
        })
    }

    /// Apply a fetch response, honoring the stale-response guard.
    pub fn complete(&mut self, response: FetchResponse) -> LoadOutcome {
        let field = response.field.as_str();
        let Some(pending) = self.in_flight.as_ref().filter(|p| p.id == response.request) else {
            rozklad_core::debug!(
                field,
                request = response.request.0,
                "discarding response to superseded request"
            );
            return LoadOutcome::Stale;
        };
        let pending_key = pending.key.clone();
        self.in_flight = None;

        if pending_key != self.dependency || response.dependency != self.dependency {
            rozklad_core::debug!(
                field,
                request = response.request.0,
                response_key = ?response.dependency.as_ref().map(ToString::to_string),
                current_key = ?self.dependency.as_ref().map(ToString::to_string),
                "discarding stale option response"
            );
            return LoadOutcome::Stale;
        }

        let OptionSource::Remote { normalizer, .. } = &self.source else {
            return LoadOutcome::Stale;
        };

        match response.result.and_then(parse_envelope) {
            Ok(records) => {
                self.options = normalizer.normalize_records(&records);
                self.generation = self.generation.wrapping_add(1);
                self.state = LoadState {
                    status: LoadStatus::Loaded,
                    cache_key: self.dependency.clone(),
                };
                LoadOutcome::Loaded {
                    count: self.options.len(),
                }
            }
            Err(err) => {
                rozklad_core::warn!(field, error = %err, "option fetch failed");
                self.state = LoadState {
                    status: LoadStatus::Error(err.clone()),
                    cache_key: self.dependency.clone(),
                };
                LoadOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::FieldMap;
    use serde_json::json;

    fn remote() -> DataSource {
        DataSource::new(OptionSource::remote(Normalizer::new(FieldMap::new(
            "id", "name",
        ))))
    }

    fn groups_payload() -> Value {
        json!([{"id": 1, "name": "KN-21"}, {"id": 2, "name": "KN-22"}])
    }

    #[test]
    fn static_source_is_loaded_immediately() {
        let src = DataSource::new(OptionSource::Static(vec![SelectOption::new(1, "a")]));
        assert!(src.state().is_loaded());
        assert!(!src.needs_load());
        assert_eq!(src.options().len(), 1);
    }

    #[test]
    fn static_options_can_be_replaced() {
        let mut src = DataSource::new(OptionSource::Static(vec![]));
        let gen0 = src.generation();
        src.set_static_options(vec![SelectOption::new(1, "a"), SelectOption::new("1", "b")]);
        assert_eq!(src.options().len(), 1);
        assert_ne!(src.generation(), gen0);
    }

    #[test]
    fn remote_starts_unloaded_and_issues_one_request() {
        let mut src = remote();
        assert_eq!(src.state().status, LoadStatus::Unloaded);
        let req = src.begin_load("group").expect("first load issues a request");
        assert_eq!(req.field, "group");
        assert!(src.state().is_loading());
        assert!(src.begin_load("group").is_none());
        assert!(src.begin_load("group").is_none());
    }

    #[test]
    fn response_loads_options() {
        let mut src = remote();
        let req = src.begin_load("group").unwrap();
        let outcome = src.complete(req.respond(Ok(groups_payload())));
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        assert!(src.state().is_loaded());
        assert!(!src.needs_load());
        assert!(!src.has_in_flight());
    }

    #[test]
    fn data_envelope_is_accepted() {
        let mut src = remote();
        let req = src.begin_load("group").unwrap();
        let outcome = src.complete(req.respond(Ok(json!({"data": groups_payload()}))));
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
    }

    #[test]
    fn empty_result_is_loaded_not_error() {
        let mut src = remote();
        let req = src.begin_load("group").unwrap();
        assert_eq!(
            src.complete(req.respond(Ok(json!([])))),
            LoadOutcome::Loaded { count: 0 }
        );
        assert!(src.state().is_loaded());
    }

    #[test]
    fn loaded_key_hit_does_not_refetch() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let req = src.begin_load("subject").unwrap();
        src.complete(req.respond(Ok(groups_payload())));
        assert!(src.begin_load("subject").is_none());
    }

    #[test]
    fn dependency_change_invalidates_loaded_set() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let req = src.begin_load("subject").unwrap();
        src.complete(req.respond(Ok(groups_payload())));

        assert!(src.set_dependency(Some(CacheKey::new("g2"))));
        assert_eq!(src.state().status, LoadStatus::Unloaded);
        assert!(src.options().is_empty());
        assert!(src.needs_load());
        assert!(!src.set_dependency(Some(CacheKey::new("g2"))));
    }

    #[test]
    fn stale_response_does_not_clobber_new_dependency() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let old = src.begin_load("subject").unwrap();

        src.set_dependency(Some(CacheKey::new("g2")));
        let new = src.begin_load("subject").expect("new key issues its own request");
        assert_ne!(old.id, new.id);

        let fresh = json!([{"id": 9, "name": "Algebra"}]);
        assert_eq!(
            src.complete(new.respond(Ok(fresh))),
            LoadOutcome::Loaded { count: 1 }
        );

        let outcome = src.complete(old.respond(Ok(groups_payload())));
        assert_eq!(outcome, LoadOutcome::Stale);
        assert_eq!(src.options().len(), 1);
        assert_eq!(src.options()[0].label, "Algebra");
        assert_eq!(src.state().cache_key, Some(CacheKey::new("g2")));
    }

    #[test]
    fn stale_response_arriving_first_is_discarded() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let old = src.begin_load("subject").unwrap();
        src.set_dependency(Some(CacheKey::new("g2")));

        assert_eq!(src.complete(old.respond(Ok(groups_payload()))), LoadOutcome::Stale);
        assert_eq!(src.state().status, LoadStatus::Unloaded);
        assert!(src.options().is_empty());
        // Old request resolved, so the next open may fetch for g2.
        assert!(src.begin_load("subject").is_some());
    }

    #[test]
    fn returning_to_pending_key_does_not_duplicate() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let req = src.begin_load("subject").unwrap();
        src.set_dependency(Some(CacheKey::new("g2")));
        src.set_dependency(Some(CacheKey::new("g1")));
        assert!(src.begin_load("subject").is_none());
        assert!(src.state().is_loading());
        assert_eq!(
            src.complete(req.respond(Ok(groups_payload()))),
            LoadOutcome::Loaded { count: 2 }
        );
    }

    #[test]
    fn failure_sets_error_and_allows_retry() {
        let mut src = remote();
        let req = src.begin_load("room").unwrap();
        let err = FetchError::Status {
            code: 503,
            message: "unavailable".into(),
        };
        assert_eq!(
            src.complete(req.respond(Err(err.clone()))),
            LoadOutcome::Failed(err.clone())
        );
        assert_eq!(src.state().error(), Some(&err));
        assert!(src.needs_load());
        assert!(src.begin_load("room").is_some());
    }

    #[test]
    fn unexpected_shape_is_an_error() {
        let mut src = remote();
        let req = src.begin_load("room").unwrap();
        let outcome = src.complete(req.respond(Ok(json!({"rooms": []}))));
        assert!(matches!(
            outcome,
            LoadOutcome::Failed(FetchError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn unknown_request_id_is_stale() {
        let mut src = remote();
        let req = src.begin_load("room").unwrap();
        let mut bogus = req.respond(Ok(groups_payload()));
        bogus.request = RequestId(999);
        assert_eq!(src.complete(bogus), LoadOutcome::Stale);
        assert!(src.state().is_loading());
    }

    #[test]
    fn envelope_shapes() {
        assert_eq!(parse_envelope(json!([1])).unwrap(), vec![json!(1)]);
        assert_eq!(parse_envelope(json!({"data": [2]})).unwrap(), vec![json!(2)]);
        assert!(parse_envelope(json!({"data": null})).unwrap().is_empty());
        assert!(parse_envelope(json!("nope")).is_err());
        assert!(parse_envelope(json!({"data": {"x": 1}})).is_err());
    }

    #[test]
    fn compound_keys_do_not_collide() {
        assert_ne!(
            CacheKey::compound(["1", "12"]),
            CacheKey::compound(["11", "2"])
        );
        assert_eq!(CacheKey::compound(["7", "3"]).to_string(), "7_3");
    }

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |req: &FetchRequest| -> Result<Value, FetchError> {
            Ok(json!([{"id": req.id.0, "name": "x"}]))
        };
        let mut src = remote();
        let req = src.begin_load("f").unwrap();
        let payload = fetcher.fetch(&req).unwrap();
        assert_eq!(payload[0]["id"], json!(1));
    }

    #[tracing_test::traced_test]
    #[test]
    fn failure_is_logged_as_warning() {
        let mut src = remote();
        let req = src.begin_load("teacher").unwrap();
        src.complete(req.respond(Err(FetchError::Network("connection reset".into()))));
        assert!(logs_contain("option fetch failed"));
        assert!(logs_contain("connection reset"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn stale_discard_is_logged() {
        let mut src = remote();
        src.set_dependency(Some(CacheKey::new("g1")));
        let old = src.begin_load("subject").unwrap();
        src.set_dependency(Some(CacheKey::new("g2")));
        src.complete(old.respond(Ok(groups_payload())));
        assert!(logs_contain("discarding stale option response"));
    }
}
