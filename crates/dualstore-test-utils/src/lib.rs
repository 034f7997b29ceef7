//! Testing utilities for the dualstore workspace
//!
//! Scripted backends, a schemaless test domain, and record fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use dualstore_core::{AdapterError, Backend, Domain, OperationKind, Response, StoreAdapter};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Schemaless domain: records, drafts and patches are plain JSON
#[derive(Debug, Clone, Copy)]
pub struct JsonDomain;

impl Domain for JsonDomain {
    const NAME: &'static str = "json";

    type Id = String;
    type Record = Value;
    type Draft = Value;
    type Patch = Value;
    type Query = ();
}

/// What a scripted adapter answers for one call
pub type Reply<D> = Result<Response<D>, AdapterError>;

/// Backend whose answers are set by the test
///
/// Queued replies are consumed first, then the standing reply for the kind.
/// An unscripted kind answers `AdapterError::Backend`.
#[derive(Debug)]
pub struct ScriptedAdapter<D: Domain> {
    backend: Backend,
    delay: Option<Duration>,
    standing: Mutex<HashMap<OperationKind, Reply<D>>>,
    queued: Mutex<HashMap<OperationKind, VecDeque<Reply<D>>>>,
    calls: DashMap<OperationKind, usize>,
}

impl<D: Domain> ScriptedAdapter<D> {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            delay: None,
            standing: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            calls: DashMap::new(),
        }
    }

    pub fn legacy() -> Self {
        Self::new(Backend::Legacy)
    }

    pub fn target() -> Self {
        Self::new(Backend::Target)
    }

    /// Sleep before every answer
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Standing reply for a kind (builder form)
    #[must_use]
    pub fn replying(self, kind: OperationKind, reply: Reply<D>) -> Self {
        self.set_reply(kind, reply);
        self
    }

    pub fn set_reply(&self, kind: OperationKind, reply: Reply<D>) {
        self.standing.lock().insert(kind, reply);
    }

    /// One-shot reply, consumed before the standing one
    pub fn push_reply(&self, kind: OperationKind, reply: Reply<D>) {
        self.queued.lock().entry(kind).or_default().push_back(reply);
    }

    pub fn calls(&self, kind: OperationKind) -> usize {
        self.calls.get(&kind).map_or(0, |n| *n)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|n| *n.value()).sum()
    }

    async fn respond(&self, kind: OperationKind) -> Reply<D> {
        *self.calls.entry(kind).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self.queued.lock().get_mut(&kind).and_then(VecDeque::pop_front);
        match queued {
            Some(reply) => reply,
            None => self.standing.lock().get(&kind).cloned().unwrap_or_else(|| {
                Err(AdapterError::Backend(format!(
                    "{} has no scripted reply for {kind}",
                    self.backend
                )))
            }),
        }
    }

    fn mismatch(&self, expected: OperationKind, got: &Response<D>) -> AdapterError {
        AdapterError::Backend(format!(
            "{} scripted a {} response for {expected}",
            self.backend,
            got.kind()
        ))
    }
}

#[async_trait]
impl<D: Domain> StoreAdapter<D> for ScriptedAdapter<D> {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn create(&self, _draft: D::Draft) -> Result<D::Record, AdapterError> {
        match self.respond(OperationKind::Create).await? {
            Response::Created(record) => Ok(record),
            other => Err(self.mismatch(OperationKind::Create, &other)),
        }
    }

    async fn read(&self, _id: &D::Id) -> Result<Option<D::Record>, AdapterError> {
        match self.respond(OperationKind::Read).await? {
            Response::Read(record) => Ok(record),
            other => Err(self.mismatch(OperationKind::Read, &other)),
        }
    }

    async fn update(&self, _id: &D::Id, _patch: D::Patch) -> Result<D::Record, AdapterError> {
        match self.respond(OperationKind::Update).await? {
            Response::Updated(record) => Ok(record),
            other => Err(self.mismatch(OperationKind::Update, &other)),
        }
    }

    async fn delete(&self, _id: &D::Id) -> Result<(), AdapterError> {
        match self.respond(OperationKind::Delete).await? {
            Response::Deleted => Ok(()),
            other => Err(self.mismatch(OperationKind::Delete, &other)),
        }
    }

    async fn list(&self, _query: &D::Query) -> Result<Vec<D::Record>, AdapterError> {
        match self.respond(OperationKind::List).await? {
            Response::Listed(records) => Ok(records),
            other => Err(self.mismatch(OperationKind::List, &other)),
        }
    }
}

/// Pair of scripted adapters with the same standing replies
pub fn scripted_pair<D: Domain>(kind: OperationKind, reply: &Reply<D>) -> (ScriptedAdapter<D>, ScriptedAdapter<D>) {
    (
        ScriptedAdapter::legacy().replying(kind, reply.clone()),
        ScriptedAdapter::target().replying(kind, reply.clone()),
    )
}

pub fn family_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "owner_id": "u-1",
        "member_count": 3,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z"
    })
}

pub fn task_record(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "family_id": "f-1",
        "title": "Take out the bins",
        "status": status,
        "assignee_id": "u-2",
        "due_date": null,
        "points": 5,
        "updated_at": "2024-01-02T00:00:00Z"
    })
}

/// Copy of `record` with `field` replaced
pub fn with_field(record: &Value, field: &str, value: Value) -> Value {
    let mut copy = record.clone();
    if let Some(object) = copy.as_object_mut() {
        object.insert(field.to_string(), value);
    }
    copy
}
