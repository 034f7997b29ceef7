//! Domain descriptors and the closed request set
//!
//! Every domain module (families, tasks, ...) implements [`Domain`] once and
//! gets a [`Request`]/[`Response`] pair whose variants are checked at compile
//! time, instead of dispatching on method names at runtime.

use crate::types::OperationKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Display};

/// Type family for one domain module
///
/// Implemented on a zero-sized marker type.
pub trait Domain: Debug + Clone + Send + Sync + 'static {
    /// Domain identifier used in cutover keys and diff records
    const NAME: &'static str;

    /// Record identifier
    type Id: Clone + Debug + Display + Send + Sync + 'static;

    /// Stored record
    type Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Input for create
    type Draft: Clone + Debug + Send + Sync + 'static;

    /// Input for update
    type Patch: Clone + Debug + Send + Sync + 'static;

    /// Input for list
    type Query: Clone + Debug + Default + Send + Sync + 'static;
}

/// A logical operation with its arguments
#[derive(Debug, Clone)]
pub enum Request<D: Domain> {
    Create(D::Draft),
    Read(D::Id),
    Update(D::Id, D::Patch),
    Delete(D::Id),
    List(D::Query),
}

impl<D: Domain> Request<D> {
    /// Kind of this request
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create(_) => OperationKind::Create,
            Self::Read(_) => OperationKind::Read,
            Self::Update(..) => OperationKind::Update,
            Self::Delete(_) => OperationKind::Delete,
            Self::List(_) => OperationKind::List,
        }
    }
}

/// Result of a [`Request`], variant for variant
#[derive(Debug, Clone)]
pub enum Response<D: Domain> {
    Created(D::Record),
    Read(Option<D::Record>),
    Updated(D::Record),
    Deleted,
    Listed(Vec<D::Record>),
}

impl<D: Domain> Response<D> {
    /// Kind of the request this answers
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Created(_) => OperationKind::Create,
            Self::Read(_) => OperationKind::Read,
            Self::Updated(_) => OperationKind::Update,
            Self::Deleted => OperationKind::Delete,
            Self::Listed(_) => OperationKind::List,
        }
    }

    /// JSON view used for structural comparison
    ///
    /// A missing read is `null`; delete is always `null`.
    ///
    /// # Errors
    /// Returns the serializer error if a record cannot be represented as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Created(r) | Self::Updated(r) => serde_json::to_value(r),
            Self::Read(r) => serde_json::to_value(r),
            Self::Deleted => Ok(serde_json::Value::Null),
            Self::Listed(rs) => serde_json::to_value(rs),
        }
    }
}
