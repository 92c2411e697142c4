//! The benchmark query model shared by the query generators and the benchmark runner.
//!
//! A [`Query`] carries the fields every part of the benchmark needs to know about (an ID assigned
//! at scan time, a human readable label used to group latency statistics, and a description used
//! for debugging) plus a backend specific [`Payload`] that is opaque to everything except the
//! generator that fills it and the processor that executes it.
//!
//! Queries travel between the generator and the runner as a framed binary stream, see the
//! [`stream`] module.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

mod payload;
pub mod stream;

pub use payload::{Payload, SiriDbQuery, SqlQuery};

/// A single benchmark query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    id: u64,
    human_label: String,
    human_description: String,
    /// Entity the query is about, used to pin queries to a worker in hash-worker mode
    affinity_key: Option<String>,
    payload: Payload,
}

impl Query {
    /// Create an empty [`Query`] holding the given payload variant
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    /// The label latency statistics for this query are grouped under
    pub fn human_label(&self) -> &str {
        &self.human_label
    }

    pub fn set_human_label(&mut self, label: impl Into<String>) {
        self.human_label = label.into();
    }

    pub fn human_description(&self) -> &str {
        &self.human_description
    }

    pub fn set_human_description(&mut self, description: impl Into<String>) {
        self.human_description = description.into();
    }

    pub fn affinity_key(&self) -> Option<&str> {
        self.affinity_key.as_deref()
    }

    pub fn set_affinity_key(&mut self, key: Option<String>) {
        self.affinity_key = key;
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Clear every field so the query can be filled again.
    ///
    /// The payload keeps its variant, but all of its contents are cleared.
    pub fn reset(&mut self) {
        self.id = 0;
        self.human_label.clear();
        self.human_description.clear();
        self.affinity_key = None;
        self.payload.reset();
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "HumanLabel: {}", self.human_label)?;
        writeln!(f, "HumanDescription: {}", self.human_description)?;
        write!(f, "{}", self.payload)
    }
}
