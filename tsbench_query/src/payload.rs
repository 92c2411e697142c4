use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The backend specific part of a [`Query`][crate::Query]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    #[default]
    Empty,
    Sql(SqlQuery),
    SiriDb(SiriDbQuery),
}

impl Payload {
    pub(crate) fn reset(&mut self) {
        match self {
            Self::Empty => (),
            Self::Sql(sql) => {
                sql.hypertable.clear();
                sql.sql.clear();
            }
            Self::SiriDb(siri) => siri.query.clear(),
        }
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Sql(sql) => write!(f, "Hypertable: {}\nQuery: {}", sql.hypertable, sql.sql),
            Self::SiriDb(siri) => write!(f, "query: {}", siri.query),
        }
    }
}

/// A SQL statement against a single (hyper)table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub hypertable: String,
    pub sql: String,
}

/// A query in the SiriDB query language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiriDbQuery {
    pub query: String,
}
