//! Storage domain - query interface over the relational store

mod queryable;

pub use queryable::{Queryable, Row, from_row};

#[cfg(test)]
pub use queryable::MockQueryable;
