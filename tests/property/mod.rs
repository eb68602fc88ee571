//! Property-based tests for barrier, reconciliation and snapshot guarantees

mod completeness;
