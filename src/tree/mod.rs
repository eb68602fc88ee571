//! Tree hashing engine
//!
//! Walks a directory tree concurrently and produces a content digest for every
//! regular file in it.

pub mod barrier;
pub mod hasher;
pub mod path;
pub mod walker;
