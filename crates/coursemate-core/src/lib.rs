//! # coursemate core
//!
//! Runtime-agnostic building blocks for coursemate: course data models,
//! the [`VectorIndex`](index::VectorIndex) contract and its in-memory
//! backend, the embedding trait, sentence chunking, and course document
//! parsing.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. The application
//! crate supplies embedding and generation clients and drives retrieval
//! through the traits defined here.

pub mod chunk;
pub mod document;
pub mod embedding;
pub mod index;
pub mod models;
