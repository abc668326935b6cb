//! Blob store backend implementations.

pub mod db;
pub mod local;
pub mod s3;
