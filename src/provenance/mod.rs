//! Provenance: BLAKE3 fingerprints and the append-only run log.

pub mod eventlog;
pub mod hasher;
