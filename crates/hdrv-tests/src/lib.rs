//! Integration tests for the hdrv crates.
//!
//! End-to-end checks that tables, transforms, packing and the container
//! work together.
