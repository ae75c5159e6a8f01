//! CLI command implementations.

pub(crate) mod merge;

pub(crate) use merge::MergeArgs;
