//! Pipeline components: identifier helpers, storage access, the conversion
//! client and the orchestrator composing them.

pub mod converter;
pub mod fetcher;
pub mod identifier;
pub mod pipeline;
pub mod storage;
pub mod writer;

#[cfg(test)]
pub mod test_support;
