//! 批量解析模块：将 N 个逐项请求合并为一次调用，命中缓存的项直接返回。
//!
//! # Batch Resolution Module
//!
//! A request to `{batch_prefix}/{resource}` with `data: {ids: [...]}` is
//! resolved item by item against `/{resource}/{id}`:
//!
//! 1. each id is looked up in the cache (unless the call skips it);
//! 2. if every id was a hit, the result map is returned as `OK (Cached)`;
//! 3. otherwise all misses are fetched concurrently, successes are cached
//!    and merged, failures are simply left out of the map.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchCoordinator`] | Cache-aware resolution of one batch request |
//! | [`BatchExecutor`] | Fan-out join that keeps every item's outcome |
//! | [`BatchResult`] | Per-index successes and failures |
//!
//! The result map is keyed by id; its order carries no meaning.

mod coordinator;
mod executor;

pub use coordinator::BatchCoordinator;
pub use executor::{BatchError, BatchExecutor, BatchResult};
