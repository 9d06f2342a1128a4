pub mod address;
pub mod error;
pub mod lru;
pub mod simulation;
pub mod trace;

#[cfg(test)]
mod test_utils;

pub use address::{CacheGeometry, DecodedAddress};
pub use error::SimError;
pub use lru::{AccessOutcome, LruCache};
pub use simulation::{RunCounters, Step, TraceRunner};
pub use trace::{Operation, TraceEvent, TraceReader};

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(
    trace: &str,
    set_index_bits: u32,
    associativity: usize,
    block_offset_bits: u32,
) -> String {
    let geometry = match CacheGeometry::new(set_index_bits, associativity, block_offset_bits) {
        Ok(geometry) => geometry,
        Err(e) => return e.to_string(),
    };

    let mut result = vec![geometry.to_string()];
    let runner = TraceRunner::new(LruCache::new(geometry));
    match runner.run_with(TraceReader::new(trace.as_bytes()), |event, step| {
        if *step != Step::Skipped {
            result.push(format!("{event} {step}"));
        }
    }) {
        Ok(counters) => result.push(counters.to_string()),
        Err(e) => return e.to_string(),
    };

    result.join("\n")
}
