/// Load-shape analysis for building interval data.
///
/// Submodules:
/// - `intervals` - break indices, cadence, and day/week grids
/// - `stats`     - per-period mean / std / percentile summaries of a grid
/// - `alignment` - date merge-join used to line weather up with meter days
/// - `building`  - the per-building bundle of all of the above
///
/// Future additions: regression against temperature.

pub mod alignment;
pub mod building;
pub mod intervals;
pub mod stats;
