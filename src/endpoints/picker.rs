//! Weighted random endpoint selection
//!
//! Each call consumes exactly one draw `u` in `[0, 1)`, scales it to
//! `r = u * total_weight`, and walks the table in order subtracting each
//! weight. The first entry that brings the remainder to `<= 0` wins, so
//! `[0, total_weight)` is partitioned into contiguous intervals sized by
//! weight and each endpoint is chosen with probability `weight / total_weight`.
//!
//! A draw landing exactly on a boundary selects the earlier entry.

use crate::endpoints::random::RandomSource;
use crate::endpoints::table::{Endpoint, EndpointTable};
use std::sync::Arc;

/// Selects one endpoint per call, proportionally to weight
///
/// Stateless apart from the shared read-only table; safe to share across
/// virtual users as long as each brings its own `RandomSource`.
#[derive(Debug, Clone)]
pub struct WeightedEndpointPicker {
    table: Arc<EndpointTable>,
}

impl WeightedEndpointPicker {
    pub fn new(table: Arc<EndpointTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EndpointTable {
        &self.table
    }

    /// Pick an endpoint using one draw from `rng`
    ///
    /// Never fails: the table is non-empty with positive weights by
    /// construction, and if rounding (or an out-of-contract draw of exactly
    /// `1.0`) leaves the remainder above zero after the walk, the last entry
    /// is returned.
    pub fn pick<R: RandomSource + ?Sized>(&self, rng: &mut R) -> &Endpoint {
        let total_weight = self.table.total_weight();
        let mut remainder = rng.next_unit() * total_weight;

        for (index, endpoint) in self.table.iter().enumerate() {
            remainder -= endpoint.weight();
            if remainder <= 0.0 {
                tracing::trace!(
                    endpoint = %endpoint.label(),
                    endpoint_index = index,
                    endpoint_weight = endpoint.weight(),
                    total_weight = total_weight,
                    "Selected endpoint via weighted random selection"
                );
                return endpoint;
            }
        }

        let last = self.table.last();
        tracing::debug!(
            endpoint = %last.label(),
            remainder = remainder,
            "Selected last endpoint as fallback (floating point edge case)"
        );
        last
    }
}
