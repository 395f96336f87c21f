//! Endpoint table and weighted selection
//!
//! Provides the validated, immutable endpoint table and the weighted random
//! picker that chooses one endpoint per iteration.

pub mod picker;
pub mod random;
pub mod table;

pub use picker::WeightedEndpointPicker;
pub use random::{FixedSequence, RandomSource};
pub use table::{Endpoint, EndpointTable};
