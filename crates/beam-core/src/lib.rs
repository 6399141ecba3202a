//! Beam transport stages for plasma-accelerator interstages.
//!
//! - [`interstage`]: R56 compression and betatron phase rotation
//! - [`betatron`]: betatron motion with radiation reaction in a plasma stage
//! - [`stage`]: the `Stage` trait and beamline composition

pub mod betatron;
pub mod compression;
pub mod interstage;
pub mod logging;
pub mod stage;
