//! Mathematical primitives for the wakefield interstage workspace.

pub mod ode;
pub mod transfer;
