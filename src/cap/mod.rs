//! Pledge-Based Capability System
//!
//! Every process carries a set of promises describing which classes of
//! privileged operation it may still perform.
//!
//! # Design
//! - Promises form a closed enumeration (`Promise`)
//! - Each process owns a `Pledge` holding its current `PledgeMask`
//! - Handlers consult the pledge before doing any work
//!
//! # Security Properties
//! - Promises can only be dropped, never regained
//! - A missing promise fails the call before any side effect

pub mod pledge;

pub use pledge::{Pledge, PledgeMask, Promise};
