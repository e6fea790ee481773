//! Pose-resolution runtime for 2D skeletal animation rigs.
//!
//! Setup data ([`SkeletonData`]) is built by a loader and shared between any number of
//! [`Skeleton`] instances. Each frame an [`AnimationState`] applies its tracks to a skeleton,
//! then [`Skeleton::update_world_transform`] resolves bone world transforms and constraints.
//! [`SkeletonClipping`] masks renderable geometry with clipping attachments.
//!
//! This crate does not load files and does not render.

#![forbid(unsafe_code)]

mod attachment;
mod clipping;
mod curve;
mod error;
mod math;
mod model;
mod runtime;
mod skin;
mod timeline;

pub use attachment::*;
pub use clipping::*;
pub use curve::{BEZIER_SIZE, Curve, CurveFrames};
pub use error::*;
pub use math::{atan2_deg, cos_deg, signum, sin_deg, wrap_degrees};
pub use model::*;
pub use runtime::*;
pub use skin::*;
pub use timeline::*;

#[cfg(test)]
mod curve_tests;

#[cfg(test)]
mod clipping_tests;
