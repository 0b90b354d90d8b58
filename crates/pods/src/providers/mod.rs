//! Pod provider implementations.
//!
//! This module contains the [`PodProvider`] trait and the RunPod
//! implementation.

pub mod runpod;
pub mod traits;

pub use traits::{
    CreatePodRequest, HaltOutcome, Pod, PodProvider, PodProviderError, PodStatus, PodVolume,
    ServiceUrls,
};
