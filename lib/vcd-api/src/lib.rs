//! vCloud Director resource shapes and their decoders
//!
//! This library provides:
//! - A small XML element tree for the API's resource envelopes
//! - Typed decoders for VDC records, provider VDC records, compute capacity
//!   and storage profiles, each with explicit per-field defaults

pub mod xml;
pub mod vdc;
pub mod cluster;
pub mod storage_profile;

pub use xml::{Element, XmlError};
pub use vdc::VdcRecord;
pub use cluster::{ClusterRef, ClusterStorage, ComputeCapacity, ProviderVdcRecord};
pub use storage_profile::{StorageProfile, StorageProfileRef, StorageProfileStats};
