//! Cluster provisioning CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the vSphere cluster
//! provisioning controllers.

pub mod cluster;
pub mod machine;

pub use cluster::*;
pub use machine::*;
