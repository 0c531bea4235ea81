//! Typed resource models and their collections
//!
//! A model holds the local view of one remote resource and talks to its
//! provider only through a service trait object. Wire attributes are mapped
//! to typed fields through a per-resource [`attributes::AttributeTable`].

pub mod attributes;
pub mod disk;
pub mod volume;

pub use disk::{Disk, DiskPatch, Disks};
pub use volume::{Volume, VolumePatch, Volumes};
