//! Data models for product resolution

pub mod product;
pub mod recall;

pub use product::{
    CacheEntry, Certification, PackagingRecycling, PalmOilStatus, ProductRecord, ScoreBreakdown,
};
pub use recall::RecallEntry;
