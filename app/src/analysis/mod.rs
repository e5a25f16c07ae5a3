// ==============================================================================
// analysis/mod.rs - Sub-analyses run by the analysis engine
// ==============================================================================
// Description: Classification, pharmacogenomics, structural, quality and risk
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

pub mod classification;
pub mod pharmacogenomics;
pub mod quality;
pub mod risk;
pub mod structural;

pub use classification::Classification;
pub use pharmacogenomics::{PharmacogenomicKnowledgeBase, StaticPharmacogenomicKnowledgeBase, PHARMACOGENES};
