// Copyright @yucwang 2026

pub mod bridge;
pub mod heatmap;
pub mod path_data;
pub mod registry;
