// Scene model
pub mod color;
pub mod param;
pub mod binding;
pub mod material;
pub mod lighting;
pub mod camera;
pub mod scene_graph;
pub mod particle;

// Per-frame updates and procedural geometry
pub mod animation;
pub mod curve;

// Assets, panel and scripting
pub mod asset;
pub mod panel;
pub mod script_log;
pub mod scripting;

// Pages
pub mod page;
pub mod pages;
pub mod registry;

pub mod config;
pub mod cli;
