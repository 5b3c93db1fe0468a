pub mod app;
pub mod assets;
pub mod attachment;
pub mod camera3d;
pub mod cli;
pub mod config;
pub mod ecs;
pub mod effects;
pub mod events;
pub mod input;
pub mod picking;
pub mod popup;
pub mod renderer;
pub mod session;
pub mod time;
pub mod tween;

pub use app::{run, run_with_overrides, App};
