#![forbid(unsafe_code)]

//! Host-side collaborators for the tspin engine.
//!
//! Nothing here reaches into engine internals. [`renderer`] reacts to setting
//! observers; [`controller`] translates input into public engine calls.

pub mod controller;
pub mod renderer;

pub use controller::{MOUSEWHEEL_KEY, SpinButton, SpinController, SpinInput, SpinKey};
pub use renderer::{Renderer, RendererBinding, TextRenderer, Theme, bind_renderer};
