//! Ripple chart rendering: terminal preview (`ascii`) and animated GIF (`animate`).

pub mod animate;
pub mod ascii;

pub use animate::render_ripple_gif;
pub use ascii::render_ripple_plot;
