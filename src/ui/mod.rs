#[cfg(feature = "egui")]
mod egui_integration;

#[cfg(feature = "egui")]
mod parameters_window;

#[cfg(feature = "egui")]
pub use egui_integration::{EguiContext, EguiRenderTarget};

#[cfg(feature = "egui")]
pub use parameters_window::ParametersWindow;

#[cfg(feature = "egui")]
pub use egui;
