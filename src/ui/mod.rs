pub mod controls;
pub mod popup;

pub use controls::{ControlBinder, ControlConfig};
pub use popup::{PopupBinder, PopupBinding, PopupConfig};
