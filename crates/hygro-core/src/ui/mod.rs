//! Display side of hygro: the label capability, a retained label screen
//! implementing it, and the dashboard that writes readings into labels.

pub mod dashboard;
pub mod labels;
pub mod screen;
pub mod styling;

pub use dashboard::{Dashboard, DisplayLabelHandles};
pub use labels::{Anchor, DisplayError, LabelSurface};
pub use screen::{LabelId, LabelScreen, SharedScreen};
pub use styling::{LabelStyle, Padding};

/// The ST7789 panel is 240x240.
pub const DISPLAY_WIDTH_PX: u16 = 240;
pub const DISPLAY_HEIGHT_PX: u16 = 240;

/// Number of labels on the dashboard screen.
pub const DASHBOARD_LABELS: usize = 4;
