//! Terminal dashboard subsystem.
//!
//! # Data Flow
//! ```text
//! every refresh interval:
//!     Ledger::snapshot()
//!     → layout.rs (pure: snapshot + size + clock → fixed-width lines)
//!     → terminal.rs (crossterm: cursor moves, colors, flush)
//! on shutdown:
//!     → terminal.rs restore (cursor visible, alternate screen left)
//! ```

pub mod layout;
pub mod renderer;
pub mod terminal;

pub use layout::{build_frame, Dimensions, FrameSettings, Line, LineStyle};
pub use renderer::{Renderer, SnapshotSource};
pub use terminal::{Screen, Terminal};
