//! # Commodore Support Chips
//!
//! Concrete chips built on the `lib8bit` engine, and a C64-style machine
//! assembled from them.
//!
//! - [`cia`] - MOS 6526 CIA: two timers, time-of-day clock, serial port
//! - [`via`] - MOS 6522 VIA: two timers, shift register, control lines
//! - [`ted`] - TED timer and raster interrupt block
//! - [`vic`] - VIC-II raster counter and raster interrupt
//! - [`io_port`] - The 6510's on-chip port, driving bank switching
//! - [`c64`] - Memory layout and machine assembly
//! - [`region`] - PAL/NTSC timing
//!
//! ## Quick Start
//!
//! ```rust
//! use commodore::{c64, Region};
//!
//! let roms = c64::Roms::blank();
//! let mut machine = c64::build(Region::Pal, &roms).unwrap();
//! machine.initialize().unwrap();
//! assert_eq!(machine.cpu().program_counter(), 0x0000);
//! ```

pub mod c64;
pub mod cia;
pub mod io_port;
pub mod port;
pub mod region;
pub mod ted;
pub mod via;
pub mod vic;

pub use c64::{C64Error, Roms};
pub use cia::Cia;
pub use io_port::IoPort6510;
pub use port::Port;
pub use region::Region;
pub use ted::Ted;
pub use via::Via;
pub use vic::Vic;
