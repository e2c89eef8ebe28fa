//! Video standard timing.

/// PAL or NTSC timing.
///
/// # Examples
///
/// ```
/// use commodore::Region;
///
/// assert_eq!(Region::Pal.cycles_per_frame(), 312 * 63);
/// assert_eq!(Region::Ntsc.tod_tenth_cycles(), 102_272);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// 985,248 Hz, 50 Hz, 312 raster lines
    #[default]
    Pal,
    /// 1,022,727 Hz, 60 Hz, 263 raster lines
    Ntsc,
}

impl Region {
    /// CPU clock in Hz.
    pub fn clock_hz(self) -> u32 {
        match self {
            Region::Pal => 985_248,
            Region::Ntsc => 1_022_727,
        }
    }

    /// Raster lines per frame.
    pub fn raster_lines(self) -> u16 {
        match self {
            Region::Pal => 312,
            Region::Ntsc => 263,
        }
    }

    /// CPU cycles per raster line.
    pub fn cycles_per_line(self) -> u16 {
        match self {
            Region::Pal => 63,
            Region::Ntsc => 65,
        }
    }

    pub fn cycles_per_frame(self) -> u32 {
        self.raster_lines() as u32 * self.cycles_per_line() as u32
    }

    /// Frames per second.
    pub fn frame_rate(self) -> f64 {
        self.clock_hz() as f64 / self.cycles_per_frame() as f64
    }

    /// CPU cycles per tenth of a second, the TOD clock's tick.
    pub fn tod_tenth_cycles(self) -> u32 {
        self.clock_hz() / 10
    }
}
