//! An 8-bit parallel port with a data direction register.

/// Output latch, direction register and the levels driven from outside.
///
/// Output bits (direction 1) read back the latch; input bits read the external
/// level. Unconnected inputs are pulled up.
///
/// # Examples
///
/// ```
/// use commodore::Port;
///
/// let mut port = Port::new();
/// port.set_direction(0x0F);
/// port.set_output(0x05);
/// port.set_external(0xA0);
/// assert_eq!(port.value(), 0xA5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    output: u8,
    direction: u8,
    external: u8,
}

impl Port {
    /// All lines input, pulled up.
    pub fn new() -> Self {
        Self {
            output: 0x00,
            direction: 0x00,
            external: 0xFF,
        }
    }

    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn set_output(&mut self, value: u8) {
        self.output = value;
    }

    pub fn direction(&self) -> u8 {
        self.direction
    }

    pub fn set_direction(&mut self, value: u8) {
        self.direction = value;
    }

    pub fn external(&self) -> u8 {
        self.external
    }

    /// Levels driven by whatever is connected to the port.
    pub fn set_external(&mut self, value: u8) {
        self.external = value;
    }

    /// What the pins read.
    #[inline]
    pub fn value(&self) -> u8 {
        (self.output & self.direction) | (self.external & !self.direction)
    }
}

impl Default for Port {
    fn default() -> Self {
        Self::new()
    }
}
