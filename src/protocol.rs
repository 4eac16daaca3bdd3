use strum_macros::{Display, EnumIter, EnumString};

/// Korg manufacturer ID, carried at offset 1 of every Wavestation message.
pub const KORG_ID: u8 = 0x42;
/// Wavestation model ID, carried at offset 3 of bank traffic.
pub const WAVESTATION_MODEL_ID: u8 = 0x28;

/// Command family shared by global, program, and parameter messages.
pub(crate) const COMMAND_FAMILY: u8 = 0x3E;
/// Channel nibble base used by the bank-dump encoding (`0x30 | device`).
pub(crate) const BANK_CHANNEL_BASE: u8 = 0x30;
pub(crate) const GLOBAL_DUMP_REQUEST: u8 = 0x00;
pub(crate) const PROGRAM_DUMP_REQUEST: u8 = 0x01;
pub(crate) const PARAMETER_CHANGE: u8 = 0x10;
pub(crate) const BANK_REQUEST_DATA: u8 = 0x10;
pub(crate) const BANK_DUMP: u8 = 0x01;

/// Mask applied to every data byte placed inside a SysEx body.
pub(crate) const SEVEN_BIT_MASK: u8 = 0x7F;

/// 7-bit SysEx device address of the target unit.
///
/// Construction masks the raw value, so the high bit is never set.
///
/// ```
/// use wsx::DeviceId;
///
/// assert_eq!(0x30, DeviceId::new(0x30).value());
/// assert_eq!(0x7F, DeviceId::new(0xFF).value());
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Display)]
#[display("0x{_0:02X}")]
pub struct DeviceId(u8);

impl DeviceId {
    /// Global channel 1, the address most Wavestation units answer on.
    pub const GLOBAL: Self = Self(0x30);

    /// Creates a device ID, masking `raw` to 7 bits.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw & SEVEN_BIT_MASK)
    }

    /// Returns the masked 7-bit address.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::GLOBAL
    }
}

impl From<u8> for DeviceId {
    fn from(raw: u8) -> Self {
        Self::new(raw)
    }
}

/// Bank addressed by a bank-dump request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BankId {
    /// Internal RAM bank 1.
    Ram1,
    /// Internal RAM bank 2.
    Ram2,
    /// Factory ROM bank 1.
    Rom1,
    /// Factory ROM bank 2.
    Rom2,
}

impl BankId {
    /// Returns the bank byte sent on the wire (`0..=3`).
    ///
    /// ```
    /// use wsx::BankId;
    ///
    /// assert_eq!(0, BankId::Ram1.as_raw());
    /// assert_eq!(3, BankId::Rom2.as_raw());
    /// ```
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        match self {
            Self::Ram1 => 0,
            Self::Ram2 => 1,
            Self::Rom1 => 2,
            Self::Rom2 => 3,
        }
    }
}

/// Dump the host can ask the unit to transmit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DumpRequest {
    /// Global settings dump.
    Global,
    /// Single program dump; the number is masked to 7 bits on the wire.
    Program(u8),
    /// Full 128-program bank dump.
    Bank(BankId),
}

impl std::fmt::Display for DumpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global dump"),
            Self::Program(program) => write!(f, "program {program} dump"),
            Self::Bank(bank) => write!(f, "bank {bank} dump"),
        }
    }
}
