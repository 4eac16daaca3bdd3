use tracing::instrument;

use crate::protocol::{
    BANK_CHANNEL_BASE, BANK_DUMP, BANK_REQUEST_DATA, BankId, COMMAND_FAMILY, DeviceId,
    DumpRequest, GLOBAL_DUMP_REQUEST, KORG_ID, PARAMETER_CHANGE, PROGRAM_DUMP_REQUEST,
    SEVEN_BIT_MASK, WAVESTATION_MODEL_ID,
};

use super::{FrameCodec, SysexFrame};

/// Builds outbound Wavestation request frames for one device address.
///
/// Global, program, and parameter messages share the `3E` command family.
/// Bank requests use a separate encoding (`0x30 | device` plus the model ID),
/// and the two shapes are kept apart because the unit expects both.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MessageBuilder {
    device_id: DeviceId,
}

impl MessageBuilder {
    /// Creates a builder addressing `device_id`.
    #[must_use]
    pub const fn new(device_id: DeviceId) -> Self {
        Self { device_id }
    }

    /// Returns the addressed device.
    #[must_use]
    pub const fn device_id(self) -> DeviceId {
        self.device_id
    }

    /// `F0 42 <dev> 3E 00 F7`
    ///
    /// ```
    /// use wsx::{DeviceId, MessageBuilder};
    ///
    /// let frame = MessageBuilder::new(DeviceId::GLOBAL).global_dump_request();
    /// assert_eq!(&[0xF0, 0x42, 0x30, 0x3E, 0x00, 0xF7], frame.as_bytes());
    /// ```
    #[must_use]
    pub fn global_dump_request(self) -> SysexFrame {
        FrameCodec::wrap(&[
            KORG_ID,
            self.device_id.value(),
            COMMAND_FAMILY,
            GLOBAL_DUMP_REQUEST,
        ])
    }

    /// `F0 42 <dev> 3E 01 <program> F7`, with `program` masked to 7 bits.
    #[must_use]
    pub fn program_dump_request(self, program: u8) -> SysexFrame {
        FrameCodec::wrap(&[
            KORG_ID,
            self.device_id.value(),
            COMMAND_FAMILY,
            PROGRAM_DUMP_REQUEST,
            program & SEVEN_BIT_MASK,
        ])
    }

    /// `F0 42 <dev> 3E 10 <param> <value> F7`, both operands masked to 7 bits.
    ///
    /// Out-of-range operands lose their high bit rather than being rejected.
    #[must_use]
    pub fn parameter_change(self, param_id: u8, value: u8) -> SysexFrame {
        FrameCodec::wrap(&[
            KORG_ID,
            self.device_id.value(),
            COMMAND_FAMILY,
            PARAMETER_CHANGE,
            param_id & SEVEN_BIT_MASK,
            value & SEVEN_BIT_MASK,
        ])
    }

    /// `F0 42 <0x30|dev> 28 10 01 <bank> F7`
    ///
    /// ```
    /// use wsx::{BankId, DeviceId, MessageBuilder};
    ///
    /// let frame = MessageBuilder::new(DeviceId::new(0x01)).bank_dump_request(BankId::Rom1);
    /// assert_eq!(&[0xF0, 0x42, 0x31, 0x28, 0x10, 0x01, 0x02, 0xF7], frame.as_bytes());
    /// ```
    #[must_use]
    pub fn bank_dump_request(self, bank: BankId) -> SysexFrame {
        FrameCodec::wrap(&[
            KORG_ID,
            BANK_CHANNEL_BASE | self.device_id.value(),
            WAVESTATION_MODEL_ID,
            BANK_REQUEST_DATA,
            BANK_DUMP,
            bank.as_raw() & SEVEN_BIT_MASK,
        ])
    }

    /// Builds the request frame for any [`DumpRequest`].
    #[instrument(level = "trace", fields(device_id = %self.device_id))]
    #[must_use]
    pub fn dump_request(self, request: DumpRequest) -> SysexFrame {
        match request {
            DumpRequest::Global => self.global_dump_request(),
            DumpRequest::Program(program) => self.program_dump_request(program),
            DumpRequest::Bank(bank) => self.bank_dump_request(bank),
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(DeviceId::default())
    }
}
