//! Vehicle status messages (`0xA100`-`0xA102`): subscribing to and
//! receiving live vehicle telemetry, distinct from the nested
//! `VehicleStatusComponent` capability-advertisement group in
//! `identification`.

use bytes::Bytes;

use crate::{
    errors::{CsmError, Result},
    schema::{self, bool_param, find_one, i16_param, read_bool, read_i16, read_u16, u16_param},
};

/// `0xA100`: subscribes to vehicle status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartVehicleStatusUpdates;

impl StartVehicleStatusUpdates {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xA100;

    /// Encodes this (field-less) message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[])
    }

    /// Decodes this (field-less) message.
    pub fn decode(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// `0xA101`: a live vehicle telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleStatusUpdate {
    /// Remaining range, in whatever unit the accessory advertised.
    pub range: u16,
    /// Outside temperature.
    pub outside_temperature: i16,
    /// Whether the vehicle is currently issuing a range warning.
    pub range_warning: bool,
}

impl VehicleStatusUpdate {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xA101;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(
            Self::MSG_ID,
            &[
                u16_param(3, self.range),
                i16_param(4, self.outside_temperature),
                bool_param(5, self.range_warning),
            ],
        )
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let range = find_one(&fields, 3)
            .ok_or(CsmError::MissingRequiredParameter { msg_id: Self::MSG_ID, param_id: 3, field: "range" })?;
        let outside_temperature = find_one(&fields, 4).ok_or(CsmError::MissingRequiredParameter {
            msg_id: Self::MSG_ID,
            param_id: 4,
            field: "outside_temperature",
        })?;
        let range_warning = find_one(&fields, 5).ok_or(CsmError::MissingRequiredParameter {
            msg_id: Self::MSG_ID,
            param_id: 5,
            field: "range_warning",
        })?;
        Ok(Self {
            range: read_u16(range, "range")?,
            outside_temperature: read_i16(outside_temperature, "outside_temperature")?,
            range_warning: read_bool(range_warning, "range_warning")?,
        })
    }
}

/// `0xA102`: unsubscribes from vehicle status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopVehicleStatusUpdates;

impl StopVehicleStatusUpdates {
    /// Wire message id.
    pub const MSG_ID: u16 = 0xA102;

    /// Encodes this (field-less) message.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        schema::encode_message(Self::MSG_ID, &[])
    }

    /// Decodes this (field-less) message.
    pub fn decode(_payload: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_status_update_round_trips() {
        let msg = VehicleStatusUpdate { range: 350, outside_temperature: -40, range_warning: true };
        let encoded = msg.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, VehicleStatusUpdate::MSG_ID);
        assert_eq!(VehicleStatusUpdate::decode(body).expect("decode body"), msg);
    }

    #[test]
    fn start_and_stop_are_field_less() {
        let encoded = StartVehicleStatusUpdates.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, StartVehicleStatusUpdates::MSG_ID);
        StartVehicleStatusUpdates::decode(body).expect("decode");

        let encoded = StopVehicleStatusUpdates.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, StopVehicleStatusUpdates::MSG_ID);
        StopVehicleStatusUpdates::decode(body).expect("decode");
    }
}
