//! Identification messages (`0x1D00`-`0x1D03`): the handshake where the
//! accessory describes itself and its capabilities to the device.

use bytes::Bytes;

use crate::{
    errors::{CsmError, Result},
    schema::{self, Param, find_all, find_one, group_param, marker, read_u8, read_u16, string_param, u16_param, u8_param},
};

/// How this accessory can provide power to the connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerProvidingCapability {
    /// No power is provided.
    None,
    /// Reserved capability tier.
    Reserved,
    /// Advanced power delivery.
    Advanced,
}

impl PowerProvidingCapability {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Reserved),
            2 => Some(Self::Advanced),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Reserved => 1,
            Self::Advanced => 2,
        }
    }
}

/// What the device should do when it matches one of the accessory's
/// external-accessory protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    /// Take no automatic action.
    None,
    /// Show the app in Settings and prompt the user to open it.
    SettingsAndPrompt,
    /// Only show the app in Settings.
    SettingsOnly,
}

impl MatchAction {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::SettingsAndPrompt),
            2 => Some(Self::SettingsOnly),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::SettingsAndPrompt => 1,
            Self::SettingsOnly => 2,
        }
    }
}

/// The kind of engine powering a vehicle accessory's host vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    /// Gasoline.
    Gas,
    /// Diesel.
    Diesel,
    /// Fully electric.
    Electric,
    /// Compressed natural gas.
    Cng,
}

impl EngineType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Gas),
            1 => Some(Self::Diesel),
            2 => Some(Self::Electric),
            3 => Some(Self::Cng),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Gas => 0,
            Self::Diesel => 1,
            Self::Electric => 2,
            Self::Cng => 3,
        }
    }
}

/// One external-accessory protocol this accessory supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAccessoryProtocol {
    /// Protocol index, referenced elsewhere by this id.
    pub id: u8,
    /// Protocol identifier string (reverse-DNS style).
    pub name: String,
    /// What the device should do on a match.
    pub match_action: MatchAction,
    /// Transport component id this protocol is pinned to, if any.
    pub native_transport_component_identifier: Option<u16>,
}

impl ExternalAccessoryProtocol {
    fn encode(&self) -> Param {
        let mut fields = vec![u8_param(0, self.id), string_param(1, &self.name), u8_param(2, self.match_action.to_u8())];
        if let Some(id) = self.native_transport_component_identifier {
            fields.push(u16_param(3, id));
        }
        group_param(10, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        let id = find_required(&fields, 0, "id")?;
        let name = schema::read_string(find_required(&fields, 1, "name")?, "name")?;
        let match_action_raw = read_u8(find_required(&fields, 2, "match_action")?, "match_action")?;
        let match_action = MatchAction::from_u8(match_action_raw)
            .ok_or(CsmError::InvalidEnumValue { param_id: 2, field: "match_action", value: match_action_raw })?;
        let native_transport_component_identifier =
            find_one(&fields, 3).map(|p| read_u16(p, "native_transport_component_identifier")).transpose()?;
        Ok(Self { id: read_u8(id, "id")?, name, match_action, native_transport_component_identifier })
    }
}

fn find_required<'a>(fields: &'a [Param], id: u16, name: &'static str) -> Result<&'a Param> {
    find_one(fields, id).ok_or(CsmError::MissingRequiredParameter { msg_id: 0, param_id: id, field: name })
}

fn transport_component_base(id: u16, name: &str, supports_iap2_connection: bool, extra: Vec<Param>) -> Vec<Param> {
    let mut fields = vec![u16_param(0, id), string_param(1, name)];
    if supports_iap2_connection {
        fields.push(marker(2));
    }
    fields.extend(extra);
    fields
}

/// A serial transport, advertised with no extra fields beyond the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialTransportComponent {
    /// Transport component id.
    pub id: u16,
    /// Human-readable transport name.
    pub name: String,
    /// Whether this transport currently supports an iAP2 connection.
    pub supports_iap2_connection: bool,
}

impl SerialTransportComponent {
    fn encode(&self) -> Param {
        let fields = transport_component_base(self.id, &self.name, self.supports_iap2_connection, vec![]);
        group_param(14, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            supports_iap2_connection: find_one(&fields, 2).is_some(),
        })
    }
}

/// A USB-device transport (the accessory is the USB device).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceTransportComponent {
    /// Transport component id.
    pub id: u16,
    /// Human-readable transport name.
    pub name: String,
    /// Whether this transport currently supports an iAP2 connection.
    pub supports_iap2_connection: bool,
    /// Negotiated audio sample rate, if the transport carries audio.
    pub audio_sample_rate: Option<u8>,
}

impl UsbDeviceTransportComponent {
    fn encode(&self) -> Param {
        let mut extra = Vec::new();
        if let Some(rate) = self.audio_sample_rate {
            extra.push(u8_param(3, rate));
        }
        let fields = transport_component_base(self.id, &self.name, self.supports_iap2_connection, extra);
        group_param(15, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            supports_iap2_connection: find_one(&fields, 2).is_some(),
            audio_sample_rate: find_one(&fields, 3).map(|p| read_u8(p, "audio_sample_rate")).transpose()?,
        })
    }
}

/// A USB-host transport (the accessory is the USB host).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbHostTransportComponent {
    /// Transport component id.
    pub id: u16,
    /// Human-readable transport name.
    pub name: String,
    /// Whether this transport currently supports an iAP2 connection.
    pub supports_iap2_connection: bool,
    /// CarPlay interface number, if this transport carries CarPlay.
    pub car_play_interface_number: Option<u8>,
}

impl UsbHostTransportComponent {
    fn encode(&self) -> Param {
        let mut extra = Vec::new();
        if let Some(n) = self.car_play_interface_number {
            extra.push(u8_param(3, n));
        }
        let fields = transport_component_base(self.id, &self.name, self.supports_iap2_connection, extra);
        group_param(16, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            supports_iap2_connection: find_one(&fields, 2).is_some(),
            car_play_interface_number: find_one(&fields, 3).map(|p| read_u8(p, "car_play_interface_number")).transpose()?,
        })
    }
}

/// A Bluetooth transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BluetoothTransportComponent {
    /// Transport component id.
    pub id: u16,
    /// Human-readable transport name.
    pub name: String,
    /// Whether this transport currently supports an iAP2 connection.
    pub supports_iap2_connection: bool,
    /// The transport's Bluetooth MAC address (3 bytes, the protocol's own
    /// truncated form).
    pub bluetooth_transport_mac: Bytes,
}

impl BluetoothTransportComponent {
    fn encode(&self) -> Param {
        let extra = vec![Param { id: 3, payload: self.bluetooth_transport_mac.clone() }];
        let fields = transport_component_base(self.id, &self.name, self.supports_iap2_connection, extra);
        group_param(17, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            supports_iap2_connection: find_one(&fields, 2).is_some(),
            bluetooth_transport_mac: find_required(&fields, 3, "bluetooth_transport_mac")?.payload.clone(),
        })
    }
}

/// A wireless CarPlay transport, referenced only via the single optional
/// `wireless_car_play_transport_component` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirelessCarPlayTransportComponent {
    /// Transport component id.
    pub id: u16,
    /// Human-readable transport name.
    pub name: String,
    /// Whether this transport currently supports an iAP2 connection.
    pub supports_iap2_connection: bool,
    /// Whether this transport currently supports CarPlay.
    pub supports_car_play: bool,
}

impl WirelessCarPlayTransportComponent {
    fn encode(&self) -> Param {
        let mut extra = Vec::new();
        if self.supports_car_play {
            extra.push(marker(4));
        }
        let fields = transport_component_base(self.id, &self.name, self.supports_iap2_connection, extra);
        group_param(24, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            supports_iap2_connection: find_one(&fields, 2).is_some(),
            supports_car_play: find_one(&fields, 4).is_some(),
        })
    }
}

/// Describes the vehicle this accessory is embedded in, for vehicle-class
/// accessories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleInformationComponent {
    /// Component id.
    pub id: u16,
    /// Human-readable name.
    pub name: String,
    /// Powertrain type.
    pub engine_type: EngineType,
}

impl VehicleInformationComponent {
    fn encode(&self) -> Param {
        let fields = [u16_param(0, self.id), string_param(1, &self.name), u8_param(2, self.engine_type.to_u8())];
        group_param(20, &fields)
    }

    fn decode(p: &Param) -> Result<Self> {
        let fields = schema::decode_params(&p.payload)?;
        let engine_raw = read_u8(find_required(&fields, 2, "engine_type")?, "engine_type")?;
        Ok(Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            name: schema::read_string(find_required(&fields, 1, "name")?, "name")?,
            engine_type: EngineType::from_u8(engine_raw)
                .ok_or(CsmError::InvalidEnumValue { param_id: 2, field: "engine_type", value: engine_raw })?,
        })
    }
}

/// Advertises which live vehicle-status fields this accessory can later
/// report via `VehicleStatusUpdate`. Each field is a presence flag, not a
/// value — the values themselves are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleStatusComponent {
    /// Component id.
    pub id: u16,
    /// Whether remaining-range updates will be reported.
    pub range: bool,
    /// Whether outside-temperature updates will be reported.
    pub outside_temperature: bool,
    /// Whether range-warning updates will be reported.
    pub range_warning: bool,
}

impl VehicleStatusComponent {
    fn encode(&self, name: &str) -> Param {
        let mut fields = vec![u16_param(0, self.id), string_param(1, name)];
        if self.range {
            fields.push(marker(3));
        }
        if self.outside_temperature {
            fields.push(marker(4));
        }
        if self.range_warning {
            fields.push(marker(5));
        }
        group_param(21, &fields)
    }

    fn decode(p: &Param) -> Result<(Self, String)> {
        let fields = schema::decode_params(&p.payload)?;
        let component = Self {
            id: read_u16(find_required(&fields, 0, "id")?, "id")?,
            range: find_one(&fields, 3).is_some(),
            outside_temperature: find_one(&fields, 4).is_some(),
            range_warning: find_one(&fields, 5).is_some(),
        };
        let name = schema::read_string(find_required(&fields, 1, "name")?, "name")?;
        Ok((component, name))
    }
}

/// `0x1D00`: requests that the accessory identify itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartIdentification;

impl StartIdentification {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x1D00;

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

/// `0x1D01`: the accessory's full self-description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationInformation {
    /// Display name.
    pub name: String,
    /// Model identifier string.
    pub model_identifier: String,
    /// Manufacturer string.
    pub manufacturer: String,
    /// Serial number string.
    pub serial_number: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Hardware version string.
    pub hardware_version: String,
    /// Bitmask of control-session messages this accessory sends.
    pub messages_sent_by_accessory: Bytes,
    /// Bitmask of control-session messages this accessory accepts.
    pub messages_received_from_accessory: Bytes,
    /// How this accessory can power the device.
    pub power_providing_capability: PowerProvidingCapability,
    /// Maximum current, in mA, the device may draw from this accessory.
    pub maximum_current_drawn_from_device: u16,
    /// External-accessory protocols this accessory supports.
    pub supported_external_accessory_protocol: Vec<ExternalAccessoryProtocol>,
    /// Apple Developer team id for CarPlay app matching, if any.
    pub app_match_team_id: Option<String>,
    /// Current active language (BCP 47).
    pub current_language: String,
    /// All languages this accessory can operate in.
    pub supported_language: Vec<String>,
    /// Serial transports present.
    pub serial_transport_component: Vec<SerialTransportComponent>,
    /// USB-device transports present.
    pub usb_device_transport_component: Vec<UsbDeviceTransportComponent>,
    /// USB-host transports present.
    pub usb_host_transport_component: Vec<UsbHostTransportComponent>,
    /// Bluetooth transports present.
    pub bluetooth_transport_component: Vec<BluetoothTransportComponent>,
    /// Present only for vehicle-class accessories.
    pub vehicle_information_component: Option<VehicleInformationComponent>,
    /// Present only for vehicle-class accessories.
    pub vehicle_status_component: Option<VehicleStatusComponent>,
    /// Present only when this accessory offers wireless CarPlay.
    pub wireless_car_play_transport_component: Option<WirelessCarPlayTransportComponent>,
}

impl IdentificationInformation {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x1D01;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut fields = vec![
            string_param(0, &self.name),
            string_param(1, &self.model_identifier),
            string_param(2, &self.manufacturer),
            string_param(3, &self.serial_number),
            string_param(4, &self.firmware_version),
            string_param(5, &self.hardware_version),
            Param { id: 6, payload: self.messages_sent_by_accessory.clone() },
            Param { id: 7, payload: self.messages_received_from_accessory.clone() },
            u8_param(8, self.power_providing_capability.to_u8()),
            u16_param(9, self.maximum_current_drawn_from_device),
        ];
        for protocol in &self.supported_external_accessory_protocol {
            fields.push(protocol.encode());
        }
        if let Some(team_id) = &self.app_match_team_id {
            fields.push(string_param(11, team_id));
        }
        fields.push(string_param(12, &self.current_language));
        for lang in &self.supported_language {
            fields.push(string_param(13, lang));
        }
        for serial in &self.serial_transport_component {
            fields.push(serial.encode());
        }
        for usb_device in &self.usb_device_transport_component {
            fields.push(usb_device.encode());
        }
        for usb_host in &self.usb_host_transport_component {
            fields.push(usb_host.encode());
        }
        for bluetooth in &self.bluetooth_transport_component {
            fields.push(bluetooth.encode());
        }
        if let Some(vehicle) = &self.vehicle_information_component {
            fields.push(vehicle.encode());
        }
        if let Some(status) = &self.vehicle_status_component {
            fields.push(status.encode(&self.name));
        }
        if let Some(car_play) = &self.wireless_car_play_transport_component {
            fields.push(car_play.encode());
        }
        schema::encode_message(Self::MSG_ID, &fields)
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let req = |id: u16, name: &'static str| find_required(&fields, id, name);

        let supported_external_accessory_protocol =
            find_all(&fields, 10).map(ExternalAccessoryProtocol::decode).collect::<Result<Vec<_>>>()?;
        let supported_language =
            find_all(&fields, 13).map(|p| schema::read_string(p, "supported_language")).collect::<Result<Vec<_>>>()?;
        let serial_transport_component =
            find_all(&fields, 14).map(SerialTransportComponent::decode).collect::<Result<Vec<_>>>()?;
        let usb_device_transport_component =
            find_all(&fields, 15).map(UsbDeviceTransportComponent::decode).collect::<Result<Vec<_>>>()?;
        let usb_host_transport_component =
            find_all(&fields, 16).map(UsbHostTransportComponent::decode).collect::<Result<Vec<_>>>()?;
        let bluetooth_transport_component =
            find_all(&fields, 17).map(BluetoothTransportComponent::decode).collect::<Result<Vec<_>>>()?;
        let vehicle_status_component =
            find_one(&fields, 21).map(VehicleStatusComponent::decode).transpose()?.map(|(component, _name)| component);

        let power_providing_capability_raw = read_u8(req(8, "power_providing_capability")?, "power_providing_capability")?;

        Ok(Self {
            name: schema::read_string(req(0, "name")?, "name")?,
            model_identifier: schema::read_string(req(1, "model_identifier")?, "model_identifier")?,
            manufacturer: schema::read_string(req(2, "manufacturer")?, "manufacturer")?,
            serial_number: schema::read_string(req(3, "serial_number")?, "serial_number")?,
            firmware_version: schema::read_string(req(4, "firmware_version")?, "firmware_version")?,
            hardware_version: schema::read_string(req(5, "hardware_version")?, "hardware_version")?,
            messages_sent_by_accessory: req(6, "messages_sent_by_accessory")?.payload.clone(),
            messages_received_from_accessory: req(7, "messages_received_from_accessory")?.payload.clone(),
            power_providing_capability: PowerProvidingCapability::from_u8(power_providing_capability_raw).ok_or(
                CsmError::InvalidEnumValue {
                    param_id: 8,
                    field: "power_providing_capability",
                    value: power_providing_capability_raw,
                },
            )?,
            maximum_current_drawn_from_device: read_u16(
                req(9, "maximum_current_drawn_from_device")?,
                "maximum_current_drawn_from_device",
            )?,
            supported_external_accessory_protocol,
            app_match_team_id: find_one(&fields, 11).map(|p| schema::read_string(p, "app_match_team_id")).transpose()?,
            current_language: schema::read_string(req(12, "current_language")?, "current_language")?,
            supported_language,
            serial_transport_component,
            usb_device_transport_component,
            usb_host_transport_component,
            bluetooth_transport_component,
            vehicle_information_component: find_one(&fields, 20)
                .map(VehicleInformationComponent::decode)
                .transpose()?,
            vehicle_status_component,
            wireless_car_play_transport_component: find_one(&fields, 24)
                .map(WirelessCarPlayTransportComponent::decode)
                .transpose()?,
        })
    }
}

/// `0x1D02`: the device accepted the accessory's identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentificationAccepted;

impl IdentificationAccepted {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x1D02;

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

/// `0x1D03`: the device rejected the accessory's identification. Every
/// field is a presence flag marking which part of the request was at
/// fault, mirroring [`IdentificationInformation`]'s field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentificationRejected {
    /// Flags set for whichever fields of the original request were rejected.
    pub rejected_fields: IdentificationRejectedFields,
}

/// Presence flags for [`IdentificationRejected`], one per field of
/// [`IdentificationInformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct IdentificationRejectedFields {
    pub name: bool,
    pub model_identifier: bool,
    pub manufacturer: bool,
    pub serial_number: bool,
    pub firmware_version: bool,
    pub hardware_version: bool,
    pub messages_sent_by_accessory: bool,
    pub messages_received_from_accessory: bool,
    pub power_providing_capability: bool,
    pub maximum_current_drawn_from_device: bool,
    pub supported_external_accessory_protocol: bool,
    pub app_match_team_id: bool,
    pub current_language: bool,
    pub supported_language: bool,
    pub serial_transport_component: bool,
    pub usb_device_transport_component: bool,
    pub usb_host_transport_component: bool,
    pub bluetooth_transport_component: bool,
    pub vehicle_information_component: bool,
    pub vehicle_status_component: bool,
    pub wireless_car_play_transport_component: bool,
}

impl IdentificationRejected {
    /// Wire message id.
    pub const MSG_ID: u16 = 0x1D03;

    /// Encodes this message to its wire form.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let f = &self.rejected_fields;
        let mut fields = Vec::new();
        let flag = |id: u16, set: bool, fields: &mut Vec<Param>| {
            if set {
                fields.push(marker(id));
            }
        };
        flag(0, f.name, &mut fields);
        flag(1, f.model_identifier, &mut fields);
        flag(2, f.manufacturer, &mut fields);
        flag(3, f.serial_number, &mut fields);
        flag(4, f.firmware_version, &mut fields);
        flag(5, f.hardware_version, &mut fields);
        flag(6, f.messages_sent_by_accessory, &mut fields);
        flag(7, f.messages_received_from_accessory, &mut fields);
        flag(8, f.power_providing_capability, &mut fields);
        flag(9, f.maximum_current_drawn_from_device, &mut fields);
        flag(10, f.supported_external_accessory_protocol, &mut fields);
        flag(11, f.app_match_team_id, &mut fields);
        flag(12, f.current_language, &mut fields);
        flag(13, f.supported_language, &mut fields);
        flag(14, f.serial_transport_component, &mut fields);
        flag(15, f.usb_device_transport_component, &mut fields);
        flag(16, f.usb_host_transport_component, &mut fields);
        flag(17, f.bluetooth_transport_component, &mut fields);
        flag(20, f.vehicle_information_component, &mut fields);
        flag(21, f.vehicle_status_component, &mut fields);
        flag(24, f.wireless_car_play_transport_component, &mut fields);
        schema::encode_message(Self::MSG_ID, &fields)
    }

    /// Decodes this message from a parameter-list body (header stripped).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let fields = schema::decode_params(payload)?;
        let has = |id: u16| find_one(&fields, id).is_some();
        Ok(Self {
            rejected_fields: IdentificationRejectedFields {
                name: has(0),
                model_identifier: has(1),
                manufacturer: has(2),
                serial_number: has(3),
                firmware_version: has(4),
                hardware_version: has(5),
                messages_sent_by_accessory: has(6),
                messages_received_from_accessory: has(7),
                power_providing_capability: has(8),
                maximum_current_drawn_from_device: has(9),
                supported_external_accessory_protocol: has(10),
                app_match_team_id: has(11),
                current_language: has(12),
                supported_language: has(13),
                serial_transport_component: has(14),
                usb_device_transport_component: has(15),
                usb_host_transport_component: has(16),
                bluetooth_transport_component: has(17),
                vehicle_information_component: has(20),
                vehicle_status_component: has(21),
                wireless_car_play_transport_component: has(24),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IdentificationInformation {
        IdentificationInformation {
            name: "Demo Accessory".to_string(),
            model_identifier: "DEMO-1".to_string(),
            manufacturer: "Acme".to_string(),
            serial_number: "SN123".to_string(),
            firmware_version: "1.0".to_string(),
            hardware_version: "rev-a".to_string(),
            messages_sent_by_accessory: Bytes::from_static(&[0xFF, 0x00]),
            messages_received_from_accessory: Bytes::from_static(&[0x00, 0xFF]),
            power_providing_capability: PowerProvidingCapability::Advanced,
            maximum_current_drawn_from_device: 1500,
            supported_external_accessory_protocol: vec![ExternalAccessoryProtocol {
                id: 0,
                name: "com.example.proto".to_string(),
                match_action: MatchAction::SettingsAndPrompt,
                native_transport_component_identifier: Some(7),
            }],
            app_match_team_id: Some("TEAMID123".to_string()),
            current_language: "en-US".to_string(),
            supported_language: vec!["en-US".to_string(), "de-DE".to_string()],
            serial_transport_component: vec![SerialTransportComponent {
                id: 1,
                name: "uart0".to_string(),
                supports_iap2_connection: true,
            }],
            usb_device_transport_component: vec![],
            usb_host_transport_component: vec![],
            bluetooth_transport_component: vec![BluetoothTransportComponent {
                id: 2,
                name: "bt0".to_string(),
                supports_iap2_connection: true,
                bluetooth_transport_mac: Bytes::from_static(&[0x01, 0x02, 0x03]),
            }],
            vehicle_information_component: Some(VehicleInformationComponent {
                id: 3,
                name: "vehicle".to_string(),
                engine_type: EngineType::Electric,
            }),
            vehicle_status_component: Some(VehicleStatusComponent {
                id: 4,
                range: true,
                outside_temperature: true,
                range_warning: false,
            }),
            wireless_car_play_transport_component: None,
        }
    }

    #[test]
    fn identification_information_round_trips() {
        let original = sample();
        let encoded = original.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, IdentificationInformation::MSG_ID);
        let decoded = IdentificationInformation::decode(body).expect("decode body");
        assert_eq!(decoded, original);
    }

    #[test]
    fn start_and_accepted_are_field_less() {
        let encoded = StartIdentification.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, StartIdentification::MSG_ID);
        assert!(body.is_empty());
        StartIdentification::decode(body).expect("decode");

        let encoded = IdentificationAccepted.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        assert_eq!(msg_id, IdentificationAccepted::MSG_ID);
        IdentificationAccepted::decode(body).expect("decode");
    }

    #[test]
    fn identification_rejected_round_trips() {
        let rejected = IdentificationRejected {
            rejected_fields: IdentificationRejectedFields { serial_number: true, current_language: true, ..Default::default() },
        };
        let encoded = rejected.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        let decoded = IdentificationRejected::decode(body).expect("decode body");
        assert_eq!(decoded, rejected);
    }

    #[test]
    fn unknown_parameter_is_ignored_not_fatal() {
        let original = sample();
        let encoded = original.encode();
        let (msg_id, body) = schema::decode_header(&encoded).expect("decode header");
        let mut fields = schema::decode_params(body).expect("decode params");
        fields.push(Param { id: 0xFFFF, payload: Bytes::from_static(b"surprise") });
        let body = schema::encode_params(&fields);
        let decoded = IdentificationInformation::decode(&body).expect("decode body despite unknown param");
        assert_eq!(msg_id, IdentificationInformation::MSG_ID);
        assert_eq!(decoded.name, original.name);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let original = sample();
        let encoded = original.encode();
        let (_, body) = schema::decode_header(&encoded).expect("decode header");
        let fields: Vec<Param> = schema::decode_params(body).expect("decode params").into_iter().filter(|p| p.id != 0).collect();
        let body = schema::encode_params(&fields);
        let err = IdentificationInformation::decode(&body).unwrap_err();
        assert!(matches!(err, CsmError::MissingRequiredParameter { param_id: 0, .. }));
    }
}
