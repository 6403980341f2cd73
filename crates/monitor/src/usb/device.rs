//! Descriptor-to-identity mapping
//!
//! Turns rusb device descriptors into [`DeviceId`]s and human-readable
//! summaries for listing.

use common::DeviceId;
use rusb::{Device, DeviceDescriptor, DeviceHandle, UsbContext, Version};

/// One attached device, as shown by `--list-devices` and `detect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub id: DeviceId,
    pub bus_number: u8,
    pub device_address: u8,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl DeviceSummary {
    /// Read the summary, including string descriptors when the device can be opened
    pub fn read<T: UsbContext>(device: &Device<T>) -> Result<Self, rusb::Error> {
        let descriptor = device.device_descriptor()?;

        let strings = device
            .open()
            .ok()
            .map(|handle| read_string_descriptors(&descriptor, &handle));
        let (manufacturer, product) = strings.unwrap_or((None, None));

        Ok(Self {
            id: device_id(&descriptor),
            bus_number: device.bus_number(),
            device_address: device.address(),
            manufacturer,
            product,
        })
    }

    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.manufacturer.as_deref().unwrap_or("Unknown Manufacturer"),
            self.product.as_deref().unwrap_or("Unknown Product")
        )
    }
}

/// Identity of a device from its descriptor
pub fn device_id(descriptor: &DeviceDescriptor) -> DeviceId {
    DeviceId::from_parts(
        descriptor.vendor_id(),
        descriptor.product_id(),
        version_to_bcd(descriptor.device_version()),
        version_to_bcd(descriptor.usb_version()),
    )
}

/// Re-encode a decoded descriptor version as the raw BCD word
///
/// rusb splits `0xJJMN` into major `JJ` (two BCD digits), minor `M` and
/// sub-minor `N`.
pub fn version_to_bcd(version: Version) -> u16 {
    bcd_from_parts(version.major(), version.minor(), version.sub_minor())
}

fn bcd_from_parts(major: u8, minor: u8, sub_minor: u8) -> u16 {
    let major = major as u16;
    ((major / 10) & 0xF) << 12
        | ((major % 10) & 0xF) << 8
        | ((minor as u16) & 0xF) << 4
        | ((sub_minor as u16) & 0xF)
}

fn read_string_descriptors<T: UsbContext>(
    descriptor: &DeviceDescriptor,
    handle: &DeviceHandle<T>,
) -> (Option<String>, Option<String>) {
    let manufacturer = descriptor
        .manufacturer_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    let product = descriptor
        .product_string_index()
        .and_then(|idx| handle.read_string_descriptor_ascii(idx).ok());

    (manufacturer, product)
}
