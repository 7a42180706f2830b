use crate::constants::{READ_CHUNK_SIZE, SET_CONTROL_LINE_STATE, VENDOR_INTERFACE_CLASS, VID};
use crate::error::FdsError;
use bytes::Bytes;
use nusb::transfer::{ControlOut, ControlType, Direction, EndpointType, Recipient, RequestBuffer};
use nusb::{Device, DeviceInfo, Interface};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

// Default timeout for outbound transfers
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Duplex text channel to an altimeter.
///
/// `receive` blocks until the device sends something; an error from it means
/// the link is gone. `send` is fire-and-forget from the protocol's point of
/// view: nothing acknowledges a message.
pub trait Transport: Send + Sync {
    fn send(&self, message: &str) -> impl Future<Output = Result<(), FdsError>> + Send;

    fn receive(&self) -> impl Future<Output = Result<Bytes, FdsError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), FdsError>> + Send;
}

/// How to find and talk to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: Option<u16>,
    pub read_size: usize,
    pub send_timeout: Duration,
    /// Send the settings request right after the interface is claimed.
    pub request_settings: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: VID,
            product_id: None,
            read_size: READ_CHUNK_SIZE,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            request_settings: true,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product_id(mut self, product_id: u16) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn matches(&self, info: &DeviceInfo) -> bool {
        info.vendor_id() == self.vendor_id && self.product_id.is_none_or(|pid| info.product_id() == pid)
    }
}

/// All attached devices matching the configuration.
pub fn list_devices(config: &DeviceConfig) -> Result<Vec<DeviceInfo>, FdsError> {
    Ok(nusb::list_devices()
        .map_err(FdsError::Usb)?
        .filter(|d| config.matches(d))
        .collect())
}

/// Represents a USB connection to an altimeter.
pub struct FdsDevice {
    interface: Interface,
    interface_number: u8,
    endpoint_in: u8,
    endpoint_out: u8,
    config: DeviceConfig,
}

impl FdsDevice {
    /// Find the first matching device and open it.
    pub async fn open(config: DeviceConfig) -> Result<Self, FdsError> {
        info!("Searching for FDS altimeter...");
        let device_info = nusb::list_devices()
            .map_err(FdsError::Usb)?
            .find(|d| config.matches(d))
            .ok_or(FdsError::DeviceNotFound)?;
        Self::open_device(&device_info, config).await
    }

    pub async fn open_device(device_info: &DeviceInfo, config: DeviceConfig) -> Result<Self, FdsError> {
        info!(
            bus = device_info.bus_number(),
            addr = device_info.device_address(),
            serial = device_info.serial_number().unwrap_or("<none>"),
            "Found device"
        );

        let device = device_info.open().map_err(FdsError::Usb)?;
        let (interface_number, endpoint_in, endpoint_out) = find_vendor_interface(&device)?;
        let interface = device
            .detach_and_claim_interface(interface_number)
            .map_err(FdsError::Usb)?;
        interface.set_alt_setting(0).map_err(FdsError::Usb)?;
        info!(interface_number, endpoint_in, endpoint_out, "Interface claimed successfully.");

        let fds = Self {
            interface,
            interface_number,
            endpoint_in,
            endpoint_out,
            config,
        };
        fds.set_control_line_state(true).await?;
        Ok(fds)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Raise or drop DTR; the firmware only talks while DTR is set.
    async fn set_control_line_state(&self, ready: bool) -> Result<(), FdsError> {
        let completion = self
            .interface
            .control_out(ControlOut {
                control_type: ControlType::Class,
                recipient: Recipient::Interface,
                request: SET_CONTROL_LINE_STATE,
                value: u16::from(ready),
                index: u16::from(self.interface_number),
                data: &[],
            })
            .await;
        completion.into_result()?;
        debug!(ready, "Control line state set");
        Ok(())
    }
}

fn find_vendor_interface(device: &Device) -> Result<(u8, u8, u8), FdsError> {
    let configuration = device.active_configuration()?;
    for alt in configuration.interface_alt_settings() {
        if alt.class() != VENDOR_INTERFACE_CLASS {
            continue;
        }
        let mut endpoint_in = None;
        let mut endpoint_out = None;
        for endpoint in alt.endpoints() {
            if endpoint.transfer_type() != EndpointType::Bulk {
                continue;
            }
            match endpoint.direction() {
                Direction::In => endpoint_in = Some(endpoint.address()),
                Direction::Out => endpoint_out = Some(endpoint.address()),
            }
        }
        if let (Some(ep_in), Some(ep_out)) = (endpoint_in, endpoint_out) {
            return Ok((alt.interface_number(), ep_in, ep_out));
        }
    }
    Err(FdsError::NoVendorInterface)
}

impl Transport for FdsDevice {
    async fn send(&self, message: &str) -> Result<(), FdsError> {
        debug!(message, "USB Write");
        let transfer = self.interface.bulk_out(self.endpoint_out, message.as_bytes().to_vec());
        let completion = tokio::time::timeout(self.config.send_timeout, transfer).await?;
        completion.into_result()?;
        Ok(())
    }

    async fn receive(&self) -> Result<Bytes, FdsError> {
        let transfer = self
            .interface
            .bulk_in(self.endpoint_in, RequestBuffer::new(self.config.read_size));
        let data = transfer.await.into_result()?;
        debug!(data = %String::from_utf8_lossy(&data), "USB Read");
        Ok(Bytes::from(data))
    }

    async fn disconnect(&self) -> Result<(), FdsError> {
        info!("Disconnecting...");
        self.set_control_line_state(false).await
    }
}
