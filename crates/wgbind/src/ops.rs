//! Exposed configuration operations.
//!
//! [`Bridge`] is the host-facing surface: every operation takes its
//! arguments as a slice of JSON values, validates count and types before
//! doing any work, and only then touches the backend. Native graphs
//! built for a call are owned by the call frame and released when it
//! returns, on success and on error alike.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::backend::Backend;
use crate::device::{validate_name, AF_INET, AF_INET6};
use crate::error::{Error, Result};
use crate::keys;
use crate::names::decode_device_names;
use crate::record::{device_from_record, device_record, str_field, u32_field};

/// Dispatcher over a device configuration backend.
#[derive(Debug)]
pub struct Bridge<B: Backend> {
    backend: B,
}

impl<B: Backend> Bridge<B> {
    /// Create a dispatcher over the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch a device's configuration as a record.
    pub fn get_device(&self, args: &[Value]) -> Result<Value> {
        expect_args("getDevice", args, 1)?;
        let name = str_arg("getDevice", args, 0)?;

        debug!(device = %name, "getDevice");
        let device = self.backend.get_device(name)?;
        device_record(&device)
    }

    /// Apply a device configuration record.
    pub fn set_device(&self, args: &[Value]) -> Result<Value> {
        expect_args("setDevice", args, 1)?;
        object_arg("setDevice", args, 0)?;

        let device = device_from_record(&args[0])
            .map_err(|e| Error::conversion("device", e))?;
        debug!(device = %device.name, peers = device.peers.len(), "setDevice");
        self.backend.set_device(&device)?;
        Ok(Value::Null)
    }

    /// Create a new device.
    pub fn add_device(&self, args: &[Value]) -> Result<Value> {
        expect_args("addDevice", args, 1)?;
        let name = str_arg("addDevice", args, 0)?;
        validate_name(name)?;

        debug!(device = %name, "addDevice");
        self.backend.add_device(name)?;
        Ok(Value::Null)
    }

    /// Delete a device.
    pub fn remove_device(&self, args: &[Value]) -> Result<Value> {
        expect_args("removeDevice", args, 1)?;
        let name = str_arg("removeDevice", args, 0)?;

        debug!(device = %name, "removeDevice");
        self.backend.remove_device(name)?;
        Ok(Value::Null)
    }

    /// List device names in enumeration order.
    pub fn list_device_names(&self, args: &[Value]) -> Result<Value> {
        expect_args("listDeviceNames", args, 0)?;

        let buffer = self.backend.device_names()?;
        Ok(json!(decode_device_names(&buffer)))
    }

    /// Generate a new private key, base64-encoded.
    pub fn generate_private_key(&self, args: &[Value]) -> Result<Value> {
        expect_args("generatePrivateKey", args, 0)?;
        Ok(json!(keys::key_to_base64(&keys::generate_private_key())))
    }

    /// Derive the public key for a base64 private key.
    pub fn generate_public_key(&self, args: &[Value]) -> Result<Value> {
        expect_args("generatePublicKey", args, 1)?;
        let private = keys::key_from_base64(str_arg("generatePublicKey", args, 0)?)?;
        Ok(json!(keys::key_to_base64(&keys::generate_public_key(
            &private
        ))))
    }

    /// Generate a new preshared key, base64-encoded.
    pub fn generate_preshared_key(&self, args: &[Value]) -> Result<Value> {
        expect_args("generatePresharedKey", args, 0)?;
        Ok(json!(keys::key_to_base64(&keys::generate_preshared_key())))
    }

    /// List addresses assigned to a device's interface.
    ///
    /// Entries for other interfaces, and entries whose family is neither
    /// IPv4 nor IPv6, are skipped rather than errored.
    pub fn get_interface_address(&self, args: &[Value]) -> Result<Value> {
        expect_args("getInterfaceAddress", args, 1)?;
        let name = str_arg("getInterfaceAddress", args, 0)?;

        let entries = self.backend.interface_addresses()?;
        let records: Vec<Value> = entries
            .iter()
            .filter(|entry| entry.interface == name)
            .map(|entry| {
                let family = if entry.address.is_ipv4() { AF_INET } else { AF_INET6 };
                json!({ "family": family, "ip": entry.address.to_string() })
            })
            .collect();

        Ok(Value::Array(records))
    }

    /// Assign an address to a device's interface.
    pub fn set_interface_address(&self, args: &[Value]) -> Result<Value> {
        expect_args("setInterfaceAddress", args, 2)?;
        let name = str_arg("setInterfaceAddress", args, 0)?;
        let obj = object_arg("setInterfaceAddress", args, 1)?;

        let family = u32_field(obj, "family")?;
        let ip = str_field(obj, "ip")?;
        let address = crate::endpoint::parse_ip(family, ip)?;

        debug!(device = %name, address = %address, "setInterfaceAddress");
        self.backend.assign_address(name, address)?;
        Ok(Value::Null)
    }
}

fn expect_args(operation: &'static str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::ArgumentCount {
            operation,
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}

fn str_arg<'a>(operation: &'static str, args: &'a [Value], index: usize) -> Result<&'a str> {
    args[index].as_str().ok_or(Error::ArgumentType {
        operation,
        index,
        expected: "string",
    })
}

fn object_arg<'a>(
    operation: &'static str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Map<String, Value>> {
    args[index].as_object().ok_or(Error::ArgumentType {
        operation,
        index,
        expected: "object",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{InterfaceAddress, MemoryBackend};
    use crate::device::Device;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the in-memory backend, counting every call that reaches it.
    #[derive(Debug, Default)]
    struct CountingBackend {
        inner: MemoryBackend,
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Backend for CountingBackend {
        fn get_device(&self, name: &str) -> Result<Device> {
            self.tick();
            self.inner.get_device(name)
        }

        fn set_device(&self, device: &Device) -> Result<()> {
            self.tick();
            self.inner.set_device(device)
        }

        fn add_device(&self, name: &str) -> Result<()> {
            self.tick();
            self.inner.add_device(name)
        }

        fn remove_device(&self, name: &str) -> Result<()> {
            self.tick();
            self.inner.remove_device(name)
        }

        fn device_names(&self) -> Result<Vec<u8>> {
            self.tick();
            self.inner.device_names()
        }

        fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>> {
            self.tick();
            self.inner.interface_addresses()
        }

        fn assign_address(&self, name: &str, address: IpAddr) -> Result<()> {
            self.tick();
            self.inner.assign_address(name, address)
        }
    }

    fn bridge() -> Bridge<CountingBackend> {
        Bridge::new(CountingBackend::default())
    }

    #[test]
    fn test_argument_count_checked_first() {
        let bridge = bridge();
        let err = bridge.get_device(&[]).unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { operation: "getDevice", .. }));

        let err = bridge
            .set_interface_address(&[json!("wg0")])
            .unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { .. }));

        let err = bridge.generate_private_key(&[json!(1)]).unwrap_err();
        assert!(matches!(err, Error::ArgumentCount { .. }));

        assert_eq!(bridge.backend().count(), 0);
    }

    #[test]
    fn test_argument_type_checked_before_backend() {
        let bridge = bridge();
        let err = bridge.get_device(&[json!(42)]).unwrap_err();
        assert!(matches!(
            err,
            Error::ArgumentType { operation: "getDevice", index: 0, .. }
        ));

        let err = bridge.set_device(&[json!("not an object")]).unwrap_err();
        assert!(matches!(err, Error::ArgumentType { .. }));

        assert_eq!(bridge.backend().count(), 0);
    }

    #[test]
    fn test_set_device_record_failure_precedes_backend() {
        let bridge = bridge();
        let err = bridge
            .set_device(&[json!({"name": "wg0"})])
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { entity: "device", .. }));
        assert_eq!(bridge.backend().count(), 0);
    }

    #[test]
    fn test_add_device_rejects_oversized_name() {
        let bridge = bridge();
        let err = bridge
            .add_device(&[json!("interface-name-way-too-long")])
            .unwrap_err();
        assert!(matches!(err, Error::DeviceName(_)));
        assert_eq!(bridge.backend().count(), 0);
    }

    #[test]
    fn test_generate_public_key_is_deterministic() {
        let bridge = bridge();
        let private = bridge.generate_private_key(&[]).unwrap();
        let a = bridge.generate_public_key(&[private.clone()]).unwrap();
        let b = bridge.generate_public_key(&[private]).unwrap();
        assert_eq!(a, b);

        let err = bridge
            .generate_public_key(&[json!("@@bad base64@@")])
            .unwrap_err();
        assert!(matches!(err, Error::KeyFormat(_)));
    }

    #[test]
    fn test_list_device_names_decodes_buffer() {
        let bridge = bridge();
        bridge.add_device(&[json!("wg0")]).unwrap();
        bridge.add_device(&[json!("wg1")]).unwrap();

        let names = bridge.list_device_names(&[]).unwrap();
        assert_eq!(names, json!(["wg0", "wg1"]));
    }

    #[test]
    fn test_interface_address_filtering() {
        let bridge = bridge();
        bridge.backend().inner.seed_address("eth0", "192.0.2.1".parse().unwrap());
        bridge.backend().inner.seed_address("wg0", "10.0.0.1".parse().unwrap());
        bridge.backend().inner.seed_address("wg0", "fd00::1".parse().unwrap());

        let records = bridge.get_interface_address(&[json!("wg0")]).unwrap();
        assert_eq!(
            records,
            json!([
                {"family": AF_INET, "ip": "10.0.0.1"},
                {"family": AF_INET6, "ip": "fd00::1"},
            ])
        );
    }

    #[test]
    fn test_set_interface_address_validates_record() {
        let bridge = bridge();
        bridge.add_device(&[json!("wg0")]).unwrap();
        let before = bridge.backend().count();

        let err = bridge
            .set_interface_address(&[json!("wg0"), json!({"family": 99, "ip": "10.0.0.1"})])
            .unwrap_err();
        assert!(matches!(err, Error::AddressFamily(_)));

        let err = bridge
            .set_interface_address(&[json!("wg0"), json!({"family": AF_INET, "ip": 7})])
            .unwrap_err();
        assert!(matches!(err, Error::FieldType { field: "ip", .. }));

        // Validation failures never reached the backend
        assert_eq!(bridge.backend().count(), before);

        bridge
            .set_interface_address(&[json!("wg0"), json!({"family": AF_INET, "ip": "10.0.0.1"})])
            .unwrap();
        let records = bridge.get_interface_address(&[json!("wg0")]).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 1);
    }
}
