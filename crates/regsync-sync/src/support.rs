//! In-memory collaborator doubles shared by the synchronizer tests.

use regsync_core::{
    FlatAttributeMap, HubAddress, HubConnector, HubDevice, HubRegistry, LocalRegistry, LockError,
    RegistryError, SymmetricKey, SyncDirections, SyncLock, TenantHubConfig, TenantHubDirectory,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn tenant_config(tenant: &str, hub: &str) -> TenantHubConfig {
    TenantHubConfig {
        tenant_id: tenant.to_string(),
        hub_name: hub.to_string(),
        connection_credential: format!(
            "HostName={hub}.example.net;SharedAccessKeyName=owner;SharedAccessKey=a2V5"
        ),
        sync: SyncDirections::default(),
    }
}

pub fn directory(configs: Vec<TenantHubConfig>) -> Arc<TenantHubDirectory> {
    Arc::new(TenantHubDirectory::new(configs).unwrap())
}

/// Shared hub-side state, observed through `MockHub` handles.
#[derive(Default)]
pub struct HubState {
    devices: Mutex<HashMap<String, HubDevice>>,
    twins: Mutex<HashMap<String, Map<String, Value>>>,
    created: Mutex<Vec<(String, SymmetricKey)>>,
    deleted: Mutex<Vec<String>>,
    twin_fetches: Mutex<Vec<String>>,
    connects: Mutex<usize>,
    fail_twins: Mutex<bool>,
    fail_creates: Mutex<bool>,
}

impl HubState {
    pub fn insert_device(&self, device_id: &str, primary_key: &str) {
        self.devices.lock().unwrap().insert(
            device_id.to_string(),
            HubDevice {
                device_id: device_id.to_string(),
                primary_key: primary_key.to_string(),
            },
        );
    }

    pub fn set_twin(&self, device_id: &str, reported: Value) {
        self.twins.lock().unwrap().insert(
            device_id.to_string(),
            reported.as_object().cloned().unwrap(),
        );
    }

    pub fn fail_twins(&self) {
        *self.fail_twins.lock().unwrap() = true;
    }

    pub fn fail_creates(&self) {
        *self.fail_creates.lock().unwrap() = true;
    }

    pub fn created(&self) -> Vec<(String, SymmetricKey)> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn twin_fetches(&self) -> Vec<String> {
        self.twin_fetches.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

/// Hub registry double.
#[derive(Default)]
pub struct MockHub {
    pub state: Arc<HubState>,
}

impl MockHub {
    pub fn new(state: Arc<HubState>) -> Self {
        Self { state }
    }
}

impl HubRegistry for MockHub {
    async fn create_device(
        &self,
        device_id: &str,
        _enabled: bool,
        key: &SymmetricKey,
    ) -> Result<(), RegistryError> {
        if *self.state.fail_creates.lock().unwrap() {
            return Err(RegistryError::Transport("create refused".to_string()));
        }
        self.state
            .created
            .lock()
            .unwrap()
            .push((device_id.to_string(), key.clone()));
        self.state.insert_device(device_id, &key.primary);
        Ok(())
    }

    async fn device(&self, device_id: &str) -> Result<HubDevice, RegistryError> {
        self.state
            .devices
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }

    async fn delete_device(&self, device_id: &str) -> Result<(), RegistryError> {
        self.state.deleted.lock().unwrap().push(device_id.to_string());
        match self.state.devices.lock().unwrap().remove(device_id) {
            Some(_) => Ok(()),
            None => Err(RegistryError::NotFound),
        }
    }

    async fn reported_properties(
        &self,
        device_id: &str,
    ) -> Result<Map<String, Value>, RegistryError> {
        if *self.state.fail_twins.lock().unwrap() {
            return Err(RegistryError::Transport("twin endpoint down".to_string()));
        }
        self.state
            .twin_fetches
            .lock()
            .unwrap()
            .push(device_id.to_string());
        Ok(self
            .state
            .twins
            .lock()
            .unwrap()
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Hub connector double handing out `MockHub` handles over shared state.
#[derive(Clone)]
pub struct MockConnector {
    pub state: Arc<HubState>,
    fail_for: Arc<Mutex<Option<String>>>,
}

impl MockConnector {
    pub fn new(state: Arc<HubState>) -> Self {
        Self {
            state,
            fail_for: Arc::new(Mutex::new(None)),
        }
    }

    /// Make connects for the given tenant fail with a credential error.
    pub fn fail_for(&self, tenant: &str) {
        *self.fail_for.lock().unwrap() = Some(tenant.to_string());
    }
}

impl HubConnector for MockConnector {
    type Registry = MockHub;

    fn connect(&self, config: &TenantHubConfig) -> Result<MockHub, RegistryError> {
        if self.fail_for.lock().unwrap().as_deref() == Some(config.tenant_id.as_str()) {
            return Err(RegistryError::Credential("unparseable credential".to_string()));
        }
        *self.state.connects.lock().unwrap() += 1;
        Ok(MockHub::new(Arc::clone(&self.state)))
    }
}

/// Shared local-registry state, observed through `MockLocal` handles.
#[derive(Default)]
pub struct LocalState {
    devices: Mutex<HashMap<String, (String, String)>>,
    creates: Mutex<Vec<(String, String, String, String)>>,
    deletes: Mutex<Vec<String>>,
    merges: Mutex<Vec<(String, FlatAttributeMap)>>,
    requested: Mutex<Vec<String>>,
    tenants_seen: Mutex<Vec<String>>,
}

impl LocalState {
    pub fn insert_device(&self, controller_id: &str, address: &str, token: &str) {
        self.devices.lock().unwrap().insert(
            controller_id.to_string(),
            (address.to_string(), token.to_string()),
        );
    }

    pub fn set_requested(&self, controller_ids: &[&str]) {
        *self.requested.lock().unwrap() =
            controller_ids.iter().map(ToString::to_string).collect();
    }

    pub fn has_device(&self, controller_id: &str) -> bool {
        self.devices.lock().unwrap().contains_key(controller_id)
    }

    pub fn device_address(&self, controller_id: &str) -> Option<String> {
        self.devices
            .lock()
            .unwrap()
            .get(controller_id)
            .map(|(address, _)| address.clone())
    }

    pub fn device_token(&self, controller_id: &str) -> Option<String> {
        self.devices
            .lock()
            .unwrap()
            .get(controller_id)
            .map(|(_, token)| token.clone())
    }

    pub fn creates(&self) -> Vec<(String, String, String, String)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn merges(&self) -> Vec<(String, FlatAttributeMap)> {
        self.merges.lock().unwrap().clone()
    }

    pub fn tenants_seen(&self) -> Vec<String> {
        self.tenants_seen.lock().unwrap().clone()
    }
}

/// Local registry double.
pub struct MockLocal {
    state: Arc<LocalState>,
}

impl MockLocal {
    pub fn new(state: Arc<LocalState>) -> Self {
        Self { state }
    }
}

impl LocalRegistry for MockLocal {
    async fn exists(&self, tenant: &str, controller_id: &str) -> Result<bool, RegistryError> {
        self.state
            .tenants_seen
            .lock()
            .unwrap()
            .push(tenant.to_string());
        Ok(self.state.has_device(controller_id))
    }

    async fn create(
        &self,
        tenant: &str,
        controller_id: &str,
        address: &HubAddress,
        security_token: &str,
    ) -> Result<(), RegistryError> {
        self.state.creates.lock().unwrap().push((
            tenant.to_string(),
            controller_id.to_string(),
            address.to_string(),
            security_token.to_string(),
        ));
        self.state
            .insert_device(controller_id, &address.to_string(), security_token);
        Ok(())
    }

    async fn delete(&self, _tenant: &str, controller_id: &str) -> Result<(), RegistryError> {
        self.state
            .deletes
            .lock()
            .unwrap()
            .push(controller_id.to_string());
        match self.state.devices.lock().unwrap().remove(controller_id) {
            Some(_) => Ok(()),
            None => Err(RegistryError::NotFound),
        }
    }

    async fn merge_attributes(
        &self,
        _tenant: &str,
        controller_id: &str,
        attributes: &FlatAttributeMap,
    ) -> Result<(), RegistryError> {
        self.state
            .merges
            .lock()
            .unwrap()
            .push((controller_id.to_string(), attributes.clone()));
        Ok(())
    }

    async fn devices_with_attributes_requested(
        &self,
        _tenant: &str,
        page_size: usize,
    ) -> Result<Vec<String>, RegistryError> {
        let requested = self.state.requested.lock().unwrap();
        Ok(requested.iter().take(page_size).cloned().collect())
    }
}

/// Non-blocking lock double.
pub struct TestLock {
    held: Arc<Mutex<bool>>,
    fail: bool,
}

impl TestLock {
    pub fn new() -> Self {
        Self {
            held: Arc::new(Mutex::new(false)),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            held: Arc::new(Mutex::new(false)),
            fail: true,
        }
    }

    /// Take the lock out-of-band, simulating another instance's run.
    pub fn hold(&self) -> TestLockGuard {
        *self.held.lock().unwrap() = true;
        TestLockGuard {
            held: Arc::clone(&self.held),
        }
    }
}

pub struct TestLockGuard {
    held: Arc<Mutex<bool>>,
}

impl Drop for TestLockGuard {
    fn drop(&mut self) {
        *self.held.lock().unwrap() = false;
    }
}

impl SyncLock for TestLock {
    type Guard = TestLockGuard;

    fn try_acquire(&self, _name: &str) -> Result<Option<TestLockGuard>, LockError> {
        if self.fail {
            return Err(LockError("lock backend down".to_string()));
        }
        let mut held = self.held.lock().unwrap();
        if *held {
            return Ok(None);
        }
        *held = true;
        Ok(Some(TestLockGuard {
            held: Arc::clone(&self.held),
        }))
    }
}
