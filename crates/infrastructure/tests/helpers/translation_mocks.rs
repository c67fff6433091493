#![allow(dead_code)]
use async_trait::async_trait;
use minke_dns_application::ports::{InterfaceBinder, TranslationSnapshot, TranslationStore};
use minke_dns_domain::DomainError;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Mutex;

/// Tracks which addresses are bound without touching the OS.
#[derive(Default)]
pub struct RecordingBinder {
    bound: Mutex<HashSet<Ipv4Addr>>,
    unbinds: Mutex<Vec<Ipv4Addr>>,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound(&self) -> HashSet<Ipv4Addr> {
        self.bound.lock().unwrap().clone()
    }

    pub fn unbinds(&self) -> Vec<Ipv4Addr> {
        self.unbinds.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterfaceBinder for RecordingBinder {
    async fn bind(&self, address: Ipv4Addr, _prefix: u8) -> Result<(), DomainError> {
        self.bound.lock().unwrap().insert(address);
        Ok(())
    }

    async fn unbind(&self, address: Ipv4Addr, _prefix: u8) -> Result<(), DomainError> {
        self.bound.lock().unwrap().remove(&address);
        self.unbinds.lock().unwrap().push(address);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTranslationStore {
    snapshot: Mutex<Option<TranslationSnapshot>>,
    saves: Mutex<usize>,
}

impl MemoryTranslationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: TranslationSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<TranslationSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl TranslationStore for MemoryTranslationStore {
    async fn load(&self) -> Result<Option<TranslationSnapshot>, DomainError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn save(&self, snapshot: &TranslationSnapshot) -> Result<(), DomainError> {
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
