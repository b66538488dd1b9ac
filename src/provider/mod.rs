// src/provider/mod.rs

//! The capability boundary between the orchestration engine and the
//! translation services it drives.

pub mod http;

pub use http::HttpProvider;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::ProviderDescriptor;
use crate::error::ProviderFailure;

/// One translation call as the provider sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source: String,
    pub target: String,
}

/// Uniform contract every provider adapter implements.
///
/// The descriptor is passed per call, so the dispatcher can hand over a
/// credential-filled copy without touching the shared template.
#[async_trait]
pub trait ProviderCapability: Send + Sync + Debug {
    /// Lightweight reachability check; returns the HTTP status code
    async fn probe(&self, descriptor: &ProviderDescriptor) -> Result<u16, ProviderFailure>;

    /// Perform one translation call
    async fn translate(
        &self,
        descriptor: &ProviderDescriptor,
        request: &TranslationRequest,
    ) -> Result<String, ProviderFailure>;
}

/// A configured provider: its descriptor and the adapter that serves it.
#[derive(Debug, Clone)]
pub struct Provider {
    descriptor: Arc<ProviderDescriptor>,
    adapter: Arc<dyn ProviderCapability>,
}

impl Provider {
    pub fn new(descriptor: ProviderDescriptor, adapter: Arc<dyn ProviderCapability>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            adapter,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &Arc<ProviderDescriptor> {
        &self.descriptor
    }

    pub fn adapter(&self) -> &Arc<dyn ProviderCapability> {
        &self.adapter
    }
}
