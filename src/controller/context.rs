use crate::config::ProvisionerConfig;
use crate::store::Clientset;

/// Shared context for the controller
pub struct Context<P> {
    /// Stores for claims, buckets, ConfigMaps and Secrets
    pub clientset: Clientset,
    /// Storage backend
    pub provisioner: P,
    pub config: ProvisionerConfig,
}

impl<P> Context<P> {
    pub fn new(clientset: Clientset, provisioner: P, config: ProvisionerConfig) -> Self {
        Self {
            clientset,
            provisioner,
            config,
        }
    }
}
