use log::debug;
use tokio::runtime::{Builder, Runtime};
use tonic::transport::{Channel, Endpoint};

use crate::{
    Error, Result,
    proto::{FrameBundle, pointer_service_client::PointerServiceClient},
};

/// Blocking client for the pointer publishing service.
///
/// Owns a current-thread runtime so the frame loop can publish without being
/// async itself; every call blocks until the service acknowledges.
#[derive(Debug)]
pub struct PointerClient {
    runtime: Runtime,
    client: PointerServiceClient<Channel>,
}

impl PointerClient {
    /// Connects to the pointer service at `url`.
    pub fn connect(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let endpoint =
            Endpoint::from_shared(url.clone()).map_err(|_| Error::Endpoint(url.clone()))?;
        let client = runtime
            .block_on(PointerServiceClient::connect(endpoint))
            .map_err(Error::Connect)?;

        debug!(target: "transport", "connected to pointer endpoint {url}");
        Ok(Self { runtime, client })
    }

    /// Publishes one frame's worth of cursor operations.
    pub fn publish(&mut self, bundle: FrameBundle) -> Result<()> {
        self.runtime.block_on(self.client.publish(bundle))?;
        Ok(())
    }
}
