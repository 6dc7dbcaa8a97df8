//! dnstap adapters: protobuf encoding and the Frame Streams transport.

pub mod codec;
pub mod frame_stream;
pub mod schema;

pub use codec::ProtobufCodec;
pub use ferrous_dnstap_domain::DEFAULT_MAX_FRAME_SIZE;
pub use frame_stream::{FrameStreamOptions, FrameStreamStats, FrameStreamTransport};

use ferrous_dnstap_application::dnstap::DnstapEnv;
use ferrous_dnstap_domain::DnstapTarget;
use std::sync::Arc;
use tracing::{debug, info};

/// Open the collector connection and wrap it in a prototype environment.
///
/// `num_workers` delivery queues are provisioned; give each worker its own
/// [`DnstapEnv::duplicate`] and call `init` on it. Returns `None` when the
/// collector cannot be reached.
pub fn create_dnstap_env(
    target: &DnstapTarget,
    num_workers: usize,
    options: FrameStreamOptions,
) -> Option<DnstapEnv> {
    create_dnstap_env_with_stats(target, num_workers, options).map(|(env, _)| env)
}

/// [`create_dnstap_env`], also returning the transport counters.
pub fn create_dnstap_env_with_stats(
    target: &DnstapTarget,
    num_workers: usize,
    options: FrameStreamOptions,
) -> Option<(DnstapEnv, Arc<FrameStreamStats>)> {
    info!(collector = %target, "opening dnstap socket");

    let codec = ProtobufCodec::with_max_frame_size(options.max_frame_size);
    match FrameStreamTransport::establish(target, num_workers, options) {
        Ok(transport) => {
            let stats = transport.stats();
            let env = DnstapEnv::new(Box::new(transport), Arc::new(codec));
            Some((env, stats))
        }
        Err(e) => {
            debug!(collector = %target, error = %e, "dnstap: failed to open collector socket");
            None
        }
    }
}
