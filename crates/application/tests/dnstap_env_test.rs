use ferrous_dnstap_application::dnstap::{DnstapEnv, SendStatus, DEFAULT_VERSION};
use ferrous_dnstap_domain::{DnstapConfig, DnstapMessageType, DomainError, SocketProtocol};
use std::net::SocketAddr;
use std::sync::Arc;

mod helpers;
use helpers::{MockTransport, RecordingCodec, TransportProbe};

fn create_env(worker_count: usize) -> (DnstapEnv, TransportProbe, RecordingCodec) {
    let (transport, probe) = MockTransport::new(worker_count);
    let codec = RecordingCodec::new();
    let env = DnstapEnv::new(Box::new(transport), Arc::new(codec.clone()));
    (env, probe, codec)
}

fn base_config() -> DnstapConfig {
    DnstapConfig {
        enabled: true,
        socket_path: Some("/tmp/dnstap.sock".to_string()),
        ..Default::default()
    }
}

fn client() -> SocketAddr {
    "10.0.0.5:53512".parse().unwrap()
}

// ============================================================================
// Per-worker initialization
// ============================================================================

#[test]
fn test_one_queue_per_worker() {
    let (mut env, _probe, _codec) = create_env(2);
    let mut worker = env.duplicate();

    assert!(env.init().is_ok());
    assert!(worker.init().is_ok());

    let mut extra = env.duplicate();
    assert!(matches!(extra.init(), Err(DomainError::QueueUnavailable)));
    assert!(!extra.is_initialized());
}

#[test]
fn test_uninitialized_env_is_a_no_op() {
    let (mut env, probe, codec) = create_env(1);
    env.apply_config(&DnstapConfig {
        log_client_query_messages: true,
        ..base_config()
    })
    .unwrap();

    let status = env.send_client_query(&client(), SocketProtocol::Udp, &[0u8; 12]);

    assert_eq!(status, SendStatus::NotInitialized);
    assert_eq!(codec.encode_calls(), 0);
    assert_eq!(probe.submission_count(), 0);
}

#[test]
fn test_env_without_queue_after_failed_init_stays_silent() {
    let (mut env, probe, codec) = create_env(1);
    env.apply_config(&DnstapConfig {
        log_client_response_messages: true,
        ..base_config()
    })
    .unwrap();
    let mut first = env.duplicate();
    first.init().unwrap();

    let mut second = env.duplicate();
    assert!(second.init().is_err());

    for _ in 0..3 {
        assert_eq!(
            second.send_client_response(&client(), SocketProtocol::Tcp, b"response"),
            SendStatus::NotInitialized
        );
    }
    assert_eq!(codec.encode_calls(), 0);
    assert_eq!(probe.submission_count(), 0);
}

// ============================================================================
// Shared connection lifetime
// ============================================================================

#[test]
fn test_connection_closes_with_last_environment() {
    let (env, probe, _codec) = create_env(4);
    let peers: Vec<DnstapEnv> = (0..3).map(|_| env.duplicate()).collect();
    let mut all: Vec<DnstapEnv> = std::iter::once(env).chain(peers).collect();
    for worker in all.iter_mut() {
        worker.init().unwrap();
    }
    assert_eq!(all[0].connection_refs(), 4);

    let last = all.pop().unwrap();
    for worker in all {
        drop(worker);
        assert!(!probe.is_closed());
    }
    assert_eq!(last.connection_refs(), 1);

    drop(last);
    assert!(probe.is_closed());
    assert_eq!(probe.shutdown_count(), 1);
}

#[test]
fn test_dropping_absent_environment_is_harmless() {
    let env: Option<DnstapEnv> = None;
    drop(env);
}

#[test]
fn test_uninitialized_environment_still_closes_connection() {
    let (env, probe, _codec) = create_env(1);
    drop(env);
    assert_eq!(probe.shutdown_count(), 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_apply_config_is_idempotent() {
    let cfg = DnstapConfig {
        send_identity: true,
        send_version: true,
        identity: Some("test-host".to_string()),
        log_client_query_messages: true,
        log_forwarder_response_messages: true,
        ..base_config()
    };

    let (mut once, _p1, _c1) = create_env(1);
    once.apply_config(&cfg).unwrap();

    let (mut twice, _p2, _c2) = create_env(1);
    twice.apply_config(&cfg).unwrap();
    twice.apply_config(&cfg).unwrap();

    assert_eq!(once.flags(), twice.flags());
    assert_eq!(once.identity(), twice.identity());
    assert_eq!(once.version(), twice.version());
    assert_eq!(twice.identity(), Some("test-host"));
    assert_eq!(twice.version(), Some(DEFAULT_VERSION));
}

#[test]
fn test_disabled_config_leaves_state_untouched() {
    let (mut env, _probe, _codec) = create_env(1);
    env.apply_config(&DnstapConfig {
        send_identity: true,
        identity: Some("first".to_string()),
        log_resolver_query_messages: true,
        ..base_config()
    })
    .unwrap();

    env.apply_config(&DnstapConfig {
        enabled: false,
        send_identity: true,
        identity: Some("second".to_string()),
        log_client_query_messages: true,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(env.identity(), Some("first"));
    assert!(env.is_enabled(DnstapMessageType::ResolverQuery));
    assert!(!env.is_enabled(DnstapMessageType::ClientQuery));
}

#[test]
fn test_reload_replaces_strings_and_flags() {
    let (mut env, _probe, _codec) = create_env(1);
    env.apply_config(&DnstapConfig {
        send_identity: true,
        send_version: true,
        identity: Some("first".to_string()),
        version: Some("1.0".to_string()),
        log_client_query_messages: true,
        ..base_config()
    })
    .unwrap();

    env.apply_config(&DnstapConfig {
        send_identity: true,
        identity: Some("second".to_string()),
        log_client_response_messages: true,
        ..base_config()
    })
    .unwrap();

    assert_eq!(env.identity(), Some("second"));
    // send_version off on reload: previous value kept
    assert_eq!(env.version(), Some("1.0"));
    assert!(!env.is_enabled(DnstapMessageType::ClientQuery));
    assert!(env.is_enabled(DnstapMessageType::ClientResponse));
}

#[test]
fn test_duplicates_inherit_configuration() {
    let (mut env, _probe, _codec) = create_env(2);
    env.apply_config(&DnstapConfig {
        send_identity: true,
        identity: Some("test-host".to_string()),
        log_forwarder_query_messages: true,
        ..base_config()
    })
    .unwrap();

    let worker = env.duplicate();

    assert_eq!(worker.identity(), Some("test-host"));
    assert_eq!(worker.flags(), env.flags());
}
