//! Integration tests for bridge port discovery.
//!
//! The real HTTP probe and TOML cache run against `wiremock` servers standing
//! in for the bridge's discovery endpoint.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use skin_monitor::application::{PortCache, PortResolver, PortSource};
use skin_monitor::domain::DiscoveryConfig;
use skin_monitor::infrastructure::{HttpPortProbe, MemoryPortCache, TomlPortCache};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "rose_bridge_port";

async fn discovery_server(route: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

/// A port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config_for(port: u16) -> DiscoveryConfig {
    DiscoveryConfig {
        host: "127.0.0.1".to_string(),
        start_port: port,
        end_port: port,
        probe_timeout: Duration::from_millis(500),
        ..Default::default()
    }
}

fn resolver(config: DiscoveryConfig, cache: Arc<dyn PortCache>) -> PortResolver {
    let probe = HttpPortProbe::new(config.probe_timeout).unwrap();
    PortResolver::new(config, Arc::new(probe), cache)
}

fn temp_cache_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("skin_monitor_it_{}", uuid::Uuid::new_v4()))
        .join("cache.toml")
}

#[tokio::test]
async fn test_scan_finds_bridge_and_persists_port_to_toml() {
    // Arrange
    let server = discovery_server("/bridge-port", "50007").await;
    let cache_path = temp_cache_path();
    let cache = Arc::new(TomlPortCache::new(&cache_path));

    // Act
    let resolution = resolver(config_for(server.address().port()), cache.clone())
        .resolve()
        .await;

    // Assert
    assert_eq!(resolution.source, PortSource::Discovered);
    assert_eq!(resolution.endpoint.port, 50007);
    assert_eq!(resolution.endpoint.url(), "ws://127.0.0.1:50007");
    let written = std::fs::read_to_string(&cache_path).unwrap();
    assert!(written.contains("rose_bridge_port = \"50007\""), "got {written}");

    if let Some(dir) = cache_path.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}

#[tokio::test]
async fn test_cached_port_is_verified_on_its_own_endpoint() {
    // Arrange: the cached port is the discovery server itself; the scan range is dead.
    let server = discovery_server("/bridge-port", "50004").await;
    let cache = Arc::new(MemoryPortCache::with_entry(KEY, &server.address().port().to_string()));

    // Act
    let resolution = resolver(config_for(closed_port()), cache.clone()).resolve().await;

    // Assert
    assert_eq!(resolution.source, PortSource::Cache);
    assert_eq!(resolution.endpoint.port, 50004);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stale_cached_port_is_cleared_before_scanning() {
    // Arrange
    let server = discovery_server("/bridge-port", "50003").await;
    let cache = Arc::new(MemoryPortCache::with_entry(KEY, &closed_port().to_string()));

    // Act
    let resolution = resolver(config_for(server.address().port()), cache.clone())
        .resolve()
        .await;

    // Assert
    assert_eq!(resolution.source, PortSource::Discovered);
    assert_eq!(resolution.endpoint.port, 50003);
    assert_eq!(cache.removals(), 1);
    assert_eq!(cache.get(KEY).as_deref(), Some("50003"));
}

#[tokio::test]
async fn test_legacy_endpoint_is_scanned_after_primary() {
    // Arrange: an old bridge that only knows `/port`.
    let server = discovery_server("/port", " 50002 \n").await;
    let cache = Arc::new(MemoryPortCache::new());

    // Act
    let resolution = resolver(config_for(server.address().port()), cache.clone())
        .resolve()
        .await;

    // Assert
    assert_eq!(resolution.source, PortSource::Legacy);
    assert_eq!(resolution.endpoint.port, 50002);
    assert_eq!(cache.get(KEY).as_deref(), Some("50002"));

    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/bridge-port", "/port"]);
}

#[tokio::test]
async fn test_error_status_and_bad_body_fall_back_to_default() {
    // Arrange: `/bridge-port` fails with 500, `/port` answers garbage.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bridge-port"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/port"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not-a-port"))
        .mount(&server)
        .await;
    let cache = Arc::new(MemoryPortCache::new());
    let config = DiscoveryConfig {
        default_port: 50000,
        ..config_for(server.address().port())
    };

    // Act
    let resolution = resolver(config, cache.clone()).resolve().await;

    // Assert
    assert_eq!(resolution.source, PortSource::Default);
    assert_eq!(resolution.endpoint.port, 50000);
    assert_eq!(cache.get(KEY), None);
}

#[tokio::test]
async fn test_silent_port_costs_one_probe_timeout() {
    // Arrange: a server that never answers in time.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("50000").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;
    let config = DiscoveryConfig {
        probe_timeout: Duration::from_millis(200),
        ..config_for(server.address().port())
    };

    // Act
    let started = std::time::Instant::now();
    let resolution = resolver(config, Arc::new(MemoryPortCache::new())).resolve().await;

    // Assert: two probes (primary + legacy), each cut off at the timeout.
    assert_eq!(resolution.source, PortSource::Default);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_hand_written_integer_port_is_read_from_toml() {
    // Arrange: `rose_bridge_port = <port>` without quotes.
    let server = discovery_server("/bridge-port", "50006").await;
    let cache_path = temp_cache_path();
    std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    std::fs::write(&cache_path, format!("rose_bridge_port = {}\n", server.address().port())).unwrap();

    // Act
    let resolution = resolver(config_for(closed_port()), Arc::new(TomlPortCache::new(&cache_path)))
        .resolve()
        .await;

    // Assert
    assert_eq!(resolution.source, PortSource::Cache);
    assert_eq!(resolution.endpoint.port, 50006);

    if let Some(dir) = cache_path.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}

#[tokio::test]
async fn test_unparseable_cache_file_is_reset_when_nothing_answers() {
    // Arrange
    let cache_path = temp_cache_path();
    std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    std::fs::write(&cache_path, "rose_bridge_port = [[[\n").unwrap();
    let cache = Arc::new(TomlPortCache::new(&cache_path));

    // Act
    let resolution = resolver(config_for(closed_port()), cache.clone()).resolve().await;

    // Assert: the broken entry does not survive to the next start.
    assert_eq!(resolution.source, PortSource::Default);
    assert_eq!(cache.load(KEY).unwrap(), None);

    if let Some(dir) = cache_path.parent() {
        std::fs::remove_dir_all(dir).ok();
    }
}
