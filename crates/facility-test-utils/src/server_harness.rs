//! Test server harness for E2E testing
//!
//! Provides `TestFacilityServer` for spawning real facility-service
//! instances in tests, with the clock pinned to a [`FixedClock`].

use chrono::{DateTime, Utc};
use facility_service::config::Config;
use facility_service::relay::RelayHub;
use facility_service::routes::{self, AppState};
use facility_service::services::clock::mock::FixedClock;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::PgPool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Relay key configured on every test server.
pub const TEST_RELAY_KEY: &str = "test-relay-key";

/// Test harness for spawning the facility service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[sqlx::test(migrations = "../../migrations")]
/// async fn test_health(pool: PgPool) -> Result<(), anyhow::Error> {
///     let server = TestFacilityServer::spawn(pool).await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestFacilityServer {
    addr: SocketAddr,
    pool: PgPool,
    config: Config,
    clock: Arc<FixedClock>,
    relay: Arc<RelayHub>,
    _handle: JoinHandle<()>,
}

impl TestFacilityServer {
    /// Spawn a server whose clock starts at the current instant.
    pub async fn spawn(pool: PgPool) -> Result<Self, anyhow::Error> {
        Self::spawn_at(pool, Utc::now()).await
    }

    /// Spawn a server whose clock is pinned to `now`.
    pub async fn spawn_at(pool: PgPool, now: DateTime<Utc>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_clock(pool, Arc::new(FixedClock::new(now))).await
    }

    /// Spawn a server reading time from `clock`.
    ///
    /// The server binds to 127.0.0.1 on a random port and uses the default
    /// service time zone (UTC+07:00) and a 15 minute early allowance.
    pub async fn spawn_with_clock(
        pool: PgPool,
        clock: Arc<FixedClock>,
    ) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("RELAY_KEY".to_string(), TEST_RELAY_KEY.to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let relay = Arc::new(RelayHub::new());
        let state = Arc::new(AppState {
            pool: pool.clone(),
            config: config.clone(),
            clock: clock.clone(),
            relay: Arc::clone(&relay),
        });

        // A recorder that is not installed globally, so many servers can
        // coexist in one test process.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            clock,
            relay,
            _handle: handle,
        })
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The clock handlers read "now" from.
    pub fn clock(&self) -> &FixedClock {
        &self.clock
    }

    /// The server's relay hub.
    pub fn relay(&self) -> &RelayHub {
        &self.relay
    }
}

impl Drop for TestFacilityServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_spawns_successfully(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestFacilityServer::spawn(pool).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_provides_pool_access(pool: PgPool) -> Result<(), anyhow::Error> {
        let server = TestFacilityServer::spawn(pool).await?;

        let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(server.pool()).await?;
        assert_eq!(result.0, 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_server_clock_is_pinned(pool: PgPool) -> Result<(), anyhow::Error> {
        use facility_service::services::Clock;

        let at = Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap();
        let server = TestFacilityServer::spawn_at(pool, at).await?;

        assert_eq!(server.clock().now(), at);
        assert_eq!(server.config().early_allowance_minutes, 15);

        Ok(())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_multiple_servers_different_ports(pool: PgPool) -> Result<(), anyhow::Error> {
        let server1 = TestFacilityServer::spawn(pool.clone()).await?;
        let server2 = TestFacilityServer::spawn(pool).await?;

        assert_ne!(server1.addr(), server2.addr());

        let response1 = reqwest::get(format!("{}/health", server1.url())).await?;
        assert_eq!(response1.status(), 200);

        let response2 = reqwest::get(format!("{}/health", server2.url())).await?;
        assert_eq!(response2.status(), 200);

        Ok(())
    }
}
