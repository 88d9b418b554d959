//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::combat::CombatStats;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Design-time combat limits for every spawned character
    pub combat: CombatStats,
    /// Respawn countdown after entering ragdoll
    pub respawn_duration: Duration,
    /// Respawn automatically when the countdown fires
    pub auto_respawn: bool,
    /// Authority ticks per second
    pub tick_rate: u32,
    /// Movement capsule half height; the mesh rests this far below its center
    pub capsule_half_height: f32,

    /// Advertised `MatchType` attribute of the hosted session
    pub match_type: String,
    /// Public connection slots of the hosted session
    pub public_connections: u32,
    /// Owning user name of the hosted session
    pub host_name: String,

    /// Allowed client origins for CORS (comma-separated), any if unset
    pub client_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let max_health: f32 = parse_or("MAX_HEALTH", 100.0)?;
        let max_ammo: i32 = parse_or("MAX_AMMO", 5)?;
        let combat = CombatStats::new(max_health, max_ammo)
            .map_err(|_| ConfigError::Invalid("MAX_HEALTH/MAX_AMMO"))?;

        let respawn_secs: f32 = parse_or("RESPAWN_DURATION_SECS", 3.0)?;
        let respawn_duration = Duration::try_from_secs_f32(respawn_secs)
            .map_err(|_| ConfigError::Invalid("RESPAWN_DURATION_SECS"))?;

        let tick_rate: u32 = parse_or("TICK_RATE", 30)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let capsule_half_height: f32 = parse_or("CAPSULE_HALF_HEIGHT", 96.0)?;
        if !(capsule_half_height.is_finite() && capsule_half_height > 0.0) {
            return Err(ConfigError::Invalid("CAPSULE_HALF_HEIGHT"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            combat,
            respawn_duration,
            auto_respawn: parse_or("AUTO_RESPAWN", true)?,
            tick_rate,
            capsule_half_height,

            match_type: env::var("MATCH_TYPE").unwrap_or_else(|_| "FreeForAll".to_string()),
            public_connections: parse_or("PUBLIC_CONNECTIONS", 4)?,
            host_name: env::var("HOST_NAME").unwrap_or_else(|_| "host".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").ok(),
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("COMBAT_STATE_SERVER_TEST_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("COMBAT_STATE_SERVER_TEST_GARBAGE", "many");
        let result: Result<u32, _> = parse_or("COMBAT_STATE_SERVER_TEST_GARBAGE", 7);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid("COMBAT_STATE_SERVER_TEST_GARBAGE"))
        ));
    }
}
