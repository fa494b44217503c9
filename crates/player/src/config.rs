//! Client configuration

use std::env;
use std::str::FromStr;

use crate::coords::{Size, Viewport};
use crate::error::{ClientError, Result};
use crate::infrastructure::messaging::CorrelationPolicy;
use crate::infrastructure::websocket::parse_server_url;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8001/ws";
pub const DEFAULT_MAP_WIDTH: u32 = 1000;
pub const DEFAULT_MAP_HEIGHT: u32 = 683;
pub const DEFAULT_TOKEN_SIZE: u32 = 48;

/// Client configuration loaded from environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the battle server
    pub server_url: String,
    /// How responses are matched to requests
    pub correlation: CorrelationPolicy,
    /// Native size of the reference map image
    pub map_size: Size,
    /// Token edge length in render pixels
    pub token_size: u32,
    /// Initial render surface, if the presentation already knows it
    pub surface: Option<Size>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            correlation: CorrelationPolicy::default(),
            map_size: Size::new(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT),
            token_size: DEFAULT_TOKEN_SIZE,
            surface: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// - `BATTLEMAP_SERVER_URL` (default `ws://localhost:8001/ws`)
    /// - `BATTLEMAP_CORRELATION`: `per-request` (default) or `per-action`
    /// - `BATTLEMAP_MAP_WIDTH` / `BATTLEMAP_MAP_HEIGHT` (default 1000 x 683)
    /// - `BATTLEMAP_TOKEN_SIZE` (default 48)
    /// - `BATTLEMAP_SURFACE_WIDTH` / `BATTLEMAP_SURFACE_HEIGHT` (unset = unmeasured)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let server_url = var("BATTLEMAP_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.into());
        parse_server_url(&server_url)?;

        let correlation = parsed(&var, "BATTLEMAP_CORRELATION")?.unwrap_or_default();
        let map_size = Size::new(
            positive(&var, "BATTLEMAP_MAP_WIDTH")?.unwrap_or(DEFAULT_MAP_WIDTH),
            positive(&var, "BATTLEMAP_MAP_HEIGHT")?.unwrap_or(DEFAULT_MAP_HEIGHT),
        );
        let token_size = parsed(&var, "BATTLEMAP_TOKEN_SIZE")?.unwrap_or(DEFAULT_TOKEN_SIZE);

        let surface = match (
            positive(&var, "BATTLEMAP_SURFACE_WIDTH")?,
            positive(&var, "BATTLEMAP_SURFACE_HEIGHT")?,
        ) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            (None, None) => None,
            _ => {
                return Err(ClientError::Config {
                    var: "BATTLEMAP_SURFACE_WIDTH",
                    reason: "surface width and height must be set together".into(),
                })
            }
        };

        Ok(Self {
            server_url,
            correlation,
            map_size,
            token_size,
            surface,
        })
    }

    /// Viewport for a new session.
    pub fn viewport(&self) -> Viewport {
        match self.surface {
            Some(surface) => Viewport::measured(self.map_size, surface, self.token_size),
            None => Viewport::unmeasured(self.map_size, self.token_size),
        }
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ClientError::Config {
                var: key,
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

fn positive(var: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<u32>> {
    match parsed::<u32>(var, key)? {
        Some(0) => Err(ClientError::Config {
            var: key,
            reason: "must be greater than zero".into(),
        }),
        other => Ok(other),
    }
}
