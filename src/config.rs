//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DEFAULT_DEDUCTION_MIN_ORDER` (optional): fallback minimum order
///   subtotal before credits may be deducted, defaults to 1000
/// - `DEFAULT_DEDUCTION_MAX_BPS` (optional): fallback maximum credit
///   coverage in basis points (1000 = 10%), defaults to 1000
///
/// The deduction defaults apply only to merchants without a row in the
/// `deduction_rules` table.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_deduction_min_order")]
    pub default_deduction_min_order: i64,

    #[serde(default = "default_deduction_max_bps")]
    pub default_deduction_max_bps: i32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default minimum order subtotal before any credit deduction is allowed.
fn default_deduction_min_order() -> i64 {
    1000
}

/// Default maximum credit coverage, in basis points of the order subtotal.
fn default_deduction_max_bps() -> i32 {
    1000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}
