//! Layered application configuration: compiled-in defaults, an optional
//! `AmbonMUD.toml` file, then `AMBONMUD_`-prefixed environment variables
//! (via the `config` crate), with `.env` loaded first via `dotenvy`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Deployment-facing options: ports, channel capacities, telnet framing
/// limits, prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub telnet_port: u16,
    pub web_port: u16,
    pub web_host: String,
    pub inbound_channel_capacity: usize,
    pub outbound_channel_capacity: usize,
    pub session_outbound_queue_capacity: usize,
    pub telnet_line_max_length: usize,
    pub telnet_max_non_printable_per_line: usize,
    pub telnet_read_buffer_bytes: usize,
    pub web_stop_grace_period_millis: u64,
    pub web_stop_timeout_millis: u64,
    pub web_max_close_reason_length: usize,
    pub prompt_text: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            telnet_port: 4000,
            web_port: 4001,
            web_host: "0.0.0.0".to_string(),
            inbound_channel_capacity: 1024,
            outbound_channel_capacity: 1024,
            session_outbound_queue_capacity: 256,
            telnet_line_max_length: 1024,
            telnet_max_non_printable_per_line: 32,
            telnet_read_buffer_bytes: 4096,
            web_stop_grace_period_millis: 2_000,
            web_stop_timeout_millis: 5_000,
            web_max_close_reason_length: 120,
            prompt_text: "> ".to_string(),
        }
    }
}

/// Per-tier mob stat formula: `stat_at_level = base + (level - 1) * per_level`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobTierDef {
    pub base_hp: i64,
    pub per_level_hp: i64,
    pub base_min_damage: i64,
    pub per_level_min_damage: i64,
    pub base_max_damage: i64,
    pub per_level_max_damage: i64,
    pub base_armor: i64,
    pub per_level_armor: i64,
}

impl MobTierDef {
    pub fn at_level(&self, level: i64) -> (i64, i64, i64, i64) {
        let steps = (level - 1).max(0);
        (
            self.base_hp + steps * self.per_level_hp,
            self.base_min_damage + steps * self.per_level_min_damage,
            self.base_max_damage + steps * self.per_level_max_damage,
            self.base_armor + steps * self.per_level_armor,
        )
    }
}

impl Default for MobTierDef {
    fn default() -> Self {
        Self {
            base_hp: 20,
            per_level_hp: 8,
            base_min_damage: 1,
            per_level_min_damage: 1,
            base_max_damage: 3,
            per_level_max_damage: 1,
            base_armor: 0,
            per_level_armor: 0,
        }
    }
}

/// Gameplay-facing options: tick timing, scheduler caps, regen constants,
/// behavior-tree timing, the mob tier table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameplayConfig {
    pub engine_tick_millis: u64,
    pub inbound_budget_ms: u64,
    pub scheduler_max_actions_per_tick: usize,
    pub behavior_max_actions_per_tick: usize,
    pub behavior_min_action_delay_ms: i64,
    pub behavior_max_action_delay_ms: i64,
    pub combat_round_millis: i64,
    pub regen_interval_millis: i64,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default = "default_mob_tiers")]
    pub mob_tiers: std::collections::BTreeMap<String, MobTierDef>,
}

fn default_max_level() -> u32 {
    50
}

fn default_mob_tiers() -> std::collections::BTreeMap<String, MobTierDef> {
    let mut tiers = std::collections::BTreeMap::new();
    tiers.insert("standard".to_string(), MobTierDef::default());
    tiers.insert(
        "elite".to_string(),
        MobTierDef {
            base_hp: 60,
            per_level_hp: 18,
            base_min_damage: 3,
            per_level_min_damage: 2,
            base_max_damage: 7,
            per_level_max_damage: 2,
            base_armor: 2,
            per_level_armor: 1,
        },
    );
    tiers
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            engine_tick_millis: 100,
            inbound_budget_ms: 40,
            scheduler_max_actions_per_tick: 256,
            behavior_max_actions_per_tick: 64,
            behavior_min_action_delay_ms: 2_000,
            behavior_max_action_delay_ms: 5_000,
            combat_round_millis: 2_000,
            regen_interval_millis: 10_000,
            max_level: default_max_level(),
            mob_tiers: default_mob_tiers(),
        }
    }
}

impl GameplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbound_budget_ms == 0 || self.inbound_budget_ms >= self.engine_tick_millis {
            return Err(ConfigError::Invalid(format!(
                "inboundBudgetMs ({}) must be > 0 and < engineTickMillis ({})",
                self.inbound_budget_ms, self.engine_tick_millis
            )));
        }
        Ok(())
    }
}

/// Observability-facing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityConfig {
    pub metrics_endpoint: Option<String>,
    pub static_tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_endpoint: None,
            static_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub gameplay: GameplayConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Directory of zone documents the world loader reads at startup.
    #[serde(default = "default_world_dir")]
    pub world_dir: String,
    /// Path to the SQLite database backing the reference player repository.
    #[serde(default = "default_player_db_path")]
    pub player_db_path: String,
}

fn default_world_dir() -> String {
    "world".to_string()
}

fn default_player_db_path() -> String {
    "ambonmud.db".to_string()
}

impl AppConfig {
    /// Load an optional `AmbonMUD.toml`, then `AMBONMUD__`-prefixed
    /// environment variables (after loading a `.env` file if present).
    /// Fields missing from every source fall back to the compiled-in
    /// defaults on each sub-config.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("AmbonMUD").required(false))
            .add_source(config::Environment::with_prefix("AMBONMUD").separator("__"));

        let loaded: AppConfig = builder.build()?.try_deserialize()?;
        loaded.gameplay.validate()?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gameplay_config_rejects_budget_exceeding_tick() {
        let mut cfg = GameplayConfig::default();
        cfg.inbound_budget_ms = cfg.engine_tick_millis;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gameplay_config_rejects_zero_budget() {
        let mut cfg = GameplayConfig::default();
        cfg.inbound_budget_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gameplay_config_accepts_defaults() {
        assert!(GameplayConfig::default().validate().is_ok());
    }
}
