//! Alert threshold configuration and its persistence.

use copytrade_core::store::ConfigStore;
use copytrade_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Config store key holding the serialized thresholds.
pub const THRESHOLDS_KEY: &str = "alert_thresholds";

/// One configurable alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConfig {
    pub enabled: bool,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_trades: Option<u64>,
}

impl ThresholdConfig {
    fn enabled(value: f64) -> Self {
        Self {
            enabled: true,
            value,
            min_trades: None,
        }
    }

    fn apply(&mut self, update: &ThresholdUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(value) = update.value {
            self.value = value;
        }
        if let Some(min_trades) = update.min_trades {
            self.min_trades = Some(min_trades);
        }
    }
}

/// Configurable rules. Rules missing from a stored blob keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertThresholds {
    /// Win-rate drop in percentage points below the historical baseline.
    pub win_rate_drop: ThresholdConfig,
    /// Loss on one trade, in currency units.
    pub single_loss: ThresholdConfig,
    /// Total loss across all trades, in currency units.
    pub cumulative_loss: ThresholdConfig,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            win_rate_drop: ThresholdConfig {
                min_trades: Some(10),
                ..ThresholdConfig::enabled(10.0)
            },
            single_loss: ThresholdConfig::enabled(1000.0),
            cumulative_loss: ThresholdConfig::enabled(5000.0),
        }
    }
}

impl AlertThresholds {
    pub fn get(&self, kind: ThresholdKind) -> &ThresholdConfig {
        match kind {
            ThresholdKind::WinRateDrop => &self.win_rate_drop,
            ThresholdKind::SingleLoss => &self.single_loss,
            ThresholdKind::CumulativeLoss => &self.cumulative_loss,
        }
    }

    fn get_mut(&mut self, kind: ThresholdKind) -> &mut ThresholdConfig {
        match kind {
            ThresholdKind::WinRateDrop => &mut self.win_rate_drop,
            ThresholdKind::SingleLoss => &mut self.single_loss,
            ThresholdKind::CumulativeLoss => &mut self.cumulative_loss,
        }
    }

    /// Merge a validated partial update into one rule.
    pub fn apply(&mut self, kind: ThresholdKind, update: &ThresholdUpdate) {
        self.get_mut(kind).apply(update);
    }

    /// Read thresholds from the store, falling back to defaults on any failure.
    pub async fn load(store: &dyn ConfigStore) -> Self {
        let raw = match store.get(THRESHOLDS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored alert thresholds, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(error = %e, "Config store unavailable, using default alert thresholds");
                return Self::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(thresholds) => thresholds,
            Err(e) => {
                warn!(error = %e, "Stored alert thresholds are unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Write thresholds through to the store.
    pub async fn save(&self, store: &dyn ConfigStore) -> Result<()> {
        let raw = serde_json::to_vec(self)?;
        store
            .set(THRESHOLDS_KEY, raw)
            .await
            .map_err(|e| Error::ConfigUnavailable {
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdKind {
    WinRateDrop,
    SingleLoss,
    CumulativeLoss,
}

impl ThresholdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdKind::WinRateDrop => "winRateDrop",
            ThresholdKind::SingleLoss => "singleLoss",
            ThresholdKind::CumulativeLoss => "cumulativeLoss",
        }
    }

    /// Accepts camelCase or snake_case rule names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "winRateDrop" | "win_rate_drop" => Some(ThresholdKind::WinRateDrop),
            "singleLoss" | "single_loss" => Some(ThresholdKind::SingleLoss),
            "cumulativeLoss" | "cumulative_loss" => Some(ThresholdKind::CumulativeLoss),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update for one rule; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdUpdate {
    pub enabled: Option<bool>,
    pub value: Option<f64>,
    pub min_trades: Option<u64>,
}

impl ThresholdUpdate {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled.is_none() && self.value.is_none() && self.min_trades.is_none() {
            return Err(Error::invalid_input("threshold update has no fields"));
        }
        if let Some(value) = self.value {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_input(format!(
                    "threshold value must be a non-negative number, got {}",
                    value
                )));
            }
        }
        Ok(())
    }
}
