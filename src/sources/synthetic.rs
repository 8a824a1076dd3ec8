use crate::sources::{send_batches, RowSource};
use crate::types::{Config, EventRecord, GenerativeModel};
use anyhow::Result;
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tokio::sync::mpsc;
use tracing::info;

// Fixed 500ms epoch between generated trades
const SYNTHETIC_EPOCH_US: i64 = 500_000;
const EPOCHS_PER_YEAR: f64 = (365.25 * 24.0 * 60.0 * 60.0 * 1_000_000.0) / SYNTHETIC_EPOCH_US as f64;

/// Generated trade rows, with signal rows interleaved at random
pub struct SyntheticSource {
    model: GenerativeModel,
    seed: Option<u64>,
}

impl SyntheticSource {
    pub fn new(model: GenerativeModel) -> Self {
        Self { model, seed: None }
    }

    /// Reproducible output for a fixed seed
    pub fn with_seed(model: GenerativeModel, seed: u64) -> Self {
        Self { model, seed: Some(seed) }
    }

    pub fn generate_rows(&self, config: &Config) -> Result<Vec<EventRecord>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let from = config.from.timestamp_micros();
        let to = config.to.timestamp_micros();
        let epochs = ((to - from).max(0) / SYNTHETIC_EPOCH_US) as usize;

        let mut rows = Vec::with_capacity(epochs);
        match &self.model {
            GenerativeModel::GBM { mu, sigma, base, signal_rate } => {
                let normal = Normal::new(0.0, 1.0)?;
                let mu_per_epoch = mu / EPOCHS_PER_YEAR;
                let sigma_per_epoch = sigma / EPOCHS_PER_YEAR.sqrt();
                let signal_rate = signal_rate.clamp(0.0, 1.0);

                let mut price = *base;
                let mut timestamp = from;
                for id in 0..epochs {
                    price *= 1.0 + mu_per_epoch + sigma_per_epoch * normal.sample(&mut rng);
                    rows.push(EventRecord {
                        timestamp,
                        value: Some(price),
                        is_trade: Some(true),
                        id: Some(id as i64),
                    });
                    // signals land between trades so ordering stays strict
                    if rng.gen_bool(signal_rate) {
                        rows.push(EventRecord {
                            timestamp: timestamp + SYNTHETIC_EPOCH_US / 2,
                            value: Some(normal.sample(&mut rng)),
                            is_trade: Some(false),
                            id: None,
                        });
                    }
                    timestamp += SYNTHETIC_EPOCH_US;
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for SyntheticSource {
    async fn fetch_rows(&self, config: &Config, tx: mpsc::Sender<Vec<EventRecord>>) -> Result<()> {
        info!("Generating synthetic data using {:?}", self.model);
        let rows = self.generate_rows(config)?;
        let total = send_batches(rows, &tx).await?;
        info!("Generated {} synthetic rows", total);
        Ok(())
    }
}
