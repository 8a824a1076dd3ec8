use series_engine::types::{Config, DataSource, GenerativeModel, Interval, Operator, OutputFormat};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveTime, Utc};
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV or Parquet file, or a generator such as `gbm(0.05,0.6,100,0.01)`
    #[arg(long, default_value = "gbm(0.05,0.6,100,0.01)")]
    pub source: String,

    /// uniform, gapfill, performance or asof
    #[arg(long, default_value = "uniform")]
    pub operator: String,

    #[arg(long, default_value = "5 seconds")]
    pub step: String,

    #[arg(long, default_value = "1 minute")]
    pub retention: String,

    /// Explicit resampling start, as a date or RFC 3339 timestamp
    #[arg(long)]
    pub start: Option<String>,

    /// Hold the earlier value between observations instead of interpolating
    #[arg(long)]
    pub constant: bool,

    #[arg(long)]
    pub include_original: bool,

    /// As-of: any row with both a value and an id is a quote
    #[arg(long)]
    pub separate_rows: bool,

    #[arg(long, default_value = "yesterday")]
    pub from: String,

    #[arg(long, default_value = "today")]
    pub to: String,

    #[arg(long, default_value = "parquet")]
    pub out_format: String,

    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let from = parse_datetime(&self.from)?;
        let to = parse_datetime(&self.to)?;
        if to <= from {
            anyhow::bail!("--to must be after --from");
        }

        let operator = match self.operator.as_str() {
            "uniform" => Operator::Uniform,
            "gapfill" | "gap-filled" => Operator::GapFilled,
            "performance" => Operator::Performance,
            "asof" => Operator::AsOf,
            other => return Err(anyhow!("Invalid operator: {}", other)),
        };

        let out_format = match self.out_format.as_str() {
            "parquet" => OutputFormat::Parquet,
            "csv" => OutputFormat::Csv,
            other => return Err(anyhow!("Invalid output format: {}", other)),
        };

        let step: Interval = self.step.parse()?;
        let retention: Interval = self.retention.parse()?;
        // fail fast instead of on the first row
        match operator {
            Operator::Uniform | Operator::GapFilled => {
                step.step_seconds()?;
            }
            Operator::Performance => {
                retention.retention_micros()?;
            }
            Operator::AsOf => {}
        }

        let start = self.start.as_deref().map(parse_datetime).transpose()?;

        Ok(Config {
            source: parse_data_source(&self.source)?,
            operator,
            step,
            retention,
            start,
            constant: self.constant,
            include_original: self.include_original,
            separate_rows: self.separate_rows,
            from,
            to,
            out_format,
            output_dir: self.output_dir,
        })
    }
}

fn midnight(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    use chrono::Duration;

    let now = Utc::now();
    let days_ago = Regex::new(r"^(\d+)-days-ago$")?;

    match s {
        "now" => Ok(now),
        "today" => Ok(midnight(now.date_naive())),
        "yesterday" => Ok(midnight((now - Duration::days(1)).date_naive())),
        _ => {
            if let Some(caps) = days_ago.captures(s) {
                let days: i64 = caps[1].parse()?;
                return Ok(midnight((now - Duration::days(days)).date_naive()));
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            Ok(DateTime::parse_from_str(&format!("{} 00:00:00 +0000", s), "%Y-%m-%d %H:%M:%S %z")?
                .with_timezone(&Utc))
        }
    }
}

pub fn parse_data_source(source: &str) -> Result<DataSource> {
    let gbm_re = Regex::new(r"^gbm\(([^,]+),([^,]+),([^,]+),([^)]+)\)$")?;

    if let Some(caps) = gbm_re.captures(source) {
        let signal_rate: f64 = caps[4].trim().parse()?;
        if !(0.0..=1.0).contains(&signal_rate) {
            anyhow::bail!("signal rate must be within [0, 1], got {}", signal_rate);
        }
        Ok(DataSource::Synthetic(GenerativeModel::GBM {
            mu: caps[1].trim().parse()?,
            sigma: caps[2].trim().parse()?,
            base: caps[3].trim().parse()?,
            signal_rate,
        }))
    } else {
        Ok(DataSource::File(PathBuf::from(source)))
    }
}
