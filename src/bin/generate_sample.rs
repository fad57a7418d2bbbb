use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Timelike};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Share of cells written as `NA`.
const MISSING_RATE: f64 = 0.02;

/// (column, winter level, summer level, noise, floor)
const POLLUTANT_PROFILES: [(&str, f64, f64, f64, f64); 6] = [
    ("PM2.5", 110.0, 45.0, 30.0, 3.0),
    ("PM10", 140.0, 70.0, 35.0, 3.0),
    ("SO2", 25.0, 3.0, 5.0, 0.5),
    ("NO2", 45.0, 20.0, 10.0, 2.0),
    ("CO", 1800.0, 600.0, 300.0, 100.0),
    ("O3", 20.0, 110.0, 20.0, 0.2),
];

const WIND_DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// 1.0 in mid-January, 0.0 in mid-July.
fn winterness(date: NaiveDate) -> f64 {
    let phase = (date.ordinal() as f64 - 15.0) / 365.25 * 2.0 * std::f64::consts::PI;
    (phase.cos() + 1.0) / 2.0
}

fn format_or_missing(rng: &mut SimpleRng, value: f64) -> String {
    if rng.next_f64() < MISSING_RATE {
        "NA".to_string()
    } else {
        format!("{value:.1}")
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let start = NaiveDate::from_ymd_opt(2013, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start date")?;
    let end = NaiveDate::from_ymd_opt(2017, 2, 28)
        .and_then(|d| d.and_hms_opt(23, 0, 0))
        .context("invalid end date")?;

    let output_path = "sample_air_quality.csv";
    let mut writer = csv::Writer::from_path(output_path).context("creating output file")?;

    let mut header = vec!["No", "year", "month", "day", "hour"];
    header.extend(POLLUTANT_PROFILES.iter().map(|p| p.0));
    header.extend(["TEMP", "PRES", "DEWP", "RAIN", "wd", "WSPM", "station"]);
    writer.write_record(&header).context("writing header")?;

    let mut row_id: u64 = 0;
    let mut ts = start;
    while ts <= end {
        row_id += 1;
        let date = ts.date();
        let w = winterness(date);
        // Pollution peaks overnight when the boundary layer is low.
        let night = if ts.hour() < 6 || ts.hour() > 20 { 1.2 } else { 0.9 };

        let mut record = vec![
            row_id.to_string(),
            date.year().to_string(),
            date.month().to_string(),
            date.day().to_string(),
            ts.hour().to_string(),
        ];
        for &(_, winter, summer, noise, floor) in &POLLUTANT_PROFILES {
            let level = (summer + (winter - summer) * w) * night;
            let value = rng.gauss(level, noise).max(floor);
            record.push(format_or_missing(&mut rng, value));
        }

        let temp = rng.gauss(28.0 - 32.0 * w, 3.0);
        let pres = rng.gauss(1000.0 + 25.0 * w, 4.0);
        let dewp = temp - rng.gauss(10.0, 4.0).abs();
        let rain = if rng.next_f64() < 0.05 * (1.0 - w) {
            rng.gauss(2.0, 1.5).abs()
        } else {
            0.0
        };
        record.push(format_or_missing(&mut rng, temp));
        record.push(format_or_missing(&mut rng, pres));
        record.push(format_or_missing(&mut rng, dewp));
        record.push(format!("{rain:.1}"));
        let wd = (rng.next_u64() % WIND_DIRECTIONS.len() as u64) as usize;
        record.push(WIND_DIRECTIONS[wd].to_string());
        record.push(format!("{:.1}", rng.gauss(1.8, 1.0).abs()));
        record.push("Dingling".to_string());

        writer
            .write_record(&record)
            .with_context(|| format!("writing row {row_id}"))?;
        ts += Duration::hours(1);
    }
    writer.flush().context("flushing output")?;

    println!("Wrote {row_id} hourly observations to {output_path}");
    Ok(())
}
