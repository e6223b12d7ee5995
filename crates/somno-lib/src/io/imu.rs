use crate::signal::ImuSamples;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::path::Path;

const HEADER: [&str; 3] = ["x", "y", "z"];

/// Read an accelerometer CSV: three `x,y,z` columns, or one column holding an already
/// combined magnitude. A leading header row is optional.
pub fn read_imu_csv(path: &Path) -> Result<ImuSamples> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", row + 1))?;
        if row == 0 && record.iter().any(|f| f.parse::<f64>().is_err()) {
            continue;
        }
        if record.len() != 1 && record.len() != 3 {
            anyhow::bail!("row {} has {} columns, expected 1 or 3", row + 1, record.len());
        }
        let values = record
            .iter()
            .map(|field| {
                field
                    .parse::<f64>()
                    .with_context(|| format!("row {} value is not f64: {}", row + 1, field))
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(values);
    }
    match rows.first().map(Vec::len) {
        None => anyhow::bail!("no accelerometer samples in {}", path.display()),
        Some(1) => Ok(ImuSamples::Magnitude(rows.into_iter().map(|r| r[0]).collect())),
        Some(_) => Ok(ImuSamples::Triaxial(
            rows.into_iter().map(|r| [r[0], r[1], r[2]]).collect(),
        )),
    }
}

/// Write samples as `x,y,z` rows under a header.
pub fn write_imu_csv(path: &Path, samples: &[[f64; 3]]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADER)?;
    for s in samples {
        writer.write_record(s.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
