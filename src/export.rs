use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use dipole_sim::geometry::Vec3;
use dipole_sim::{BlockRecord, BlockSummary, ResultSink, SinkError, SnapshotRecord, SnapshotSink};
use serde::Serialize;
use serde_json::json;

fn write_line<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> Result<(), SinkError> {
    serde_json::to_writer(&mut *w, value).map_err(|e| SinkError::Encode(e.to_string()))?;
    w.write_all(b"\n")?;
    Ok(())
}

/// One JSON object per block record, one record per line.
pub struct JsonLinesResults<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesResults<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesResults<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ResultSink for JsonLinesResults<W> {
    fn record(&mut self, record: &BlockRecord) -> Result<(), SinkError> {
        write_line(&mut self.writer, record)
    }

    fn finish(&mut self, _realization: usize) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Snapshot stream: a header line with the site positions of each
/// realization, then one line per snapshot.
pub struct JsonLinesSnapshots<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSnapshots<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSnapshots<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SnapshotSink for JsonLinesSnapshots<W> {
    fn begin(&mut self, realization: usize, positions: &[Vec3]) -> Result<(), SinkError> {
        let positions: Vec<[f32; 3]> = positions.iter().map(|p| (*p).into()).collect();
        let header = json!({
            "realization": realization,
            "sites": positions.len(),
            "positions": positions,
        });
        write_line(&mut self.writer, &header)
    }

    fn snapshot(&mut self, snapshot: &SnapshotRecord) -> Result<(), SinkError> {
        write_line(&mut self.writer, snapshot)
    }

    fn finish(&mut self, _realization: usize) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write the cross-realization averages as a pretty-printed JSON array.
pub fn write_summary(path: impl AsRef<Path>, summary: &[BlockSummary]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, summary)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dipole_sim::BlockAggregate;
    use serde_json::Value;

    fn record(sample: usize) -> BlockRecord {
        BlockRecord {
            realization: 1,
            sample,
            sites: 900,
            lambda: 0.25,
            time: 12.5,
            theta: 0.0,
            energy: -0.1,
            magnetization: 0.5,
            binder: 0.2,
            field: [0.0, 0.0, 1.0],
            m_planar: 0.3,
            m: [0.3, 0.0, 0.4],
        }
    }

    #[test]
    fn test_results_are_one_object_per_line() {
        let mut sink = JsonLinesResults::new(Vec::new());
        sink.record(&record(0)).unwrap();
        sink.record(&record(1)).unwrap();
        sink.finish(1).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(v["sample"], 1);
        assert_eq!(v["sites"], 900);
        assert_eq!(v["lambda"], 0.25);
        assert_eq!(v["field"][2], 1.0);
    }

    #[test]
    fn test_snapshot_header_then_records() {
        let mut sink = JsonLinesSnapshots::new(Vec::new());
        sink.begin(0, &[Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)])
            .unwrap();
        sink.snapshot(&SnapshotRecord {
            realization: 0,
            step: 40,
            lambda: 0.5,
            time: 0.15625,
            energy: -0.2,
            directions: vec![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
        })
        .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sites"], 2);
        assert_eq!(lines[0]["positions"][1][0], 1.0);
        assert_eq!(lines[1]["step"], 40);
        assert_eq!(lines[1]["directions"][0][2], 1.0);
    }

    #[test]
    fn test_summary_file() {
        let path = std::env::temp_dir().join(format!("rbm_{}_summary.json", std::process::id()));
        let summary = BlockAggregate::aggregate(&[vec![record(0), record(1)]]);
        write_summary(&path, &summary).unwrap();

        let v: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);
        assert_eq!(v[0]["n_realizations"], 1);
        std::fs::remove_file(&path).unwrap();
    }
}
