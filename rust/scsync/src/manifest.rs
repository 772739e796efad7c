//! The per-run JSON manifest written alongside the rewritten pair.
//!
//! Downstream tools key off two things here: the anomaly tallies, and the
//! `injected_open_bits` pattern that marks the records injected into the
//! trades output (the upstream format prescribes no marker, so the choice is
//! published with every run).

use std::io::Write;

use json_writer::JSONObjectWriter;

use crate::{
    anomaly::AnomalyCounts,
    error::{Error, Result},
    run::RunStatus,
    sync::SyncCounts,
};

/// Everything the manifest records about one `(contract, day)` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunManifest {
    /// The contract symbol the run covered.
    pub symbol: String,
    /// The UTC session day, when the run had one.
    pub day: Option<time::Date>,
    /// How the run ended.
    pub status: RunStatus,
    /// Record counters.
    pub counts: SyncCounts,
    /// Anomaly tallies by kind.
    pub anomalies: AnomalyCounts,
    /// The rolling checksum over the emitted event sequence.
    pub manifest_hash: u64,
}

impl RunManifest {
    /// Renders the manifest as a JSON object.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        {
            let mut writer = JSONObjectWriter::new(&mut out);
            writer.value("symbol", &self.symbol);
            match &self.day {
                Some(day) => writer.value("day", &day.to_string()),
                None => writer.value("day", json_writer::NULL),
            }
            writer.value("status", self.status.as_str());
            writer.value(
                "injected_open_bits",
                &format!("{:#010x}", crate::INJECTED_TICK_BITS),
            );
            writer.value("manifest_hash", &format!("{:016x}", self.manifest_hash));
            {
                let mut counts = writer.object("counts");
                counts.value("trades_in", self.counts.trades_in as u32);
                counts.value("trades_out", self.counts.trades_out as u32);
                counts.value("depth_records_in", self.counts.depth_records_in as u32);
                counts.value("depth_records_out", self.counts.depth_records_out as u32);
                counts.value("depth_batches_in", self.counts.depth_batches_in as u32);
                counts.value("injected", self.counts.injected as u32);
                counts.value("buckets", self.counts.buckets as u32);
                counts.value("unmatched_trades", self.counts.unmatched_trades as u32);
            }
            let mut anomalies = writer.object("anomalies");
            for (kind, count) in self.anomalies.iter() {
                anomalies.value(kind.name(), count as u32);
            }
        }
        out
    }

    /// Writes the rendered manifest, with a trailing newline, to `writer`.
    ///
    /// # Errors
    /// This function returns an error if the write fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer
            .write_all(self.to_json().as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| Error::io(e, "writing run manifest"))
    }
}
