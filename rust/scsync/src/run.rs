//! Day-level orchestration: locating the input pair, driving the
//! synchronizer, atomically publishing the rewritten pair, and writing the
//! manifest.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use crate::{
    anomaly::AnomalyCounts,
    decode::{DepthDecoder, IntradayDecoder},
    encode::{DepthEncoder, IntradayEncoder},
    error::{Error, Result},
    manifest::RunManifest,
    sync::{Synchronizer, UnifiedEvent},
    verify::{self, Expectations, VerifyReport},
};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Both inputs were consumed in full.
    Complete,
    /// An input truncation cut the run short after at least one complete
    /// bucket; everything emitted is still consistent.
    PartiallyComplete,
    /// The run produced no outputs.
    Failed,
}

impl RunStatus {
    /// The status name as it appears in manifests and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::PartiallyComplete => "partially_complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The file set of one `(contract, day)` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPaths {
    /// The intraday input.
    pub trades_in: PathBuf,
    /// The depth input.
    pub depth_in: PathBuf,
    /// The rewritten intraday output.
    pub trades_out: PathBuf,
    /// The rewritten depth output.
    pub depth_out: PathBuf,
    /// The run manifest.
    pub manifest_out: PathBuf,
}

/// Maps `(symbol, day)` to the file set of a run. Implementations own the
/// naming conventions; the core never guesses paths.
pub trait FileLocator {
    /// Resolves the file set for one run.
    ///
    /// # Errors
    /// This function returns an error when no input pair exists for the
    /// given symbol and day.
    fn locate(&self, symbol: &str, day: time::Date) -> Result<DayPaths>;
}

/// The default locator: everything lives in one directory, named
/// `<symbol>.scid` and `<symbol>.<YYYY-MM-DD>.depth`, with rewritten outputs
/// taking a `-SYNC` suffix on the stem.
#[derive(Debug, Clone)]
pub struct DirLocator {
    root: PathBuf,
}

impl DirLocator {
    /// Creates a locator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileLocator for DirLocator {
    fn locate(&self, symbol: &str, day: time::Date) -> Result<DayPaths> {
        if symbol.is_empty() {
            return Err(Error::bad_argument("symbol", "empty"));
        }
        Ok(DayPaths {
            trades_in: self.root.join(format!("{symbol}.scid")),
            depth_in: self.root.join(format!("{symbol}.{day}.depth")),
            trades_out: self.root.join(format!("{symbol}-SYNC.scid")),
            depth_out: self.root.join(format!("{symbol}-SYNC.{day}.depth")),
            manifest_out: self.root.join(format!("{symbol}-SYNC.{day}.manifest.json")),
        })
    }
}

/// Everything a caller learns from a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// How the run ended.
    pub status: RunStatus,
    /// Record counters.
    pub counts: crate::sync::SyncCounts,
    /// Anomaly tallies.
    pub anomalies: AnomalyCounts,
    /// The rolling checksum also written to the manifest.
    pub manifest_hash: u64,
    /// The end-of-run verifier's findings on the rewritten pair.
    pub report: VerifyReport,
}

/// Locates and synchronizes one `(symbol, day)` pair.
///
/// # Errors
/// This function returns an error when locating, decoding, writing,
/// renaming, or verifying fails; partial outputs are removed first.
pub fn run_day(locator: &impl FileLocator, symbol: &str, day: time::Date) -> Result<RunOutcome> {
    run_paths(&locator.locate(symbol, day)?, symbol, Some(day))
}

/// Synchronizes one explicit file set. `day` bounds the depth input when
/// given.
///
/// # Errors
/// This function returns an error when decoding, writing, renaming, or
/// verifying fails; partial outputs are removed first.
pub fn run_paths(paths: &DayPaths, symbol: &str, day: Option<time::Date>) -> Result<RunOutcome> {
    tracing::info!(
        symbol,
        trades = %paths.trades_in.display(),
        depth = %paths.depth_in.display(),
        "starting synchronization run"
    );
    let trades = IntradayDecoder::from_file(&paths.trades_in)?;
    let depth = DepthDecoder::from_file(&paths.depth_in)?;
    let mut sync = Synchronizer::new(trades, depth, day, AnomalyCounts::default());

    let trades_tmp = tmp_path(&paths.trades_out);
    let depth_tmp = tmp_path(&paths.depth_out);
    if let Err(err) = write_outputs(&mut sync, &trades_tmp, &depth_tmp) {
        remove_quietly(&trades_tmp);
        remove_quietly(&depth_tmp);
        return Err(err);
    }
    if let Err(err) = persist(&trades_tmp, &paths.trades_out)
        .and_then(|()| persist(&depth_tmp, &paths.depth_out))
    {
        remove_quietly(&trades_tmp);
        remove_quietly(&depth_tmp);
        remove_quietly(&paths.trades_out);
        remove_quietly(&paths.depth_out);
        return Err(err);
    }

    let counts = sync.counts();
    let manifest_hash = sync.digest();
    let expectations = Expectations {
        trades_in: counts.trades_in,
        depth_records_in: counts.depth_records_in,
        depth_batches_in: counts.depth_batches_in,
        flagged_trades: counts.unmatched_trades,
    };
    let report = verify::check(&paths.trades_out, &paths.depth_out, &expectations)?;
    if report.manifest_hash != manifest_hash {
        tracing::warn!(
            emitted = %format_args!("{manifest_hash:016x}"),
            reread = %format_args!("{:016x}", report.manifest_hash),
            "rolling hash of the rewritten pair differs from the emitted one"
        );
    }

    let status = if sync.is_partial() {
        RunStatus::PartiallyComplete
    } else {
        RunStatus::Complete
    };
    let anomalies = sync.into_sink();
    let manifest = RunManifest {
        symbol: symbol.to_owned(),
        day,
        status,
        counts,
        anomalies: anomalies.clone(),
        manifest_hash,
    };
    let manifest_file = File::create(&paths.manifest_out).map_err(|e| {
        Error::io(
            e,
            format!(
                "creating manifest file at path '{}'",
                paths.manifest_out.display()
            ),
        )
    })?;
    manifest.write_to(BufWriter::new(manifest_file))?;

    tracing::info!(
        symbol,
        status = %status,
        trades_out = counts.trades_out,
        depth_records_out = counts.depth_records_out,
        anomalies = %anomalies,
        verified = report.passed(),
        "synchronization run finished"
    );
    Ok(RunOutcome {
        status,
        counts,
        anomalies,
        manifest_hash,
        report,
    })
}

fn write_outputs<R1, R2>(
    sync: &mut Synchronizer<R1, R2>,
    trades_tmp: &Path,
    depth_tmp: &Path,
) -> Result<()>
where
    R1: std::io::Read,
    R2: std::io::Read,
{
    let trades_header = *sync.trades_header();
    let depth_header = *sync.depth_header();
    let trades_file = File::create(trades_tmp).map_err(|e| {
        Error::io(
            e,
            format!("creating output file at path '{}'", trades_tmp.display()),
        )
    })?;
    let depth_file = File::create(depth_tmp).map_err(|e| {
        Error::io(
            e,
            format!("creating output file at path '{}'", depth_tmp.display()),
        )
    })?;
    let mut trades_enc = IntradayEncoder::new(BufWriter::new(trades_file), &trades_header)?;
    let mut depth_enc = DepthEncoder::new(BufWriter::new(depth_file), &depth_header)?;
    while let Some(event) = sync.next_event()? {
        match event {
            UnifiedEvent::Depth(batch) => depth_enc.encode_batch(&batch)?,
            UnifiedEvent::Tick(record) | UnifiedEvent::InjectedTick(record) => {
                trades_enc.encode_record(&record)?
            }
        }
    }
    trades_enc.flush()?;
    depth_enc.flush()
}

fn persist(tmp: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp, target).map_err(|source| Error::OutputRename {
        src: tmp.to_path_buf(),
        dst: target.to_path_buf(),
        source,
    })
}

fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), %err, "failed to remove partial output");
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_locator_follows_the_naming_convention() {
        let locator = DirLocator::new("/data/sc");
        let day = time::macros::date!(2024 - 03 - 15);
        let paths = locator.locate("ESM4", day).unwrap();
        assert_eq!(paths.trades_in, PathBuf::from("/data/sc/ESM4.scid"));
        assert_eq!(
            paths.depth_in,
            PathBuf::from("/data/sc/ESM4.2024-03-15.depth")
        );
        assert_eq!(paths.trades_out, PathBuf::from("/data/sc/ESM4-SYNC.scid"));
        assert_eq!(
            paths.depth_out,
            PathBuf::from("/data/sc/ESM4-SYNC.2024-03-15.depth")
        );
        assert_eq!(
            paths.manifest_out,
            PathBuf::from("/data/sc/ESM4-SYNC.2024-03-15.manifest.json")
        );
        assert!(locator.locate("", day).is_err());
    }

    #[test]
    fn tmp_names_shadow_the_target() {
        assert_eq!(
            tmp_path(Path::new("/data/sc/ESM4-SYNC.scid")),
            PathBuf::from("/data/sc/ESM4-SYNC.scid.tmp")
        );
    }
}
