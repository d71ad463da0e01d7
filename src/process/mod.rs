// src/process/mod.rs

use anyhow::{Context, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::Path,
};
use tracing::{debug, instrument};

/// A decoded Parquet file, held in memory.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Dataset {
    /// Decode an in-memory Parquet file.
    pub fn decode(bytes: Bytes) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .context("reading Parquet footer")?;
        let schema = builder.schema().clone();
        let reader = builder.build().context("building Parquet reader")?;
        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .context("decoding record batches")?;
        Ok(Self { schema, batches })
    }

    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Encode as Snappy-compressed Parquet.
    pub fn write_to<W: std::io::Write + Send>(&self, sink: W) -> Result<W> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(sink, self.schema.clone(), Some(props))
            .context("creating Arrow writer")?;
        for batch in &self.batches {
            writer.write(batch).context("writing record batch")?;
        }
        writer.into_inner().context("closing Arrow writer")
    }

    /// Write to `path`, replacing whatever is there.
    ///
    /// Goes through a hidden temp file in the same directory so a failed write
    /// never leaves a truncated `.parquet` behind.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.display(), rows = self.num_rows()))]
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?;
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_string_lossy();
        let tmp_path = dir.join(format!(".{}.tmp", name));

        let written = File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))
            .and_then(|file| self.write_to(file))
            .and_then(|file| {
                file.sync_all()
                    .with_context(|| format!("syncing {}", tmp_path.display()))
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, path).with_context(|| {
            format!("renaming {} -> {}", tmp_path.display(), path.display())
        })?;
        debug!("persisted");
        Ok(())
    }
}
