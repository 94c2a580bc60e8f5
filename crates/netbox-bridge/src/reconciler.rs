//! Sample reconciliation.
//!
//! The encoder streams at a fixed hardware rate into a FIFO, while the
//! load cell buffers lines at its own rate. One request cycle drains every
//! buffered load-cell line (keeping the newest), reads exactly one encoder
//! entry, and combines both into a [`SampleRow`] with tare and scaling
//! applied.
//!
//! # Channel mapping
//!
//! The row and the HTTP reading reproduce the channel assignment browser
//! clients and existing log files rely on:
//!
//! | Output | Source |
//! |---|---|
//! | log `Load Cell Fx` | raw `fz` / 1000 |
//! | log `Load Cell Fy`, `Fz`, `Tx`, `Ty`, `Tz` | matching raw channel / 1000 |
//! | HTTP `fz` | raw `fy` / 1000 |
//!
//! The first and last lines look like labelling mistakes. They are kept
//! until the consumers of both outputs are migrated.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use netbox_core::{
    AxisIndex, EncoderSample, LoadCellBlock, SampleRow, TareOffsets, format_record_time,
    scale_load,
};
use netbox_hardware::{
    ConfigWriteResult, EncoderDriver, EncoderSession, LoadCellDriver, LoadCellSession,
};

use crate::context::MeasurementContext;
use crate::error::Result;

/// Body of a sample response: the three tared axes and one force channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleResponse {
    pub fz: f64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Row as written to the log.
    pub row: SampleRow,
    /// Raw encoder entry the row was computed from.
    pub encoder: EncoderSample,
    /// Raw load-cell block the row was computed from.
    pub block: LoadCellBlock,
}

impl Reading {
    /// Response body for HTTP clients.
    #[must_use]
    pub fn response(&self) -> SampleResponse {
        SampleResponse {
            fz: scale_load(self.block.fy),
            ax: self.row.ax,
            ay: self.row.ay,
            az: self.row.az,
        }
    }
}

/// Build the log row from one encoder entry and one load-cell block.
#[must_use]
pub fn reconcile(
    encoder: &EncoderSample,
    block: &LoadCellBlock,
    tare: &TareOffsets,
    at: &DateTime<Local>,
) -> SampleRow {
    SampleRow {
        date: format_record_time(at),
        ax: tare.apply(encoder, AxisIndex::X),
        ay: tare.apply(encoder, AxisIndex::Y),
        az: tare.apply(encoder, AxisIndex::Z),
        fx: scale_load(block.fz),
        fy: scale_load(block.fy),
        fz: scale_load(block.fz),
        tx: scale_load(block.tx),
        ty: scale_load(block.ty),
        tz: scale_load(block.tz),
    }
}

/// Owns both device sessions and combines their readings.
#[derive(Debug)]
pub struct SampleReconciler<E: EncoderDriver, L: LoadCellDriver> {
    encoder: EncoderSession<E>,
    load_cell: LoadCellSession<L>,
}

impl<E: EncoderDriver, L: LoadCellDriver> SampleReconciler<E, L> {
    pub fn new(encoder: EncoderSession<E>, load_cell: LoadCellSession<L>) -> Self {
        Self { encoder, load_cell }
    }

    #[must_use]
    pub fn encoder(&self) -> &EncoderSession<E> {
        &self.encoder
    }

    pub fn encoder_mut(&mut self) -> &mut EncoderSession<E> {
        &mut self.encoder
    }

    #[must_use]
    pub fn load_cell(&self) -> &LoadCellSession<L> {
        &self.load_cell
    }

    pub fn load_cell_mut(&mut self) -> &mut LoadCellSession<L> {
        &mut self.load_cell
    }

    /// Read one encoder entry and store its scaled positions as the new
    /// zero reference of `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder session is not ready.
    pub fn tare_encoder(&mut self, ctx: &mut MeasurementContext) -> Result<TareOffsets> {
        let sample = self.encoder.read_cycle()?;
        let tare = TareOffsets::capture(&sample);
        ctx.set_tare(tare);
        info!(x = tare.x, y = tare.y, z = tare.z, "Encoder tare captured");
        Ok(tare)
    }

    /// Zero the load-cell channels on the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the load-cell session is not ready. A rejected
    /// write is reported as [`ConfigWriteResult::Unsuccessful`].
    pub fn tare_load_cell(&mut self) -> Result<ConfigWriteResult> {
        Ok(self.load_cell.tare_zero_offset()?)
    }

    /// Run one reconciliation cycle, appending the row to the log of `ctx`
    /// when `write` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if a session is not ready or the row cannot be
    /// written.
    pub fn sample(
        &mut self,
        ctx: &mut MeasurementContext,
        write: bool,
        at: DateTime<Local>,
    ) -> Result<Reading> {
        let block = self.load_cell.drain_available()?;
        let encoder = self.encoder.read_cycle()?;
        let row = reconcile(&encoder, &block, ctx.tare(), &at);

        if write {
            ctx.append(&row)?;
        }
        debug!(write, ax = row.ax, ay = row.ay, az = row.az, "Sample reconciled");

        Ok(Reading {
            row,
            encoder,
            block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 12).unwrap()
    }

    fn block() -> LoadCellBlock {
        LoadCellBlock {
            timestamp: 1.0,
            fx: 1000.0,
            fy: 2000.0,
            fz: 3000.0,
            tx: 4000.0,
            ty: 5000.0,
            tz: 6000.0,
        }
    }

    #[test]
    fn test_reconcile_scales_and_tares() {
        let encoder = EncoderSample {
            positions: [4_000_000, 2_000_000, -1_000_000, 8_000_000],
            ..Default::default()
        };
        let tare = TareOffsets {
            x: 1.0,
            y: 0.5,
            z: 0.0,
        };
        let row = reconcile(&encoder, &block(), &tare, &at());

        assert_eq!(row.date, "19-10-2026-14:05:12");
        assert_eq!((row.ax, row.ay, row.az), (1.0, 0.5, -0.5));
        assert_eq!((row.tx, row.ty, row.tz), (4.0, 5.0, 6.0));
    }

    #[test]
    fn test_channel_mapping_is_preserved() {
        let row = reconcile(
            &EncoderSample::default(),
            &block(),
            &TareOffsets::default(),
            &at(),
        );
        // Log Fx carries raw fz.
        assert_eq!(row.fx, 3.0);
        assert_eq!(row.fy, 2.0);
        assert_eq!(row.fz, 3.0);

        // HTTP fz carries raw fy.
        let reading = Reading {
            row,
            encoder: EncoderSample::default(),
            block: block(),
        };
        assert_eq!(reading.response().fz, 2.0);
    }
}
