//! Where emitted signals go.
//!
//! Chat and spreadsheet delivery are out of process; these sinks write the
//! same payloads to any `io::Write` so a wrapper script can forward them.

use std::io::Write;

use thiserror::Error;

use crate::engine::TradeSignal;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON encode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encode failed: {0}")]
    Csv(#[from] csv::Error),
}

pub trait SignalSink {
    fn emit(&mut self, signal: &TradeSignal) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SignalSink for JsonLinesSink<W> {
    fn emit(&mut self, signal: &TradeSignal) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.out, signal)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.out.flush()?)
    }
}

/// Spreadsheet rows, one per signal, in the journal's column order.
pub const SHEET_COLUMNS: [&str; 15] = [
    "timestamp",
    "symbol",
    "direction",
    "price",
    "stop_loss",
    "target",
    "quantity",
    "ema_fast",
    "ema_mid",
    "ema_slow",
    "adx",
    "atr",
    "volume",
    "volume_avg",
    "win_rate",
];

pub struct SheetRowSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SheetRowSink<W> {
    /// `with_header` writes the column names first (skip it when appending
    /// to an existing sheet).
    pub fn new(out: W, with_header: bool) -> Result<Self, SinkError> {
        let mut writer = csv::Writer::from_writer(out);
        if with_header {
            writer.write_record(SHEET_COLUMNS)?;
        }
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

/// Row cells for `signal`; undefined values are empty cells.
pub fn sheet_row(signal: &TradeSignal) -> [String; 15] {
    let num = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();
    let s = &signal.indicator_snapshot;
    [
        signal.generated_at.to_rfc3339(),
        signal.symbol.clone(),
        signal.direction.to_string(),
        format!("{:.2}", signal.price),
        format!("{:.2}", signal.stop_loss),
        format!("{:.2}", signal.target),
        signal.quantity.to_string(),
        num(s.ema_fast),
        num(s.ema_mid),
        num(s.ema_slow),
        num(s.adx),
        num(s.atr),
        s.volume.map(|v| format!("{v:.0}")).unwrap_or_default(),
        s.volume_avg.map(|v| format!("{v:.0}")).unwrap_or_default(),
        num(signal.win_rate_estimate),
    ]
}

impl<W: Write> SignalSink for SheetRowSink<W> {
    fn emit(&mut self, signal: &TradeSignal) -> Result<(), SinkError> {
        self.writer.write_record(sheet_row(signal))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.writer.flush()?)
    }
}

/// Human-readable alert text, blank line between signals.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SignalSink for TextSink<W> {
    fn emit(&mut self, signal: &TradeSignal) -> Result<(), SinkError> {
        writeln!(self.out, "{signal}\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(self.out.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Direction;
    use crate::snapshot::IndicatorSnapshot;
    use chrono::{TimeZone, Utc};

    fn signal() -> TradeSignal {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap();
        TradeSignal {
            symbol: "INFY.NS".into(),
            direction: Direction::Buy,
            price: 1500.0,
            stop_loss: 1470.0,
            target: 1560.0,
            secondary_target: None,
            quantity: 50,
            risk_amount: 1000.0,
            risk_pct: 1.0,
            confidence: 70,
            win_rate_estimate: None,
            indicator_snapshot: IndicatorSnapshot {
                close: Some(1500.0),
                ema_fast: Some(1490.0),
                ema_mid: Some(1450.0),
                ema_slow: Some(1400.0),
                adx: Some(31.25),
                atr: Some(20.0),
                rsi: Some(62.0),
                volume: Some(1_200_000.0),
                volume_avg: None,
            },
            bar_timestamp: ts,
            generated_at: ts,
        }
    }

    #[test]
    fn json_lines_one_per_signal() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&signal()).unwrap();
        sink.emit(&signal()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["direction"], "BUY");
        assert_eq!(value["quantity"], 50);
        assert!(value["win_rate_estimate"].is_null());
    }

    #[test]
    fn sheet_row_column_order() {
        let mut sink = SheetRowSink::new(Vec::new(), true).unwrap();
        sink.emit(&signal()).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), SHEET_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "2024-05-06T10:00:00+00:00,INFY.NS,BUY,1500.00,1470.00,1560.00,50,\
             1490.00,1450.00,1400.00,31.25,20.00,1200000,,"
        );
    }

    #[test]
    fn text_sink_uses_alert_format() {
        let mut out = Vec::new();
        TextSink::new(&mut out).emit(&signal()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("INFY.NS: BUY"));
        assert!(text.contains("Win rate: N/A"));
    }
}
