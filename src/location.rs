// Device location feed: a reader thread pushes fixes, the UI keeps the latest
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use nmea0183::{ParseResult, Parser, Sentence};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::thread;

use crate::position::Coordinate;

/// Where location fixes come from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LocationSource {
    /// No receiver; Save and recenter stay inert
    #[default]
    None,
    /// A single fix delivered at startup
    Fixed(Coordinate),
    /// NMEA 0183 sentences, one per line (serial device, pipe or log file)
    Nmea(PathBuf),
}

pub struct LocationFeed {
    rx: Receiver<Coordinate>,
    latest: Option<Coordinate>,
    _reader: Option<thread::JoinHandle<()>>,
}

impl LocationFeed {
    pub fn start(source: &LocationSource) -> Result<Self> {
        let (tx, rx) = unbounded();
        let reader = match source {
            LocationSource::None => None,
            LocationSource::Fixed(c) => {
                // Receiver outlives the sender, so this cannot fail
                let _ = tx.send(*c);
                None
            }
            LocationSource::Nmea(path) => Some(spawn_nmea_reader(path.clone(), tx)?),
        };
        log::info!("Location feed started: {:?}", source);
        Ok(Self { rx, latest: None, _reader: reader })
    }

    #[cfg(test)]
    pub fn from_receiver(rx: Receiver<Coordinate>) -> Self {
        Self { rx, latest: None, _reader: None }
    }

    /// Drain pending fixes, keeping only the newest. Returns true if the
    /// latest value changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(c) => {
                    changed |= self.latest != Some(c);
                    self.latest = Some(c);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    pub fn latest(&self) -> Option<Coordinate> {
        self.latest
    }
}

pub fn nmea_parser() -> Parser {
    Parser::new().sentence_filter(Sentence::GGA | Sentence::RMC)
}

/// Parse one NMEA line. Sentences without a fix, other sentence types and
/// checksum failures yield None.
pub fn parse_sentence(parser: &mut Parser, line: &str) -> Option<Coordinate> {
    let line = line.trim();
    if !line.starts_with('$') {
        return None;
    }
    // The parser only completes a sentence on CRLF
    let framed = format!("{}\r\n", line);

    let mut fix = None;
    for result in parser.parse_from_bytes(framed.as_bytes()) {
        match result {
            Ok(ParseResult::GGA(Some(gga))) => {
                fix = Some(Coordinate::new(gga.latitude.as_f64(), gga.longitude.as_f64()));
            }
            Ok(ParseResult::RMC(Some(rmc))) => {
                fix = Some(Coordinate::new(rmc.latitude.as_f64(), rmc.longitude.as_f64()));
            }
            Ok(_) => {}
            Err(e) => {
                log::debug!("NMEA parse error: {:?} in {:?}", e, line);
            }
        }
    }
    fix
}

fn spawn_nmea_reader(path: PathBuf, tx: Sender<Coordinate>) -> Result<thread::JoinHandle<()>> {
    let file = File::open(&path).with_context(|| format!("Failed to open NMEA source {:?}", path))?;

    let handle = thread::Builder::new().name("nmea-reader".to_string()).spawn(move || {
        let mut parser = nmea_parser();
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("NMEA source {:?} read error: {}", path, e);
                    break;
                }
            };
            if let Some(fix) = parse_sentence(&mut parser, &line)
                && tx.send(fix).is_err()
            {
                // UI is gone
                break;
            }
        }
        log::info!("NMEA source {:?} closed", path);
    })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GGA: &str = "$GPGGA,145659.00,5956.695396,N,03022.454999,E,2,07,0.6,9.0,M,18.0,M,,*62";
    const RMC: &str = "$GPRMC,125504.049,A,5542.2389,N,03741.6063,E,0.06,25.82,200906,,,A*56";

    fn assert_close(c: Coordinate, lat: f64, lon: f64) {
        assert!((c.latitude - lat).abs() < 1e-6, "lat {} != {}", c.latitude, lat);
        assert!((c.longitude - lon).abs() < 1e-6, "lon {} != {}", c.longitude, lon);
    }

    #[test]
    fn test_parse_gga_and_rmc() {
        let mut parser = nmea_parser();
        let gga = parse_sentence(&mut parser, GGA).expect("GGA fix");
        assert_close(gga, 59.0 + 56.695396 / 60.0, 30.0 + 22.454999 / 60.0);

        let rmc = parse_sentence(&mut parser, RMC).expect("RMC fix");
        assert_close(rmc, 55.0 + 42.2389 / 60.0, 37.0 + 41.6063 / 60.0);
    }

    #[test]
    fn test_parse_rejects_noise() {
        let mut parser = nmea_parser();
        assert_eq!(parse_sentence(&mut parser, ""), None);
        assert_eq!(parse_sentence(&mut parser, "hello"), None);
        assert_eq!(parse_sentence(&mut parser, "$GPGGA,092750.000,,,,,0,0,,,M,,M,,*41"), None);
        // Bad checksum
        let bad_checksum = GGA.replace("*62", "*00");
        assert_eq!(parse_sentence(&mut parser, &bad_checksum), None);
        // Still usable after garbage
        assert!(parse_sentence(&mut parser, GGA).is_some());
    }

    #[test]
    fn test_poll_keeps_latest_only() {
        let (tx, rx) = unbounded();
        let mut feed = LocationFeed::from_receiver(rx);
        assert!(!feed.poll());
        assert_eq!(feed.latest(), None);

        tx.send(Coordinate::new(1.0, 1.0)).unwrap();
        tx.send(Coordinate::new(2.0, 2.0)).unwrap();
        tx.send(Coordinate::new(3.0, 3.0)).unwrap();
        assert!(feed.poll());
        assert_eq!(feed.latest(), Some(Coordinate::new(3.0, 3.0)));

        // Feed going away keeps the last value
        drop(tx);
        assert!(!feed.poll());
        assert_eq!(feed.latest(), Some(Coordinate::new(3.0, 3.0)));
    }

    #[test]
    fn test_fixed_source() {
        let source = LocationSource::Fixed(Coordinate::new(40.0, -74.0));
        let mut feed = LocationFeed::start(&source).unwrap();
        feed.poll();
        assert_eq!(feed.latest(), Some(Coordinate::new(40.0, -74.0)));

        let mut none = LocationFeed::start(&LocationSource::None).unwrap();
        none.poll();
        assert_eq!(none.latest(), None);
    }

    #[test]
    fn test_nmea_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", GGA).unwrap();
        writeln!(file, "$GPGSV,garbage").unwrap();
        writeln!(file, "{}", RMC).unwrap();
        file.flush().unwrap();

        let source = LocationSource::Nmea(file.path().to_path_buf());
        let mut feed = LocationFeed::start(&source).unwrap();
        // Reader thread runs to EOF then drops the sender
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            feed.poll();
            if feed.latest().map(|c| c.latitude < 56.0).unwrap_or(false) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let latest = feed.latest().expect("fix from file");
        assert_close(latest, 55.0 + 42.2389 / 60.0, 37.0 + 41.6063 / 60.0);
    }

    #[test]
    fn test_missing_nmea_source_is_error() {
        let res = LocationFeed::start(&LocationSource::Nmea(PathBuf::from("/nonexistent/gps0")));
        assert!(res.is_err());
    }
}
