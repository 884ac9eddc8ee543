// src/engine.rs
use crate::drivers::{
    ByteSource, HistoryBuffer, PlotterError, SamplePipeline, SeriesRegistry, SeriesView,
};
use crate::recorder::CsvRecorder;
use crate::serial::{self, PortOpener, RetryPolicy};
use crate::types::*;
use std::io::ErrorKind;
use std::path::PathBuf;

// 单次读取的缓冲大小
const READ_CHUNK: usize = 4096;

/// Owns the serial link, the sample pipeline and the CSV recorder.
///
/// Everything runs on the caller's thread: `tick` drains whatever bytes have
/// arrived since the last call and returns immediately.
pub struct PlotterEngine {
    pipeline: SamplePipeline,
    link: Option<Box<dyn ByteSource>>,
    port_name: String,
    running: bool,
    recorder: CsvRecorder,
    // None = 不记录 CSV
    csv_target: Option<PathBuf>,
    read_buf: Vec<u8>,
}

impl PlotterEngine {
    pub fn new(max_points: usize) -> Result<Self, PlotterError> {
        Ok(Self {
            pipeline: SamplePipeline::with_max_points(max_points)?,
            ..Self::default()
        })
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.link, self.running) {
            (None, _) => ConnectionState::Disconnected,
            (Some(_), true) => ConnectionState::Connected(RunState::Running),
            (Some(_), false) => ConnectionState::Connected(RunState::Paused),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn buffer(&self) -> &HistoryBuffer {
        self.pipeline.buffer()
    }

    pub fn registry(&self) -> &SeriesRegistry {
        self.pipeline.registry()
    }

    pub fn registry_mut(&mut self) -> &mut SeriesRegistry {
        self.pipeline.registry_mut()
    }

    pub fn recorder(&self) -> &CsvRecorder {
        &self.recorder
    }

    /// CSV file for the next connection; `None` turns logging off.
    pub fn set_csv_target(&mut self, target: Option<PathBuf>) {
        self.csv_target = target;
    }

    pub fn set_max_points(&mut self, max_points: usize) -> Result<(), PlotterError> {
        self.pipeline.set_max_points(max_points)
    }

    pub fn clear(&mut self) {
        self.pipeline.clear();
    }

    /// Open the port (with retries) and start running.
    ///
    /// If the port opens but the CSV file does not, the link stays up in the
    /// paused state and the CSV error is returned.
    pub fn connect(
        &mut self,
        opener: &dyn PortOpener,
        port: &str,
        baud: u32,
        policy: RetryPolicy,
    ) -> Result<(), PlotterError> {
        self.disconnect();
        let link = serial::open_with_retry(opener, port, baud, policy, |attempt, err| {
            log::warn!("Connection attempt {attempt} to {port} failed ({err}). Retrying...");
        })?;
        self.attach(link, port);
        log::info!("✅ Connected to {port} @ {baud}");
        self.start_running()
    }

    /// Adopt an already opened link; the engine starts paused.
    pub fn attach(&mut self, link: Box<dyn ByteSource>, port: &str) {
        self.disconnect();
        self.pipeline.clear();
        self.link = Some(link);
        self.port_name = port.to_owned();
        self.running = false;
    }

    pub fn disconnect(&mut self) {
        if self.link.take().is_some() {
            log::info!("Disconnected from {}", self.port_name);
        }
        self.running = false;
        self.recorder.stop();
    }

    /// Flip Run/Pause; returns whether the engine is now running.
    pub fn toggle_running(&mut self) -> Result<bool, PlotterError> {
        if !self.is_connected() {
            return Err(PlotterError::NotConnected);
        }
        if self.running {
            self.running = false;
            Ok(false)
        } else {
            self.start_running().map(|_| true)
        }
    }

    // CSV 目标可能在暂停期间被改过，运行前与记录器对齐
    fn start_running(&mut self) -> Result<(), PlotterError> {
        match &self.csv_target {
            Some(target) if self.recorder.path() != Some(target.as_path()) => {
                self.recorder.start(target)?;
            }
            Some(_) => {}
            None => self.recorder.stop(),
        }
        self.running = true;
        Ok(())
    }

    /// One render-step: drain the link, parse, buffer and log.
    ///
    /// A read or CSV write failure disconnects before the error is returned.
    pub fn tick(&mut self) -> Result<TickReport, PlotterError> {
        let mut report = TickReport::default();
        if !self.running {
            return Ok(report);
        }
        let Some(link) = self.link.as_mut() else {
            return Ok(report);
        };
        loop {
            let n = match link.read_available(&mut self.read_buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    break
                }
                Err(err) => {
                    log::error!("❌ Read from {} failed: {err}", self.port_name);
                    self.disconnect();
                    return Err(PlotterError::Read(err));
                }
            };
            let recorder = &mut self.recorder;
            let chunk = self
                .pipeline
                .ingest(&self.read_buf[..n], |sample| recorder.write_record(sample.values()));
            match chunk {
                Ok(chunk) => report.merge(chunk),
                Err(err) => {
                    log::error!("❌ CSV logging failed: {err}");
                    self.disconnect();
                    return Err(err);
                }
            }
        }
        Ok(report)
    }

    pub fn visible_series(&self) -> Vec<SeriesView> {
        self.pipeline.visible_series()
    }
}

impl Default for PlotterEngine {
    fn default() -> Self {
        Self {
            pipeline: SamplePipeline::default(),
            link: None,
            port_name: String::new(),
            running: false,
            recorder: CsvRecorder::new(),
            csv_target: None,
            read_buf: vec![0u8; READ_CHUNK],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{ManualSource, Step};
    use crate::serial::testing::{no_wait, FlakyOpener};
    use std::io;

    fn engine() -> PlotterEngine {
        PlotterEngine::new(100).unwrap()
    }

    fn rows(engine: &PlotterEngine) -> Vec<Vec<f64>> {
        engine.buffer().iter().map(|s| s.values().to_vec()).collect()
    }

    #[test]
    fn end_to_end_skips_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("session.csv");
        let mut engine = engine();
        engine.set_csv_target(Some(csv.clone()));
        let opener = FlakyOpener::new(
            0,
            vec![
                Step::Data(b"1,2\n".to_vec()),
                Step::Data(b"3,4\nx,4\n".to_vec()),
                Step::Data(b"5,6\n".to_vec()),
            ],
        );
        engine.connect(&opener, "COM1", 9600, no_wait()).unwrap();
        assert!(engine.state().is_running());
        let report = engine.tick().unwrap();
        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(rows(&engine), vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(engine.buffer().total_count(), 3);
        assert_eq!(engine.registry().slot_count(), 2);
        engine.disconnect();
        let text = std::fs::read_to_string(&csv).unwrap();
        assert_eq!(text, "1.0,2.0\n3.0,4.0\n5.0,6.0\n");
    }

    #[test]
    fn partial_lines_complete_on_a_later_tick() {
        let mut engine = engine();
        engine.attach(
            Box::new(ManualSource::new(vec![
                Step::Data(b"1,2\n3,".to_vec()),
                Step::Idle,
                Step::Data(b"4\n".to_vec()),
            ])),
            "sim",
        );
        engine.toggle_running().unwrap();
        assert_eq!(engine.tick().unwrap().accepted, 1);
        assert_eq!(engine.tick().unwrap().accepted, 1);
        assert_eq!(rows(&engine), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn paused_engine_does_not_ingest() {
        let mut engine = engine();
        engine.attach(Box::new(ManualSource::lines(&["1\n", "2\n"])), "sim");
        assert_eq!(engine.state(), ConnectionState::Connected(RunState::Paused));
        assert_eq!(engine.tick().unwrap(), TickReport::default());
        assert!(engine.buffer().is_empty());
        assert!(engine.toggle_running().unwrap());
        assert_eq!(engine.tick().unwrap().accepted, 2);
    }

    #[test]
    fn read_error_forces_disconnect_and_closes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine();
        engine.set_csv_target(Some(dir.path().join("unplug.csv")));
        let opener = FlakyOpener::new(
            0,
            vec![
                Step::Data(b"1\n".to_vec()),
                Step::Fail(io::ErrorKind::BrokenPipe),
            ],
        );
        engine.connect(&opener, "COM9", 9600, no_wait()).unwrap();
        assert!(engine.recorder().is_recording());
        let err = engine.tick().unwrap_err();
        assert!(matches!(err, PlotterError::Read(_)));
        assert_eq!(engine.state(), ConnectionState::Disconnected);
        assert!(!engine.recorder().is_recording());
        // the sample that arrived before the failure is still shown
        assert_eq!(engine.buffer().len(), 1);
    }

    #[test]
    fn timeouts_just_end_the_tick() {
        let mut engine = engine();
        engine.attach(
            Box::new(ManualSource::new(vec![
                Step::Data(b"1\n".to_vec()),
                Step::Fail(io::ErrorKind::TimedOut),
                Step::Data(b"2\n".to_vec()),
            ])),
            "sim",
        );
        engine.toggle_running().unwrap();
        assert_eq!(engine.tick().unwrap().accepted, 1);
        assert!(engine.is_connected());
        assert_eq!(engine.tick().unwrap().accepted, 1);
    }

    #[test]
    fn failed_connect_stays_disconnected() {
        let mut engine = engine();
        let opener = FlakyOpener::new(3, Vec::new());
        let err = engine.connect(&opener, "COM4", 9600, no_wait()).unwrap_err();
        assert!(matches!(err, PlotterError::Open { attempts: 3, .. }));
        assert_eq!(opener.calls.get(), 3);
        assert_eq!(engine.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn csv_open_failure_keeps_link_paused() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine();
        // the directory itself is not a writable file
        engine.set_csv_target(Some(dir.path().to_path_buf()));
        let opener = FlakyOpener::new(0, vec![Step::Data(b"1\n".to_vec())]);
        let err = engine.connect(&opener, "COM2", 9600, no_wait()).unwrap_err();
        assert!(matches!(err, PlotterError::CsvOpen { .. }));
        assert_eq!(engine.state(), ConnectionState::Connected(RunState::Paused));
        assert!(engine.toggle_running().is_err());
        engine.set_csv_target(Some(dir.path().join("ok.csv")));
        assert!(engine.toggle_running().unwrap());
    }

    #[test]
    fn connect_clears_previous_history() {
        let mut engine = engine();
        engine.attach(Box::new(ManualSource::lines(&["1,2\n"])), "first");
        engine.toggle_running().unwrap();
        engine.tick().unwrap();
        assert_eq!(engine.buffer().total_count(), 1);
        let opener = FlakyOpener::new(0, Vec::new());
        engine.connect(&opener, "second", 9600, no_wait()).unwrap();
        assert_eq!(engine.buffer().total_count(), 0);
        assert_eq!(engine.port_name(), "second");
        // channels outlive the reconnect
        assert_eq!(engine.registry().slot_count(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn csv_write_failure_forces_disconnect() {
        let mut engine = engine();
        // /dev/full accepts the open but every flush fails with ENOSPC
        engine.set_csv_target(Some(PathBuf::from("/dev/full")));
        let opener = FlakyOpener::new(0, vec![Step::Data(b"1,2\n".to_vec())]);
        engine.connect(&opener, "COM5", 9600, no_wait()).unwrap();
        assert!(engine.recorder().is_recording());
        let err = engine.tick().unwrap_err();
        assert!(matches!(err, PlotterError::CsvWrite(_)));
        assert_eq!(engine.state(), ConnectionState::Disconnected);
        assert!(!engine.recorder().is_recording());
    }

    #[test]
    fn csv_target_changed_while_paused_applies_on_run() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let mut engine = engine();
        engine.set_csv_target(Some(first.clone()));
        let opener = FlakyOpener::new(
            0,
            vec![Step::Data(b"1\n".to_vec()), Step::Idle, Step::Data(b"2\n".to_vec())],
        );
        engine.connect(&opener, "COM6", 9600, no_wait()).unwrap();
        engine.tick().unwrap();
        assert!(!engine.toggle_running().unwrap());
        engine.set_csv_target(Some(second.clone()));
        assert!(engine.toggle_running().unwrap());
        assert_eq!(engine.recorder().path(), Some(second.as_path()));
        engine.tick().unwrap();
        engine.disconnect();
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "1.0\n");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "2.0\n");
    }

    #[test]
    fn disabling_csv_while_paused_stops_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine();
        engine.set_csv_target(Some(dir.path().join("log.csv")));
        let opener = FlakyOpener::new(0, Vec::new());
        engine.connect(&opener, "COM8", 9600, no_wait()).unwrap();
        engine.toggle_running().unwrap();
        engine.set_csv_target(None);
        engine.toggle_running().unwrap();
        assert!(!engine.recorder().is_recording());
    }

    #[test]
    fn new_validates_saved_capacity() {
        assert_eq!(PlotterEngine::new(250).unwrap().buffer().max_points(), 250);
        assert!(matches!(
            PlotterEngine::new(0),
            Err(PlotterError::InvalidCapacity { actual: 0, .. })
        ));
    }

    #[test]
    fn toggle_requires_connection() {
        let mut engine = engine();
        assert!(matches!(
            engine.toggle_running(),
            Err(PlotterError::NotConnected)
        ));
    }

    #[test]
    fn capacity_changes_apply_while_connected() {
        let mut engine = engine();
        let lines: Vec<String> = (0..50).map(|i| format!("{i}\n")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        engine.attach(Box::new(ManualSource::lines(&refs)), "sim");
        engine.toggle_running().unwrap();
        engine.tick().unwrap();
        engine.set_max_points(10).unwrap();
        assert_eq!(engine.buffer().len(), 10);
        assert_eq!(engine.buffer().window_start(), 40);
        let series = engine.visible_series();
        assert_eq!(series[0].points.first(), Some(&[40.0, 40.0]));
    }
}
