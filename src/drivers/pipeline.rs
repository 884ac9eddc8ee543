use crate::drivers::buffer::HistoryBuffer;
use crate::drivers::ingest::LineIngestor;
use crate::drivers::parser::{parse_sample, Sample};
use crate::drivers::registry::{SeriesRegistry, SeriesView};
use crate::drivers::PlotterError;
use crate::types::TickReport;
/// Turns raw serial bytes into buffered samples and channels. Does no I/O.
#[derive(Default)]
pub struct SamplePipeline {
    ingestor: LineIngestor,
    buffer: HistoryBuffer,
    registry: SeriesRegistry,
}
impl SamplePipeline {
    pub fn with_max_points(max_points: usize) -> Result<Self, PlotterError> {
        Ok(Self {
            buffer: HistoryBuffer::with_capacity(max_points)?,
            ..Self::default()
        })
    }
    pub fn buffer(&self) -> &HistoryBuffer {
        &self.buffer
    }
    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }
    pub fn registry_mut(&mut self) -> &mut SeriesRegistry {
        &mut self.registry
    }
    pub fn set_max_points(&mut self, max_points: usize) -> Result<(), PlotterError> {
        self.buffer.set_capacity(max_points)
    }
    /// Empty the history and forget any half-received line. Channels are kept.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ingestor.reset();
    }
    /// Feed one chunk of bytes.
    ///
    /// `on_sample` sees every accepted sample before it is buffered; its error
    /// aborts the rest of the chunk.
    pub fn ingest<E>(
        &mut self,
        bytes: &[u8],
        mut on_sample: impl FnMut(&Sample) -> Result<(), E>,
    ) -> Result<TickReport, E> {
        let mut report = TickReport::default();
        for line in self.ingestor.feed(bytes) {
            report.lines += 1;
            match parse_sample(&line) {
                Ok(sample) => {
                    on_sample(&sample)?;
                    self.registry.ensure_width(sample.width());
                    self.buffer.push(sample);
                    report.accepted += 1;
                }
                Err(err) => {
                    log::debug!("dropping line {line:?}: {err}");
                    report.rejected += 1;
                }
            }
        }
        Ok(report)
    }
    pub fn visible_series(&self) -> Vec<SeriesView> {
        self.registry.visible_series(&self.buffer)
    }
}
