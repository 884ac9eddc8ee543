use std::io;
/// Anything that can hand over bytes that have already arrived.
///
/// Implementations must not block waiting for data: `Ok(0)` means nothing is
/// pending right now.
pub trait ByteSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
/// One scripted event for [`ManualSource`].
#[cfg(test)]
pub enum Step {
    Data(Vec<u8>),
    /// Ends the current drain, as if the device went quiet for a tick.
    Idle,
    Fail(io::ErrorKind),
}
/// In-memory source useful for tests and deterministic playback.
#[cfg(test)]
pub struct ManualSource {
    queue: std::collections::VecDeque<Step>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            queue: steps.into_iter().collect(),
        }
    }
    pub fn lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| Step::Data(l.as_bytes().to_vec())))
    }
}
#[cfg(test)]
impl ByteSource for ManualSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.queue.pop_front() {
            None | Some(Step::Idle) => Ok(0),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    self.queue.push_front(Step::Data(rest));
                }
                Ok(n)
            }
        }
    }
}
