use crate::drivers::buffer::HistoryBuffer;
pub const STATE_VISIBLE: &str = "true";
pub const STATE_HIDDEN: &str = "false";
pub const STATE_REMOVED: &str = "removed";
/// A named display series bound to one tuple position.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub index: usize,
    pub name: String,
    pub visible: bool,
    pub color: [u8; 3],
}
impl Channel {
    fn new(index: usize, name: String, hues: usize) -> Self {
        Self {
            index,
            name,
            visible: true,
            color: palette_color(index, hues),
        }
    }
}
/// Ready-to-draw points for one visible channel.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesView {
    pub index: usize,
    pub name: String,
    pub color: [u8; 3],
    pub points: Vec<[f64; 2]>,
}
pub fn default_channel_name(index: usize) -> String {
    format!("Data {}", index + 1)
}
/// Evenly spaced hue around the wheel at full saturation and value.
pub fn palette_color(index: usize, hues: usize) -> [u8; 3] {
    let hues = hues.max(1);
    let hue = 360.0 * (index % hues) as f64 / hues as f64;
    hsv_to_rgb(hue, 1.0, 1.0)
}
fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let c = value * saturation;
    let h = (hue % 360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
/// Channel slots indexed by tuple position.
///
/// Removing a channel leaves a tombstone (`None`) so every other index keeps its
/// meaning; a tombstoned slot is never recreated by incoming data.
#[derive(Default, Debug)]
pub struct SeriesRegistry {
    slots: Vec<Option<Channel>>,
}
impl SeriesRegistry {
    /// Number of slots, tombstones included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.slots.iter().flatten()
    }
    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.slots.get(index).and_then(Option::as_ref)
    }
    pub fn ensure_channel(&mut self, index: usize) {
        let hues = index + 1;
        while self.slots.len() <= index {
            let next = self.slots.len();
            self.slots
                .push(Some(Channel::new(next, default_channel_name(next), hues)));
        }
    }
    pub fn ensure_width(&mut self, width: usize) {
        if width > self.slot_count() {
            self.ensure_channel(width - 1);
        }
    }
    pub fn rename(&mut self, index: usize, name: impl Into<String>) {
        if let Some(channel) = self.live_mut(index) {
            channel.name = name.into();
        }
    }
    pub fn set_visible(&mut self, index: usize, visible: bool) {
        if let Some(channel) = self.live_mut(index) {
            channel.visible = visible;
        }
    }
    pub fn remove(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }
    /// Drop every slot, tombstones included.
    pub fn clear_all(&mut self) {
        self.slots.clear();
    }
    pub fn visible_series(&self, buffer: &HistoryBuffer) -> Vec<SeriesView> {
        let total = buffer.total_count();
        self.channels()
            .filter(|channel| channel.visible)
            .map(|channel| {
                let ys: Vec<f64> = buffer
                    .iter()
                    .filter_map(|sample| sample.get(channel.index))
                    .collect();
                let start = total - ys.len() as u64;
                let points = ys
                    .into_iter()
                    .enumerate()
                    .map(|(offset, y)| [(start + offset as u64) as f64, y])
                    .collect();
                SeriesView {
                    index: channel.index,
                    name: channel.name.clone(),
                    color: channel.color,
                    points,
                }
            })
            .collect()
    }
    /// Rebuild slots from the persisted parallel name/state lists.
    pub fn restore_from(&mut self, names: &[String], states: &[String]) {
        let hues = names.len().min(states.len());
        self.slots = names
            .iter()
            .zip(states)
            .enumerate()
            .map(|(index, (name, state))| match state.as_str() {
                STATE_REMOVED => None,
                state => {
                    let mut channel = Channel::new(index, name.clone(), hues);
                    channel.visible = state == STATE_VISIBLE;
                    Some(channel)
                }
            })
            .collect();
    }
    /// Parallel name/state lists for persistence.
    pub fn snapshot(&self) -> (Vec<String>, Vec<String>) {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(channel) => (
                    channel.name.clone(),
                    (if channel.visible { STATE_VISIBLE } else { STATE_HIDDEN }).to_owned(),
                ),
                None => (String::new(), STATE_REMOVED.to_owned()),
            })
            .unzip()
    }
    fn live_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }
}
