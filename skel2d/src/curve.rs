use crate::Error;

pub(crate) const LINEAR: f32 = 0.0;
pub(crate) const STEPPED: f32 = 1.0;
pub(crate) const BEZIER: f32 = 2.0;
/// Floats stored per sampled bezier: 9 points of (x, y).
pub const BEZIER_SIZE: usize = 18;

/// Interpolation between a keyframe and the one after it.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Curve {
    #[default]
    Linear,
    Stepped,
    /// Control points normalized to the segment: x in time, y in value, both 0 at the
    /// segment start and 1 at its end.
    Bezier {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
    },
}

/// Flat keyframe storage: `entries` floats per frame (`[time, v0, v1, ..]`) plus a parallel
/// curve array holding one type code per frame followed by the pre-sampled bezier tables.
///
/// The last frame is always stepped, so interpolation never reads past the end.
#[derive(Clone, Debug)]
pub struct CurveFrames {
    entries: usize,
    frames: Vec<f32>,
    curves: Vec<f32>,
}

impl CurveFrames {
    /// `entries` counts the time slot, so a single-value timeline uses 2.
    pub fn new(entries: usize, frame_count: usize) -> Self {
        let entries = entries.max(1);
        let mut curves = vec![LINEAR; frame_count];
        if let Some(last) = curves.last_mut() {
            *last = STEPPED;
        }
        Self {
            entries,
            frames: vec![0.0; frame_count * entries],
            curves,
        }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn value_count(&self) -> usize {
        self.entries - 1
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len() / self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    pub fn curves(&self) -> &[f32] {
        &self.curves
    }

    pub fn duration(&self) -> f32 {
        self.frames
            .len()
            .checked_sub(self.entries)
            .map_or(0.0, |i| self.frames[i])
    }

    #[inline]
    pub fn time(&self, frame: usize) -> f32 {
        self.frames[frame * self.entries]
    }

    #[inline]
    pub fn value(&self, frame: usize, value: usize) -> f32 {
        self.frames[frame * self.entries + 1 + value]
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, values: &[f32]) -> Result<(), Error> {
        if frame >= self.frame_count() {
            return Err(Error::invalid_data(format!(
                "frame {frame} out of range ({} frames)",
                self.frame_count()
            )));
        }
        if values.len() != self.value_count() {
            return Err(Error::invalid_data(format!(
                "expected {} values per frame, got {}",
                self.value_count(),
                values.len()
            )));
        }
        let i = frame * self.entries;
        self.frames[i] = time;
        self.frames[i + 1..i + self.entries].copy_from_slice(values);
        Ok(())
    }

    pub fn set_linear(&mut self, frame: usize) {
        if let Some(c) = self.curves.get_mut(frame) {
            *c = LINEAR;
        }
    }

    pub fn set_stepped(&mut self, frame: usize) {
        if let Some(c) = self.curves.get_mut(frame) {
            *c = STEPPED;
        }
    }

    /// Applies `curve` to every value of `frame`, mapping normalized control points onto the
    /// segment endpoints. Both frames of the segment must be set first.
    pub fn set_curve(&mut self, frame: usize, curve: Curve) -> Result<(), Error> {
        match curve {
            Curve::Linear => self.set_linear(frame),
            Curve::Stepped => self.set_stepped(frame),
            Curve::Bezier { cx1, cy1, cx2, cy2 } => {
                if frame + 1 >= self.frame_count() {
                    return Err(Error::invalid_data("bezier curve on the last frame"));
                }
                let (time1, time2) = (self.time(frame), self.time(frame + 1));
                let span = time2 - time1;
                let (tx1, tx2) = (time1 + cx1 * span, time1 + cx2 * span);
                if self.value_count() == 0 {
                    return self.set_bezier(
                        frame, 0, time1, 0.0, tx1, cy1, tx2, cy2, time2, 1.0,
                    );
                }
                for value in 0..self.value_count() {
                    let (value1, value2) = (self.value(frame, value), self.value(frame + 1, value));
                    let range = value2 - value1;
                    self.set_bezier(
                        frame,
                        value,
                        time1,
                        value1,
                        tx1,
                        value1 + cy1 * range,
                        tx2,
                        value1 + cy2 * range,
                        time2,
                        value2,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Samples a cubic bezier into a lookup table using forward differencing.
    ///
    /// Values of one frame must be set in order starting at 0, so their tables are contiguous.
    #[allow(clippy::too_many_arguments)]
    pub fn set_bezier(
        &mut self,
        frame: usize,
        value: usize,
        time1: f32,
        value1: f32,
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
        time2: f32,
        value2: f32,
    ) -> Result<(), Error> {
        let frame_count = self.frame_count();
        if frame >= frame_count {
            return Err(Error::invalid_data(format!(
                "bezier frame {frame} out of range ({frame_count} frames)"
            )));
        }
        if value >= self.value_count().max(1) {
            return Err(Error::invalid_data(format!(
                "bezier value {value} out of range"
            )));
        }
        let start = self.curves.len();
        if value == 0 {
            self.curves[frame] = BEZIER + start as f32;
        } else {
            let first = self.curves[frame];
            if first < BEZIER || (first - BEZIER) as usize + value * BEZIER_SIZE != start {
                return Err(Error::invalid_data(format!(
                    "bezier for value {value} of frame {frame} set out of order"
                )));
            }
        }

        let tmpx = (time1 - cx1 * 2.0 + cx2) * 0.03;
        let tmpy = (value1 - cy1 * 2.0 + cy2) * 0.03;
        let dddx = ((cx1 - cx2) * 3.0 - time1 + time2) * 0.006;
        let dddy = ((cy1 - cy2) * 3.0 - value1 + value2) * 0.006;
        let mut ddx = tmpx * 2.0 + dddx;
        let mut ddy = tmpy * 2.0 + dddy;
        let mut dx = (cx1 - time1) * 0.3 + tmpx + dddx * 0.166_666_67;
        let mut dy = (cy1 - value1) * 0.3 + tmpy + dddy * 0.166_666_67;
        let mut x = time1 + dx;
        let mut y = value1 + dy;

        self.curves.reserve(BEZIER_SIZE);
        for _ in 0..BEZIER_SIZE / 2 {
            self.curves.push(x);
            self.curves.push(y);
            dx += ddx;
            dy += ddy;
            ddx += dddx;
            ddy += dddy;
            x += dx;
            y += dy;
        }
        Ok(())
    }

    /// Index of the last frame whose time is `<= time`, or 0 when `time` precedes every frame.
    pub fn search(&self, time: f32) -> usize {
        search(&self.frames, time, self.entries)
    }

    /// Interpolated value `value` (0-based) at `time`. The caller handles `time` before the
    /// first frame.
    pub fn curve_value(&self, time: f32, value: usize) -> f32 {
        let frame = self.search(time);
        self.value_in_frame(time, frame, value)
    }

    pub(crate) fn value_in_frame(&self, time: f32, frame: usize, value: usize) -> f32 {
        let start = self.value(frame, value);
        if frame + 1 >= self.frame_count() {
            return start;
        }
        let end = self.value(frame + 1, value);
        match self.curve_type(frame) {
            CurveType::Linear => {
                let before = self.time(frame);
                let span = self.time(frame + 1) - before;
                if span <= 0.0 {
                    return end;
                }
                start + (time - before) / span * (end - start)
            }
            CurveType::Stepped => start,
            CurveType::Bezier(lut) => {
                self.bezier_value(time, frame, start, end, lut + value * BEZIER_SIZE)
            }
        }
    }

    /// Progress in [0, 1] through the segment starting at `frame`, for keyframes whose
    /// curves were set with values 0 to 1.
    pub fn curve_percent(&self, time: f32, frame: usize) -> f32 {
        if frame + 1 >= self.frame_count() {
            return 0.0;
        }
        match self.curve_type(frame) {
            CurveType::Linear => {
                let before = self.time(frame);
                let span = self.time(frame + 1) - before;
                if span <= 0.0 {
                    return 1.0;
                }
                (time - before) / span
            }
            CurveType::Stepped => 0.0,
            CurveType::Bezier(lut) => self.bezier_value(time, frame, 0.0, 1.0, lut),
        }
    }

    fn curve_type(&self, frame: usize) -> CurveType {
        let code = self.curves[frame];
        if code == LINEAR {
            CurveType::Linear
        } else if code == STEPPED {
            CurveType::Stepped
        } else {
            CurveType::Bezier((code - BEZIER) as usize)
        }
    }

    fn bezier_value(&self, time: f32, frame: usize, start: f32, end: f32, lut: usize) -> f32 {
        let curves = &self.curves;
        let n = lut + BEZIER_SIZE;
        if n > curves.len() {
            return start;
        }
        if curves[lut] > time {
            let x = self.time(frame);
            return start + (time - x) / (curves[lut] - x) * (curves[lut + 1] - start);
        }
        let mut i = lut + 2;
        while i < n {
            if curves[i] >= time {
                let x = curves[i - 2];
                let y = curves[i - 1];
                return y + (time - x) / (curves[i] - x) * (curves[i + 1] - y);
            }
            i += 2;
        }
        let x = curves[n - 2];
        let y = curves[n - 1];
        y + (time - x) / (self.time(frame + 1) - x) * (end - y)
    }
}

#[derive(Copy, Clone, Debug)]
enum CurveType {
    Linear,
    Stepped,
    Bezier(usize),
}

/// Binary search over a flat frame array with `step` floats per frame. Returns the index of the
/// last frame whose time is `<= time` (0 when `time` is before the first frame).
pub(crate) fn search(frames: &[f32], time: f32, step: usize) -> usize {
    let count = frames.len() / step.max(1);
    let mut low = 0usize;
    let mut high = count;
    while low < high {
        let mid = (low + high) / 2;
        if frames[mid * step] <= time {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low.saturating_sub(1)
}
