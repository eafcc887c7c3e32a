use ndarray::{Array2, s};

/// Detection record for one image: parallel arrays indexed by detection.
/// Masks start as the network's fixed-size probability maps and are
/// replaced by full-image canvases after pasting.
#[derive(Debug, Clone, Default)]
pub struct Detections {
    pub boxes: Vec<[f32; 4]>,
    pub labels: Vec<i64>,
    pub scores: Vec<f32>,
    pub masks: Option<Vec<Array2<f32>>>,
}

impl Detections {
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Rescale box coordinates from the working resolution `from` to the
    /// original image dimensions `to`, clamped into bounds.
    pub fn resize(&mut self, from: (u32, u32), to: (u32, u32)) {
        let ratio_w = to.0 as f32 / from.0 as f32;
        let ratio_h = to.1 as f32 / from.1 as f32;
        let max_x = to.0 as f32 - 1.0;
        let max_y = to.1 as f32 - 1.0;
        for bbox in &mut self.boxes {
            bbox[0] = (bbox[0] * ratio_w).clamp(0.0, max_x);
            bbox[1] = (bbox[1] * ratio_h).clamp(0.0, max_y);
            bbox[2] = (bbox[2] * ratio_w).clamp(0.0, max_x);
            bbox[3] = (bbox[3] * ratio_h).clamp(0.0, max_y);
        }
    }

    /// Keep only detections scoring at or above `threshold`, all parallel
    /// fields staying aligned.
    pub fn select_top(&mut self, threshold: f32) {
        let keep: Vec<usize> = self
            .scores
            .iter()
            .enumerate()
            .filter(|&(_, &score)| score >= threshold)
            .map(|(i, _)| i)
            .collect();

        self.boxes = keep.iter().map(|&i| self.boxes[i]).collect();
        self.labels = keep.iter().map(|&i| self.labels[i]).collect();
        self.scores = keep.iter().map(|&i| self.scores[i]).collect();
        if let Some(masks) = &mut self.masks {
            *masks = keep.iter().map(|&i| masks[i].clone()).collect();
        }
    }
}

/// Pastes fixed-size mask probability maps into full-image canvases at
/// their box locations. `threshold: None` is heatmap mode: raw
/// probabilities are kept instead of a binary mask.
#[derive(Debug, Clone, Copy)]
pub struct Masker {
    threshold: Option<f32>,
    padding: u32,
}

impl Masker {
    pub fn new(threshold: Option<f32>, padding: u32) -> Self {
        Self { threshold, padding }
    }

    /// Replace every per-box mask with its pasted full-image canvas.
    pub fn paste_all(&self, detections: &mut Detections, width: u32, height: u32) {
        if let Some(masks) = &mut detections.masks {
            for (mask, bbox) in masks.iter_mut().zip(&detections.boxes) {
                *mask = self.paste(mask, *bbox, width, height);
            }
        }
    }

    /// Paste one mask into a `height` x `width` canvas at its box. The
    /// mask border is zero-padded first (and the box grown to match) to
    /// damp edge artifacts; the written region is clipped to the canvas.
    pub fn paste(&self, mask: &Array2<f32>, bbox: [f32; 4], width: u32, height: u32) -> Array2<f32> {
        let (padded, scale) = expand_mask(mask, self.padding);
        let bbox = expand_box(bbox, scale);

        let x0 = bbox[0].floor() as i64;
        let y0 = bbox[1].floor() as i64;
        let box_w = ((bbox[2] - bbox[0] + 1.0).round() as i64).max(1) as usize;
        let box_h = ((bbox[3] - bbox[1] + 1.0).round() as i64).max(1) as usize;

        let resized = resize_bilinear(&padded, box_h, box_w);

        let mut canvas = Array2::<f32>::zeros((height as usize, width as usize));
        let x_start = x0.max(0);
        let y_start = y0.max(0);
        let x_end = (x0 + box_w as i64).min(width as i64);
        let y_end = (y0 + box_h as i64).min(height as i64);
        for y in y_start..y_end {
            for x in x_start..x_end {
                let value = resized[[(y - y0) as usize, (x - x0) as usize]];
                canvas[[y as usize, x as usize]] = match self.threshold {
                    Some(t) => {
                        if value > t {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    None => value,
                };
            }
        }
        canvas
    }
}

/// Zero-pad the mask border; returns the padded map and the factor by
/// which the box must grow so mask pixels stay aligned.
fn expand_mask(mask: &Array2<f32>, padding: u32) -> (Array2<f32>, f32) {
    let p = padding as usize;
    let (h, w) = mask.dim();
    let mut padded = Array2::<f32>::zeros((h + 2 * p, w + 2 * p));
    padded.slice_mut(s![p..p + h, p..p + w]).assign(mask);
    (padded, (w + 2 * p) as f32 / w as f32)
}

fn expand_box(bbox: [f32; 4], scale: f32) -> [f32; 4] {
    let cx = (bbox[2] + bbox[0]) * 0.5;
    let cy = (bbox[3] + bbox[1]) * 0.5;
    let half_w = (bbox[2] - bbox[0]) * 0.5 * scale;
    let half_h = (bbox[3] - bbox[1]) * 0.5 * scale;
    [cx - half_w, cy - half_h, cx + half_w, cy + half_h]
}

fn resize_bilinear(map: &Array2<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (h, w) = map.dim();
    let mut out = Array2::<f32>::zeros((out_h, out_w));
    let sy = h as f32 / out_h as f32;
    let sx = w as f32 / out_w as f32;
    for oy in 0..out_h {
        for ox in 0..out_w {
            let fy = ((oy as f32 + 0.5) * sy - 0.5).clamp(0.0, h as f32 - 1.0);
            let fx = ((ox as f32 + 0.5) * sx - 0.5).clamp(0.0, w as f32 - 1.0);
            let y0 = fy.floor() as usize;
            let x0 = fx.floor() as usize;
            let y1 = (y0 + 1).min(h - 1);
            let x1 = (x0 + 1).min(w - 1);
            let dy = fy - y0 as f32;
            let dx = fx - x0 as f32;
            let top = map[[y0, x0]] * (1.0 - dx) + map[[y0, x1]] * dx;
            let bottom = map[[y1, x0]] * (1.0 - dx) + map[[y1, x1]] * dx;
            out[[oy, ox]] = top * (1.0 - dy) + bottom * dy;
        }
    }
    out
}
