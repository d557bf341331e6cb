use crate::application::ports::FrameRenderer;

const SQUARE_SIDE: u32 = 24;
const SQUARE_SHADE: u8 = 0xF0;

/// 8-bit grayscale test scene: a horizontal gradient with a square that
/// sweeps across it, one pixel per sequence step. Row-major, one byte per
/// pixel.
pub struct SyntheticSceneRenderer {
    width: u32,
    height: u32,
}

impl SyntheticSceneRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn square_origin(&self, sequence: u64) -> (u32, u32) {
        let side = SQUARE_SIDE.min(self.width).min(self.height);
        let span_x = u64::from(self.width - side + 1);
        let span_y = u64::from(self.height - side + 1);
        let x = (sequence % span_x) as u32;
        let y = ((sequence / span_x) % span_y) as u32;
        (x, y)
    }
}

impl FrameRenderer for SyntheticSceneRenderer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render(&self, sequence: u64) -> Vec<u8> {
        let side = SQUARE_SIDE.min(self.width).min(self.height);
        let (sx, sy) = self.square_origin(sequence);
        // Background drifts slowly so consecutive frames differ everywhere
        let drift = (sequence % 256) as u32;

        let mut pixels = Vec::with_capacity((self.width * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let inside = x >= sx && x < sx + side && y >= sy && y < sy + side;
                let shade = if inside {
                    SQUARE_SHADE
                } else {
                    ((x * 0xA0 / self.width + drift) % 0xA0) as u8
                };
                pixels.push(shade);
            }
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_matches_dimensions() {
        let renderer = SyntheticSceneRenderer::new(64, 48);
        assert_eq!(renderer.dimensions(), (64, 48));
        assert_eq!(renderer.render(0).len(), 64 * 48);
    }

    #[test]
    fn test_render_is_deterministic_per_sequence() {
        let renderer = SyntheticSceneRenderer::new(32, 32);
        assert_eq!(renderer.render(7), renderer.render(7));
        assert_ne!(renderer.render(7), renderer.render(8));
    }

    #[test]
    fn test_tiny_canvas_does_not_panic() {
        let renderer = SyntheticSceneRenderer::new(1, 1);
        for sequence in 0..5 {
            assert_eq!(renderer.render(sequence).len(), 1);
        }
    }
}
