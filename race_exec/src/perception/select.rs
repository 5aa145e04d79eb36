//! Detection selection policy

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use ordered_float::OrderedFloat;

use comms_if::eqpt::perception::GateBox;
use super::{Detection, Params};

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Select the gate to servo on from all boxes found in a frame.
///
/// Boxes scoring under the confidence threshold are discarded and the largest remaining box,
/// which is the nearest gate, is selected. The selection is only reported if its area lies within
/// the configured bounds.
pub fn select_detection(boxes: &[GateBox], params: &Params) -> Option<Detection> {
    let largest = boxes
        .iter()
        .filter(|b| b.score >= params.min_confidence)
        .max_by_key(|b| OrderedFloat(b.area()))?;

    let area = largest.area();
    if area < params.min_area || area > params.max_area {
        return None;
    }

    let (mx, my) = largest.centre();

    Some(Detection {
        mx,
        my,
        w: largest.width(),
        h: largest.height(),
        score: largest.score,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn gate_box(x_min: f64, y_min: f64, size: f64, score: f64) -> GateBox {
        GateBox {
            y_min,
            x_min,
            y_max: y_min + size,
            x_max: x_min + size,
            score,
        }
    }

    #[test]
    fn test_largest_confident_box_selected() {
        let params = Params::default();
        let boxes = vec![
            gate_box(0.1, 0.1, 0.2, 0.99),
            // Bigger but not confident enough
            gate_box(0.2, 0.2, 0.6, 0.90),
            gate_box(0.4, 0.3, 0.4, 0.98),
        ];

        let det = select_detection(&boxes, &params).unwrap();

        assert!((det.w - 0.4).abs() < 1e-12);
        assert!((det.h - 0.4).abs() < 1e-12);
        assert!((det.mx - 0.6).abs() < 1e-12);
        assert!((det.my - 0.5).abs() < 1e-12);
        assert_eq!(det.score, 0.98);
    }

    #[test]
    fn test_area_bounds() {
        let params = Params::default();

        // Too far away
        assert_eq!(select_detection(&[gate_box(0.5, 0.5, 0.05, 0.99)], &params), None);

        // Filling the frame
        assert_eq!(select_detection(&[gate_box(0.0, 0.0, 0.995, 0.99)], &params), None);

        // Nothing confident
        assert_eq!(select_detection(&[gate_box(0.2, 0.2, 0.3, 0.5)], &params), None);
        assert_eq!(select_detection(&[], &params), None);
    }

    #[test]
    fn test_out_of_bounds_largest_box_is_not_replaced() {
        let params = Params {
            min_area: 0.05,
            ..Default::default()
        };

        // The largest box is too small, the smaller one must not be picked instead
        let boxes = vec![gate_box(0.1, 0.1, 0.2, 0.99), gate_box(0.5, 0.5, 0.1, 0.99)];
        assert_eq!(select_detection(&boxes, &params), None);

        let boxes = vec![gate_box(0.1, 0.1, 0.1, 0.99), gate_box(0.5, 0.5, 0.3, 0.99)];
        let det = select_detection(&boxes, &params).unwrap();
        assert!((det.w - 0.3).abs() < 1e-12);
    }
}
